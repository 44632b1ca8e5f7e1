//! Nullable store: thread-safe in-memory verification records.

use reval_store::{StoreError, VerificationStore};
use reval_types::{Clock, GroupId, MemberId, VerificationLink, VerificationRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::NullClock;

/// An in-memory [`VerificationStore`] for testing.
///
/// Counts successful writes so tests can assert that a request left the
/// store untouched, and can be switched into a failing mode.
pub struct NullVerificationStore {
    records: Mutex<HashMap<String, VerificationRecord>>,
    clock: Arc<dyn Clock>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl NullVerificationStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(NullClock::default()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
            writes: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Insert a record as-is, bypassing the uniqueness checks.
    pub fn insert(&self, record: VerificationRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.verification_link.to_string(), record);
    }

    /// Number of successful mutating calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with a backend error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_failing(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Backend("null store set to fail".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for NullVerificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationStore for NullVerificationStore {
    fn create(
        &self,
        group_id: &GroupId,
        member_id: &MemberId,
        link: &VerificationLink,
    ) -> Result<VerificationRecord, StoreError> {
        self.check_failing()?;
        let mut records = self.records.lock().unwrap();
        if records.contains_key(link.as_str()) {
            return Err(StoreError::Duplicate(link.to_string()));
        }
        if records
            .values()
            .any(|r| r.is_live() && &r.group_id == group_id && &r.member_id == member_id)
        {
            return Err(StoreError::Duplicate(format!("{group_id}/{member_id}")));
        }
        let record = VerificationRecord::new(
            group_id.clone(),
            member_id.clone(),
            link.clone(),
            self.clock.now(),
        );
        records.insert(link.to_string(), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    fn get_by_link(&self, link: &VerificationLink) -> Result<VerificationRecord, StoreError> {
        self.check_failing()?;
        self.records
            .lock()
            .unwrap()
            .get(link.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(link.to_string()))
    }

    fn find_live_by_member(
        &self,
        group_id: &GroupId,
        member_id: &MemberId,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        self.check_failing()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.is_live() && &r.group_id == group_id && &r.member_id == member_id)
            .cloned())
    }

    fn mark_verified(&self, link: &VerificationLink) -> Result<VerificationRecord, StoreError> {
        self.check_failing()?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(link.as_str())
            .ok_or_else(|| StoreError::NotFound(link.to_string()))?;
        if record.verification_status {
            return Err(StoreError::AlreadyVerified(link.to_string()));
        }
        record.verification_status = true;
        record.updated_at = self.clock.now();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record.clone())
    }

    fn set_status_url(
        &self,
        link: &VerificationLink,
        url: &str,
    ) -> Result<VerificationRecord, StoreError> {
        self.check_failing()?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(link.as_str())
            .ok_or_else(|| StoreError::NotFound(link.to_string()))?;
        record.reclaim_status_url = Some(url.to_string());
        record.updated_at = self.clock.now();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record.clone())
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        self.check_failing()?;
        Ok(self.records.lock().unwrap().len() as u64)
    }
}
