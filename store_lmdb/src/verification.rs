//! LMDB implementation of VerificationStore.
//!
//! Records live in `records` keyed by link. The `live_by_member` index maps
//! `group_id \0 member_id` to the link of the pair's unverified record and is
//! maintained in the same write transaction as the record itself, so the
//! "one live record per pair" and "verify once" checks are race-free.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use reval_store::{StoreError, VerificationStore};
use reval_types::{Clock, GroupId, MemberId, VerificationLink, VerificationRecord};

use crate::LmdbError;

pub struct LmdbVerificationStore {
    pub(crate) env: Arc<Env>,
    pub(crate) records_db: Database<Bytes, Bytes>,
    pub(crate) live_db: Database<Bytes, Bytes>,
    pub(crate) clock: Arc<dyn Clock>,
}

/// Build the live-index key `group_bytes ++ 0x00 ++ member_bytes`.
pub(crate) fn member_key(group_id: &GroupId, member_id: &MemberId) -> Vec<u8> {
    let g = group_id.as_str().as_bytes();
    let m = member_id.as_str().as_bytes();
    let mut key = Vec::with_capacity(g.len() + 1 + m.len());
    key.extend_from_slice(g);
    key.push(0);
    key.extend_from_slice(m);
    key
}

pub(crate) fn decode_record(bytes: &[u8]) -> Result<VerificationRecord, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

fn encode_record(record: &VerificationRecord) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(record)?)
}

impl LmdbVerificationStore {
    fn read_record(
        &self,
        txn: &RoTxn,
        link: &VerificationLink,
    ) -> Result<Option<VerificationRecord>, LmdbError> {
        self.records_db
            .get(txn, link.as_bytes())?
            .map(decode_record)
            .transpose()
    }
}

impl VerificationStore for LmdbVerificationStore {
    fn create(
        &self,
        group_id: &GroupId,
        member_id: &MemberId,
        link: &VerificationLink,
    ) -> Result<VerificationRecord, StoreError> {
        let live_key = member_key(group_id, member_id);
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        if self
            .records_db
            .get(&wtxn, link.as_bytes())
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(format!("link {link}")));
        }
        if self
            .live_db
            .get(&wtxn, &live_key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(format!(
                "live record for member {member_id} in group {group_id}"
            )));
        }

        let record = VerificationRecord::new(
            group_id.clone(),
            member_id.clone(),
            link.clone(),
            self.clock.now(),
        );
        let bytes = encode_record(&record)?;
        self.records_db
            .put(&mut wtxn, link.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.live_db
            .put(&mut wtxn, &live_key, link.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }

    fn get_by_link(&self, link: &VerificationLink) -> Result<VerificationRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        self.read_record(&rtxn, link)?
            .ok_or_else(|| StoreError::NotFound(link.to_string()))
    }

    fn find_live_by_member(
        &self,
        group_id: &GroupId,
        member_id: &MemberId,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let Some(link_bytes) = self
            .live_db
            .get(&rtxn, &member_key(group_id, member_id))
            .map_err(LmdbError::from)?
        else {
            return Ok(None);
        };
        let link = std::str::from_utf8(link_bytes)
            .ok()
            .and_then(|s| VerificationLink::parse(s).ok())
            .ok_or_else(|| {
                StoreError::Corruption(format!(
                    "live index for member {member_id} holds an invalid link"
                ))
            })?;
        match self.read_record(&rtxn, &link)? {
            Some(record) if record.is_live() => Ok(Some(record)),
            Some(_) => Err(StoreError::Corruption(format!(
                "live index points at verified record {link}"
            ))),
            None => Err(StoreError::Corruption(format!(
                "live index points at missing record {link}"
            ))),
        }
    }

    fn mark_verified(&self, link: &VerificationLink) -> Result<VerificationRecord, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut record = self
            .read_record(&wtxn, link)?
            .ok_or_else(|| StoreError::NotFound(link.to_string()))?;
        if record.verification_status {
            // Dropping the transaction aborts it; nothing was written.
            return Err(StoreError::AlreadyVerified(link.to_string()));
        }

        record.verification_status = true;
        record.updated_at = self.clock.now();
        let bytes = encode_record(&record)?;
        self.records_db
            .put(&mut wtxn, link.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.live_db
            .delete(
                &mut wtxn,
                &member_key(&record.group_id, &record.member_id),
            )
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }

    fn set_status_url(
        &self,
        link: &VerificationLink,
        url: &str,
    ) -> Result<VerificationRecord, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut record = self
            .read_record(&wtxn, link)?
            .ok_or_else(|| StoreError::NotFound(link.to_string()))?;
        record.reclaim_status_url = Some(url.to_string());
        record.updated_at = self.clock.now();
        let bytes = encode_record(&record)?;
        self.records_db
            .put(&mut wtxn, link.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.records_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}
