//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the gate begins
//! accepting webhooks.

use crate::environment::LmdbEnvironment;
use crate::verification::{decode_record, member_key};
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Debug)]
pub struct IntegrityReport {
    pub records: u64,
    pub live_records: u64,
    pub live_index_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check that every record decodes and that the live index agrees with the
/// records: each unverified record is indexed under its pair, and each index
/// entry points at an unverified record. Read failures are collected in the
/// report rather than causing a hard error.
pub fn check_integrity(environment: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let env = environment.env();
    let rtxn = env.read_txn()?;
    let mut report = IntegrityReport {
        records: 0,
        live_records: 0,
        live_index_entries: environment.live_db.len(&rtxn)?,
        errors: Vec::new(),
    };

    for entry in environment.records_db.iter(&rtxn)? {
        let (key, value) = entry?;
        report.records += 1;
        let record = match decode_record(value) {
            Ok(record) => record,
            Err(e) => {
                report.errors.push(format!(
                    "record {} does not decode: {e}",
                    String::from_utf8_lossy(key)
                ));
                continue;
            }
        };
        if record.verification_link.as_bytes() != key {
            report.errors.push(format!(
                "record stored under {} carries link {}",
                String::from_utf8_lossy(key),
                record.verification_link
            ));
        }
        if !record.is_live() {
            continue;
        }
        report.live_records += 1;
        let indexed = environment
            .live_db
            .get(&rtxn, &member_key(&record.group_id, &record.member_id))?;
        if indexed != Some(key) {
            report.errors.push(format!(
                "live record {} is not the indexed record for its member",
                record.verification_link
            ));
        }
    }

    if report.live_index_entries != report.live_records {
        report.errors.push(format!(
            "live index has {} entries but {} records are unverified",
            report.live_index_entries, report.live_records
        ));
    }

    if report.is_healthy() {
        tracing::debug!(records = report.records, "LMDB integrity check passed");
    } else {
        tracing::warn!(errors = report.errors.len(), "LMDB integrity check found problems");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reval_store::VerificationStore;
    use reval_types::{SystemClock, VerificationLink};
    use std::sync::Arc;

    #[test]
    fn fresh_and_populated_databases_are_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).unwrap();
        assert!(check_integrity(&env).unwrap().is_healthy());

        let store = env.verification_store(Arc::new(SystemClock));
        let a = VerificationLink::parse("aaaa").unwrap();
        let b = VerificationLink::parse("bbbb").unwrap();
        store.create(&"G1".into(), &"M1".into(), &a).unwrap();
        store.create(&"G1".into(), &"M2".into(), &b).unwrap();
        store.mark_verified(&a).unwrap();

        let report = check_integrity(&env).unwrap();
        assert!(report.is_healthy(), "{:?}", report.errors);
        assert_eq!(report.records, 2);
        assert_eq!(report.live_records, 1);
        assert_eq!(report.live_index_entries, 1);
    }
}
