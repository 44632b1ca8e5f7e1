//! The verification record, the only persisted entity.

use serde::{Deserialize, Serialize};

use crate::{GroupId, MemberId, Timestamp, VerificationLink};

/// State of one member's verification for one group.
///
/// `verification_status` starts `false` and flips to `true` exactly once.
/// Records are never deleted; verified ones form the audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub group_id: GroupId,
    pub member_id: MemberId,
    pub verification_link: VerificationLink,
    pub verification_status: bool,
    /// External polling URL of the in-flight proof session, if any.
    #[serde(default)]
    pub reclaim_status_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl VerificationRecord {
    /// A fresh, unverified record.
    pub fn new(
        group_id: GroupId,
        member_id: MemberId,
        verification_link: VerificationLink,
        now: Timestamp,
    ) -> Self {
        Self {
            group_id,
            member_id,
            verification_link,
            verification_status: false,
            reclaim_status_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this record still gates a pending join request.
    pub fn is_live(&self) -> bool {
        !self.verification_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VerificationRecord {
        VerificationRecord::new(
            GroupId::from("G1"),
            MemberId::from("M1"),
            VerificationLink::parse("abc123").unwrap(),
            Timestamp::new(1_700_000_000),
        )
    }

    #[test]
    fn new_record_is_live() {
        let record = sample();
        assert!(record.is_live());
        assert_eq!(record.created_at, record.updated_at);
        assert!(record.reclaim_status_url.is_none());
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["groupId"], "G1");
        assert_eq!(value["memberId"], "M1");
        assert_eq!(value["verificationLink"], "abc123");
        assert_eq!(value["verificationStatus"], false);
        assert_eq!(value["createdAt"], 1_700_000_000u64);
    }

    #[test]
    fn bincode_roundtrip_keeps_optional_url() {
        let mut record = sample();
        record.reclaim_status_url = Some("https://status.example/abc".into());
        let bytes = bincode::serialize(&record).unwrap();
        let back: VerificationRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, record);
    }
}
