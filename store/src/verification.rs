//! Verification record storage trait.

use crate::StoreError;
use reval_types::{GroupId, MemberId, VerificationLink, VerificationRecord};

/// Persistence for verification records, keyed by verification link.
///
/// Implementations stamp `created_at`/`updated_at` from their clock and must
/// make each mutating call atomic: the check and the write of
/// [`create`](Self::create) and [`mark_verified`](Self::mark_verified) happen
/// in one transaction. There is no delete; records are the audit trail.
pub trait VerificationStore: Send + Sync {
    /// Insert a new unverified record.
    ///
    /// Fails with [`StoreError::Duplicate`] if the link is taken or a live
    /// (unverified) record already exists for `(group_id, member_id)`.
    fn create(
        &self,
        group_id: &GroupId,
        member_id: &MemberId,
        link: &VerificationLink,
    ) -> Result<VerificationRecord, StoreError>;

    /// Look up a record by its link.
    fn get_by_link(&self, link: &VerificationLink) -> Result<VerificationRecord, StoreError>;

    /// The live (unverified) record for a member of a group, if any.
    fn find_live_by_member(
        &self,
        group_id: &GroupId,
        member_id: &MemberId,
    ) -> Result<Option<VerificationRecord>, StoreError>;

    /// Flip `verification_status` from `false` to `true`.
    ///
    /// Compare-and-set: fails with [`StoreError::AlreadyVerified`] instead of
    /// rewriting a verified record, and [`StoreError::NotFound`] for unknown links.
    fn mark_verified(&self, link: &VerificationLink) -> Result<VerificationRecord, StoreError>;

    /// Attach the external status-polling URL of the in-flight session.
    fn set_status_url(
        &self,
        link: &VerificationLink,
        url: &str,
    ) -> Result<VerificationRecord, StoreError>;

    /// Total number of records ever created.
    fn record_count(&self) -> Result<u64, StoreError>;
}
