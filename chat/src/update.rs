//! Webhook update decoding.

use teloxide::types::{Update, UpdateKind};

use reval_types::{GroupId, MemberId};

use crate::ChatError;

/// A user asked to join a group that requires approval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinRequestEvent {
    pub group_id: GroupId,
    pub member_id: MemberId,
}

/// Decode a raw webhook body.
///
/// Returns `Ok(None)` for well-formed updates the gate does not care about.
/// Bodies that are not Telegram updates, or whose payload teloxide could not
/// decode, are errors.
///
/// Decodes straight from bytes: teloxide's `Update` does not survive a
/// round trip through `serde_json::Value` and would come back as
/// `UpdateKind::Error`.
pub fn parse_update(body: &[u8]) -> Result<Option<JoinRequestEvent>, ChatError> {
    let update: Update =
        serde_json::from_slice(body).map_err(|e| ChatError::InvalidUpdate(e.to_string()))?;
    match update.kind {
        UpdateKind::ChatJoinRequest(request) => Ok(Some(JoinRequestEvent {
            group_id: GroupId::from(request.chat.id.0),
            member_id: MemberId::from(request.from.id.0),
        })),
        UpdateKind::Error(payload) => Err(ChatError::InvalidUpdate(format!(
            "update {} has an undecodable payload: {payload}",
            update.id.0
        ))),
        _ => {
            tracing::debug!(update_id = update.id.0, "ignoring non join-request update");
            Ok(None)
        }
    }
}
