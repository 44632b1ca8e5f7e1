//! The chat-service contract used by the gate.

use async_trait::async_trait;
use reval_types::{GroupId, MemberId};

use crate::ChatError;

/// An inline button that opens a URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkButton {
    pub text: String,
    pub url: String,
}

/// Outbound operations on the chat platform.
///
/// Constructed once at process start and shared as `Arc<dyn ChatService>`.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Send a direct message with a single link button to a member.
    async fn send_link_message(
        &self,
        member_id: &MemberId,
        text: &str,
        button: &LinkButton,
    ) -> Result<(), ChatError>;

    /// Approve the member's pending request to join the group.
    async fn approve_join_request(
        &self,
        group_id: &GroupId,
        member_id: &MemberId,
    ) -> Result<(), ChatError>;
}
