//! Nullable chat: record outbound messages and approvals without sending them.

use async_trait::async_trait;
use reval_chat::{ChatError, ChatService, LinkButton};
use reval_types::{GroupId, MemberId};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

/// A direct message the gate "sent".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub member_id: MemberId,
    pub text: String,
    pub button: LinkButton,
}

/// A test [`ChatService`] that records calls instead of making them.
#[derive(Default)]
pub struct NullChat {
    messages: Mutex<Vec<SentMessage>>,
    approvals: Mutex<Vec<(GroupId, MemberId)>>,
    approval_attempts: AtomicU32,
    /// Number of upcoming approvals that fail before one succeeds.
    failing_approvals: AtomicU32,
    fail_messages: AtomicBool,
}

impl NullChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` approval calls.
    pub fn fail_next_approvals(&self, n: u32) {
        self.failing_approvals.store(n, Ordering::SeqCst);
    }

    /// Make message sends fail (e.g. the member never started the bot).
    pub fn set_fail_messages(&self, fail: bool) {
        self.fail_messages.store(fail, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Successful approvals, in order.
    pub fn approvals(&self) -> Vec<(GroupId, MemberId)> {
        self.approvals.lock().unwrap().clone()
    }

    /// Every approval call, failed ones included.
    pub fn approval_attempts(&self) -> u32 {
        self.approval_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatService for NullChat {
    async fn send_link_message(
        &self,
        member_id: &MemberId,
        text: &str,
        button: &LinkButton,
    ) -> Result<(), ChatError> {
        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(ChatError::RequestFailed(
                "Forbidden: bot can't initiate conversation with a user".into(),
            ));
        }
        self.messages.lock().unwrap().push(SentMessage {
            member_id: member_id.clone(),
            text: text.to_string(),
            button: button.clone(),
        });
        Ok(())
    }

    async fn approve_join_request(
        &self,
        group_id: &GroupId,
        member_id: &MemberId,
    ) -> Result<(), ChatError> {
        self.approval_attempts.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .failing_approvals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(ChatError::RequestFailed("null chat approval failure".into()));
        }
        self.approvals
            .lock()
            .unwrap()
            .push((group_id.clone(), member_id.clone()));
        Ok(())
    }
}
