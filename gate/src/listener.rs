//! Turns incoming join requests into verification prompts.

use std::sync::Arc;

use reval_chat::{ChatService, JoinRequestEvent, LinkButton};
use reval_crypto::generate_link;
use reval_store::{StoreError, VerificationStore};
use reval_types::VerificationRecord;

use crate::{GateError, GateMetrics, LinkBuilder};

pub const PROMPT_TEXT: &str =
    "Hello! To join the group, please verify yourself by clicking the button below:";
pub const PROMPT_BUTTON: &str = "Verify Now ↗";

/// Result of handling one join request.
#[derive(Clone, Debug)]
pub struct JoinOutcome {
    pub record: VerificationRecord,
    /// `false` when an existing live record was reused.
    pub created: bool,
    /// Whether the direct message reached the member.
    pub prompt_delivered: bool,
}

pub struct JoinRequestListener {
    store: Arc<dyn VerificationStore>,
    chat: Arc<dyn ChatService>,
    links: LinkBuilder,
    metrics: Arc<GateMetrics>,
}

impl JoinRequestListener {
    pub fn new(
        store: Arc<dyn VerificationStore>,
        chat: Arc<dyn ChatService>,
        links: LinkBuilder,
        metrics: Arc<GateMetrics>,
    ) -> Self {
        Self {
            store,
            chat,
            links,
            metrics,
        }
    }

    /// Ensure a live record exists for the requester and send them its link.
    ///
    /// A repeated request from the same member reuses the live record, so
    /// there is never more than one unverified record per member and group.
    pub async fn handle(&self, event: &JoinRequestEvent) -> Result<JoinOutcome, GateError> {
        self.metrics.join_requests.inc();
        let (record, created) = self.live_record(event)?;

        let button = LinkButton {
            text: PROMPT_BUTTON.to_string(),
            url: self.links.page_url(&record.verification_link),
        };
        let prompt_delivered = match self
            .chat
            .send_link_message(&event.member_id, PROMPT_TEXT, &button)
            .await
        {
            Ok(()) => {
                self.metrics.prompts_sent.inc();
                true
            }
            Err(e) => {
                self.metrics.prompts_failed.inc();
                tracing::warn!(
                    group = %event.group_id,
                    member = %event.member_id,
                    error = %e,
                    "could not deliver verification prompt"
                );
                false
            }
        };

        tracing::info!(
            group = %event.group_id,
            member = %event.member_id,
            link = %record.verification_link,
            created,
            prompt_delivered,
            "join request handled"
        );

        Ok(JoinOutcome {
            record,
            created,
            prompt_delivered,
        })
    }

    fn live_record(&self, event: &JoinRequestEvent) -> Result<(VerificationRecord, bool), GateError> {
        if let Some(record) = self
            .store
            .find_live_by_member(&event.group_id, &event.member_id)?
        {
            return Ok((record, false));
        }

        let link = generate_link()?;
        match self.store.create(&event.group_id, &event.member_id, &link) {
            Ok(record) => {
                self.metrics.records_created.inc();
                Ok((record, true))
            }
            // Lost a race with a concurrent request for the same member.
            Err(StoreError::Duplicate(_)) => self
                .store
                .find_live_by_member(&event.group_id, &event.member_id)?
                .map(|record| (record, false))
                .ok_or_else(|| GateError::Upstream("live record vanished after duplicate".into())),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reval_nullables::{NullChat, NullVerificationStore};
    use reval_types::{GroupId, MemberId};

    fn setup() -> (JoinRequestListener, Arc<NullVerificationStore>, Arc<NullChat>) {
        let store = Arc::new(NullVerificationStore::new());
        let chat = Arc::new(NullChat::new());
        let listener = JoinRequestListener::new(
            store.clone(),
            chat.clone(),
            LinkBuilder::new("https://gate.example"),
            Arc::new(GateMetrics::new()),
        );
        (listener, store, chat)
    }

    fn event() -> JoinRequestEvent {
        JoinRequestEvent {
            group_id: GroupId::from("-100123"),
            member_id: MemberId::from("42"),
        }
    }

    #[tokio::test]
    async fn creates_record_and_sends_one_prompt() {
        let (listener, store, chat) = setup();
        let outcome = listener.handle(&event()).await.unwrap();

        assert!(outcome.created);
        assert!(outcome.prompt_delivered);
        assert!(!outcome.record.verification_status);
        assert_eq!(outcome.record.verification_link.as_str().len(), 40);

        let messages = chat.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].member_id, MemberId::from("42"));
        assert_eq!(messages[0].text, PROMPT_TEXT);
        assert_eq!(
            messages[0].button.url,
            format!("https://gate.example/{}", outcome.record.verification_link)
        );
        assert_eq!(store.record_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn repeated_request_reuses_live_record() {
        let (listener, store, chat) = setup();
        let first = listener.handle(&event()).await.unwrap();
        let second = listener.handle(&event()).await.unwrap();

        assert!(!second.created);
        assert_eq!(first.record.verification_link, second.record.verification_link);
        assert_eq!(store.record_count().unwrap(), 1);
        assert_eq!(chat.messages().len(), 2);
    }

    #[tokio::test]
    async fn undeliverable_prompt_keeps_record() {
        let (listener, store, chat) = setup();
        chat.set_fail_messages(true);
        let outcome = listener.handle(&event()).await.unwrap();
        assert!(!outcome.prompt_delivered);
        assert_eq!(store.record_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn store_failure_is_upstream() {
        let (listener, store, chat) = setup();
        store.set_failing(true);
        let err = listener.handle(&event()).await.unwrap_err();
        assert!(matches!(err, GateError::Upstream(_)));
        assert!(chat.messages().is_empty());
    }
}
