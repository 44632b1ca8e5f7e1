//! Telegram Bot API implementation of [`ChatService`].

use async_trait::async_trait;
use teloxide::payloads::{SendMessageSetters, SetWebhookSetters};
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, InlineKeyboardButton, InlineKeyboardMarkup};

use reval_types::{GroupId, MemberId};

use crate::{ChatError, ChatService, LinkButton};

/// Telegram bot client.
pub struct TelegramChat {
    bot: Bot,
}

impl TelegramChat {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }

    /// Point the bot's webhook at `url`, subscribing to join requests only.
    pub async fn register_webhook(&self, url: &str) -> Result<(), ChatError> {
        let url = reqwest::Url::parse(url).map_err(|e| ChatError::InvalidUrl(e.to_string()))?;
        self.bot
            .set_webhook(url.clone())
            .allowed_updates(vec![AllowedUpdate::ChatJoinRequest])
            .await?;
        tracing::info!(%url, "registered Telegram webhook");
        Ok(())
    }
}

fn chat_id(group_id: &GroupId) -> Result<ChatId, ChatError> {
    group_id
        .as_str()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| ChatError::InvalidId(group_id.to_string()))
}

fn user_id(member_id: &MemberId) -> Result<UserId, ChatError> {
    member_id
        .as_str()
        .parse::<u64>()
        .map(UserId)
        .map_err(|_| ChatError::InvalidId(member_id.to_string()))
}

#[async_trait]
impl ChatService for TelegramChat {
    async fn send_link_message(
        &self,
        member_id: &MemberId,
        text: &str,
        button: &LinkButton,
    ) -> Result<(), ChatError> {
        // A private chat with a user shares the user's id.
        let uid = user_id(member_id)?;
        let url = reqwest::Url::parse(&button.url)
            .map_err(|e| ChatError::InvalidUrl(format!("{}: {e}", button.url)))?;
        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
            button.text.clone(),
            url,
        )]]);
        self.bot
            .send_message(ChatId(uid.0 as i64), text)
            .reply_markup(keyboard)
            .await?;
        Ok(())
    }

    async fn approve_join_request(
        &self,
        group_id: &GroupId,
        member_id: &MemberId,
    ) -> Result<(), ChatError> {
        self.bot
            .approve_chat_join_request(chat_id(group_id)?, user_id(member_id)?)
            .await?;
        Ok(())
    }
}
