//! Chat transport for the ReVal join gate.
//!
//! The gate only needs two things from the chat platform: send a member a
//! message carrying a link button, and approve a pending join request. Both
//! sit behind [`ChatService`]; [`TelegramChat`] is the Bot API implementation.
//! Inbound webhook updates are decoded by [`parse_update`].

pub mod error;
pub mod service;
pub mod telegram;
pub mod update;

pub use error::ChatError;
pub use service::{ChatService, LinkButton};
pub use telegram::TelegramChat;
pub use update::{parse_update, JoinRequestEvent};
