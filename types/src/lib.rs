//! Fundamental types for the ReVal join gate.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! chat identifiers, verification links, the verification record, timestamps
//! and the clock abstraction.

pub mod error;
pub mod ids;
pub mod link;
pub mod record;
pub mod time;

pub use error::TypeError;
pub use ids::{GroupId, MemberId};
pub use link::VerificationLink;
pub use record::VerificationRecord;
pub use time::{Clock, SystemClock, Timestamp};
