//! The ReVal join-gate workflow.
//!
//! ```text
//! JoinRequestListener ──► SessionInitiator ──► (proof protocol)
//!                                                   │
//!                          StatusPoller / callback ◄┘
//!                                   │
//!                          CompletionHandler ──► store CAS + chat approval
//! ```
//!
//! [`Gate`] wires the components together over shared trait objects.

pub mod completion;
pub mod error;
pub mod gate;
pub mod initiator;
pub mod links;
pub mod listener;
pub mod metrics;
pub mod resolver;

pub use completion::{CompletionHandler, RetryPolicy};
pub use error::GateError;
pub use gate::{Gate, GateDeps, GateSettings};
pub use initiator::{SessionInitiator, StartedSession};
pub use links::{parse_link, LinkBuilder};
pub use listener::{JoinOutcome, JoinRequestListener, PROMPT_BUTTON, PROMPT_TEXT};
pub use metrics::GateMetrics;
pub use resolver::{DeliveryMode, PollRegistry, PollState, StatusPoller};
