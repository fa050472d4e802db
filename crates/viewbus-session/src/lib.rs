//! # ViewBus Session
//!
//! Per-UI-session ownership of the event bus, shutdown notification and the
//! announce/commit protocol around login and logout.

pub mod coordinator;
pub mod error;
pub mod session;

pub use coordinator::{
    PendingUserChange, UserChangeCoordinator, UserChangeDecision, UserChangeDisposition,
    UserChangeOutcome,
};
pub use error::{SessionError, SessionResult};
pub use session::{SessionId, SessionScope};
