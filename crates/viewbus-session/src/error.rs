//! Error types for the session crate.

use thiserror::Error;
use viewbus_core::{DispatchError, RegistrationError, UserChangeType};
use viewbus_view::ViewError;

use crate::session::SessionId;

/// Errors that can occur during session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A handler failed while the change was being announced.
    ///
    /// The flags are the accept/refresh state at the moment of failure.
    #[error("{change_type} announcement failed (accept={accepted}, refresh={refresh_requested})")]
    AnnouncementFailed {
        /// The announced change.
        change_type: UserChangeType,
        /// Accept flag when dispatch stopped.
        accepted: bool,
        /// Refresh flag when dispatch stopped.
        refresh_requested: bool,
        /// The failing dispatch.
        #[source]
        source: DispatchError,
    },

    /// The identity was swapped but notifying observers failed.
    #[error("{change_type} committed but notification failed")]
    NotificationFailed {
        /// The committed change.
        change_type: UserChangeType,
        /// The failing dispatch.
        #[source]
        source: DispatchError,
    },

    /// The caller's identity swap failed after the change was accepted.
    #[error("{change_type} swap failed: {error}")]
    SwapFailed {
        /// The accepted change.
        change_type: UserChangeType,
        /// Error returned by the swap closure.
        error: anyhow::Error,
    },

    /// A publish on the session bus failed.
    #[error("Session publish failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// A session-level service could not be registered.
    #[error("Session registration failed: {0}")]
    Registration(#[from] RegistrationError),

    /// A view operation failed.
    #[error("View error: {0}")]
    View(#[from] ViewError),

    /// The session was already shut down.
    #[error("Session {0} is closed")]
    Closed(SessionId),
}

impl SessionError {
    /// Check if the session was closed
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionError::Closed(_))
    }
}

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
