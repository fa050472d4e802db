//! Error handling for ViewBus core
//!
//! Errors are split by the phase they surface in:
//! - Registration errors (fatal, raised while wiring a subscriber)
//! - Binding errors (a `Listen` parameter can not be tied to a declared component)
//! - Resolution errors (a bound component is in an impossible state at dispatch)
//! - Dispatch errors (a publish could not complete)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::event_bus::EventType;

/// Binding error type
///
/// Raised by a component scope when a `Listen` parameter can not be tied to
/// exactly one declared component.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The identifier is not declared by the view
    #[error("No component declared with identifier '{identifier}'")]
    UnknownIdentifier {
        /// The undeclared identifier.
        identifier: String,
    },

    /// The declared component has a different type than the parameter expects
    #[error("Component '{identifier}' is declared as {declared}, parameter expects {expected}")]
    CapabilityMismatch {
        /// The component identifier.
        identifier: String,
        /// Type the parameter expects.
        expected: String,
        /// Type the view declares.
        declared: String,
    },

    /// No declared component fits an unnamed parameter
    #[error("No declared component of type {capability}")]
    Unbindable {
        /// Type the parameter expects.
        capability: String,
    },

    /// Several declared components fit an unnamed parameter
    #[error("Parameter of type {capability} is ambiguous between {candidates:?}")]
    Ambiguous {
        /// Type the parameter expects.
        capability: String,
        /// Identifiers of all fitting components.
        candidates: Vec<String>,
    },
}

/// Resolution error type
///
/// A bound component that is attached but can not be handed to the handler.
/// Construction-time validation should make these impossible, so they are
/// treated as defects and abort the publish.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// More than one live component is attached under the identifier
    #[error("{count} live components attached as '{identifier}'")]
    Ambiguous {
        /// The component identifier.
        identifier: String,
        /// Number of live components.
        count: usize,
    },

    /// The attached component is not of the bound type
    #[error("Component '{identifier}' is not a {expected}")]
    CapabilityMismatch {
        /// The component identifier.
        identifier: String,
        /// Type the binding expects.
        expected: String,
    },
}

/// Registration error type
///
/// Raised by [`crate::EventBus::register`] and friends. A failed registration
/// leaves the bus unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A handler declares two filter values for the same property key
    #[error("{subscriber}::{method} declares property '{key}' more than once")]
    AmbiguousProperty {
        /// The subscriber type.
        subscriber: String,
        /// The handler method.
        method: String,
        /// The duplicated key.
        key: String,
    },

    /// A `Listen` parameter could not be bound
    #[error("{subscriber}::{method} has an unbindable component parameter: {reason}")]
    Binding {
        /// The subscriber type.
        subscriber: String,
        /// The handler method.
        method: String,
        /// Why binding failed.
        reason: BindingError,
    },

    /// Several unnamed `Listen` parameters fall onto the same component
    #[error("{subscriber}::{method} has unnamed parameters that all bind to '{identifier}'")]
    AmbiguousParameters {
        /// The subscriber type.
        subscriber: String,
        /// The handler method.
        method: String,
        /// The component the parameters collapse onto.
        identifier: String,
    },

    /// A `Listen` handler was registered without a view to bind against
    #[error("{subscriber}::{method} listens to components but was registered outside a view")]
    MissingComponentScope {
        /// The subscriber type.
        subscriber: String,
        /// The handler method.
        method: String,
    },
}

/// Dispatch error type
///
/// Returned by [`crate::EventBus::publish`] when a publish stops early.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A handler method returned an error
    #[error("Handler {subscriber}::{method} failed on {event_type} event: {error}")]
    Handler {
        /// The subscriber type.
        subscriber: String,
        /// The handler method.
        method: String,
        /// Type of the event being dispatched.
        event_type: EventType,
        /// The error the handler returned.
        error: anyhow::Error,
    },

    /// A bound component was attached in an impossible state
    #[error("Could not resolve components for {subscriber}::{method}: {reason}")]
    Resolution {
        /// The subscriber type.
        subscriber: String,
        /// The handler method.
        method: String,
        /// Why resolution failed.
        reason: ResolutionError,
    },
}

impl DispatchError {
    /// Check if this error came from a handler body
    pub fn is_handler_error(&self) -> bool {
        matches!(self, DispatchError::Handler { .. })
    }

    /// Check if this error came from component resolution
    pub fn is_resolution_error(&self) -> bool {
        matches!(self, DispatchError::Resolution { .. })
    }
}

/// Result type for registration
pub type RegistrationResult<T> = std::result::Result<T, RegistrationError>;

/// Result type for dispatch
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
