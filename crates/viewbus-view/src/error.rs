//! Error types for the view crate.
//!
//! This module provides structured error types for view declarations,
//! component attach/detach notifications and presenter registration.

use thiserror::Error;
use viewbus_core::RegistrationError;

/// Errors that can occur during view operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// Two components are declared under the same identifier.
    #[error("View '{view}' declares component '{identifier}' more than once")]
    DuplicateDeclaration { view: String, identifier: String },

    /// A component was attached under an identifier the view never declared.
    #[error("View '{view}' has no component declared as '{identifier}'")]
    UndeclaredComponent { view: String, identifier: String },

    /// An attached component does not have the declared type.
    #[error("Component '{identifier}' of view '{view}' must be a {expected}")]
    WrongComponentType {
        view: String,
        identifier: String,
        expected: String,
    },

    /// The view scope was already closed.
    #[error("View '{0}' is closed")]
    Closed(String),

    /// A presenter could not be registered.
    #[error("Presenter registration failed: {0}")]
    Registration(#[from] RegistrationError),
}

/// Result type alias for view operations.
pub type ViewResult<T> = Result<T, ViewError>;
