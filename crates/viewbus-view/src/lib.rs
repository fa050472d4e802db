//! # ViewBus View
//!
//! Views declare the components they produce; presenters registered through a
//! [`ViewScope`] get those components handed to their `Listen` handlers while
//! the components are attached to the UI.

pub mod active;
pub mod declaration;
pub mod error;
pub mod scope;

pub use active::ActiveComponents;
pub use declaration::{ComponentDeclaration, ViewDeclaration};
pub use error::{ViewError, ViewResult};
pub use scope::ViewScope;
