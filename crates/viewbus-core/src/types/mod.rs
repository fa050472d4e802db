//! Type system utilities and aliases.
//!
//! ## Modules
//!
//! - [`aliases`]: Type aliases for shared components, handler results and locks.

pub mod aliases;

pub use aliases::*;
