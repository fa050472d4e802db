//! Type aliases for commonly used complex types.
//!
//! Names the handful of nested types that appear across the bus, the view
//! scope and the session crate so the same pattern reads the same way in
//! every crate.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use viewbus_core::types::*;
//!
//! // Instead of: Arc<dyn Any + Send + Sync>
//! let button: ComponentRef = Arc::new(LoginButton::default());
//!
//! // Instead of: Arc<RwLock<HashMap<String, Vec<ComponentRef>>>>
//! let attached: ThreadSafeRwMap<String, Vec<ComponentRef>> = thread_safe_rw_map();
//! ```

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A live UI component handed over by the toolkit integration.
///
/// The bus never inspects components beyond their concrete type; handlers
/// downcast them back through [`crate::ComponentArgs`].
pub type ComponentRef = Arc<dyn Any + Send + Sync>;

/// Result returned by handler method bodies.
pub type HandlerResult = anyhow::Result<()>;

/// A thread-safe reader-writer hash map.
///
/// Dispatch only reads; attach and detach write.
pub type ThreadSafeRwMap<K, V> = Arc<RwLock<HashMap<K, V>>>;

/// Create a new empty thread-safe reader-writer hash map.
#[inline]
pub fn thread_safe_rw_map<K, V>() -> ThreadSafeRwMap<K, V> {
    Arc::new(RwLock::new(HashMap::new()))
}
