//! # Event Bus Module
//!
//! Session-scoped, synchronous publish/subscribe between presenters, views and
//! session services.
//!
//! ## Overview
//!
//! - Subscribers declare handler methods through a static table
//!   ([`Subscriber::handlers`]) instead of runtime reflection
//! - Handlers are selected by event type (with parent tags) and by
//!   property filters, all of which must match
//! - `Listen` handlers receive live UI components resolved through a
//!   [`ComponentScope`]; they are skipped while a component is detached
//! - Announcement events collect veto/refresh votes and hand the final
//!   flags back to the publisher
//!
//! ## Usage
//!
//! ```rust,ignore
//! use viewbus_core::event_bus::{EventBus, ShutdownEvent};
//!
//! let bus = EventBus::new();
//! let handle = bus.register(&presenter)?;
//!
//! let report = bus.publish(ShutdownEvent::new())?;
//! println!("{} handlers ran", report.invoked);
//!
//! bus.unregister(handle);
//! ```

mod bus;
mod component;
mod events;
mod property;
mod subscriber;

pub use bus::*;
pub use component::*;
pub use events::*;
pub use property::*;
pub use subscriber::*;
