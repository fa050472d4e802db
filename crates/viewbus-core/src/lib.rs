//! # ViewBus Core
//!
//! Core types for ViewBus: the event model, property filters, subscriber
//! handler tables, the session-scoped event bus and the seam through which
//! views supply live components to `Listen` handlers.

pub mod error;
pub mod event_bus;
pub mod types;

pub use error::{
    BindingError, DispatchError, DispatchResult, RegistrationError, RegistrationResult,
    ResolutionError,
};

pub use event_bus::{
    AnnouncementOutcome, BoundComponent, BusEvent, Capability, ComponentArgs, ComponentParam,
    ComponentScope, CustomEvent, DispatchErrorPolicy, DispatchReport, EventBus, EventBusConfig,
    EventPayload, EventProperties, EventProperty, EventType, HandlerFailure, HandlerKind,
    HandlerMethod, PropertyFilter, RegistrationHandle, ShutdownEvent, Subscriber,
    UserChangeAnnouncementEvent, UserChangeEvent, UserChangeType,
};

pub use types::{thread_safe_rw_map, ComponentRef, HandlerResult, ThreadSafeRwMap};
