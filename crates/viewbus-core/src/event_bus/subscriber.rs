//! Handler method descriptors.
//!
//! A subscriber exposes its handler methods through [`Subscriber::handlers`],
//! a static table built once per registration. Each entry names the method,
//! the event type it takes, its property filter and, for `Listen` methods,
//! the component parameters it needs.
//!
//! ```rust,ignore
//! impl Subscriber for LoginPresenter {
//!     fn handlers() -> Vec<HandlerMethod<Self>> {
//!         vec![
//!             HandlerMethod::subscribe("on_logout", |p: &Self, e: &mut UserChangeAnnouncementEvent| {
//!                 if p.has_unsaved_changes() {
//!                     e.decline();
//!                 }
//!                 Ok(())
//!             })
//!             .with_property("realm", "admin"),
//!             HandlerMethod::listen(
//!                 "on_user_changed",
//!                 vec![ComponentParam::named::<Label>("greeting")],
//!                 |p: &Self, e: &mut UserChangeEvent, args| p.greet(e, args.get::<Label>(0)),
//!             ),
//!         ]
//!     }
//! }
//! ```

use super::component::{ComponentArgs, ComponentParam};
use super::events::{BusEvent, EventPayload, EventType};
use super::property::{EventProperty, PropertyFilter};
use crate::types::HandlerResult;

pub(crate) type Invoker<S> =
    Box<dyn Fn(&S, &mut BusEvent, &ComponentArgs) -> HandlerResult + Send + Sync>;

/// How a handler method is tied to the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerKind {
    /// Receives the event only.
    Subscribe,
    /// Receives the event plus live components of the owning view.
    Listen(Vec<ComponentParam>),
}

/// One handler method of a subscriber type
pub struct HandlerMethod<S> {
    name: &'static str,
    accepts: EventType,
    filter: PropertyFilter,
    kind: HandlerKind,
    pub(crate) invoke: Invoker<S>,
}

impl<S: Send + Sync + 'static> HandlerMethod<S> {
    /// Handler taking events of type `E`
    pub fn subscribe<E, F>(name: &'static str, handler: F) -> Self
    where
        E: EventPayload,
        F: Fn(&S, &mut E) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name,
            accepts: E::EVENT_TYPE,
            filter: PropertyFilter::new(),
            kind: HandlerKind::Subscribe,
            invoke: Box::new(move |subscriber: &S, event: &mut BusEvent, _: &ComponentArgs| {
                match E::from_event_mut(event) {
                    Some(event) => handler(subscriber, event),
                    None => Ok(()),
                }
            }),
        }
    }

    /// Handler taking every event below `accepts`, including abstract tags
    pub fn subscribe_type<F>(name: &'static str, accepts: EventType, handler: F) -> Self
    where
        F: Fn(&S, &mut BusEvent) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name,
            accepts,
            filter: PropertyFilter::new(),
            kind: HandlerKind::Subscribe,
            invoke: Box::new(move |subscriber: &S, event: &mut BusEvent, _: &ComponentArgs| {
                handler(subscriber, event)
            }),
        }
    }

    /// Handler taking events of type `E` plus the components in `params`
    pub fn listen<E, F>(name: &'static str, params: Vec<ComponentParam>, handler: F) -> Self
    where
        E: EventPayload,
        F: Fn(&S, &mut E, &ComponentArgs) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name,
            accepts: E::EVENT_TYPE,
            filter: PropertyFilter::new(),
            kind: HandlerKind::Listen(params),
            invoke: Box::new(move |subscriber: &S, event: &mut BusEvent, args: &ComponentArgs| {
                match E::from_event_mut(event) {
                    Some(event) => handler(subscriber, event, args),
                    None => Ok(()),
                }
            }),
        }
    }

    /// Narrow the handler to events carrying `key` = `value`
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter.push(EventProperty::new(key, value));
        self
    }
}

impl<S> HandlerMethod<S> {
    /// Method name, for diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared event type
    pub fn accepts(&self) -> EventType {
        self.accepts
    }

    /// Declared property filter
    pub fn filter(&self) -> &PropertyFilter {
        &self.filter
    }

    /// Subscribe or Listen
    pub fn kind(&self) -> &HandlerKind {
        &self.kind
    }
}

impl<S> std::fmt::Debug for HandlerMethod<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerMethod")
            .field("name", &self.name)
            .field("accepts", &self.accepts)
            .field("filter", &self.filter)
            .field("kind", &self.kind)
            .finish()
    }
}

/// An object whose methods receive bus events.
///
/// The bus only keeps a weak reference to a registered subscriber, so the
/// owning scope decides how long it lives.
pub trait Subscriber: Send + Sync + 'static {
    /// Handler table of this subscriber type
    fn handlers() -> Vec<HandlerMethod<Self>>
    where
        Self: Sized;

    /// Name used in logs and errors
    fn subscriber_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}
