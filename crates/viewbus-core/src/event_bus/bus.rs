//! Event Bus implementation.
//!
//! Provides the session-scoped EventBus that keeps the handler table of every
//! registered subscriber and dispatches events to the matching handlers.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use super::component::{BoundComponent, ComponentArgs, ComponentParam, ComponentScope};
use super::events::{BusEvent, EventType};
use super::property::PropertyFilter;
use super::subscriber::{HandlerKind, HandlerMethod, Subscriber};
use crate::error::{DispatchError, RegistrationError, ResolutionError};
use crate::types::HandlerResult;

/// Registration handle for unregistering a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationHandle(Uuid);

impl RegistrationHandle {
    /// Create a new unique registration handle
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RegistrationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// What a publish does when a handler returns an error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchErrorPolicy {
    /// Stop calling handlers and return the error to the publisher.
    #[default]
    Abort,
    /// Record the failure in the report and keep dispatching.
    Continue,
}

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Handling of handler errors.
    pub error_policy: DispatchErrorPolicy,
    /// Drop table entries of subscribers that no longer exist.
    pub prune_dead_subscribers: bool,
    /// Emit a trace line per invoked handler.
    pub trace_dispatch: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            error_policy: DispatchErrorPolicy::Abort,
            prune_dead_subscribers: true,
            trace_dispatch: false,
        }
    }
}

/// Final state of an announcement after all handlers ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnouncementOutcome {
    /// No handler declined.
    pub accepted: bool,
    /// Some handler requested a refresh.
    pub refresh: bool,
}

/// A handler failure recorded under [`DispatchErrorPolicy::Continue`]
#[derive(Debug)]
pub struct HandlerFailure {
    /// The subscriber type.
    pub subscriber: &'static str,
    /// The handler method.
    pub method: &'static str,
    /// The error the handler returned.
    pub error: anyhow::Error,
}

/// Summary of a single publish
#[derive(Debug)]
pub struct DispatchReport {
    /// Type of the dispatched event.
    pub event_type: EventType,
    /// Handlers that ran.
    pub invoked: usize,
    /// `Listen` handlers skipped because a component was not attached.
    pub skipped_unresolved: usize,
    /// Subscribers dropped from the table because they no longer exist.
    pub pruned: usize,
    /// Failures recorded under [`DispatchErrorPolicy::Continue`].
    pub failures: Vec<HandlerFailure>,
    /// Final flags when the event was an announcement.
    pub announcement: Option<AnnouncementOutcome>,
}

impl DispatchReport {
    fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            invoked: 0,
            skipped_unresolved: 0,
            pruned: 0,
            failures: Vec::new(),
            announcement: None,
        }
    }

    /// Whether every matching handler ran without error
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Invocation thunk with the subscriber type erased.
///
/// Returns `None` once the subscriber has been dropped.
type ErasedInvoker =
    Box<dyn Fn(&mut BusEvent, &ComponentArgs) -> Option<HandlerResult> + Send + Sync>;

/// One row of the handler table
struct HandlerEntry {
    handle: RegistrationHandle,
    subscriber: &'static str,
    method: &'static str,
    accepts: EventType,
    filter: PropertyFilter,
    bindings: Vec<BoundComponent>,
    scope: Option<Weak<dyn ComponentScope>>,
    owner: Weak<dyn Any + Send + Sync>,
    invoke: ErasedInvoker,
}

impl HandlerEntry {
    /// Whether the subscriber still exists
    fn is_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }

    fn matches(&self, event: &BusEvent) -> bool {
        self.accepts.is_assignable_from(event.event_type())
            && self.filter.matches(event.properties())
    }

    /// Resolve bound components; `Ok(None)` if one is not attached
    fn resolve(&self) -> Result<Option<ComponentArgs>, ResolutionError> {
        if self.bindings.is_empty() {
            return Ok(Some(ComponentArgs::default()));
        }
        let Some(scope) = self.scope.as_ref().and_then(Weak::upgrade) else {
            return Ok(None);
        };

        let mut components = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            match scope.resolve(binding)? {
                Some(component) => components.push((binding.identifier.clone(), component)),
                None => return Ok(None),
            }
        }
        Ok(Some(ComponentArgs::new(components)))
    }
}

/// Bind every component parameter of a `Listen` method.
///
/// Unnamed parameters bind by type; two of them landing on the same
/// component can not be told apart and are rejected.
fn bind_params(
    scope: &dyn ComponentScope,
    params: &[ComponentParam],
    subscriber: &str,
    method: &str,
) -> Result<Vec<BoundComponent>, RegistrationError> {
    let mut bindings: Vec<BoundComponent> = Vec::with_capacity(params.len());
    let mut unnamed = HashSet::new();

    for param in params {
        let bound = scope
            .bind(param)
            .map_err(|reason| RegistrationError::Binding {
                subscriber: subscriber.to_string(),
                method: method.to_string(),
                reason,
            })?;
        if param.identifier().is_none() && !unnamed.insert(bound.identifier.clone()) {
            return Err(RegistrationError::AmbiguousParameters {
                subscriber: subscriber.to_string(),
                method: method.to_string(),
                identifier: bound.identifier,
            });
        }
        bindings.push(bound);
    }

    tracing::trace!(
        "Bound {} components for {}::{} in {}",
        bindings.len(),
        subscriber,
        method,
        scope.scope_name()
    );
    Ok(bindings)
}

/// Session-scoped event bus.
///
/// Dispatch is synchronous on the publishing thread. Every publish works on a
/// snapshot of the handler table, so handlers may register and unregister
/// subscribers (or publish again) while being invoked; such changes take
/// effect from the next publish on.
pub struct EventBus {
    /// Handler table in registration order
    handlers: RwLock<Vec<Arc<HandlerEntry>>>,
    /// Configuration
    config: EventBusConfig,
}

impl EventBus {
    /// Create a new event bus with default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new event bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            config,
        }
    }

    /// Register a subscriber whose handlers only take events
    pub fn register<S: Subscriber>(
        &self,
        subscriber: &Arc<S>,
    ) -> Result<RegistrationHandle, RegistrationError> {
        self.register_methods(subscriber, S::subscriber_name(), S::handlers(), None)
    }

    /// Register a subscriber whose `Listen` handlers bind against `scope`
    pub fn register_in_scope<S: Subscriber>(
        &self,
        subscriber: &Arc<S>,
        scope: &Arc<dyn ComponentScope>,
    ) -> Result<RegistrationHandle, RegistrationError> {
        self.register_methods(subscriber, S::subscriber_name(), S::handlers(), Some(scope))
    }

    /// Register an explicit handler table for `subscriber`.
    ///
    /// All methods are validated before any is added; on error the bus is
    /// left unchanged.
    pub fn register_methods<S: Send + Sync + 'static>(
        &self,
        subscriber: &Arc<S>,
        name: &'static str,
        methods: Vec<HandlerMethod<S>>,
        scope: Option<&Arc<dyn ComponentScope>>,
    ) -> Result<RegistrationHandle, RegistrationError> {
        let handle = RegistrationHandle::new();
        let mut entries = Vec::with_capacity(methods.len());

        for method in methods {
            if let Some(key) = method.filter().duplicate_key() {
                return Err(RegistrationError::AmbiguousProperty {
                    subscriber: name.to_string(),
                    method: method.name().to_string(),
                    key: key.to_string(),
                });
            }

            let bindings = match method.kind() {
                HandlerKind::Subscribe => Vec::new(),
                HandlerKind::Listen(params) => {
                    let Some(scope) = scope else {
                        return Err(RegistrationError::MissingComponentScope {
                            subscriber: name.to_string(),
                            method: method.name().to_string(),
                        });
                    };
                    bind_params(&**scope, params, name, method.name())?
                }
            };

            let weak = Arc::downgrade(subscriber);
            let owner: Weak<dyn Any + Send + Sync> = weak.clone();
            let accepts = method.accepts();
            let method_name = method.name();
            let filter = method.filter().clone();
            let invoke = method.invoke;
            entries.push(Arc::new(HandlerEntry {
                handle,
                subscriber: name,
                method: method_name,
                accepts,
                filter,
                scope: if bindings.is_empty() {
                    None
                } else {
                    scope.map(Arc::downgrade)
                },
                bindings,
                owner,
                invoke: Box::new(move |event: &mut BusEvent, args: &ComponentArgs| {
                    weak.upgrade().map(|subscriber| invoke(&*subscriber, event, args))
                }),
            }));
        }

        let count = entries.len();
        self.handlers.write().extend(entries);
        tracing::debug!("Subscriber {} registered as {} with {} handlers", name, handle, count);
        Ok(handle)
    }

    /// Remove every handler of a registration
    ///
    /// Returns true if the registration was found and removed.
    pub fn unregister(&self, handle: RegistrationHandle) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|entry| entry.handle != handle);
        let removed = handlers.len() != before;
        if removed {
            tracing::debug!("Subscriber {} unregistered", handle);
        }
        removed
    }

    /// Publish an event to all matching handlers
    pub fn publish(&self, event: impl Into<BusEvent>) -> Result<DispatchReport, DispatchError> {
        let mut event = event.into();
        self.dispatch(&mut event)
    }

    /// Publish an event the caller keeps ownership of.
    ///
    /// Handlers may mutate announcement flags; on error the event holds the
    /// flags as they were when dispatch stopped.
    pub fn dispatch(&self, event: &mut BusEvent) -> Result<DispatchReport, DispatchError> {
        let snapshot: Vec<Arc<HandlerEntry>> = self.handlers.read().clone();
        let event_type = event.event_type();
        let mut report = DispatchReport::new(event_type);
        let mut dead = HashSet::new();

        let outcome = self.run_handlers(&snapshot, event, &mut report, &mut dead);

        if self.config.prune_dead_subscribers && !dead.is_empty() {
            report.pruned = self.prune(&dead);
        }
        outcome?;

        report.announcement = event.as_announcement().map(|a| AnnouncementOutcome {
            accepted: a.do_accept(),
            refresh: a.do_refresh(),
        });
        tracing::debug!(
            "{} dispatched to {} handlers ({} skipped)",
            event.description(),
            report.invoked,
            report.skipped_unresolved
        );
        Ok(report)
    }

    fn run_handlers(
        &self,
        snapshot: &[Arc<HandlerEntry>],
        event: &mut BusEvent,
        report: &mut DispatchReport,
        dead: &mut HashSet<RegistrationHandle>,
    ) -> Result<(), DispatchError> {
        for entry in snapshot {
            if dead.contains(&entry.handle) {
                continue;
            }
            if !entry.is_alive() {
                dead.insert(entry.handle);
                continue;
            }
            if !entry.matches(event) {
                continue;
            }

            let args = match entry.resolve() {
                Ok(Some(args)) => args,
                Ok(None) => {
                    tracing::debug!(
                        "Skipping {}::{}: component not attached",
                        entry.subscriber,
                        entry.method
                    );
                    report.skipped_unresolved += 1;
                    continue;
                }
                Err(reason) => {
                    return Err(DispatchError::Resolution {
                        subscriber: entry.subscriber.to_string(),
                        method: entry.method.to_string(),
                        reason,
                    });
                }
            };

            if self.config.trace_dispatch {
                tracing::trace!("Invoking {}::{}", entry.subscriber, entry.method);
            }

            match (entry.invoke)(event, &args) {
                None => {
                    dead.insert(entry.handle);
                }
                Some(Ok(())) => report.invoked += 1,
                Some(Err(error)) => match self.config.error_policy {
                    DispatchErrorPolicy::Abort => {
                        return Err(DispatchError::Handler {
                            subscriber: entry.subscriber.to_string(),
                            method: entry.method.to_string(),
                            event_type: event.event_type(),
                            error,
                        });
                    }
                    DispatchErrorPolicy::Continue => {
                        tracing::warn!(
                            "Handler {}::{} failed: {:#}",
                            entry.subscriber,
                            entry.method,
                            error
                        );
                        report.failures.push(HandlerFailure {
                            subscriber: entry.subscriber,
                            method: entry.method,
                            error,
                        });
                    }
                },
            }
        }
        Ok(())
    }

    /// Drop entries of subscribers that were found dead during dispatch
    fn prune(&self, dead: &HashSet<RegistrationHandle>) -> usize {
        self.handlers.write().retain(|entry| !dead.contains(&entry.handle));
        tracing::debug!("Pruned {} dropped subscribers", dead.len());
        dead.len()
    }

    /// Whether a registration is still active and its subscriber alive
    pub fn is_registered(&self, handle: RegistrationHandle) -> bool {
        self.handlers
            .read()
            .iter()
            .any(|entry| entry.handle == handle && entry.is_alive())
    }

    /// Get the number of live registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.handlers
            .read()
            .iter()
            .filter(|entry| entry.is_alive())
            .map(|entry| entry.handle)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Get the number of handler methods across live subscribers
    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .iter()
            .filter(|entry| entry.is_alive())
            .count()
    }

    /// Remove every registration
    pub fn clear(&self) {
        let mut handlers = self.handlers.write();
        let count = handlers.len();
        handlers.clear();
        tracing::debug!("Cleared {} handlers", count);
    }

    /// Get the current configuration
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("handlers", &self.handler_count())
            .field("config", &self.config)
            .finish()
    }
}
