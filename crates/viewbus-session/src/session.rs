//! UI session scope
//!
//! One [`SessionScope`] exists per UI session. It owns the session's event bus
//! and is the only way views, session services and the user change
//! coordinator get hold of it. Shutting the session down publishes a
//! [`ShutdownEvent`], closes every view opened from the session and then drops
//! every registration.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use uuid::Uuid;

use viewbus_core::{
    BusEvent, DispatchReport, EventBus, EventBusConfig, RegistrationHandle, ShutdownEvent,
    Subscriber,
};
use viewbus_view::{ViewDeclaration, ViewScope};

use crate::coordinator::UserChangeCoordinator;
use crate::error::{SessionError, SessionResult};

/// Unique identifier for a UI session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// The bus and lifecycle of one UI session
pub struct SessionScope {
    id: SessionId,
    bus: Arc<EventBus>,
    closed: Arc<AtomicBool>,
    views: Mutex<Vec<Weak<ViewScope>>>,
}

impl SessionScope {
    /// Open a session with the default bus configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Open a session whose bus uses `config`
    pub fn with_config(config: EventBusConfig) -> Self {
        let id = SessionId::new();
        tracing::info!("Session {} opened", id);
        Self {
            id,
            bus: Arc::new(EventBus::with_config(config)),
            closed: Arc::new(AtomicBool::new(false)),
            views: Mutex::new(Vec::new()),
        }
    }

    /// Session identifier
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The session bus
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Whether [`Self::notify_shutdown`] already ran
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Open a view bound to this session's bus.
    ///
    /// The view closes when the session shuts down, or earlier when the last
    /// handle to it is dropped.
    pub fn open_view(&self, declaration: ViewDeclaration) -> SessionResult<Arc<ViewScope>> {
        self.ensure_open()?;
        let view = Arc::new(ViewScope::with_owner(
            self.bus.clone(),
            declaration,
            self.closed.clone(),
        )?);
        let mut views = self.views.lock();
        views.retain(|open| open.strong_count() > 0);
        views.push(Arc::downgrade(&view));
        Ok(view)
    }

    /// Number of views opened from this session that are still open
    pub fn open_view_count(&self) -> usize {
        self.views
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|view| !view.is_closed())
            .count()
    }

    /// Register a session-level subscriber.
    ///
    /// The caller keeps the subscriber alive; once it is dropped the bus
    /// forgets it.
    pub fn register<S: Subscriber>(
        &self,
        subscriber: &Arc<S>,
    ) -> SessionResult<RegistrationHandle> {
        self.ensure_open()?;
        Ok(self.bus.register(subscriber)?)
    }

    /// Coordinator for login and logout in this session
    pub fn coordinator(&self) -> SessionResult<UserChangeCoordinator> {
        self.ensure_open()?;
        Ok(UserChangeCoordinator::for_session(
            self.bus.clone(),
            self.id,
            self.closed.clone(),
        ))
    }

    /// Publish an application event on the session bus
    pub fn publish(&self, event: impl Into<BusEvent>) -> SessionResult<DispatchReport> {
        self.ensure_open()?;
        Ok(self.bus.publish(event)?)
    }

    /// Publish [`ShutdownEvent`], close every view and tear the bus down.
    ///
    /// The session is closed even when a shutdown handler fails; the failure
    /// is returned after teardown.
    pub fn notify_shutdown(&self) -> SessionResult<DispatchReport> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(SessionError::Closed(self.id));
        }

        let result = self.bus.publish(ShutdownEvent::new());
        let views = std::mem::take(&mut *self.views.lock());
        for view in views.iter().filter_map(Weak::upgrade) {
            view.close();
        }
        self.bus.clear();
        match &result {
            Ok(report) => tracing::info!(
                "Session {} shut down, {} handlers notified",
                self.id,
                report.invoked
            ),
            Err(e) => tracing::warn!("Session {} shut down with failing handler: {}", self.id, e),
        }
        result.map_err(SessionError::from)
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.is_closed() {
            return Err(SessionError::Closed(self.id));
        }
        Ok(())
    }
}

impl Default for SessionScope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionScope")
            .field("id", &self.id)
            .field("bus", &self.bus)
            .field("views", &self.open_view_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use viewbus_core::HandlerMethod;

    #[derive(Default)]
    struct ShutdownWatcher {
        shutdowns: AtomicUsize,
    }

    impl Subscriber for ShutdownWatcher {
        fn handlers() -> Vec<HandlerMethod<Self>> {
            vec![HandlerMethod::subscribe(
                "on_shutdown",
                |s: &Self, _: &mut ShutdownEvent| {
                    s.shutdowns.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
            )]
        }
    }

    #[test]
    fn test_session_id_is_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_shutdown_notifies_and_closes() {
        let session = SessionScope::new();
        let watcher = Arc::new(ShutdownWatcher::default());
        session.register(&watcher).expect("Should register");

        let report = session.notify_shutdown().expect("Should shut down");
        assert_eq!(report.invoked, 1);
        assert_eq!(watcher.shutdowns.load(Ordering::SeqCst), 1);
        assert!(session.is_closed());
        assert_eq!(session.bus().handler_count(), 0);

        assert!(session.notify_shutdown().is_err_and(|e| e.is_closed()));
        assert!(session.register(&watcher).is_err_and(|e| e.is_closed()));
        assert!(session
            .open_view(ViewDeclaration::new("orders"))
            .is_err_and(|e| e.is_closed()));
    }

    #[test]
    fn test_shutdown_closes_views() {
        let session = SessionScope::new();
        let view = session
            .open_view(ViewDeclaration::new("orders"))
            .expect("Should open");
        let dropped = session
            .open_view(ViewDeclaration::new("invoices"))
            .expect("Should open");
        drop(dropped);
        assert_eq!(session.open_view_count(), 1);

        session.notify_shutdown().expect("Should shut down");
        assert!(view.is_closed());
        assert_eq!(session.open_view_count(), 0);
    }

    #[test]
    fn test_coordinator_closes_with_session() {
        let session = SessionScope::new();
        let coordinator = session.coordinator().expect("Should create");
        session.notify_shutdown().expect("Should shut down");
        assert!(coordinator
            .announce(viewbus_core::UserChangeType::Logout)
            .is_err_and(|e| e.is_closed()));
    }
}
