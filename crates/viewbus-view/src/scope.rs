//! View scope
//!
//! A view scope ties the presenters of one view to the session bus and to the
//! view's active components. Closing the scope (explicitly or on drop)
//! unregisters every presenter and forgets every attached component.

use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use viewbus_core::{ComponentRef, ComponentScope, EventBus, RegistrationHandle, Subscriber};

use crate::active::ActiveComponents;
use crate::declaration::ViewDeclaration;
use crate::error::{ViewError, ViewResult};

/// A presenter registered with the view; the scope keeps it alive
struct PresenterSlot {
    handle: RegistrationHandle,
    name: &'static str,
    _presenter: Arc<dyn Any + Send + Sync>,
}

/// Presenter lifecycle and component binding for one open view
pub struct ViewScope {
    bus: Arc<EventBus>,
    components: Arc<ActiveComponents>,
    presenters: Mutex<Vec<PresenterSlot>>,
    closed: AtomicBool,
    /// Closed flag of the owning session, if any
    owner_closed: Option<Arc<AtomicBool>>,
}

impl ViewScope {
    /// Open a view on `bus`
    pub fn new(bus: Arc<EventBus>, declaration: ViewDeclaration) -> ViewResult<Self> {
        Self::build(bus, declaration, None)
    }

    /// Open a view on `bus` that also counts as closed once `owner_closed` is set
    pub fn with_owner(
        bus: Arc<EventBus>,
        declaration: ViewDeclaration,
        owner_closed: Arc<AtomicBool>,
    ) -> ViewResult<Self> {
        Self::build(bus, declaration, Some(owner_closed))
    }

    fn build(
        bus: Arc<EventBus>,
        declaration: ViewDeclaration,
        owner_closed: Option<Arc<AtomicBool>>,
    ) -> ViewResult<Self> {
        let components = Arc::new(ActiveComponents::new(declaration)?);
        tracing::debug!("View {} opened", components.declaration().name());
        Ok(Self {
            bus,
            components,
            presenters: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            owner_closed,
        })
    }

    /// View name
    pub fn name(&self) -> &str {
        self.components.declaration().name()
    }

    /// The bus presenters are registered with
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Active components of this view
    pub fn components(&self) -> &ActiveComponents {
        &self.components
    }

    /// Register a presenter, binding its `Listen` handlers to this view.
    ///
    /// The scope holds the presenter until it is unregistered or the view is
    /// closed.
    pub fn register_presenter<P: Subscriber>(
        &self,
        presenter: Arc<P>,
    ) -> ViewResult<RegistrationHandle> {
        self.ensure_open()?;
        let scope: Arc<dyn ComponentScope> = self.components.clone();
        let handle = self.bus.register_in_scope(&presenter, &scope)?;
        self.presenters.lock().push(PresenterSlot {
            handle,
            name: P::subscriber_name(),
            _presenter: presenter,
        });
        Ok(handle)
    }

    /// Unregister one presenter of this view
    ///
    /// Returns true if the presenter belonged to this view.
    pub fn unregister_presenter(&self, handle: RegistrationHandle) -> bool {
        let slot = {
            let mut presenters = self.presenters.lock();
            presenters
                .iter()
                .position(|slot| slot.handle == handle)
                .map(|index| presenters.remove(index))
        };
        match slot {
            Some(slot) => {
                self.bus.unregister(slot.handle);
                tracing::debug!("View {}: presenter {} removed", self.name(), slot.name);
                true
            }
            None => false,
        }
    }

    /// Number of presenters registered through this view
    pub fn presenter_count(&self) -> usize {
        self.presenters.lock().len()
    }

    /// Forward an attach notification from the toolkit
    pub fn notify_attach(&self, identifier: &str, component: ComponentRef) -> ViewResult<()> {
        self.ensure_open()?;
        self.components.notify_attach(identifier, component)
    }

    /// Forward a detach notification from the toolkit
    pub fn notify_detach(&self, identifier: &str) -> bool {
        self.components.notify_detach(identifier)
    }

    /// Whether the view or its owner was closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
            || self
                .owner_closed
                .as_ref()
                .is_some_and(|owner| owner.load(Ordering::Acquire))
    }

    /// Unregister every presenter and detach every component.
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let presenters = std::mem::take(&mut *self.presenters.lock());
        for slot in &presenters {
            self.bus.unregister(slot.handle);
        }
        self.components.detach_all();
        tracing::debug!(
            "View {} closed, {} presenters unregistered",
            self.name(),
            presenters.len()
        );
    }

    fn ensure_open(&self) -> ViewResult<()> {
        if self.is_closed() {
            return Err(ViewError::Closed(self.name().to_string()));
        }
        Ok(())
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ViewScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewScope")
            .field("view", &self.name())
            .field("presenters", &self.presenter_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}
