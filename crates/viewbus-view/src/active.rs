//! Active component tracking
//!
//! Keeps the set of components of one view that are currently attached to
//! the UI. The toolkit integration reports attach and detach; the bus asks
//! this set to bind `Listen` parameters and to resolve them at dispatch.

use viewbus_core::{
    thread_safe_rw_map, BindingError, BoundComponent, ComponentParam, ComponentRef,
    ComponentScope, ResolutionError, ThreadSafeRwMap,
};

use crate::declaration::ViewDeclaration;
use crate::error::{ViewError, ViewResult};

/// Attached components of one view, keyed by declared identifier
pub struct ActiveComponents {
    declaration: ViewDeclaration,
    attached: ThreadSafeRwMap<String, Vec<ComponentRef>>,
}

impl ActiveComponents {
    /// Create an empty set for a validated declaration
    pub fn new(declaration: ViewDeclaration) -> ViewResult<Self> {
        declaration.validate()?;
        Ok(Self {
            declaration,
            attached: thread_safe_rw_map(),
        })
    }

    /// The view declaration
    pub fn declaration(&self) -> &ViewDeclaration {
        &self.declaration
    }

    /// Record that `component` is now attached under `identifier`.
    ///
    /// Attaching a second live component under one identifier is allowed but
    /// makes `Listen` handlers bound to it fail on dispatch until one of them
    /// is detached.
    pub fn notify_attach(&self, identifier: &str, component: ComponentRef) -> ViewResult<()> {
        let Some(declared) = self.declaration.find(identifier) else {
            return Err(ViewError::UndeclaredComponent {
                view: self.declaration.name().to_string(),
                identifier: identifier.to_string(),
            });
        };
        if !declared.capability.accepts(&component) {
            return Err(ViewError::WrongComponentType {
                view: self.declaration.name().to_string(),
                identifier: identifier.to_string(),
                expected: declared.capability.to_string(),
            });
        }

        let mut attached = self.attached.write();
        let live = attached.entry(identifier.to_string()).or_default();
        if !live.is_empty() {
            tracing::warn!(
                "View {}: component '{}' attached while {} already live",
                self.declaration.name(),
                identifier,
                live.len()
            );
        }
        live.push(component);
        tracing::debug!("View {}: attached '{}'", self.declaration.name(), identifier);
        Ok(())
    }

    /// Record that every component under `identifier` was detached
    ///
    /// Returns true if anything was attached.
    pub fn notify_detach(&self, identifier: &str) -> bool {
        let removed = self
            .attached
            .write()
            .remove(identifier)
            .is_some_and(|live| !live.is_empty());
        if removed {
            tracing::debug!("View {}: detached '{}'", self.declaration.name(), identifier);
        }
        removed
    }

    /// Detach one specific component instance
    pub fn detach_component(&self, identifier: &str, component: &ComponentRef) -> bool {
        let mut attached = self.attached.write();
        let Some(live) = attached.get_mut(identifier) else {
            return false;
        };
        let before = live.len();
        live.retain(|c| !std::sync::Arc::ptr_eq(c, component));
        let removed = live.len() != before;
        if live.is_empty() {
            attached.remove(identifier);
        }
        removed
    }

    /// Whether a component is attached under `identifier`
    pub fn is_attached(&self, identifier: &str) -> bool {
        self.attached
            .read()
            .get(identifier)
            .is_some_and(|live| !live.is_empty())
    }

    /// Number of identifiers with a live component
    pub fn attached_count(&self) -> usize {
        self.attached.read().values().filter(|l| !l.is_empty()).count()
    }

    /// Forget every attached component
    pub fn detach_all(&self) {
        self.attached.write().clear();
    }
}

impl ComponentScope for ActiveComponents {
    fn scope_name(&self) -> &str {
        self.declaration.name()
    }

    fn bind(&self, param: &ComponentParam) -> Result<BoundComponent, BindingError> {
        let expected = param.capability();

        if let Some(identifier) = param.identifier() {
            let declared =
                self.declaration
                    .find(identifier)
                    .ok_or_else(|| BindingError::UnknownIdentifier {
                        identifier: identifier.to_string(),
                    })?;
            if declared.capability != expected {
                return Err(BindingError::CapabilityMismatch {
                    identifier: identifier.to_string(),
                    expected: expected.to_string(),
                    declared: declared.capability.to_string(),
                });
            }
            return Ok(BoundComponent {
                identifier: identifier.to_string(),
                capability: expected,
            });
        }

        match self.declaration.of_capability(expected).as_slice() {
            [] => Err(BindingError::Unbindable {
                capability: expected.to_string(),
            }),
            [only] => Ok(BoundComponent {
                identifier: only.identifier.clone(),
                capability: expected,
            }),
            many => Err(BindingError::Ambiguous {
                capability: expected.to_string(),
                candidates: many.iter().map(|c| c.identifier.clone()).collect(),
            }),
        }
    }

    fn resolve(&self, binding: &BoundComponent) -> Result<Option<ComponentRef>, ResolutionError> {
        let attached = self.attached.read();
        let live = match attached.get(&binding.identifier) {
            Some(live) => live.as_slice(),
            None => return Ok(None),
        };

        match live {
            [] => Ok(None),
            [component] if binding.capability.accepts(component) => Ok(Some(component.clone())),
            [_] => Err(ResolutionError::CapabilityMismatch {
                identifier: binding.identifier.clone(),
                expected: binding.capability.to_string(),
            }),
            many => Err(ResolutionError::Ambiguous {
                identifier: binding.identifier.clone(),
                count: many.len(),
            }),
        }
    }
}

impl std::fmt::Debug for ActiveComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveComponents")
            .field("view", &self.declaration.name())
            .field("attached", &self.attached_count())
            .finish()
    }
}
