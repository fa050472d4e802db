//! Component binding seam between the bus and a view.
//!
//! `Listen` handlers take live UI components as extra arguments. The bus does
//! not know which components exist; it asks a [`ComponentScope`] to bind each
//! declared parameter when the handler is registered and to resolve the bound
//! identifier every time the handler is about to run.

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::error::{BindingError, ResolutionError};
use crate::types::ComponentRef;

/// Concrete component type a parameter or declaration refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability {
    type_id: TypeId,
    type_name: &'static str,
}

impl Capability {
    /// Capability of components of type `T`
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Full type name, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether `component` is of this type
    pub fn accepts(&self, component: &ComponentRef) -> bool {
        Any::type_id(&**component) == self.type_id
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name)
    }
}

/// Component parameter of a `Listen` handler.
///
/// A named parameter binds to the component declared under that identifier.
/// An unnamed one binds to the only declared component of its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentParam {
    identifier: Option<String>,
    capability: Capability,
}

impl ComponentParam {
    /// Parameter bound to the component declared as `identifier`
    pub fn named<T: Any>(identifier: impl Into<String>) -> Self {
        Self {
            identifier: Some(identifier.into()),
            capability: Capability::of::<T>(),
        }
    }

    /// Parameter bound by type alone
    pub fn of_type<T: Any>() -> Self {
        Self {
            identifier: None,
            capability: Capability::of::<T>(),
        }
    }

    /// Declared identifier, if any
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Expected component type
    pub fn capability(&self) -> Capability {
        self.capability
    }
}

/// A parameter after registration-time binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundComponent {
    /// Identifier the parameter resolves against.
    pub identifier: String,
    /// Expected component type.
    pub capability: Capability,
}

/// A set of declared components and the ones currently attached.
///
/// Implemented by the view layer. Binding runs once per handler at
/// registration; resolution runs on every dispatch of a `Listen` handler.
pub trait ComponentScope: Send + Sync {
    /// Name used in logs
    fn scope_name(&self) -> &str;

    /// Tie a parameter to exactly one declared component
    fn bind(&self, param: &ComponentParam) -> Result<BoundComponent, BindingError>;

    /// Look up the live component for a binding.
    ///
    /// `Ok(None)` means the component is not attached right now.
    fn resolve(&self, binding: &BoundComponent) -> Result<Option<ComponentRef>, ResolutionError>;
}

/// Live components handed to a `Listen` handler, in parameter order
#[derive(Clone, Default)]
pub struct ComponentArgs {
    components: Vec<(String, ComponentRef)>,
}

impl ComponentArgs {
    pub(crate) fn new(components: Vec<(String, ComponentRef)>) -> Self {
        Self { components }
    }

    /// Number of resolved components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the handler takes no components
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component for the parameter at `index`
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Option<Arc<T>> {
        self.components
            .get(index)
            .and_then(|(_, c)| c.clone().downcast::<T>().ok())
    }

    /// Component resolved for `identifier`
    pub fn by_id<T: Any + Send + Sync>(&self, identifier: &str) -> Option<Arc<T>> {
        self.components
            .iter()
            .find(|(id, _)| id == identifier)
            .and_then(|(_, c)| c.clone().downcast::<T>().ok())
    }
}

impl std::fmt::Debug for ComponentArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.components.iter().map(|(id, _)| id))
            .finish()
    }
}
