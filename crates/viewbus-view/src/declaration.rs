//! View declarations
//!
//! A view declares up front which components it produces and under which
//! identifiers. `Listen` handlers of its presenters are validated against
//! these declarations when they are registered.

use std::any::Any;
use std::collections::HashSet;

use viewbus_core::Capability;

use crate::error::{ViewError, ViewResult};

/// A component a view produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDeclaration {
    /// Identifier presenters bind against.
    pub identifier: String,
    /// Concrete component type.
    pub capability: Capability,
}

/// Name and declared components of a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDeclaration {
    name: String,
    components: Vec<ComponentDeclaration>,
}

impl ViewDeclaration {
    /// Create a declaration without components
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
        }
    }

    /// Declare a component of type `T` under `identifier`
    pub fn component<T: Any>(mut self, identifier: impl Into<String>) -> Self {
        self.components.push(ComponentDeclaration {
            identifier: identifier.into(),
            capability: Capability::of::<T>(),
        });
        self
    }

    /// View name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared components in declaration order
    pub fn components(&self) -> &[ComponentDeclaration] {
        &self.components
    }

    /// Declaration for `identifier`
    pub fn find(&self, identifier: &str) -> Option<&ComponentDeclaration> {
        self.components.iter().find(|c| c.identifier == identifier)
    }

    /// Declarations of components of the given type
    pub fn of_capability(&self, capability: Capability) -> Vec<&ComponentDeclaration> {
        self.components
            .iter()
            .filter(|c| c.capability == capability)
            .collect()
    }

    /// Check that identifiers are unique
    pub fn validate(&self) -> ViewResult<()> {
        let mut seen = HashSet::new();
        for component in &self.components {
            if !seen.insert(component.identifier.as_str()) {
                return Err(ViewError::DuplicateDeclaration {
                    view: self.name.clone(),
                    identifier: component.identifier.clone(),
                });
            }
        }
        Ok(())
    }
}
