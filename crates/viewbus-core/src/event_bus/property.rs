//! Property filters declared on handler methods.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::events::EventProperties;

/// A single `(key, value)` constraint declared on a handler method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventProperty {
    /// Property key the event must carry.
    pub key: String,
    /// Exact value the event must carry for `key`.
    pub value: String,
}

impl EventProperty {
    /// Create a property constraint
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Conjunction of property constraints.
///
/// An empty filter matches every event. Otherwise every declared constraint
/// must be carried by the event with an equal value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyFilter(Vec<EventProperty>);

impl PropertyFilter {
    /// Create a filter that matches everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a constraint
    pub fn push(&mut self, property: EventProperty) {
        self.0.push(property);
    }

    /// Check if an event's properties satisfy this filter
    pub fn matches(&self, properties: &EventProperties) -> bool {
        self.0
            .iter()
            .all(|p| properties.get(&p.key) == Some(p.value.as_str()))
    }

    /// First key declared more than once, if any
    pub fn duplicate_key(&self) -> Option<&str> {
        let mut seen = HashSet::with_capacity(self.0.len());
        self.0
            .iter()
            .find(|p| !seen.insert(p.key.as_str()))
            .map(|p| p.key.as_str())
    }

    /// Declared constraints
    pub fn properties(&self) -> &[EventProperty] {
        &self.0
    }

    /// Whether no constraint is declared
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<EventProperty> for PropertyFilter {
    fn from_iter<I: IntoIterator<Item = EventProperty>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
