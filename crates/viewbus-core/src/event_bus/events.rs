//! Event type definitions for the event bus.
//!
//! Every event carries a set of string properties fixed at construction time.
//! Concrete event types add their own payload. The [`EventType`] tag of an
//! event decides which handlers may receive it; tags form a small hierarchy so
//! a handler declared for a parent tag receives every descendant.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Property key/value pairs attached to an event.
///
/// Lookup is by key only; the order properties were added in is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventProperties(BTreeMap<String, String>);

impl EventProperties {
    /// Create an empty property set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property, replacing an earlier value for the same key
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Get the value carried for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Check whether a property is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no properties are carried
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for EventProperties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Dispatch tag of an event.
///
/// `Any` and `User` are abstract: no event is ever tagged with them, but a
/// handler declared for them receives every event below them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Root of the hierarchy.
    Any,
    /// UI session is shutting down.
    Shutdown,
    /// Parent of all user/session identity events.
    User,
    /// Announcement before a user change, subscribers may veto it.
    UserChangeAnnouncement,
    /// Notification after a user change was committed.
    UserChange,
    /// Application-defined event.
    Custom,
}

impl EventType {
    /// Parent tag, `None` for the root
    pub fn parent(self) -> Option<EventType> {
        match self {
            EventType::Any => None,
            EventType::Shutdown | EventType::User | EventType::Custom => Some(EventType::Any),
            EventType::UserChangeAnnouncement | EventType::UserChange => Some(EventType::User),
        }
    }

    /// Whether a handler declared for `self` may receive an event tagged `other`
    pub fn is_assignable_from(self, other: EventType) -> bool {
        let mut current = Some(other);
        while let Some(tag) = current {
            if tag == self {
                return true;
            }
            current = tag.parent();
        }
        false
    }

    /// Whether events are never tagged with this type directly
    pub fn is_abstract(self) -> bool {
        matches!(self, EventType::Any | EventType::User)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Any => write!(f, "Any"),
            EventType::Shutdown => write!(f, "Shutdown"),
            EventType::User => write!(f, "User"),
            EventType::UserChangeAnnouncement => write!(f, "UserChangeAnnouncement"),
            EventType::UserChange => write!(f, "UserChange"),
            EventType::Custom => write!(f, "Custom"),
        }
    }
}

/// Kind of user/session identity change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserChangeType {
    /// A user signs in.
    Login,
    /// The current user signs out.
    Logout,
}

impl std::fmt::Display for UserChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserChangeType::Login => write!(f, "LOGIN"),
            UserChangeType::Logout => write!(f, "LOGOUT"),
        }
    }
}

/// Published once when the owning UI session shuts down
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShutdownEvent {
    properties: EventProperties,
}

impl ShutdownEvent {
    /// Create a shutdown event without properties
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach properties to the event
    pub fn with_properties(mut self, properties: EventProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Properties carried by the event
    pub fn properties(&self) -> &EventProperties {
        &self.properties
    }
}

/// Announcement published before a user change is performed.
///
/// Subscribers may veto the change with [`decline`](Self::decline) or ask for
/// a view refresh once it is done with
/// [`refresh_after_change`](Self::refresh_after_change). Both flags only move
/// one way: a declined change can not be re-accepted, a requested refresh can
/// not be withdrawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserChangeAnnouncementEvent {
    change_type: UserChangeType,
    accept: bool,
    refresh: bool,
    properties: EventProperties,
}

impl UserChangeAnnouncementEvent {
    /// Create an announcement that is accepted and needs no refresh so far
    pub fn new(change_type: UserChangeType) -> Self {
        Self {
            change_type,
            accept: true,
            refresh: false,
            properties: EventProperties::new(),
        }
    }

    /// Attach properties to the event
    pub fn with_properties(mut self, properties: EventProperties) -> Self {
        self.properties = properties;
        self
    }

    /// The announced change
    pub fn change_type(&self) -> UserChangeType {
        self.change_type
    }

    /// Veto the change
    pub fn decline(&mut self) {
        self.accept = false;
    }

    /// Request a view refresh after the change
    pub fn refresh_after_change(&mut self) {
        self.refresh = true;
    }

    /// Whether no subscriber has declined the change
    pub fn do_accept(&self) -> bool {
        self.accept
    }

    /// Whether any subscriber requested a refresh
    pub fn do_refresh(&self) -> bool {
        self.refresh
    }

    /// Properties carried by the event
    pub fn properties(&self) -> &EventProperties {
        &self.properties
    }
}

/// Notification published after a user change was committed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserChangeEvent {
    change_type: UserChangeType,
    properties: EventProperties,
}

impl UserChangeEvent {
    /// Create a notification for a committed change
    pub fn new(change_type: UserChangeType) -> Self {
        Self {
            change_type,
            properties: EventProperties::new(),
        }
    }

    /// Attach properties to the event
    pub fn with_properties(mut self, properties: EventProperties) -> Self {
        self.properties = properties;
        self
    }

    /// The committed change
    pub fn change_type(&self) -> UserChangeType {
        self.change_type
    }

    /// Properties carried by the event
    pub fn properties(&self) -> &EventProperties {
        &self.properties
    }
}

/// Application-defined event with a JSON payload.
///
/// The topic is also exposed as the `topic` property so handlers can narrow on
/// it with an ordinary property filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomEvent {
    topic: String,
    payload: serde_json::Value,
    properties: EventProperties,
}

impl CustomEvent {
    /// Property key under which the topic is published
    pub const TOPIC_PROPERTY: &'static str = "topic";

    /// Create an event for `topic`
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        let topic = topic.into();
        let properties = EventProperties::new().with(Self::TOPIC_PROPERTY, topic.clone());
        Self {
            topic,
            payload,
            properties,
        }
    }

    /// Attach properties to the event; the topic property always wins
    pub fn with_properties(mut self, properties: EventProperties) -> Self {
        self.properties = properties.with(Self::TOPIC_PROPERTY, self.topic.clone());
        self
    }

    /// Event topic
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Event payload
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Properties carried by the event
    pub fn properties(&self) -> &EventProperties {
        &self.properties
    }
}

/// Root event enum for everything dispatched through the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BusEvent {
    /// Session shutdown
    Shutdown(ShutdownEvent),
    /// User change announcement
    UserChangeAnnouncement(UserChangeAnnouncementEvent),
    /// Committed user change
    UserChange(UserChangeEvent),
    /// Application-defined event
    Custom(CustomEvent),
}

impl BusEvent {
    /// Get the dispatch tag of this event
    pub fn event_type(&self) -> EventType {
        match self {
            BusEvent::Shutdown(_) => EventType::Shutdown,
            BusEvent::UserChangeAnnouncement(_) => EventType::UserChangeAnnouncement,
            BusEvent::UserChange(_) => EventType::UserChange,
            BusEvent::Custom(_) => EventType::Custom,
        }
    }

    /// Properties carried by the event
    pub fn properties(&self) -> &EventProperties {
        match self {
            BusEvent::Shutdown(e) => e.properties(),
            BusEvent::UserChangeAnnouncement(e) => e.properties(),
            BusEvent::UserChange(e) => e.properties(),
            BusEvent::Custom(e) => e.properties(),
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            BusEvent::Shutdown(_) => "Session shutdown".to_string(),
            BusEvent::UserChangeAnnouncement(e) => format!(
                "User change announced: {} (accept={}, refresh={})",
                e.change_type, e.accept, e.refresh
            ),
            BusEvent::UserChange(e) => format!("User changed: {}", e.change_type),
            BusEvent::Custom(e) => format!("Custom event: {}", e.topic),
        }
    }

    /// The announcement payload, if this is an announcement
    pub fn as_announcement(&self) -> Option<&UserChangeAnnouncementEvent> {
        match self {
            BusEvent::UserChangeAnnouncement(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShutdownEvent> for BusEvent {
    fn from(event: ShutdownEvent) -> Self {
        BusEvent::Shutdown(event)
    }
}

impl From<UserChangeAnnouncementEvent> for BusEvent {
    fn from(event: UserChangeAnnouncementEvent) -> Self {
        BusEvent::UserChangeAnnouncement(event)
    }
}

impl From<UserChangeEvent> for BusEvent {
    fn from(event: UserChangeEvent) -> Self {
        BusEvent::UserChange(event)
    }
}

impl From<CustomEvent> for BusEvent {
    fn from(event: CustomEvent) -> Self {
        BusEvent::Custom(event)
    }
}

/// Event types a handler method can take as its parameter.
///
/// `EVENT_TYPE` is the tag a handler for `Self` is declared with;
/// `from_event_mut` narrows a dispatched event to `Self`.
pub trait EventPayload: Send + 'static {
    /// Declared dispatch tag
    const EVENT_TYPE: EventType;

    /// Narrow a dispatched event to this payload type
    fn from_event_mut(event: &mut BusEvent) -> Option<&mut Self>;
}

impl EventPayload for BusEvent {
    const EVENT_TYPE: EventType = EventType::Any;

    fn from_event_mut(event: &mut BusEvent) -> Option<&mut Self> {
        Some(event)
    }
}

macro_rules! impl_event_payload {
    ($ty:ty, $variant:ident) => {
        impl EventPayload for $ty {
            const EVENT_TYPE: EventType = EventType::$variant;

            fn from_event_mut(event: &mut BusEvent) -> Option<&mut Self> {
                match event {
                    BusEvent::$variant(e) => Some(e),
                    _ => None,
                }
            }
        }
    };
}

impl_event_payload!(ShutdownEvent, Shutdown);
impl_event_payload!(UserChangeAnnouncementEvent, UserChangeAnnouncement);
impl_event_payload!(UserChangeEvent, UserChange);
impl_event_payload!(CustomEvent, Custom);
