//! User change coordination.
//!
//! A login or logout is announced on the session bus before it happens so
//! that subscribers can veto it (unsaved work, running jobs) or ask for a
//! refresh once it is done. Only an accepted change is committed, which
//! publishes the matching [`UserChangeEvent`].
//!
//! ```rust,ignore
//! let coordinator = session.coordinator()?;
//! match coordinator.announce(UserChangeType::Logout)? {
//!     UserChangeDecision::Declined(outcome) => show_declined(outcome),
//!     UserChangeDecision::Accepted(pending) => {
//!         auth.logout()?;
//!         let outcome = coordinator.commit(pending)?;
//!         if outcome.refresh_requested {
//!             ui.refresh();
//!         }
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use viewbus_core::{
    BusEvent, EventBus, EventProperties, UserChangeAnnouncementEvent, UserChangeEvent,
    UserChangeType,
};

use crate::error::{SessionError, SessionResult};
use crate::session::SessionId;

/// Whether the change went ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserChangeDisposition {
    /// No subscriber declined; the change was committed.
    Accepted,
    /// At least one subscriber declined; nothing was swapped.
    Declined,
}

/// What the caller of a user change gets back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserChangeOutcome {
    /// The announced change.
    pub change_type: UserChangeType,
    /// Accepted or declined.
    pub disposition: UserChangeDisposition,
    /// Some subscriber asked for a view refresh after the change.
    pub refresh_requested: bool,
}

impl UserChangeOutcome {
    /// Whether the change went ahead
    pub fn is_accepted(&self) -> bool {
        self.disposition == UserChangeDisposition::Accepted
    }
}

/// An accepted change waiting for the caller to swap identities
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an accepted user change must be committed"]
pub struct PendingUserChange {
    change_type: UserChangeType,
    refresh_requested: bool,
}

impl PendingUserChange {
    /// The accepted change
    pub fn change_type(&self) -> UserChangeType {
        self.change_type
    }

    /// Whether a refresh was requested during the announcement
    pub fn refresh_requested(&self) -> bool {
        self.refresh_requested
    }
}

/// Result of announcing a change
#[derive(Debug, PartialEq, Eq)]
pub enum UserChangeDecision {
    /// Some subscriber declined; nothing is published further.
    Declined(UserChangeOutcome),
    /// Nobody declined; the caller swaps identities and commits.
    Accepted(PendingUserChange),
}

/// Shutdown state of the owning session
#[derive(Debug, Clone)]
struct SessionGuard {
    id: SessionId,
    closed: Arc<AtomicBool>,
}

/// Runs the announce/commit protocol for login and logout
#[derive(Debug, Clone)]
pub struct UserChangeCoordinator {
    bus: Arc<EventBus>,
    properties: EventProperties,
    session: Option<SessionGuard>,
}

impl UserChangeCoordinator {
    /// Coordinator publishing on `bus`
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            properties: EventProperties::new(),
            session: None,
        }
    }

    pub(crate) fn for_session(bus: Arc<EventBus>, id: SessionId, closed: Arc<AtomicBool>) -> Self {
        Self {
            session: Some(SessionGuard { id, closed }),
            ..Self::new(bus)
        }
    }

    /// Attach properties to every announcement and change event
    pub fn with_properties(mut self, properties: EventProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Publish the announcement and collect the subscribers' votes
    pub fn announce(&self, change_type: UserChangeType) -> SessionResult<UserChangeDecision> {
        self.ensure_open()?;
        let mut event = BusEvent::from(
            UserChangeAnnouncementEvent::new(change_type).with_properties(self.properties.clone()),
        );

        if let Err(source) = self.bus.dispatch(&mut event) {
            let (accepted, refresh_requested) = event
                .as_announcement()
                .map(|a| (a.do_accept(), a.do_refresh()))
                .unwrap_or((true, false));
            tracing::warn!("User change {} aborted: {}", change_type, source);
            return Err(SessionError::AnnouncementFailed {
                change_type,
                accepted,
                refresh_requested,
                source,
            });
        }

        let Some(announcement) = event.as_announcement() else {
            return Ok(UserChangeDecision::Accepted(PendingUserChange {
                change_type,
                refresh_requested: false,
            }));
        };

        if announcement.do_accept() {
            tracing::debug!("User change {} accepted by subscribers", change_type);
            Ok(UserChangeDecision::Accepted(PendingUserChange {
                change_type,
                refresh_requested: announcement.do_refresh(),
            }))
        } else {
            tracing::info!("User change {} declined", change_type);
            Ok(UserChangeDecision::Declined(UserChangeOutcome {
                change_type,
                disposition: UserChangeDisposition::Declined,
                refresh_requested: announcement.do_refresh(),
            }))
        }
    }

    /// Notify observers that an accepted change has happened
    pub fn commit(&self, pending: PendingUserChange) -> SessionResult<UserChangeOutcome> {
        self.ensure_open()?;
        let change_type = pending.change_type;
        self.bus
            .publish(UserChangeEvent::new(change_type).with_properties(self.properties.clone()))
            .map_err(|source| SessionError::NotificationFailed {
                change_type,
                source,
            })?;

        tracing::info!(
            "User change {} committed{}",
            change_type,
            if pending.refresh_requested {
                ", refresh requested"
            } else {
                ""
            }
        );
        Ok(UserChangeOutcome {
            change_type,
            disposition: UserChangeDisposition::Accepted,
            refresh_requested: pending.refresh_requested,
        })
    }

    /// Announce, run `swap` if accepted, then commit
    pub fn change_user<F>(
        &self,
        change_type: UserChangeType,
        swap: F,
    ) -> SessionResult<UserChangeOutcome>
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        match self.announce(change_type)? {
            UserChangeDecision::Declined(outcome) => Ok(outcome),
            UserChangeDecision::Accepted(pending) => {
                swap().map_err(|error| SessionError::SwapFailed { change_type, error })?;
                self.commit(pending)
            }
        }
    }

    fn ensure_open(&self) -> SessionResult<()> {
        match &self.session {
            Some(guard) if guard.closed.load(Ordering::Acquire) => {
                Err(SessionError::Closed(guard.id))
            }
            _ => Ok(()),
        }
    }
}
