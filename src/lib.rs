//! # ViewBus
//!
//! A typed, session-scoped event bus for server-side UI sessions with:
//! - Handler selection by event type hierarchy and property filters
//! - Presenters whose handlers receive live view components while attached
//! - Announce/commit coordination around login and logout
//!
//! ## Architecture
//!
//! ViewBus is organized as a workspace with multiple crates:
//!
//! 1. **viewbus-core** - Event model, property filters, handler tables, event bus
//! 2. **viewbus-view** - View declarations, active components, view scope
//! 3. **viewbus-session** - Session scope and user change coordinator
//! 4. **viewbus-settings** - Configuration files and validation
//! 5. **viewbus** - Re-exports, logging setup and the demo binary

pub use viewbus_core::{
    BindingError, BusEvent, Capability, ComponentArgs, ComponentParam, ComponentRef,
    ComponentScope, CustomEvent, DispatchError, DispatchErrorPolicy, DispatchReport, EventBus,
    EventBusConfig, EventProperties, EventType, HandlerMethod, HandlerResult, RegistrationError,
    RegistrationHandle, ResolutionError, ShutdownEvent, Subscriber, UserChangeAnnouncementEvent,
    UserChangeEvent, UserChangeType,
};

pub use viewbus_view::{ActiveComponents, ViewDeclaration, ViewError, ViewScope};

pub use viewbus_session::{
    PendingUserChange, SessionError, SessionId, SessionScope, UserChangeCoordinator,
    UserChangeDecision, UserChangeDisposition, UserChangeOutcome,
};

pub use viewbus_settings::{BusSettings, Config, LoggingSettings, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging from settings
///
/// Sets up structured logging with:
/// - `RUST_LOG` support, falling back to the configured level and directives
/// - Console output, pretty or JSON lines
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(settings.filter_directives())?,
    };

    if settings.json {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_thread_ids(settings.with_thread_ids)
            .json();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(settings.with_thread_ids)
            .with_line_number(true)
            .pretty();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
