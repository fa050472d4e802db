use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use viewbus::{
    init_logging, ComponentParam, Config, CustomEvent, EventProperties, HandlerMethod,
    SessionScope, ShutdownEvent, Subscriber, UserChangeAnnouncementEvent, UserChangeEvent,
    UserChangeType, ViewDeclaration, BUILD_DATE, VERSION,
};

/// Stand-in for a toolkit label
struct Label {
    text: Mutex<String>,
}

/// Updates the header greeting after every committed user change
struct HeaderPresenter;

impl Subscriber for HeaderPresenter {
    fn handlers() -> Vec<HandlerMethod<Self>> {
        vec![
            HandlerMethod::listen(
                "on_user_changed",
                vec![ComponentParam::named::<Label>("greeting")],
                |_: &Self, e: &mut UserChangeEvent, args| {
                    let label = args
                        .get::<Label>(0)
                        .ok_or_else(|| anyhow::anyhow!("greeting label not resolved"))?;
                    let text = match e.change_type() {
                        UserChangeType::Login => "Welcome back",
                        UserChangeType::Logout => "Signed out",
                    };
                    if let Ok(mut current) = label.text.lock() {
                        *current = text.to_string();
                    }
                    tracing::info!("Header greeting set to '{}'", text);
                    Ok(())
                },
            ),
            HandlerMethod::subscribe("on_refresh", |_: &Self, e: &mut CustomEvent| {
                tracing::info!("Header refresh requested: {}", e.payload());
                Ok(())
            })
            .with_property(CustomEvent::TOPIC_PROPERTY, "refresh")
            .with_property("view", "header"),
        ]
    }
}

/// Session service that vetoes logout while work is unsaved
struct DocumentEditor {
    dirty: AtomicBool,
}

impl Subscriber for DocumentEditor {
    fn handlers() -> Vec<HandlerMethod<Self>> {
        vec![
            HandlerMethod::subscribe(
                "on_user_change_announced",
                |editor: &Self, e: &mut UserChangeAnnouncementEvent| {
                    if e.change_type() == UserChangeType::Logout
                        && editor.dirty.load(Ordering::SeqCst)
                    {
                        tracing::info!("Editor has unsaved changes, declining logout");
                        e.decline();
                    }
                    e.refresh_after_change();
                    Ok(())
                },
            ),
            HandlerMethod::subscribe("on_shutdown", |_: &Self, _: &mut ShutdownEvent| {
                tracing::info!("Editor releasing documents");
                Ok(())
            }),
        ]
    }
}

fn config_path() -> anyhow::Result<PathBuf> {
    match std::env::args().nth(1) {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(Config::default_path()?),
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::load_or_default(&config_path()?)?;
    init_logging(&config.logging)?;
    tracing::info!("ViewBus {} (built {})", VERSION, BUILD_DATE);

    let session = SessionScope::with_config(config.event_bus_config());

    let editor = Arc::new(DocumentEditor {
        dirty: AtomicBool::new(true),
    });
    session.register(&editor)?;

    let header =
        session.open_view(ViewDeclaration::new("header").component::<Label>("greeting"))?;
    header.register_presenter(Arc::new(HeaderPresenter))?;
    let greeting = Arc::new(Label {
        text: Mutex::new(String::new()),
    });
    header.notify_attach("greeting", greeting.clone())?;

    let coordinator = session.coordinator()?;
    for change_type in [UserChangeType::Login, UserChangeType::Logout] {
        let outcome = coordinator.change_user(change_type, || {
            tracing::info!("Swapping identity for {}", change_type);
            Ok(())
        })?;
        tracing::info!(
            "{}: {:?} (refresh requested: {})",
            change_type,
            outcome.disposition,
            outcome.refresh_requested
        );
    }

    editor.dirty.store(false, Ordering::SeqCst);
    let outcome = coordinator.change_user(UserChangeType::Logout, || Ok(()))?;
    tracing::info!("LOGOUT after save: {:?}", outcome.disposition);

    session.publish(
        CustomEvent::new("refresh", serde_json::json!({ "reason": "logout" }))
            .with_properties(EventProperties::new().with("view", "header")),
    )?;

    header.close();
    let report = session.notify_shutdown()?;
    tracing::info!("Shutdown reached {} handlers", report.invoked);

    Ok(())
}
