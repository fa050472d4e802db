// Active component binding tests
// Presenters registered through a view get live components in their Listen
// handlers and are skipped while those components are detached.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use viewbus_core::{
    BindingError, ComponentParam, CustomEvent, DispatchError, EventBus, HandlerMethod,
    RegistrationError, ResolutionError, Subscriber, UserChangeEvent, UserChangeType,
};
use viewbus_view::{ViewDeclaration, ViewError, ViewScope};

struct Label {
    text: Mutex<String>,
}

impl Label {
    fn new() -> Self {
        Self {
            text: Mutex::new(String::new()),
        }
    }
}

struct Button;

#[derive(Default)]
struct GreetingPresenter {
    greetings: AtomicUsize,
}

impl Subscriber for GreetingPresenter {
    fn handlers() -> Vec<HandlerMethod<Self>> {
        vec![HandlerMethod::listen(
            "on_user_changed",
            vec![ComponentParam::named::<Label>("greeting")],
            |p: &Self, e: &mut UserChangeEvent, args| {
                let label = args
                    .get::<Label>(0)
                    .ok_or_else(|| anyhow::anyhow!("greeting label missing"))?;
                *label.text.lock() = format!("{} done", e.change_type());
                p.greetings.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )]
    }
}

fn login_view(bus: &Arc<EventBus>) -> ViewScope {
    ViewScope::new(
        bus.clone(),
        ViewDeclaration::new("login")
            .component::<Label>("greeting")
            .component::<Button>("submit")
            .component::<Button>("cancel"),
    )
    .expect("Should open view")
}

#[test]
fn test_listen_handler_waits_for_attach() {
    let bus = Arc::new(EventBus::new());
    let view = login_view(&bus);
    let presenter = Arc::new(GreetingPresenter::default());
    view.register_presenter(presenter.clone())
        .expect("Should register");

    // Detached: handler is skipped, no error
    let report = bus
        .publish(UserChangeEvent::new(UserChangeType::Login))
        .expect("Should publish");
    assert_eq!(report.invoked, 0);
    assert_eq!(report.skipped_unresolved, 1);
    assert_eq!(presenter.greetings.load(Ordering::SeqCst), 0);

    let label = Arc::new(Label::new());
    view.notify_attach("greeting", label.clone())
        .expect("Should attach");

    let report = bus
        .publish(UserChangeEvent::new(UserChangeType::Login))
        .expect("Should publish");
    assert_eq!(report.invoked, 1);
    assert_eq!(presenter.greetings.load(Ordering::SeqCst), 1);
    assert_eq!(*label.text.lock(), "LOGIN done");

    // Detached again: skipped again
    assert!(view.notify_detach("greeting"));
    bus.publish(UserChangeEvent::new(UserChangeType::Logout))
        .expect("Should publish");
    assert_eq!(presenter.greetings.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unknown_identifier_fails_registration() {
    struct AvatarPresenter;

    impl Subscriber for AvatarPresenter {
        fn handlers() -> Vec<HandlerMethod<Self>> {
            vec![HandlerMethod::listen(
                "on_user_changed",
                vec![ComponentParam::named::<Label>("avatar")],
                |_: &Self, _: &mut UserChangeEvent, _| Ok(()),
            )]
        }
    }

    let bus = Arc::new(EventBus::new());
    let view = login_view(&bus);

    let err = view
        .register_presenter(Arc::new(AvatarPresenter))
        .expect_err("Should reject");
    assert!(matches!(
        err,
        ViewError::Registration(RegistrationError::Binding {
            reason: BindingError::UnknownIdentifier { .. },
            ..
        })
    ));
    assert_eq!(bus.handler_count(), 0);
    assert_eq!(view.presenter_count(), 0);
}

#[test]
fn test_unnamed_parameters_must_be_unambiguous() {
    struct ByTypeButton;

    impl Subscriber for ByTypeButton {
        fn handlers() -> Vec<HandlerMethod<Self>> {
            vec![HandlerMethod::listen(
                "on_refresh",
                vec![ComponentParam::of_type::<Button>()],
                |_: &Self, _: &mut CustomEvent, _| Ok(()),
            )]
        }
    }

    struct TwoLabels;

    impl Subscriber for TwoLabels {
        fn handlers() -> Vec<HandlerMethod<Self>> {
            vec![HandlerMethod::listen(
                "on_refresh",
                vec![
                    ComponentParam::of_type::<Label>(),
                    ComponentParam::of_type::<Label>(),
                ],
                |_: &Self, _: &mut CustomEvent, _| Ok(()),
            )]
        }
    }

    let bus = Arc::new(EventBus::new());
    let view = login_view(&bus);

    // Two buttons are declared, so a by-type button parameter is ambiguous
    assert!(matches!(
        view.register_presenter(Arc::new(ByTypeButton)),
        Err(ViewError::Registration(RegistrationError::Binding {
            reason: BindingError::Ambiguous { .. },
            ..
        }))
    ));

    // Both unnamed labels collapse onto the single declared label
    assert!(matches!(
        view.register_presenter(Arc::new(TwoLabels)),
        Err(ViewError::Registration(
            RegistrationError::AmbiguousParameters { ref identifier, .. }
        )) if identifier == "greeting"
    ));
}

#[test]
fn test_two_live_components_abort_dispatch() {
    let bus = Arc::new(EventBus::new());
    let view = login_view(&bus);
    view.register_presenter(Arc::new(GreetingPresenter::default()))
        .expect("Should register");

    view.notify_attach("greeting", Arc::new(Label::new()))
        .expect("Should attach");
    view.notify_attach("greeting", Arc::new(Label::new()))
        .expect("Should attach");

    let err = bus
        .publish(UserChangeEvent::new(UserChangeType::Login))
        .expect_err("Should fail");
    assert!(matches!(
        err,
        DispatchError::Resolution {
            reason: ResolutionError::Ambiguous { count: 2, .. },
            ..
        }
    ));
}

#[test]
fn test_closed_view_no_longer_dispatches() {
    let bus = Arc::new(EventBus::new());
    let view = login_view(&bus);
    let presenter = Arc::new(GreetingPresenter::default());
    view.register_presenter(presenter.clone())
        .expect("Should register");
    view.notify_attach("greeting", Arc::new(Label::new()))
        .expect("Should attach");

    view.close();

    let report = bus
        .publish(UserChangeEvent::new(UserChangeType::Login))
        .expect("Should publish");
    assert_eq!(report.invoked, 0);
    assert_eq!(presenter.greetings.load(Ordering::SeqCst), 0);
    assert!(!view.components().is_attached("greeting"));
    assert!(matches!(
        view.notify_attach("greeting", Arc::new(Label::new())),
        Err(ViewError::Closed(_))
    ));
}
