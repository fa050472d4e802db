// User change coordination tests
// Runs login/logout through a session: announcement votes, commit
// notification and failures in either phase.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use viewbus_core::{
    ComponentParam, DispatchErrorPolicy, EventBusConfig, EventProperties, EventType,
    HandlerMethod, Subscriber, UserChangeAnnouncementEvent, UserChangeEvent, UserChangeType,
};
use viewbus_session::{SessionError, SessionScope, UserChangeDecision, UserChangeDisposition};
use viewbus_view::{ViewDeclaration, ViewError};

struct Decliner;

impl Subscriber for Decliner {
    fn handlers() -> Vec<HandlerMethod<Self>> {
        vec![HandlerMethod::subscribe(
            "on_announcement",
            |_: &Self, e: &mut UserChangeAnnouncementEvent| {
                e.decline();
                Ok(())
            },
        )]
    }
}

struct Refresher;

impl Subscriber for Refresher {
    fn handlers() -> Vec<HandlerMethod<Self>> {
        vec![HandlerMethod::subscribe(
            "on_announcement",
            |_: &Self, e: &mut UserChangeAnnouncementEvent| {
                e.refresh_after_change();
                Ok(())
            },
        )]
    }
}

struct Broken;

impl Subscriber for Broken {
    fn handlers() -> Vec<HandlerMethod<Self>> {
        vec![HandlerMethod::subscribe(
            "on_announcement",
            |_: &Self, _: &mut UserChangeAnnouncementEvent| {
                Err(anyhow::anyhow!("editor state unreadable"))
            },
        )]
    }
}

#[derive(Default)]
struct ChangeLog {
    changes: Mutex<Vec<UserChangeType>>,
}

impl Subscriber for ChangeLog {
    fn handlers() -> Vec<HandlerMethod<Self>> {
        vec![HandlerMethod::subscribe(
            "on_change",
            |s: &Self, e: &mut UserChangeEvent| {
                s.changes.lock().push(e.change_type());
                Ok(())
            },
        )]
    }
}

#[test]
fn test_declined_login_publishes_no_change() {
    let session = SessionScope::new();
    let decliner = Arc::new(Decliner);
    let refresher = Arc::new(Refresher);
    let log = Arc::new(ChangeLog::default());
    session.register(&decliner).expect("Should register");
    session.register(&refresher).expect("Should register");
    session.register(&log).expect("Should register");

    let swaps = AtomicUsize::new(0);
    let outcome = session
        .coordinator()
        .expect("Should create")
        .change_user(UserChangeType::Login, || {
            swaps.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .expect("Should complete");

    assert_eq!(outcome.disposition, UserChangeDisposition::Declined);
    assert!(outcome.refresh_requested);
    assert_eq!(swaps.load(Ordering::SeqCst), 0);
    assert!(log.changes.lock().is_empty());
}

#[test]
fn test_logout_without_subscribers_commits() {
    let session = SessionScope::new();
    let coordinator = session.coordinator().expect("Should create");

    let pending = match coordinator
        .announce(UserChangeType::Logout)
        .expect("Should announce")
    {
        UserChangeDecision::Accepted(pending) => pending,
        UserChangeDecision::Declined(outcome) => panic!("Unexpected decline: {:?}", outcome),
    };
    assert!(!pending.refresh_requested());

    // Observers registered between announce and commit still see the change
    let log = Arc::new(ChangeLog::default());
    session.register(&log).expect("Should register");

    let outcome = coordinator.commit(pending).expect("Should commit");
    assert!(outcome.is_accepted());
    assert!(!outcome.refresh_requested);
    assert_eq!(*log.changes.lock(), vec![UserChangeType::Logout]);
}

#[test]
fn test_refresh_request_reaches_caller_on_accept() {
    let session = SessionScope::new();
    let refresher = Arc::new(Refresher);
    session.register(&refresher).expect("Should register");

    let outcome = session
        .coordinator()
        .expect("Should create")
        .change_user(UserChangeType::Login, || Ok(()))
        .expect("Should complete");

    assert!(outcome.is_accepted());
    assert!(outcome.refresh_requested);
}

#[test]
fn test_failing_announcement_keeps_earlier_decline() {
    let session = SessionScope::new();
    let decliner = Arc::new(Decliner);
    let broken = Arc::new(Broken);
    let log = Arc::new(ChangeLog::default());
    session.register(&decliner).expect("Should register");
    session.register(&broken).expect("Should register");
    session.register(&log).expect("Should register");

    let err = session
        .coordinator()
        .expect("Should create")
        .change_user(UserChangeType::Logout, || Ok(()))
        .expect_err("Should fail");

    match err {
        SessionError::AnnouncementFailed {
            change_type,
            accepted,
            refresh_requested,
            source,
        } => {
            assert_eq!(change_type, UserChangeType::Logout);
            assert!(!accepted);
            assert!(!refresh_requested);
            assert!(source.is_handler_error());
        }
        other => panic!("Unexpected error: {}", other),
    }
    assert!(log.changes.lock().is_empty());
}

#[test]
fn test_continue_policy_lets_change_proceed() {
    let session = SessionScope::with_config(EventBusConfig {
        error_policy: DispatchErrorPolicy::Continue,
        ..Default::default()
    });
    let broken = Arc::new(Broken);
    let log = Arc::new(ChangeLog::default());
    session.register(&broken).expect("Should register");
    session.register(&log).expect("Should register");

    let outcome = session
        .coordinator()
        .expect("Should create")
        .change_user(UserChangeType::Login, || Ok(()))
        .expect("Should complete");

    assert!(outcome.is_accepted());
    assert_eq!(*log.changes.lock(), vec![UserChangeType::Login]);
}

#[test]
fn test_realm_filtered_subscriber() {
    struct AdminOnly {
        seen: AtomicUsize,
    }

    impl Subscriber for AdminOnly {
        fn handlers() -> Vec<HandlerMethod<Self>> {
            vec![HandlerMethod::subscribe_type(
                "on_user",
                EventType::User,
                |s: &Self, _| {
                    s.seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
            )
            .with_property("realm", "admin")]
        }
    }

    let session = SessionScope::new();
    let admin = Arc::new(AdminOnly {
        seen: AtomicUsize::new(0),
    });
    session.register(&admin).expect("Should register");

    session
        .coordinator()
        .expect("Should create")
        .change_user(UserChangeType::Login, || Ok(()))
        .expect("Should complete");
    assert_eq!(admin.seen.load(Ordering::SeqCst), 0);

    session
        .coordinator()
        .expect("Should create")
        .with_properties(EventProperties::new().with("realm", "admin"))
        .change_user(UserChangeType::Login, || Ok(()))
        .expect("Should complete");
    // Announcement and change event
    assert_eq!(admin.seen.load(Ordering::SeqCst), 2);
}

#[test]
fn test_view_presenter_sees_committed_change() {
    struct Greeting {
        text: Mutex<String>,
    }

    struct HeaderPresenter;

    impl Subscriber for HeaderPresenter {
        fn handlers() -> Vec<HandlerMethod<Self>> {
            vec![HandlerMethod::listen(
                "on_change",
                vec![ComponentParam::of_type::<Greeting>()],
                |_: &Self, e: &mut UserChangeEvent, args| {
                    if let Some(greeting) = args.get::<Greeting>(0) {
                        *greeting.text.lock() = format!("after {}", e.change_type());
                    }
                    Ok(())
                },
            )]
        }
    }

    let session = SessionScope::new();
    let view = session
        .open_view(ViewDeclaration::new("header").component::<Greeting>("greeting"))
        .expect("Should open");
    view.register_presenter(Arc::new(HeaderPresenter))
        .expect("Should register");

    let greeting = Arc::new(Greeting {
        text: Mutex::new(String::new()),
    });
    view.notify_attach("greeting", greeting.clone())
        .expect("Should attach");

    session
        .coordinator()
        .expect("Should create")
        .change_user(UserChangeType::Logout, || Ok(()))
        .expect("Should complete");

    assert_eq!(*greeting.text.lock(), "after LOGOUT");
}

struct Avatar;

/// Votes for a refresh only while its avatar is attached
struct AvatarPresenter {
    announcements: AtomicUsize,
}

impl Subscriber for AvatarPresenter {
    fn handlers() -> Vec<HandlerMethod<Self>> {
        vec![HandlerMethod::listen(
            "on_announcement",
            vec![ComponentParam::named::<Avatar>("avatar")],
            |p: &Self, e: &mut UserChangeAnnouncementEvent, _| {
                p.announcements.fetch_add(1, Ordering::SeqCst);
                e.refresh_after_change();
                Ok(())
            },
        )]
    }
}

#[test]
fn test_detached_presenter_skipped_while_announcement_aggregates() {
    let session = SessionScope::new();
    let view = session
        .open_view(ViewDeclaration::new("profile").component::<Avatar>("avatar"))
        .expect("Should open");
    let presenter = Arc::new(AvatarPresenter {
        announcements: AtomicUsize::new(0),
    });
    view.register_presenter(presenter.clone())
        .expect("Should register");
    let decliner = Arc::new(Decliner);
    session.register(&decliner).expect("Should register");

    let report = session
        .publish(UserChangeAnnouncementEvent::new(UserChangeType::Logout))
        .expect("Should publish");

    assert_eq!(report.skipped_unresolved, 1);
    assert_eq!(report.invoked, 1);
    let announcement = report.announcement.expect("Should aggregate");
    assert!(!announcement.accepted);
    assert!(!announcement.refresh);
    assert_eq!(presenter.announcements.load(Ordering::SeqCst), 0);

    view.notify_attach("avatar", Arc::new(Avatar))
        .expect("Should attach");
    let report = session
        .publish(UserChangeAnnouncementEvent::new(UserChangeType::Logout))
        .expect("Should publish");

    assert_eq!(report.skipped_unresolved, 0);
    assert_eq!(report.invoked, 2);
    let announcement = report.announcement.expect("Should aggregate");
    assert!(!announcement.accepted);
    assert!(announcement.refresh);
}

#[test]
fn test_shutdown_closes_views_and_their_presenters() {
    let session = SessionScope::new();
    let view = session
        .open_view(ViewDeclaration::new("history"))
        .expect("Should open");
    let log = Arc::new(ChangeLog::default());
    view.register_presenter(log.clone())
        .expect("Should register");

    session.notify_shutdown().expect("Should shut down");

    assert!(view.is_closed());
    assert_eq!(view.presenter_count(), 0);
    assert!(matches!(
        view.register_presenter(Arc::new(ChangeLog::default())),
        Err(ViewError::Closed(_))
    ));
    assert!(matches!(
        view.notify_attach("anything", Arc::new(Avatar)),
        Err(ViewError::Closed(_))
    ));

    let report = view
        .bus()
        .publish(UserChangeEvent::new(UserChangeType::Login))
        .expect("Should publish");
    assert_eq!(report.invoked, 0);
    assert_eq!(view.bus().handler_count(), 0);
    assert!(log.changes.lock().is_empty());
}
