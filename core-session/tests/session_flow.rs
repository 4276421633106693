use bridge_desktop::MemorySecureStore;
use bridge_traits::{
    ManualClock, RemoteError, RemoteErrorCode, RemoteUser, SecureStore, SessionCallbacks,
};
use chrono::{TimeZone, Utc};
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use core_session::credentials::{PASSWORD_KEY, USERNAME_KEY};
use core_session::testing::{settings, FakeRemoteService, RecordingPresenter};
use core_session::{ConnectionState, Session, SessionError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::broadcast;

fn build(store_credentials: bool) -> (Arc<FakeRemoteService>, Arc<RecordingPresenter>, Arc<Session>) {
    let remote = Arc::new(FakeRemoteService::new());
    let presenter = Arc::new(RecordingPresenter::new());
    let store = Arc::new(MemorySecureStore::new());
    if store_credentials {
        store.set_secret(USERNAME_KEY, b"jdoe").unwrap();
        store.set_secret(PASSWORD_KEY, b"hunter2").unwrap();
    }
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap(),
    ));

    let session = Session::new(
        remote.clone(),
        settings(),
        presenter.clone(),
        store,
        clock,
        EventBus::new(64),
    );
    (remote, presenter, session)
}

fn drain(events: &mut broadcast::Receiver<CoreEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Session(event) = event {
            out.push(event);
        }
    }
    out
}

#[test]
fn full_login_lifecycle_publishes_events_in_order() {
    let (remote, presenter, session) = build(false);
    let mut events = session.events().subscribe();
    presenter.answer_text("jdoe");
    presenter.answer_text("hunter2");

    assert!(matches!(session.active_session(), Err(SessionError::NotConnected)));
    assert_eq!(
        presenter.prompts(),
        vec![
            ("Spotify username".to_string(), false),
            ("Spotify password for user jdoe".to_string(), true),
        ]
    );

    remote.session().set_user(RemoteUser {
        canonical_name: "jdoe".to_string(),
        display_name: None,
        loaded: false,
    });
    remote.session().callbacks().logged_in(Ok(()));
    session.tick();

    assert!(session.active_session().is_ok());
    assert_eq!(session.current_user(), Some("jdoe".to_string()));

    session.disconnect().unwrap();
    remote.session().callbacks().logged_out();
    session.tick();

    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert_eq!(
        drain(&mut events),
        vec![
            SessionEvent::Connecting,
            SessionEvent::LoggedIn {
                user: "jdoe".to_string()
            },
            SessionEvent::LoggedOut,
        ]
    );
    assert_eq!(remote.sessions_created(), 1);
}

#[test]
fn cancelled_credentials_prompt_hides_indicator() {
    let (remote, presenter, session) = build(false);
    let mut events = session.events().subscribe();

    assert!(!session.reconnect(false));

    assert_eq!(presenter.connecting_shown(), 1);
    assert_eq!(presenter.connecting_hidden(), 1);
    assert!(remote.session().logins().is_empty());
    assert!(matches!(
        drain(&mut events).as_slice(),
        [SessionEvent::ConnectionFailed { recoverable: true, .. }]
    ));
}

#[test]
fn rejected_login_request_offers_retry_on_next_pump() {
    let (remote, presenter, session) = build(true);
    remote.session().fail_login(RemoteError::new(
        RemoteErrorCode::UnableToContactServer,
        "Unable to contact server",
    ));

    // The reconnect's own pump shows the dialog; declining ends the attempt
    assert!(!session.reconnect(false));
    assert_eq!(presenter.confirms(), 1);
    assert_eq!(remote.session().logins().len(), 1);
    assert!(matches!(session.state(), ConnectionState::Failed(_)));
}

#[test]
fn failed_retry_is_offered_again_on_the_following_tick() {
    let (remote, presenter, session) = build(true);
    session.connect(false).unwrap();
    remote.session().fail_login(RemoteError::new(
        RemoteErrorCode::UnableToContactServer,
        "Unable to contact server",
    ));
    presenter.answer_confirm(true);
    presenter.answer_confirm(false);

    remote.session().callbacks().connection_error(RemoteError::new(
        RemoteErrorCode::UnableToContactServer,
        "Unable to contact server",
    ));
    session.tick();
    assert_eq!(presenter.confirms(), 1);

    session.tick();
    assert_eq!(presenter.confirms(), 2);
    assert_eq!(remote.session().logins().len(), 2);

    session.tick();
    assert_eq!(presenter.confirms(), 2);
}

#[test]
fn callbacks_from_other_threads_are_handled_by_the_pump() {
    let (remote, presenter, session) = build(true);
    session.connect(false).unwrap();
    remote.session().set_process_wait(Duration::from_secs(3600));
    session.tick();

    let callbacks: Arc<dyn SessionCallbacks> = remote.session().callbacks();
    let worker = thread::spawn(move || {
        callbacks.log_message("Connecting to ap.spotify.com\n");
        callbacks.logged_in(Ok(()));
        callbacks.notify_main_thread();
    });
    worker.join().unwrap();

    assert!(session.is_logged_in());
    assert_eq!(presenter.connecting_hidden(), 0);

    session.tick();
    assert_eq!(presenter.connecting_hidden(), 1);
    assert_eq!(remote.session().process_calls(), 2);
}

#[test]
fn callbacks_after_session_dropped_are_ignored() {
    let (remote, _presenter, session) = build(true);
    session.connect(false).unwrap();
    let callbacks = remote.session().callbacks();
    drop(session);

    callbacks.logged_in(Ok(()));
    callbacks.notify_main_thread();
    callbacks.end_of_track();
    let format = bridge_traits::DeliveryFormat {
        channels: 2,
        sample_rate: 44100,
    };
    assert_eq!(callbacks.music_delivery(format, &[0; 8]), 0);
}
