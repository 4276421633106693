//! # Session State Machine
//!
//! Owns the remote session handle, the connection lifecycle and the event
//! pump.
//!
//! ## Overview
//!
//! ```text
//! Disconnected ──connect──> Connecting ──logged_in(Ok)──> LoggedIn
//!      ^                        │                            │
//!      │                logged_in(Err)                  disconnect
//!      │                        v                            │
//!      └──────────────────── Failed(reason) <────────────────┘
//!                              (retry offered)
//! ```
//!
//! The remote library pushes notifications into a [`SessionCallbacks`]
//! router that holds only a weak reference back to the [`Session`]. Callbacks
//! update shared state and queue a notice; anything that touches the host UI
//! (hiding the reconnect indicator, the retry dialog) runs from
//! [`Session::pump_events`] on the host's own thread.
//!
//! ## Usage
//!
//! ```ignore
//! let session = Session::new(remote, settings, presenter, secure_store, clock, events);
//!
//! // Host timer, once per UI frame
//! session.tick();
//!
//! // Any operation that needs the service
//! if !session.reconnect(false) {
//!     return; // retried on the next user action
//! }
//! ```

use crate::credentials::CredentialStore;
use crate::error::{ConnectError, LogoutError, Result, SessionError};
use crate::types::{AudioSink, ConnectionState};
use bridge_traits::{
    Clock, DeliveryFormat, ImageFetcher, ImageId, Presenter, RemoteError, RemoteRequest,
    RemoteService, RemoteSession, RemoteSessionSettings, SecureStore, SessionCallbacks,
};
use bridge_traits::remote::ImageCallback;
use chrono::{DateTime, Utc};
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use core_runtime::logging::REMOTE_LOG_TARGET;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument, warn};

const DIALOG_HEADING: &str = "Spotify";
const RECONNECTING_MESSAGE: &str = "Not connected to Spotify.\nReconnecting...";

/// Work queued by remote callbacks for the pump thread.
#[derive(Debug)]
enum Notice {
    LoginFinished(std::result::Result<(), RemoteError>),
    ConnectionError(RemoteError),
    LoggedOut,
}

/// The session state machine.
///
/// Always handled through `Arc<Session>`; see [`Session::new`].
pub struct Session {
    remote: Arc<dyn RemoteService>,
    settings: RemoteSessionSettings,
    presenter: Arc<dyn Presenter>,
    credentials: CredentialStore,
    clock: Arc<dyn Clock>,
    events: EventBus,
    handle: RwLock<Option<Arc<dyn RemoteSession>>>,
    /// Serializes `connect` calls.
    connect_lock: Mutex<()>,
    state: Mutex<ConnectionState>,
    /// Unix millis at which the remote library wants to process events again.
    next_event_due_ms: AtomicI64,
    notices: Mutex<VecDeque<Notice>>,
    audio_sink: RwLock<Option<Weak<dyn AudioSink>>>,
    self_ref: Weak<Session>,
}

impl Session {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        settings: RemoteSessionSettings,
        presenter: Arc<dyn Presenter>,
        secure_store: Arc<dyn SecureStore>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Arc<Self> {
        let credentials = CredentialStore::new(secure_store, presenter.clone());

        Arc::new_cyclic(|self_ref| Session {
            remote,
            settings,
            presenter,
            credentials,
            clock,
            events,
            handle: RwLock::new(None),
            connect_lock: Mutex::new(()),
            state: Mutex::new(ConnectionState::Disconnected),
            next_event_due_ms: AtomicI64::new(0),
            notices: Mutex::new(VecDeque::new()),
            audio_sink: RwLock::new(None),
            self_ref: self_ref.clone(),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state.lock().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.lock().is_logged_in()
    }

    /// The remote session handle, if one was constructed.
    pub fn remote_session(&self) -> Option<Arc<dyn RemoteSession>> {
        self.handle.read().clone()
    }

    /// The remote session handle, reconnecting first when not logged in.
    ///
    /// Returns [`SessionError::NotConnected`] without blocking when a
    /// reconnect had to be started.
    pub fn active_session(&self) -> Result<Arc<dyn RemoteSession>> {
        if !self.reconnect(false) {
            return Err(SessionError::NotConnected);
        }
        self.remote_session().ok_or(SessionError::NotConnected)
    }

    /// Name of the logged-in user: display name once loaded, canonical name
    /// before.
    pub fn current_user(&self) -> Option<String> {
        if !self.is_logged_in() {
            return None;
        }
        self.remote_session()?
            .user()
            .map(|user| user.preferred_name().to_string())
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Route audio deliveries to `sink`. Only a weak reference is kept.
    pub fn register_audio_sink(&self, sink: &Arc<dyn AudioSink>) {
        *self.audio_sink.write() = Some(Arc::downgrade(sink));
    }

    /// Create the remote session if needed and log in.
    ///
    /// With `force_new_credentials` the current user is logged out and the
    /// stored credentials are cleared first, so the user is asked again. The
    /// outcome of the login itself arrives later through the pump.
    #[instrument(skip(self))]
    pub fn connect(&self, force_new_credentials: bool) -> std::result::Result<(), ConnectError> {
        let _guard = self.connect_lock.lock();

        let handle = self.ensure_remote_session()?;

        if force_new_credentials {
            if let Err(e) = self.disconnect() {
                debug!(error = %e, "Logout before credential reset failed");
            }
            self.credentials.clear()?;
        }

        if self.is_logged_in() && !force_new_credentials {
            return Ok(());
        }

        let credentials = self.credentials.resolve()?;
        self.set_state(ConnectionState::Connecting);
        self.events.publish(CoreEvent::Session(SessionEvent::Connecting));

        info!(username = %credentials.username, "Logging in");
        if let Err(e) = handle.login(&credentials.username, credentials.password()) {
            warn!(error = %e, "Login request rejected");
            self.set_state(ConnectionState::Failed(e.message.clone()));
            return Err(ConnectError::Login {
                code: e.code,
                message: e.message,
            });
        }

        Ok(())
    }

    /// Log out of the remote session.
    #[instrument(skip(self))]
    pub fn disconnect(&self) -> std::result::Result<(), LogoutError> {
        let Some(handle) = self.remote_session() else {
            debug!("No remote session to log out of");
            return Ok(());
        };

        handle.logout().map_err(|e| {
            warn!(error = %e, "Logout failed");
            LogoutError::from(e)
        })?;

        self.set_state(ConnectionState::Disconnected);
        info!("Logged out");
        Ok(())
    }

    /// Returns `true` when already logged in.
    ///
    /// Otherwise shows the reconnecting indicator, starts a login, runs one
    /// pump tick right away and returns `false` without waiting for the
    /// login to finish.
    #[instrument(skip(self))]
    pub fn reconnect(&self, force_new_credentials: bool) -> bool {
        if self.is_logged_in() {
            return true;
        }

        self.presenter.show_connecting(RECONNECTING_MESSAGE);

        if let Err(e) = self.connect(force_new_credentials) {
            self.connect_failed(e);
        }

        self.next_event_due_ms
            .store(self.clock.unix_timestamp_millis(), Ordering::SeqCst);
        self.pump_events(self.clock.now());
        false
    }

    /// Let the remote library process pending work if it is due, then handle
    /// notices its callbacks queued.
    pub fn pump_events(&self, now: DateTime<Utc>) {
        let now_ms = now.timestamp_millis();

        if now_ms >= self.next_event_due_ms.load(Ordering::SeqCst) {
            if let Some(handle) = self.remote_session() {
                let wait = handle.process_events();
                let wait_ms = i64::try_from(wait.as_millis()).unwrap_or(i64::MAX);
                self.next_event_due_ms
                    .store(now_ms.saturating_add(wait_ms), Ordering::SeqCst);
            }
        }

        self.handle_notices();
    }

    /// One pump tick at the clock's current time.
    pub fn tick(&self) {
        self.pump_events(self.clock.now());
    }

    /// Unix millis of the next due pump.
    pub fn next_event_due_ms(&self) -> i64 {
        self.next_event_due_ms.load(Ordering::SeqCst)
    }

    fn ensure_remote_session(&self) -> std::result::Result<Arc<dyn RemoteSession>, ConnectError> {
        if let Some(handle) = self.remote_session() {
            return Ok(handle);
        }

        debug!(user_agent = %self.settings.user_agent, "Creating remote session");
        let callbacks: Arc<dyn SessionCallbacks> = Arc::new(SessionCallbackRouter {
            session: self.self_ref.clone(),
        });

        let handle = self
            .remote
            .create_session(&self.settings, callbacks)
            .map_err(|e| {
                warn!(error = %e, "Failed to create remote session");
                ConnectError::SessionInit(e)
            })?;

        *self.handle.write() = Some(handle.clone());
        Ok(handle)
    }

    fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.lock();
        if *current != state {
            debug!(from = %*current, to = %state, "Connection state changed");
            *current = state;
        }
    }

    fn connect_failed(&self, error: ConnectError) {
        warn!(error = %error, "Connect failed");
        match error.remote_error() {
            // Offer a retry from the pump
            Some(remote) => self.notices.lock().push_back(Notice::ConnectionError(remote)),
            None => {
                self.presenter.hide_connecting();
                self.events.publish(CoreEvent::Session(SessionEvent::ConnectionFailed {
                    message: error.to_string(),
                    recoverable: true,
                }));
            }
        }
    }

    fn handle_notices(&self) {
        // Notices queued while handling these wait for the next tick
        let pending: Vec<Notice> = self.notices.lock().drain(..).collect();

        for notice in pending {
            match notice {
                Notice::LoginFinished(Ok(())) => {
                    self.presenter.hide_connecting();
                    let user = self.current_user().unwrap_or_default();
                    info!(user = %user, "Logged in");
                    self.events
                        .publish(CoreEvent::Session(SessionEvent::LoggedIn { user }));
                }
                Notice::LoginFinished(Err(error)) => {
                    self.presenter.hide_connecting();
                    warn!(error = %error, "Failed to log in");
                    self.offer_retry(error);
                }
                Notice::ConnectionError(error) => {
                    self.presenter.hide_connecting();
                    warn!(error = %error, "Connection to remote service failed");
                    self.offer_retry(error);
                }
                Notice::LoggedOut => {
                    self.events.publish(CoreEvent::Session(SessionEvent::LoggedOut));
                }
            }
        }
    }

    fn offer_retry(&self, error: RemoteError) {
        self.events.publish(CoreEvent::Session(SessionEvent::ConnectionFailed {
            message: error.message.clone(),
            recoverable: true,
        }));

        let lines = vec![
            "Failed to connect:".to_string(),
            error.message.clone(),
            "Retry?".to_string(),
        ];
        if !self.presenter.confirm(DIALOG_HEADING, &lines) {
            debug!("Retry declined");
            return;
        }

        let clear_credentials = error.code.is_credentials_error();
        if let Err(e) = self.connect(clear_credentials) {
            self.connect_failed(e);
        }
    }

    // Callback side. These run on the remote library's threads.

    fn on_logged_in(&self, result: std::result::Result<(), RemoteError>) {
        match &result {
            Ok(()) => self.set_state(ConnectionState::LoggedIn),
            Err(e) => self.set_state(ConnectionState::Failed(e.message.clone())),
        }
        self.notices.lock().push_back(Notice::LoginFinished(result));
    }

    fn on_logged_out(&self) {
        self.set_state(ConnectionState::Disconnected);
        self.notices.lock().push_back(Notice::LoggedOut);
    }

    fn on_connection_error(&self, error: RemoteError) {
        self.set_state(ConnectionState::Failed(error.message.clone()));
        self.notices.lock().push_back(Notice::ConnectionError(error));
    }

    fn on_notify_main_thread(&self) {
        self.next_event_due_ms
            .store(self.clock.unix_timestamp_millis(), Ordering::SeqCst);
    }

    fn audio_sink(&self) -> Option<Arc<dyn AudioSink>> {
        self.audio_sink.read().as_ref().and_then(Weak::upgrade)
    }
}

impl ImageFetcher for Session {
    fn fetch_image(
        &self,
        image: &ImageId,
        done: ImageCallback,
    ) -> std::result::Result<Box<dyn RemoteRequest>, RemoteError> {
        let handle = self.remote_session().ok_or_else(|| {
            RemoteError::new(
                bridge_traits::RemoteErrorCode::OtherTransient,
                "No remote session",
            )
        })?;
        handle.load_image(image, done)
    }
}

/// Callback registration handed to the remote library.
struct SessionCallbackRouter {
    session: Weak<Session>,
}

impl SessionCallbacks for SessionCallbackRouter {
    fn logged_in(&self, result: std::result::Result<(), RemoteError>) {
        if let Some(session) = self.session.upgrade() {
            session.on_logged_in(result);
        }
    }

    fn logged_out(&self) {
        if let Some(session) = self.session.upgrade() {
            session.on_logged_out();
        }
    }

    fn connection_error(&self, error: RemoteError) {
        if let Some(session) = self.session.upgrade() {
            session.on_connection_error(error);
        }
    }

    fn notify_main_thread(&self) {
        if let Some(session) = self.session.upgrade() {
            session.on_notify_main_thread();
        }
    }

    fn log_message(&self, message: &str) {
        debug!(target: REMOTE_LOG_TARGET, "{}", message.trim_end());
    }

    fn music_delivery(&self, format: DeliveryFormat, samples: &[i16]) -> usize {
        match self.session.upgrade().and_then(|s| s.audio_sink()) {
            Some(sink) => sink.on_frames_delivered(format, samples),
            None => 0,
        }
    }

    fn end_of_track(&self) {
        debug!("Player end of track");
        if let Some(sink) = self.session.upgrade().and_then(|s| s.audio_sink()) {
            sink.on_end_of_track();
        }
    }
}
