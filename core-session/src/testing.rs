//! Scriptable in-memory stand-ins for the remote service and the host UI.
//!
//! Asynchronous requests (search, browse, image loads) are parked until the
//! test completes them, so completion order is under the test's control.

use bridge_traits::remote::{
    AlbumBrowseCallback, ArtistBrowseCallback, ImageCallback, SearchCallback,
};
use bridge_traits::{
    AlbumBrowseResults, ArtistBrowseResults, ImageId, Presenter, RemoteAlbum, RemoteArtist,
    RemoteError, RemotePlaylist, RemoteRequest, RemoteService, RemoteSession,
    RemoteSessionSettings, RemoteTrack, RemoteUser, SearchRequest, SearchResults,
    SessionCallbacks,
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn settings() -> RemoteSessionSettings {
    RemoteSessionSettings {
        cache_location: PathBuf::from("/tmp/spotbridge-test/cache"),
        settings_location: PathBuf::from("/tmp/spotbridge-test/settings"),
        user_agent: "spotbridge-test".to_string(),
        application_key: vec![1, 2, 3, 4],
    }
}

pub struct FakeRemoteService {
    session: Arc<FakeRemoteSession>,
    create_error: Mutex<Option<RemoteError>>,
    created: AtomicUsize,
}

impl FakeRemoteService {
    pub fn new() -> Self {
        Self {
            session: Arc::new(FakeRemoteSession::new()),
            create_error: Mutex::new(None),
            created: AtomicUsize::new(0),
        }
    }

    /// The single session every `create_session` call hands out.
    pub fn session(&self) -> Arc<FakeRemoteSession> {
        self.session.clone()
    }

    pub fn fail_create(&self, error: RemoteError) {
        *self.create_error.lock() = Some(error);
    }

    pub fn sessions_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl Default for FakeRemoteService {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteService for FakeRemoteService {
    fn create_session(
        &self,
        _settings: &RemoteSessionSettings,
        callbacks: Arc<dyn SessionCallbacks>,
    ) -> Result<Arc<dyn RemoteSession>, RemoteError> {
        if let Some(error) = self.create_error.lock().clone() {
            return Err(error);
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.session.callbacks.lock() = Some(callbacks);
        Ok(self.session.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCall {
    Load(String),
    Play(bool),
    Seek(u32),
    Unload,
}

/// Handle returned for every parked request. Counts releases.
struct FakeRequest {
    released: Arc<AtomicUsize>,
}

impl RemoteRequest for FakeRequest {
    fn release(self: Box<Self>) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeRemoteSession {
    callbacks: Mutex<Option<Arc<dyn SessionCallbacks>>>,
    logins: Mutex<Vec<String>>,
    login_error: Mutex<Option<RemoteError>>,
    logouts: AtomicUsize,
    process_calls: AtomicUsize,
    process_wait: Mutex<Duration>,
    user: Mutex<Option<RemoteUser>>,
    artists: Mutex<HashMap<String, RemoteArtist>>,
    albums: Mutex<HashMap<String, RemoteAlbum>>,
    tracks: Mutex<HashMap<String, RemoteTrack>>,
    playlists: Mutex<Vec<RemotePlaylist>>,
    searches: Mutex<VecDeque<(SearchRequest, SearchCallback)>>,
    search_requests: Mutex<Vec<SearchRequest>>,
    artist_browses: Mutex<VecDeque<(String, ArtistBrowseCallback)>>,
    album_browses: Mutex<VecDeque<(String, AlbumBrowseCallback)>>,
    images: Mutex<VecDeque<(ImageId, ImageCallback)>>,
    released: Arc<AtomicUsize>,
    player_calls: Mutex<Vec<PlayerCall>>,
    player_error: Mutex<Option<RemoteError>>,
}

impl FakeRemoteSession {
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(None),
            logins: Mutex::new(Vec::new()),
            login_error: Mutex::new(None),
            logouts: AtomicUsize::new(0),
            process_calls: AtomicUsize::new(0),
            process_wait: Mutex::new(Duration::from_millis(0)),
            user: Mutex::new(None),
            artists: Mutex::new(HashMap::new()),
            albums: Mutex::new(HashMap::new()),
            tracks: Mutex::new(HashMap::new()),
            playlists: Mutex::new(Vec::new()),
            searches: Mutex::new(VecDeque::new()),
            search_requests: Mutex::new(Vec::new()),
            artist_browses: Mutex::new(VecDeque::new()),
            album_browses: Mutex::new(VecDeque::new()),
            images: Mutex::new(VecDeque::new()),
            released: Arc::new(AtomicUsize::new(0)),
            player_calls: Mutex::new(Vec::new()),
            player_error: Mutex::new(None),
        }
    }

    /// The callbacks registered at session creation.
    ///
    /// Panics when no session was created yet.
    pub fn callbacks(&self) -> Arc<dyn SessionCallbacks> {
        self.callbacks
            .lock()
            .clone()
            .expect("remote session was never created")
    }

    pub fn logins(&self) -> Vec<String> {
        self.logins.lock().clone()
    }

    pub fn fail_login(&self, error: RemoteError) {
        *self.login_error.lock() = Some(error);
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub fn process_calls(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }

    pub fn set_process_wait(&self, wait: Duration) {
        *self.process_wait.lock() = wait;
    }

    pub fn set_user(&self, user: RemoteUser) {
        *self.user.lock() = Some(user);
    }

    pub fn add_artist(&self, artist: RemoteArtist) {
        self.artists.lock().insert(artist.uri.clone(), artist);
    }

    pub fn add_album(&self, album: RemoteAlbum) {
        self.albums.lock().insert(album.uri.clone(), album);
    }

    pub fn add_track(&self, track: RemoteTrack) {
        self.tracks.lock().insert(track.uri.clone(), track);
    }

    pub fn set_playlists(&self, playlists: Vec<RemotePlaylist>) {
        *self.playlists.lock() = playlists;
    }

    pub fn search_requests(&self) -> Vec<SearchRequest> {
        self.search_requests.lock().clone()
    }

    pub fn pending_searches(&self) -> usize {
        self.searches.lock().len()
    }

    /// Complete the oldest parked search. Returns `false` when none is parked.
    pub fn complete_search(&self, result: Result<SearchResults, RemoteError>) -> bool {
        let next = self.searches.lock().pop_front();
        match next {
            Some((_, done)) => {
                done(result);
                true
            }
            None => false,
        }
    }

    pub fn pending_artist_browses(&self) -> usize {
        self.artist_browses.lock().len()
    }

    pub fn complete_artist_browse(&self, result: Result<ArtistBrowseResults, RemoteError>) -> bool {
        let next = self.artist_browses.lock().pop_front();
        match next {
            Some((_, done)) => {
                done(result);
                true
            }
            None => false,
        }
    }

    pub fn pending_album_browses(&self) -> usize {
        self.album_browses.lock().len()
    }

    pub fn complete_album_browse(&self, result: Result<AlbumBrowseResults, RemoteError>) -> bool {
        let next = self.album_browses.lock().pop_front();
        match next {
            Some((_, done)) => {
                done(result);
                true
            }
            None => false,
        }
    }

    pub fn pending_images(&self) -> Vec<ImageId> {
        self.images.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn complete_image(&self, result: Result<Bytes, RemoteError>) -> bool {
        let next = self.images.lock().pop_front();
        match next {
            Some((_, done)) => {
                done(result);
                true
            }
            None => false,
        }
    }

    /// Number of request handles released so far.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn player_calls(&self) -> Vec<PlayerCall> {
        self.player_calls.lock().clone()
    }

    pub fn fail_player(&self, error: RemoteError) {
        *self.player_error.lock() = Some(error);
    }

    fn request(&self) -> Box<dyn RemoteRequest> {
        Box::new(FakeRequest {
            released: self.released.clone(),
        })
    }

    fn player(&self, call: PlayerCall) -> Result<(), RemoteError> {
        if let Some(error) = self.player_error.lock().clone() {
            return Err(error);
        }
        self.player_calls.lock().push(call);
        Ok(())
    }
}

impl Default for FakeRemoteSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteSession for FakeRemoteSession {
    fn login(&self, username: &str, _password: &str) -> Result<(), RemoteError> {
        self.logins.lock().push(username.to_string());
        match self.login_error.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn logout(&self) -> Result<(), RemoteError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn process_events(&self) -> Duration {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        *self.process_wait.lock()
    }

    fn user(&self) -> Option<RemoteUser> {
        self.user.lock().clone()
    }

    fn lookup_artist(&self, uri: &str) -> Option<RemoteArtist> {
        self.artists.lock().get(uri).cloned()
    }

    fn lookup_album(&self, uri: &str) -> Option<RemoteAlbum> {
        self.albums.lock().get(uri).cloned()
    }

    fn lookup_track(&self, uri: &str) -> Option<RemoteTrack> {
        self.tracks.lock().get(uri).cloned()
    }

    fn search(
        &self,
        request: &SearchRequest,
        done: SearchCallback,
    ) -> Result<Box<dyn RemoteRequest>, RemoteError> {
        self.search_requests.lock().push(request.clone());
        self.searches.lock().push_back((request.clone(), done));
        Ok(self.request())
    }

    fn browse_artist(
        &self,
        artist_uri: &str,
        done: ArtistBrowseCallback,
    ) -> Result<Box<dyn RemoteRequest>, RemoteError> {
        self.artist_browses
            .lock()
            .push_back((artist_uri.to_string(), done));
        Ok(self.request())
    }

    fn browse_album(
        &self,
        album_uri: &str,
        done: AlbumBrowseCallback,
    ) -> Result<Box<dyn RemoteRequest>, RemoteError> {
        self.album_browses
            .lock()
            .push_back((album_uri.to_string(), done));
        Ok(self.request())
    }

    fn load_image(
        &self,
        image: &ImageId,
        done: ImageCallback,
    ) -> Result<Box<dyn RemoteRequest>, RemoteError> {
        self.images.lock().push_back((image.clone(), done));
        Ok(self.request())
    }

    fn playlists(&self) -> Vec<RemotePlaylist> {
        self.playlists.lock().clone()
    }

    fn player_load(&self, track_uri: &str) -> Result<(), RemoteError> {
        self.player(PlayerCall::Load(track_uri.to_string()))
    }

    fn player_play(&self, play: bool) -> Result<(), RemoteError> {
        self.player(PlayerCall::Play(play))
    }

    fn player_seek(&self, offset_ms: u32) -> Result<(), RemoteError> {
        self.player(PlayerCall::Seek(offset_ms))
    }

    fn player_unload(&self) -> Result<(), RemoteError> {
        self.player(PlayerCall::Unload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressCall {
    Show { heading: String, message: String },
    Set(u8),
    Hide,
}

/// Presenter that records every call and answers from queued replies.
///
/// Unanswered confirms return `false`, unanswered prompts return `None`.
#[derive(Default)]
pub struct RecordingPresenter {
    connecting_shown: AtomicUsize,
    connecting_hidden: AtomicUsize,
    confirm_answers: Mutex<VecDeque<bool>>,
    text_answers: Mutex<VecDeque<String>>,
    confirms: Mutex<Vec<Vec<String>>>,
    prompts: Mutex<Vec<(String, bool)>>,
    progress: Mutex<Vec<ProgressCall>>,
    notifications: Mutex<Vec<(String, String)>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_confirm(&self, answer: bool) {
        self.confirm_answers.lock().push_back(answer);
    }

    pub fn answer_text(&self, answer: impl Into<String>) {
        self.text_answers.lock().push_back(answer.into());
    }

    pub fn connecting_shown(&self) -> usize {
        self.connecting_shown.load(Ordering::SeqCst)
    }

    pub fn connecting_hidden(&self) -> usize {
        self.connecting_hidden.load(Ordering::SeqCst)
    }

    pub fn last_confirm(&self) -> Option<Vec<String>> {
        self.confirms.lock().last().cloned()
    }

    pub fn confirms(&self) -> usize {
        self.confirms.lock().len()
    }

    pub fn prompts(&self) -> Vec<(String, bool)> {
        self.prompts.lock().clone()
    }

    pub fn progress(&self) -> Vec<ProgressCall> {
        self.progress.lock().clone()
    }

    /// Percentages passed to `set_progress`, in order.
    pub fn progress_values(&self) -> Vec<u8> {
        self.progress
            .lock()
            .iter()
            .filter_map(|call| match call {
                ProgressCall::Set(percent) => Some(*percent),
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().clone()
    }
}

impl Presenter for RecordingPresenter {
    fn show_connecting(&self, _message: &str) {
        self.connecting_shown.fetch_add(1, Ordering::SeqCst);
    }

    fn hide_connecting(&self) {
        self.connecting_hidden.fetch_add(1, Ordering::SeqCst);
    }

    fn show_progress(&self, heading: &str, message: &str) {
        self.progress.lock().push(ProgressCall::Show {
            heading: heading.to_string(),
            message: message.to_string(),
        });
    }

    fn set_progress(&self, percent: u8) {
        self.progress.lock().push(ProgressCall::Set(percent));
    }

    fn hide_progress(&self) {
        self.progress.lock().push(ProgressCall::Hide);
    }

    fn confirm(&self, _heading: &str, lines: &[String]) -> bool {
        self.confirms.lock().push(lines.to_vec());
        self.confirm_answers.lock().pop_front().unwrap_or(false)
    }

    fn notify(&self, heading: &str, message: &str) {
        self.notifications
            .lock()
            .push((heading.to_string(), message.to_string()));
    }

    fn request_text(&self, prompt: &str, secret: bool) -> Option<String> {
        self.prompts.lock().push((prompt.to_string(), secret));
        self.text_answers.lock().pop_front()
    }
}
