//! Remote Media Service
//!
//! The streaming service is reached through an opaque client library that
//! owns authentication, the catalog and audio decoding. This module describes
//! that library at the boundary the core needs:
//!
//! - [`RemoteService`] constructs a session and registers the
//!   [`SessionCallbacks`] the library will push notifications into.
//! - [`RemoteSession`] exposes session control, metadata lookups, the three
//!   asynchronous request constructors (search, artist browse, album browse),
//!   image fetches and the player.
//! - Every asynchronous request returns a [`RemoteRequest`] handle. Entity
//!   values delivered to a completion callback are snapshots and stay valid
//!   after the handle is released.
//!
//! # Callback context
//!
//! Callbacks may run on the library's own threads, concurrently with the event
//! pump and with consumer pulls. A completion callback may also run before the
//! request constructor returns. Implementations of [`SessionCallbacks`] and of
//! completion closures must therefore never assume they are on the pump thread
//! and must not hold locks that the request constructor's caller holds.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error codes reported by the remote library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteErrorCode {
    BadApiVersion,
    ApiInitializationFailed,
    BadApplicationKey,
    BadUsernameOrPassword,
    UserBanned,
    UnableToContactServer,
    ClientTooOld,
    UserNeedsPremium,
    TrackNotPlayable,
    ResourceNotLoaded,
    InvalidInData,
    IsLoading,
    NoSuchUser,
    OtherPermanent,
    OtherTransient,
}

impl RemoteErrorCode {
    /// Whether retrying needs different credentials.
    pub fn is_credentials_error(&self) -> bool {
        matches!(self, RemoteErrorCode::BadUsernameOrPassword)
    }

    /// Whether the same call may succeed later without user action.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteErrorCode::UnableToContactServer
                | RemoteErrorCode::OtherTransient
                | RemoteErrorCode::IsLoading
                | RemoteErrorCode::ResourceNotLoaded
        )
    }
}

impl fmt::Display for RemoteErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} ({code})")]
pub struct RemoteError {
    pub code: RemoteErrorCode,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: RemoteErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Parameters used to construct a remote session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSessionSettings {
    pub cache_location: PathBuf,
    pub settings_location: PathBuf,
    pub user_agent: String,
    /// Application key issued by the service. Never logged.
    pub application_key: Vec<u8>,
}

impl fmt::Debug for RemoteSessionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSessionSettings")
            .field("cache_location", &self.cache_location)
            .field("settings_location", &self.settings_location)
            .field("user_agent", &self.user_agent)
            .field("application_key", &"<redacted>")
            .finish()
    }
}

/// Per-category result caps applied to a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLimits {
    pub max_tracks: usize,
    pub max_albums: usize,
    pub max_artists: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_tracks: 100,
            max_albums: 50,
            max_artists: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub limits: SearchLimits,
}

/// Audio format of one delivery batch. Samples are interleaved signed 16-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryFormat {
    pub channels: u16,
    pub sample_rate: u32,
}

/// Opaque image reference (the service's image id bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(pub Vec<u8>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtist {
    pub uri: String,
    pub name: String,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAlbum {
    pub uri: String,
    pub name: String,
    pub year: Option<i32>,
    pub available: bool,
    pub artist: Option<RemoteArtist>,
    pub cover: Option<ImageId>,
}

impl RemoteAlbum {
    pub fn artist_name(&self) -> &str {
        self.artist.as_ref().map(|a| a.name.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub uri: String,
    pub name: String,
    pub duration_ms: u32,
    /// 0..=100
    pub popularity: u8,
    pub available: bool,
    pub loaded: bool,
    /// Position of the track on its disc, starting at 1.
    pub index: u32,
    pub album: Option<RemoteAlbum>,
    pub artists: Vec<RemoteArtist>,
}

impl RemoteTrack {
    pub fn first_artist_name(&self) -> &str {
        self.artists.first().map(|a| a.name.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    pub query: String,
    pub did_you_mean: Option<String>,
    pub artists: Vec<RemoteArtist>,
    pub albums: Vec<RemoteAlbum>,
    pub tracks: Vec<RemoteTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistBrowseResults {
    pub artist: RemoteArtist,
    pub albums: Vec<RemoteAlbum>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumBrowseResults {
    pub album: RemoteAlbum,
    pub tracks: Vec<RemoteTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePlaylist {
    pub name: String,
    pub loaded: bool,
    pub tracks: Vec<RemoteTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser {
    pub canonical_name: String,
    pub display_name: Option<String>,
    pub loaded: bool,
}

impl RemoteUser {
    /// Display name once the user record is loaded, canonical name before.
    pub fn preferred_name(&self) -> &str {
        match (&self.display_name, self.loaded) {
            (Some(display), true) => display,
            _ => &self.canonical_name,
        }
    }
}

pub type SearchCallback = Box<dyn FnOnce(Result<SearchResults, RemoteError>) + Send>;
pub type ArtistBrowseCallback = Box<dyn FnOnce(Result<ArtistBrowseResults, RemoteError>) + Send>;
pub type AlbumBrowseCallback = Box<dyn FnOnce(Result<AlbumBrowseResults, RemoteError>) + Send>;
pub type ImageCallback = Box<dyn FnOnce(Result<Bytes, RemoteError>) + Send>;

/// Handle to an in-flight remote request.
pub trait RemoteRequest: Send {
    /// Release the request. Its completion callback may still be running on
    /// another thread when this is called.
    fn release(self: Box<Self>);
}

/// Entry point of the remote library.
pub trait RemoteService: Send + Sync {
    /// Construct a session. `callbacks` receives every session notification
    /// for the lifetime of the returned session.
    fn create_session(
        &self,
        settings: &RemoteSessionSettings,
        callbacks: Arc<dyn SessionCallbacks>,
    ) -> Result<Arc<dyn RemoteSession>, RemoteError>;
}

/// A live session with the remote service.
pub trait RemoteSession: Send + Sync {
    /// Start logging in. The outcome arrives through
    /// [`SessionCallbacks::logged_in`].
    fn login(&self, username: &str, password: &str) -> Result<(), RemoteError>;

    fn logout(&self) -> Result<(), RemoteError>;

    /// Let the library do pending work. Returns how long until it wants to be
    /// called again.
    fn process_events(&self) -> Duration;

    /// The logged-in user, if any.
    fn user(&self) -> Option<RemoteUser>;

    fn lookup_artist(&self, uri: &str) -> Option<RemoteArtist>;

    fn lookup_album(&self, uri: &str) -> Option<RemoteAlbum>;

    fn lookup_track(&self, uri: &str) -> Option<RemoteTrack>;

    fn search(
        &self,
        request: &SearchRequest,
        done: SearchCallback,
    ) -> Result<Box<dyn RemoteRequest>, RemoteError>;

    fn browse_artist(
        &self,
        artist_uri: &str,
        done: ArtistBrowseCallback,
    ) -> Result<Box<dyn RemoteRequest>, RemoteError>;

    fn browse_album(
        &self,
        album_uri: &str,
        done: AlbumBrowseCallback,
    ) -> Result<Box<dyn RemoteRequest>, RemoteError>;

    fn load_image(
        &self,
        image: &ImageId,
        done: ImageCallback,
    ) -> Result<Box<dyn RemoteRequest>, RemoteError>;

    /// Snapshot of the user's playlist container.
    fn playlists(&self) -> Vec<RemotePlaylist>;

    fn player_load(&self, track_uri: &str) -> Result<(), RemoteError>;

    fn player_play(&self, play: bool) -> Result<(), RemoteError>;

    fn player_seek(&self, offset_ms: u32) -> Result<(), RemoteError>;

    fn player_unload(&self) -> Result<(), RemoteError>;
}

/// Notifications pushed by the remote library.
pub trait SessionCallbacks: Send + Sync {
    fn logged_in(&self, result: Result<(), RemoteError>);

    fn logged_out(&self);

    fn connection_error(&self, error: RemoteError);

    /// The library wants `process_events` to run as soon as possible.
    fn notify_main_thread(&self);

    fn log_message(&self, message: &str);

    /// A batch of interleaved samples. Returns the number of frames accepted;
    /// the library redelivers the rest later.
    fn music_delivery(&self, format: DeliveryFormat, samples: &[i16]) -> usize;

    fn end_of_track(&self);
}

/// Fetches images for the thumbnail pipeline.
///
/// Implemented by the session so that fetches go through the same connection
/// checks as every other remote call.
pub trait ImageFetcher: Send + Sync {
    fn fetch_image(
        &self,
        image: &ImageId,
        done: ImageCallback,
    ) -> Result<Box<dyn RemoteRequest>, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_bad_credentials_clear_credentials() {
        assert!(RemoteErrorCode::BadUsernameOrPassword.is_credentials_error());
        assert!(!RemoteErrorCode::UnableToContactServer.is_credentials_error());
        assert!(!RemoteErrorCode::UserBanned.is_credentials_error());
    }

    #[test]
    fn test_remote_error_display() {
        let err = RemoteError::new(RemoteErrorCode::UnableToContactServer, "Unable to contact server");
        assert_eq!(err.to_string(), "Unable to contact server (UnableToContactServer)");
    }

    #[test]
    fn test_preferred_name() {
        let mut user = RemoteUser {
            canonical_name: "jdoe".to_string(),
            display_name: Some("Jane Doe".to_string()),
            loaded: false,
        };
        assert_eq!(user.preferred_name(), "jdoe");

        user.loaded = true;
        assert_eq!(user.preferred_name(), "Jane Doe");
    }

    #[test]
    fn test_settings_debug_hides_key() {
        let settings = RemoteSessionSettings {
            cache_location: PathBuf::from("/tmp/cache"),
            settings_location: PathBuf::from("/tmp/settings"),
            user_agent: "spotbridge".to_string(),
            application_key: vec![1, 2, 3],
        };
        let debug = format!("{:?}", settings);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("[1, 2, 3]"));
    }

    #[test]
    fn test_default_search_limits() {
        let limits = SearchLimits::default();
        assert_eq!(limits.max_tracks, 100);
        assert_eq!(limits.max_albums, 50);
        assert_eq!(limits.max_artists, 50);
    }
}
