//! # Playback Error Types
//!
//! Buffer overflow is not an error: excess frames are declined and the
//! remote library slows its deliveries.

use core_session::SessionError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// No active remote session. A reconnect was started.
    #[error("Not connected to the remote service")]
    NotConnected,

    /// The track URI does not resolve to a track.
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// Attempted operation when no track is loaded.
    #[error("No track loaded")]
    TrackNotLoaded,

    #[error("Failed to load track into the player: {0}")]
    PlayerLoadFailed(String),

    #[error("Seek failed: {0}")]
    SeekFailed(String),

    #[error("Invalid audio buffer configuration: {0}")]
    InvalidBufferConfig(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl PlaybackError {
    /// Returns `true` if the operation may succeed when retried later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::NotConnected | PlaybackError::PlayerLoadFailed(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
