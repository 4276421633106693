use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Runtime error: {0}")]
    Runtime(core_runtime::Error),

    #[error("Session error: {0}")]
    Session(#[from] core_session::SessionError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Artwork error: {0}")]
    Artwork(#[from] core_metadata::ArtworkError),

    #[error("Browse error: {0}")]
    Browse(#[from] core_browse::BrowseError),
}

impl From<core_runtime::Error> for CoreError {
    fn from(err: core_runtime::Error) -> Self {
        match err {
            core_runtime::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            other => CoreError::Runtime(other),
        }
    }
}

impl From<core_session::LogoutError> for CoreError {
    fn from(err: core_session::LogoutError) -> Self {
        CoreError::Session(err.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
