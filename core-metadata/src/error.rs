use thiserror::Error;

/// Thumbnail failures. These are logged and never surfaced to the user.
#[derive(Error, Debug)]
pub enum ArtworkError {
    #[error("Thumbnail fetch failed: {0}")]
    ThumbnailFetchFailed(String),

    #[error("Short write to {path}: {written} of {expected} bytes")]
    ShortWrite {
        path: String,
        written: usize,
        expected: usize,
    },

    #[error("No image reference for {0}")]
    NoImageReference(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, ArtworkError>;
