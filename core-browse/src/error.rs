use bridge_traits::BridgeError;
use core_session::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowseError {
    /// No active remote session. A reconnect was started.
    #[error("Not connected to the remote service")]
    NotConnected,

    #[error("URI does not resolve: {0}")]
    InvalidUri(String),

    #[error("Remote query failed: {0}")]
    RemoteQueryFailed(String),

    #[error("No album tracks to add")]
    NothingToAdd,

    #[error("Catalog error: {0}")]
    Catalog(#[from] BridgeError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

pub type Result<T> = std::result::Result<T, BrowseError>;
