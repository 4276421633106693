use bridge_traits::{BridgeError, RemoteError, RemoteErrorCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Failed to create remote session: {0}")]
    SessionInit(RemoteError),

    #[error("Login failed: {message} ({code})")]
    Login {
        code: RemoteErrorCode,
        message: String,
    },

    #[error("Credentials unavailable: {0}")]
    Credentials(String),
}

impl ConnectError {
    /// The remote error behind this failure, if the remote service reported one.
    pub fn remote_error(&self) -> Option<RemoteError> {
        match self {
            ConnectError::SessionInit(err) => Some(err.clone()),
            ConnectError::Login { code, message } => Some(RemoteError::new(*code, message.clone())),
            ConnectError::Credentials(_) => None,
        }
    }
}

impl From<BridgeError> for ConnectError {
    fn from(err: BridgeError) -> Self {
        ConnectError::Credentials(err.to_string())
    }
}

#[derive(Error, Debug)]
#[error("Logout failed: {message} ({code})")]
pub struct LogoutError {
    pub code: RemoteErrorCode,
    pub message: String,
}

impl From<RemoteError> for LogoutError {
    fn from(err: RemoteError) -> Self {
        Self {
            code: err.code,
            message: err.message,
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Logout(#[from] LogoutError),

    #[error("Not connected to the remote service")]
    NotConnected,

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
