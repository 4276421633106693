use bridge_traits::DeliveryFormat;
use std::fmt;

/// Connection lifecycle of the remote session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// A login was issued and its outcome has not arrived yet.
    Connecting,
    LoggedIn,
    /// The last login or the connection failed. Retrying is always allowed.
    Failed(String),
}

impl ConnectionState {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, ConnectionState::LoggedIn)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::LoggedIn => "logged in",
            ConnectionState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Failed(reason) => write!(f, "failed: {}", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// Receiver of the audio the remote service pushes.
///
/// Called on the remote library's delivery thread.
pub trait AudioSink: Send + Sync {
    /// Accept as many frames of `samples` as fit. Returns the frame count
    /// accepted.
    fn on_frames_delivered(&self, format: DeliveryFormat, samples: &[i16]) -> usize;

    fn on_end_of_track(&self);
}
