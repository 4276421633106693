//! # Event Bus System
//!
//! Typed notifications from the bridge to the host UI, carried over a
//! `tokio::sync::broadcast` channel.
//!
//! ## Overview
//!
//! Remote callbacks never touch host UI state directly. They update shared
//! state and then publish a [`CoreEvent`]; the host drains its subscription on
//! its own schedule and refreshes the listing named in the event.
//!
//! ```text
//! ┌─────────────┐     emit      ┌───────────┐
//! │ Session     ├──────────────>│           │
//! └─────────────┘               │           │
//! ┌─────────────┐     emit      │ EventBus  │     subscribe    ┌────────────┐
//! │ Aggregator  ├──────────────>│ (broadcast├─────────────────>│ Host UI    │
//! └─────────────┘               │  channel) │                  └────────────┘
//! ┌─────────────┐     emit      │           │
//! │ Player      ├──────────────>│           │
//! └─────────────┘               └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{BrowseEvent, CoreEvent, EventBus};
//! use bridge_traits::paths::ListingTarget;
//!
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.publish(CoreEvent::Browse(BrowseEvent::ResultSetUpdated {
//!     target: ListingTarget::SearchMenu,
//! }));
//!
//! assert!(matches!(rx.try_recv(), Ok(CoreEvent::Browse(_))));
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events and can keep
//!   receiving.
//! - **`RecvError::Closed`**: every sender was dropped; the core shut down.

use bridge_traits::paths::ListingTarget;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tracing::trace;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Session(SessionEvent),
    Browse(BrowseEvent),
    Playback(PlaybackEvent),
    Artwork(ArtworkEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Session(e) => e.description(),
            CoreEvent::Browse(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Artwork(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Session(SessionEvent::ConnectionFailed { recoverable: false, .. }) => {
                EventSeverity::Error
            }
            CoreEvent::Session(SessionEvent::ConnectionFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Browse(BrowseEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Session(SessionEvent::LoggedIn { .. })
            | CoreEvent::Browse(BrowseEvent::ResultSetUpdated { .. })
            | CoreEvent::Playback(PlaybackEvent::Loaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Session Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// A login was started.
    Connecting,
    /// Login completed. `user` is the display name when known.
    LoggedIn { user: String },
    LoggedOut,
    /// Session construction, login or the connection itself failed.
    ConnectionFailed {
        message: String,
        /// Whether a retry is offered.
        recoverable: bool,
    },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::Connecting => "Connecting to remote service",
            SessionEvent::LoggedIn { .. } => "Logged in",
            SessionEvent::LoggedOut => "Logged out",
            SessionEvent::ConnectionFailed { .. } => "Connection failed",
        }
    }
}

// ============================================================================
// Browse Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum BrowseEvent {
    Started { target: ListingTarget },
    /// Processing progress, never above 99.
    Progress { target: ListingTarget, percent: u8 },
    /// The listing for `target` has new content and should be refreshed.
    ResultSetUpdated { target: ListingTarget },
    Failed { target: ListingTarget, message: String },
}

impl BrowseEvent {
    fn description(&self) -> &str {
        match self {
            BrowseEvent::Started { .. } => "Query started",
            BrowseEvent::Progress { .. } => "Processing results",
            BrowseEvent::ResultSetUpdated { .. } => "Result set updated",
            BrowseEvent::Failed { .. } => "Query failed",
        }
    }

    pub fn target(&self) -> &ListingTarget {
        match self {
            BrowseEvent::Started { target }
            | BrowseEvent::Progress { target, .. }
            | BrowseEvent::ResultSetUpdated { target }
            | BrowseEvent::Failed { target, .. } => target,
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    Loaded { track_uri: String, duration_secs: u32 },
    Unloaded,
    /// The producer finished the track; buffered audio may still be draining.
    EndOfTrack { track_uri: String },
    Seeked { offset_secs: u32 },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loaded { .. } => "Track loaded",
            PlaybackEvent::Unloaded => "Player unloaded",
            PlaybackEvent::EndOfTrack { .. } => "End of track",
            PlaybackEvent::Seeked { .. } => "Seeked",
        }
    }
}

// ============================================================================
// Artwork Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ArtworkEvent {
    /// A thumbnail was written to the cache.
    ThumbnailReady { path: String },
}

impl ArtworkEvent {
    fn description(&self) -> &str {
        match self {
            ArtworkEvent::ThumbnailReady { .. } => "Thumbnail ready",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every clone publishes into the same
/// channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus. Subscribers that fall more than `capacity`
    /// events behind receive `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Publishes an event, treating "no subscribers" as fine.
    pub fn publish(&self, event: CoreEvent) {
        if let Err(SendError(event)) = self.sender.send(event) {
            trace!(event = event.description(), "No subscribers for event");
        }
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let browse_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Browse(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`/`try_recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
