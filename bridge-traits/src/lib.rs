//! # Host Bridge Traits
//!
//! Capability traits the core needs from its host and from the remote media
//! service library.
//!
//! ## Overview
//!
//! The core is a bridge: a push-style, callback-driven remote service on one
//! side and a pull-style media player plus file-listing UI on the other.
//! Everything on either side of that bridge is reached through a trait in
//! this crate so that each host (and each test) can plug in its own.
//!
//! ## Traits
//!
//! ### Remote service
//! - [`RemoteService`](remote::RemoteService) - Session construction
//! - [`RemoteSession`](remote::RemoteSession) - Login, event processing, queries, player
//! - [`SessionCallbacks`](remote::SessionCallbacks) - Notifications pushed by the service
//! - [`ImageFetcher`](remote::ImageFetcher) - Image fetches for the thumbnail cache
//!
//! ### Host collaborators
//! - [`CatalogStore`](catalog::CatalogStore) - Local album/song database
//! - [`Presenter`](presentation::Presenter) - Dialogs, indicators, text input
//! - [`ListingPaths`](paths::ListingPaths) - Virtual filesystem path formats
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Thumbnail cache file I/O
//! - [`SecureStore`](storage::SecureStore) - Credential persistence
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for the event pump
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! let remote = builder.remote_service
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "RemoteService".to_string(),
//!         message: "No remote service client provided.".to_string(),
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. Remote callbacks can arrive on threads
//! the core does not control, and collaborators are shared between them and
//! the host's pump and playback threads.

pub mod catalog;
pub mod error;
pub mod paths;
pub mod presentation;
pub mod remote;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::{AlbumId, CatalogAlbum, CatalogSong, CatalogStore};
pub use paths::{ListingPaths, ListingTarget};
pub use presentation::Presenter;
pub use remote::{
    AlbumBrowseResults, ArtistBrowseResults, DeliveryFormat, ImageFetcher, ImageId, RemoteAlbum,
    RemoteArtist, RemoteError, RemoteErrorCode, RemotePlaylist, RemoteRequest, RemoteService,
    RemoteSession, RemoteSessionSettings, RemoteTrack, RemoteUser, SearchLimits, SearchRequest,
    SearchResults, SessionCallbacks,
};
pub use storage::{FileSystemAccess, SecureStore};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
