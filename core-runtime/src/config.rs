//! # Core Configuration Module
//!
//! Provides configuration management for the bridge core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds every collaborator and setting the core needs. It
//! enforces fail-fast validation so a missing capability or an invalid
//! setting is reported before any session is created.
//!
//! ## Required Dependencies
//!
//! - `RemoteService` - The remote media service client
//! - `Presenter` - Host dialogs and indicators
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `SecureStore` - Credential persistence (desktop default: keyring or in-memory)
//! - `FileSystemAccess` - Thumbnail cache I/O (desktop default: `std::fs`)
//! - `ListingPaths` - Virtual path formats (desktop default: `musicdb://`)
//! - `CatalogStore` - Local catalog; without it catalog-first resolution is skipped
//! - `Clock` - Time source (default: system clock)
//!
//! When the `desktop-shims` feature is enabled, the desktop defaults are
//! injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .remote_service(Arc::new(MyRemoteService))
//!     .presenter(Arc::new(MyPresenter))
//!     .application_key(include_bytes!("appkey.key").to_vec())
//!     .user_agent("spotbridge")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    CatalogStore, Clock, FileSystemAccess, ListingPaths, Presenter, RemoteService,
    RemoteSessionSettings, SearchLimits, SecureStore, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Frames per delivery the remote library sends at most.
const FRAMES_PER_DELIVERY: usize = 2048;

/// Default audio buffer: five full stereo 16-bit deliveries.
pub const DEFAULT_AUDIO_BUFFER_BYTES: usize = FRAMES_PER_DELIVERY * 2 * 2 * 5;

const MAX_USER_AGENT_LEN: usize = 255;

/// Sizing of the audio delivery buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioBufferConfig {
    /// Bytes the buffer holds.
    pub capacity_bytes: usize,
    /// Buffered bytes at which the consumer may start draining.
    pub start_threshold_bytes: usize,
}

impl Default for AudioBufferConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: DEFAULT_AUDIO_BUFFER_BYTES,
            start_threshold_bytes: DEFAULT_AUDIO_BUFFER_BYTES,
        }
    }
}

impl AudioBufferConfig {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            capacity_bytes,
            start_threshold_bytes: capacity_bytes,
        }
    }

    pub fn with_start_threshold(mut self, bytes: usize) -> Self {
        self.start_threshold_bytes = bytes;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity_bytes == 0 {
            return Err(Error::Config(
                "Audio buffer capacity must be greater than 0 bytes".to_string(),
            ));
        }

        // One stereo 16-bit frame is 4 bytes
        if self.capacity_bytes % 4 != 0 {
            return Err(Error::Config(format!(
                "Audio buffer capacity must be a multiple of 4 bytes, got {}",
                self.capacity_bytes
            )));
        }

        if self.start_threshold_bytes > self.capacity_bytes {
            return Err(Error::Config(format!(
                "Audio buffer start threshold ({}) exceeds capacity ({})",
                self.start_threshold_bytes, self.capacity_bytes
            )));
        }

        Ok(())
    }
}

/// Core configuration for the bridge.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Remote media service client (required)
    pub remote_service: Arc<dyn RemoteService>,

    /// Host dialogs and indicators (required)
    pub presenter: Arc<dyn Presenter>,

    pub secure_store: Arc<dyn SecureStore>,

    pub file_system: Arc<dyn FileSystemAccess>,

    pub listing_paths: Arc<dyn ListingPaths>,

    /// Local catalog (optional)
    pub catalog: Option<Arc<dyn CatalogStore>>,

    pub clock: Arc<dyn Clock>,

    /// Settings passed to the remote session constructor
    pub session: RemoteSessionSettings,

    pub search_limits: SearchLimits,

    pub audio_buffer: AudioBufferConfig,

    /// Directory holding the four thumbnail category directories
    pub thumbnail_root: PathBuf,

    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("remote_service", &"RemoteService { ... }")
            .field("presenter", &"Presenter { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("listing_paths", &"ListingPaths { ... }")
            .field(
                "catalog",
                &self.catalog.as_ref().map(|_| "CatalogStore { ... }"),
            )
            .field("session", &self.session)
            .field("search_limits", &self.search_limits)
            .field("audio_buffer", &self.audio_buffer)
            .field("thumbnail_root", &self.thumbnail_root)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - User agent is 1 to 255 characters
    /// - Application key is present
    /// - Search limits are non-zero
    /// - Audio buffer sizing is consistent
    /// - Thumbnail root and event buffer size are set
    pub fn validate(&self) -> Result<()> {
        let agent_len = self.session.user_agent.chars().count();
        if agent_len == 0 || agent_len > MAX_USER_AGENT_LEN {
            return Err(Error::Config(format!(
                "User agent must be 1 to {} characters, got {}",
                MAX_USER_AGENT_LEN, agent_len
            )));
        }

        if self.session.application_key.is_empty() {
            return Err(Error::Config(
                "Application key cannot be empty. Use .application_key() to set it.".to_string(),
            ));
        }

        let limits = &self.search_limits;
        if limits.max_tracks == 0 || limits.max_albums == 0 || limits.max_artists == 0 {
            return Err(Error::Config(
                "Search limits must be greater than 0".to_string(),
            ));
        }

        self.audio_buffer.validate()?;

        if self.thumbnail_root.as_os_str().is_empty() {
            return Err(Error::Config("Thumbnail root cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn remote_service_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "RemoteService".to_string(),
        message: "A remote service client is required to create sessions. \
                 Inject the host's binding of the streaming library with .remote_service()."
            .to_string(),
    }
}

fn presenter_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "Presenter".to_string(),
        message: "A Presenter is required for connection dialogs and progress indicators. \
                 Inject the host UI adapter with .presenter()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    #[cfg(feature = "keyring-store")]
    let store: Arc<dyn SecureStore> = Arc::new(bridge_desktop::KeyringSecureStore::new());
    #[cfg(not(feature = "keyring-store"))]
    let store: Arc<dyn SecureStore> = Arc::new(bridge_desktop::MemorySecureStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "SecureStore implementation is required for credential persistence. \
                 Desktop: enable the 'desktop-shims' feature to use the default store."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system(root: &std::path::Path) -> Result<Arc<dyn FileSystemAccess>> {
    let fs: Arc<dyn FileSystemAccess> =
        Arc::new(bridge_desktop::StdFileSystem::with_temp_root(root.to_path_buf()));
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system(_root: &std::path::Path) -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for the thumbnail cache. \
                 Desktop: enable the 'desktop-shims' feature to use std::fs."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_listing_paths() -> Result<Arc<dyn ListingPaths>> {
    let paths: Arc<dyn ListingPaths> = Arc::new(bridge_desktop::MusicDbPaths);
    Ok(paths)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_listing_paths() -> Result<Arc<dyn ListingPaths>> {
    Err(Error::CapabilityMissing {
        capability: "ListingPaths".to_string(),
        message: "ListingPaths implementation is required to address host listings. \
                 Desktop: enable the 'desktop-shims' feature to use musicdb:// paths."
            .to_string(),
    })
}

fn default_thumbnail_root() -> PathBuf {
    std::env::temp_dir().join("spotbridge")
}

/// Builder for constructing a [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    remote_service: Option<Arc<dyn RemoteService>>,
    presenter: Option<Arc<dyn Presenter>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    listing_paths: Option<Arc<dyn ListingPaths>>,
    catalog: Option<Arc<dyn CatalogStore>>,
    clock: Option<Arc<dyn Clock>>,
    cache_location: Option<PathBuf>,
    settings_location: Option<PathBuf>,
    user_agent: Option<String>,
    application_key: Option<Vec<u8>>,
    search_limits: Option<SearchLimits>,
    audio_buffer: Option<AudioBufferConfig>,
    thumbnail_root: Option<PathBuf>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    pub fn remote_service(mut self, service: Arc<dyn RemoteService>) -> Self {
        self.remote_service = Some(service);
        self
    }

    pub fn presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn listing_paths(mut self, paths: Arc<dyn ListingPaths>) -> Self {
        self.listing_paths = Some(paths);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn CatalogStore>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Directory the remote library keeps its cache in.
    ///
    /// Default: `<thumbnail root>/cache`
    pub fn cache_location<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_location = Some(path.into());
        self
    }

    /// Directory the remote library keeps its settings in.
    ///
    /// Default: `<thumbnail root>/settings`
    pub fn settings_location<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_location = Some(path.into());
        self
    }

    /// Default: `"spotbridge"`
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn application_key(mut self, key: Vec<u8>) -> Self {
        self.application_key = Some(key);
        self
    }

    /// Default: 100 tracks, 50 albums, 50 artists
    pub fn search_limits(mut self, limits: SearchLimits) -> Self {
        self.search_limits = Some(limits);
        self
    }

    pub fn audio_buffer(mut self, config: AudioBufferConfig) -> Self {
        self.audio_buffer = Some(config);
        self
    }

    /// Default: `<system temp>/spotbridge`
    pub fn thumbnail_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.thumbnail_root = Some(path.into());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if a required capability is missing (and has no
    /// platform default) or if a setting is invalid.
    pub fn build(self) -> Result<CoreConfig> {
        let remote_service = self
            .remote_service
            .ok_or_else(remote_service_missing_error)?;
        let presenter = self.presenter.ok_or_else(presenter_missing_error)?;

        let thumbnail_root = self.thumbnail_root.unwrap_or_else(default_thumbnail_root);

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system(&thumbnail_root)?,
        };

        let listing_paths = match self.listing_paths {
            Some(paths) => paths,
            None => provide_default_listing_paths()?,
        };

        let session = RemoteSessionSettings {
            cache_location: self
                .cache_location
                .unwrap_or_else(|| thumbnail_root.join("cache")),
            settings_location: self
                .settings_location
                .unwrap_or_else(|| thumbnail_root.join("settings")),
            user_agent: self.user_agent.unwrap_or_else(|| "spotbridge".to_string()),
            application_key: self.application_key.unwrap_or_default(),
        };

        let config = CoreConfig {
            remote_service,
            presenter,
            secure_store,
            file_system,
            listing_paths,
            catalog: self.catalog,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            session,
            search_limits: self.search_limits.unwrap_or_default(),
            audio_buffer: self.audio_buffer.unwrap_or_default(),
            thumbnail_root,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
