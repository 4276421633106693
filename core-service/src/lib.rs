//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided capabilities of a
//! [`CoreConfig`] into the session, the player, the thumbnail pipeline and
//! the result aggregator. Desktop hosts typically enable the `desktop-shims`
//! feature so that the filesystem, secure store and listing paths default to
//! the `bridge-desktop` implementations.
//!
//! The host drives [`CoreService::tick`] from its UI thread and listens on
//! [`CoreService::subscribe`] for the notifications the components publish.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::SearchLimits;
use core_browse::{ResetScope, ResultAggregator};
use core_metadata::{ThumbnailCache, ThumbnailPipeline};
use core_playback::Player;
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use core_runtime::logging::{init_logging, LoggingConfig};
use core_session::Session;
use tracing::{info, warn};

/// Primary façade exposed to host applications.
pub struct CoreService {
    events: EventBus,
    session: Arc<Session>,
    player: Arc<Player>,
    thumbnails: Arc<ThumbnailPipeline>,
    aggregator: ResultAggregator,
    search_limits: SearchLimits,
}

impl CoreService {
    /// Build every component from the validated configuration.
    ///
    /// No remote session is created yet; the first query or an explicit
    /// [`Session::connect`] does that.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let session = Session::new(
            config.remote_service.clone(),
            config.session.clone(),
            config.presenter.clone(),
            config.secure_store.clone(),
            config.clock.clone(),
            events.clone(),
        );

        let player = Player::new(session.clone(), config.audio_buffer)?;

        let cache = ThumbnailCache::new(config.thumbnail_root.clone(), config.file_system.clone());
        let thumbnails = Arc::new(ThumbnailPipeline::new(
            cache,
            session.clone(),
            events.clone(),
        ));

        let aggregator = ResultAggregator::new(
            session.clone(),
            config.presenter.clone(),
            config.catalog.clone(),
            config.listing_paths.clone(),
            thumbnails.clone(),
        );

        info!(
            thumbnail_root = %config.thumbnail_root.display(),
            catalog = config.catalog.is_some(),
            "Core service initialized"
        );

        Ok(Self {
            events,
            session,
            player,
            thumbnails,
            aggregator,
            search_limits: config.search_limits,
        })
    }

    /// Install the tracing subscriber, then build the service.
    pub fn bootstrap(config: CoreConfig, logging: LoggingConfig) -> Result<Self> {
        init_logging(logging)?;
        Self::new(config)
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    pub fn thumbnails(&self) -> &Arc<ThumbnailPipeline> {
        &self.thumbnails
    }

    pub fn aggregator(&self) -> &ResultAggregator {
        &self.aggregator
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Search with the configured limits.
    pub fn search(&self, query: &str) -> Result<()> {
        Ok(self.aggregator.search(query, self.search_limits)?)
    }

    /// Run one event pump pass. Call from the host's UI thread.
    pub fn tick(&self) {
        self.session.tick();
    }

    /// Stop playback, log out and clear every result set and thumbnail
    /// directory.
    pub fn shutdown(&self) -> Result<()> {
        // A deferred load holds an instance without a running player
        while self.player.current().is_some() {
            self.player.unload()?;
        }

        let logout = self.session.disconnect();
        if let Err(e) = &logout {
            warn!(error = %e, "Logout during shutdown failed");
        }

        self.aggregator.reset(ResetScope::All);
        info!("Core service shut down");
        Ok(logout?)
    }
}
