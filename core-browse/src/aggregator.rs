//! # Result Aggregator
//!
//! Runs one remote query at a time (search, artist browse or album browse)
//! and turns its results into view items.
//!
//! ## Overview
//!
//! Starting a query takes the in-flight slot: the previous request is
//! released and the result sets the new query replaces are cleared. Each
//! query gets a fresh [`QueryEpoch`]; a completion whose epoch no longer
//! owns the slot is dropped without touching results. Its progress reporter
//! is tied to the same epoch, so a query superseded halfway through its
//! conversion cannot move or hide the newer query's indicator.
//!
//! Completions are invoked by the remote library, possibly on its own thread
//! and possibly before the request constructor returns. No aggregator lock is
//! held while a remote call or a catalog lookup runs.
//!
//! ## Usage
//!
//! ```ignore
//! let aggregator = ResultAggregator::new(session, presenter, catalog, paths, thumbnails);
//! aggregator.search("the killers", SearchLimits::default())?;
//!
//! // Later, after `BrowseEvent::ResultSetUpdated { target: SearchMenu }`
//! let results = aggregator.search_results();
//! ```

use crate::error::{BrowseError, Result};
use crate::progress::{IndicatorOwner, ProgressReporter};
use crate::query::{
    AlbumResultSet, ArtistResultSet, InFlight, QueryEpoch, QueryKind, ResetScope, ResultSets,
    SearchResultSet,
};
use bridge_traits::{
    AlbumBrowseResults, ArtistBrowseResults, CatalogStore, ListingPaths, ListingTarget, Presenter,
    RemoteAlbum, RemoteError, RemoteSession, RemoteTrack, SearchLimits, SearchRequest,
    SearchResults,
};
use core_metadata::items::{
    album_item, artist_item, catalog_album_item, playlist_item, track_item,
};
use core_metadata::{ThumbnailCategory, ThumbnailPipeline, ViewItem};
use core_runtime::events::EventBus;
use core_session::Session;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument, warn};

/// Progress after the remote results arrived and before conversion.
const PROGRESS_RESULTS_RECEIVED: u8 = 50;
const PROGRESS_ARTISTS_DONE: u8 = 60;
const PROGRESS_ALBUMS_DONE: u8 = 80;
const PROGRESS_STEP: u8 = 5;

struct AggregatorState {
    in_flight: Option<InFlight>,
    results: ResultSets,
}

pub(crate) struct AggregatorInner {
    pub(crate) session: Arc<Session>,
    pub(crate) presenter: Arc<dyn Presenter>,
    pub(crate) catalog: Option<Arc<dyn CatalogStore>>,
    pub(crate) paths: Arc<dyn ListingPaths>,
    pub(crate) thumbnails: Arc<ThumbnailPipeline>,
    events: EventBus,
    indicator: IndicatorOwner,
    next_epoch: AtomicU64,
    state: Mutex<AggregatorState>,
}

#[derive(Clone)]
pub struct ResultAggregator {
    pub(crate) inner: Arc<AggregatorInner>,
}

impl ResultAggregator {
    /// Create the aggregator and perform a full reset of the thumbnail
    /// directories.
    pub fn new(
        session: Arc<Session>,
        presenter: Arc<dyn Presenter>,
        catalog: Option<Arc<dyn CatalogStore>>,
        paths: Arc<dyn ListingPaths>,
        thumbnails: Arc<ThumbnailPipeline>,
    ) -> Self {
        let events = session.events().clone();
        let aggregator = Self {
            inner: Arc::new(AggregatorInner {
                session,
                presenter,
                catalog,
                paths,
                thumbnails,
                events,
                indicator: IndicatorOwner::new(),
                next_epoch: AtomicU64::new(0),
                state: Mutex::new(AggregatorState {
                    in_flight: None,
                    results: ResultSets::default(),
                }),
            }),
        };
        aggregator.reset(ResetScope::All);
        aggregator
    }

    /// Search artists, albums and tracks.
    ///
    /// Results are published under [`ListingTarget::SearchMenu`].
    #[instrument(skip(self, limits))]
    pub fn search(&self, query: &str, limits: SearchLimits) -> Result<()> {
        let handle = self.connected()?;
        let target = ListingTarget::SearchMenu;
        let epoch = self.inner.begin(QueryKind::Search, target.clone());
        let progress = self.start_progress(epoch, target, &format!("Searching for {}", query));

        let request = SearchRequest {
            query: query.to_string(),
            limits,
        };
        let inner = Arc::downgrade(&self.inner);
        let done = Box::new(move |result: std::result::Result<SearchResults, RemoteError>| {
            if let Some(inner) = Weak::upgrade(&inner) {
                inner.complete_search(epoch, limits, result);
            }
        });

        match handle.search(&request, done) {
            Ok(remote) => {
                self.inner.attach(epoch, remote);
                Ok(())
            }
            Err(e) => Err(self.inner.abandon(epoch, progress, e)),
        }
    }

    /// Browse the albums of an artist.
    #[instrument(skip(self))]
    pub fn browse_artist(&self, artist_uri: &str) -> Result<()> {
        let handle = self.connected()?;
        let artist = handle
            .lookup_artist(artist_uri)
            .ok_or_else(|| BrowseError::InvalidUri(artist_uri.to_string()))?;

        let target = ListingTarget::Artist(artist_uri.to_string());
        let epoch = self.inner.begin(QueryKind::ArtistBrowse, target.clone());
        let progress =
            self.start_progress(epoch, target, &format!("Browsing albums from {}", artist.name));

        let uri = artist_uri.to_string();
        let inner = Arc::downgrade(&self.inner);
        let done = Box::new(
            move |result: std::result::Result<ArtistBrowseResults, RemoteError>| {
                if let Some(inner) = Weak::upgrade(&inner) {
                    inner.complete_artist_browse(epoch, uri, result);
                }
            },
        );

        match handle.browse_artist(artist_uri, done) {
            Ok(remote) => {
                self.inner.attach(epoch, remote);
                Ok(())
            }
            Err(e) => Err(self.inner.abandon(epoch, progress, e)),
        }
    }

    /// Browse the tracks of an album.
    #[instrument(skip(self))]
    pub fn browse_album(&self, album_uri: &str) -> Result<()> {
        let handle = self.connected()?;
        let album = handle
            .lookup_album(album_uri)
            .ok_or_else(|| BrowseError::InvalidUri(album_uri.to_string()))?;

        let target = ListingTarget::Album(album_uri.to_string());
        let epoch = self.inner.begin(QueryKind::AlbumBrowse, target.clone());
        let progress = self.start_progress(epoch, target, &format!("Browsing tracks from {}", album.name));

        let uri = album_uri.to_string();
        let inner = Arc::downgrade(&self.inner);
        let done = Box::new(
            move |result: std::result::Result<AlbumBrowseResults, RemoteError>| {
                if let Some(inner) = Weak::upgrade(&inner) {
                    inner.complete_album_browse(epoch, uri, result);
                }
            },
        );

        match handle.browse_album(album_uri, done) {
            Ok(remote) => {
                self.inner.attach(epoch, remote);
                Ok(())
            }
            Err(e) => Err(self.inner.abandon(epoch, progress, e)),
        }
    }

    /// The user's playlists, in container order.
    pub fn playlists(&self) -> Result<Vec<Arc<ViewItem>>> {
        let handle = self.connected()?;
        let paths = self.inner.paths.as_ref();

        Ok(handle
            .playlists()
            .iter()
            .enumerate()
            .map(|(index, playlist)| Arc::new(playlist_item(index, playlist, paths)))
            .collect())
    }

    /// Available tracks of the playlist at `index`. An index past the end of
    /// the container yields an empty listing.
    pub fn playlist_tracks(&self, index: usize) -> Result<Vec<Arc<ViewItem>>> {
        let handle = self.connected()?;
        let Some(playlist) = handle.playlists().into_iter().nth(index) else {
            debug!(index, "Playlist index out of range");
            return Ok(Vec::new());
        };

        Ok(playlist
            .tracks
            .iter()
            .filter(|track| track.available)
            .map(|track| self.inner.track_view(track, ThumbnailCategory::Playlist))
            .collect())
    }

    pub fn search_results(&self) -> SearchResultSet {
        self.inner.state.lock().results.search.clone()
    }

    pub fn did_you_mean(&self) -> Option<String> {
        self.inner.state.lock().results.search.did_you_mean.clone()
    }

    pub fn artist_albums(&self) -> ArtistResultSet {
        self.inner.state.lock().results.artist.clone()
    }

    pub fn album_tracks(&self) -> AlbumResultSet {
        self.inner.state.lock().results.album.clone()
    }

    /// Whether a started query has not completed yet.
    pub fn is_in_flight(&self) -> bool {
        self.inner
            .state
            .lock()
            .in_flight
            .as_ref()
            .is_some_and(|flight| !flight.finished)
    }

    /// Kind of the query owning the in-flight slot, finished or not.
    pub fn current_kind(&self) -> Option<QueryKind> {
        self.inner.state.lock().in_flight.as_ref().map(|flight| flight.kind)
    }

    /// Release the in-flight request, hide its progress indicator and clear
    /// what `scope` covers.
    #[instrument(skip(self))]
    pub fn reset(&self, scope: ResetScope) {
        let previous = {
            let mut state = self.inner.state.lock();
            state.results.clear(scope);
            state.in_flight.take()
        };
        if let Some(previous) = previous {
            debug!(kind = %previous.kind, "Releasing in-flight request");
            previous.release();
        }
        self.inner.indicator.withdraw(self.inner.presenter.as_ref());
        self.inner.reset_thumbnails(scope);
    }

    pub(crate) fn connected(&self) -> Result<Arc<dyn RemoteSession>> {
        if !self.inner.session.reconnect(false) {
            return Err(BrowseError::NotConnected);
        }
        self.inner
            .session
            .remote_session()
            .ok_or(BrowseError::NotConnected)
    }

    fn start_progress(
        &self,
        epoch: QueryEpoch,
        target: ListingTarget,
        message: &str,
    ) -> ProgressReporter {
        ProgressReporter::start(
            self.inner.presenter.clone(),
            self.inner.events.clone(),
            self.inner.indicator.clone(),
            epoch,
            target,
            message,
        )
    }
}

impl AggregatorInner {
    /// Take the in-flight slot for a new query.
    fn begin(&self, kind: QueryKind, target: ListingTarget) -> QueryEpoch {
        let epoch = self.next_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.indicator.claim(epoch);
        let previous = {
            let mut state = self.state.lock();
            state.results.clear(kind.into());
            state.in_flight.replace(InFlight {
                kind,
                target,
                epoch,
                request: None,
                finished: false,
            })
        };

        if let Some(previous) = previous {
            debug!(kind = %previous.kind, superseded_by = %kind, "Releasing previous request");
            previous.release();
        }
        self.reset_thumbnails(kind.into());
        epoch
    }

    /// Store the request handle, unless a newer query took the slot while
    /// the request was being constructed.
    fn attach(&self, epoch: QueryEpoch, remote: Box<dyn bridge_traits::RemoteRequest>) {
        let stale = {
            let mut state = self.state.lock();
            match state.in_flight.as_mut() {
                Some(flight) if flight.epoch == epoch && flight.request.is_none() => {
                    flight.request = Some(remote);
                    None
                }
                _ => Some(remote),
            }
        };
        if let Some(remote) = stale {
            debug!(epoch, "Query superseded before its request was stored");
            remote.release();
        }
    }

    /// The remote call could not be issued: free the slot and hide progress.
    fn abandon(&self, epoch: QueryEpoch, progress: ProgressReporter, error: RemoteError) -> BrowseError {
        {
            let mut state = self.state.lock();
            if state.in_flight.as_ref().is_some_and(|f| f.epoch == epoch) {
                state.in_flight = None;
            }
        }
        warn!(error = %error, "Remote query could not be started");
        progress.fail(error.to_string());
        BrowseError::RemoteQueryFailed(error.to_string())
    }

    fn is_current(&self, epoch: QueryEpoch) -> bool {
        self.state
            .lock()
            .in_flight
            .as_ref()
            .is_some_and(|flight| flight.epoch == epoch && !flight.finished)
    }

    /// Apply `update` and mark the query finished if it still owns the slot.
    fn publish(&self, epoch: QueryEpoch, update: impl FnOnce(&mut ResultSets)) -> bool {
        let mut state = self.state.lock();
        let AggregatorState { in_flight, results } = &mut *state;
        match in_flight.as_mut() {
            Some(flight) if flight.epoch == epoch && !flight.finished => {
                flight.finished = true;
                update(results);
                true
            }
            _ => false,
        }
    }

    fn finish_failed(&self, epoch: QueryEpoch) {
        if let Some(flight) = self.state.lock().in_flight.as_mut() {
            if flight.epoch == epoch {
                flight.finished = true;
            }
        }
    }

    /// Reporter for a completion of query `epoch`; it goes quiet once a
    /// newer query shows its own indicator.
    fn progress(&self, epoch: QueryEpoch, target: ListingTarget) -> ProgressReporter {
        ProgressReporter::resume(
            self.presenter.clone(),
            self.events.clone(),
            self.indicator.clone(),
            epoch,
            target,
        )
    }

    fn complete_search(
        &self,
        epoch: QueryEpoch,
        limits: SearchLimits,
        result: std::result::Result<SearchResults, RemoteError>,
    ) {
        if !self.is_current(epoch) {
            debug!(epoch, "Discarding stale search completion");
            return;
        }
        let mut progress = self.progress(epoch, ListingTarget::SearchMenu);

        let results = match result {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "Search failed");
                self.finish_failed(epoch);
                progress.fail(e.to_string());
                return;
            }
        };
        progress.set(PROGRESS_RESULTS_RECEIVED);

        let paths = self.paths.as_ref();
        let artists: Vec<_> = results
            .artists
            .iter()
            .filter(|artist| artist.available)
            .take(limits.max_artists)
            .map(|artist| Arc::new(artist_item(artist, paths)))
            .collect();
        progress.set(PROGRESS_ARTISTS_DONE);

        let albums: Vec<_> = results
            .albums
            .iter()
            .filter(|album| album.available)
            .take(limits.max_albums)
            .map(|album| self.album_view(album, ThumbnailCategory::Search))
            .collect();
        progress.set(PROGRESS_ALBUMS_DONE);

        let tracks: Vec<_> = results
            .tracks
            .iter()
            .filter(|track| track.available)
            .take(limits.max_tracks)
            .map(|track| self.track_view(track, ThumbnailCategory::Search))
            .collect();
        progress.set(crate::progress::PROGRESS_CEILING);

        let counts = (artists.len(), albums.len(), tracks.len());
        let published = self.publish(epoch, |sets| {
            sets.search = SearchResultSet {
                query: results.query,
                did_you_mean: results.did_you_mean,
                artists,
                albums,
                tracks,
            };
        });

        if published {
            info!(
                artists = counts.0,
                albums = counts.1,
                tracks = counts.2,
                "Search results ready"
            );
            progress.finish();
        } else {
            debug!(epoch, "Search superseded during conversion");
        }
    }

    fn complete_artist_browse(
        &self,
        epoch: QueryEpoch,
        artist_uri: String,
        result: std::result::Result<ArtistBrowseResults, RemoteError>,
    ) {
        if !self.is_current(epoch) {
            debug!(epoch, uri = %artist_uri, "Discarding stale artist browse completion");
            return;
        }
        let target = ListingTarget::Artist(artist_uri.clone());
        let mut progress = self.progress(epoch, target);

        let results = match result {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, uri = %artist_uri, "Artist browse failed");
                self.finish_failed(epoch);
                progress.fail(e.to_string());
                return;
            }
        };
        progress.set(PROGRESS_RESULTS_RECEIVED);

        let available: Vec<&RemoteAlbum> =
            results.albums.iter().filter(|album| album.available).collect();
        let update_every = available.len() / 10;
        let mut counter = 0;
        let mut percent = PROGRESS_RESULTS_RECEIVED;

        let mut albums = Vec::with_capacity(available.len());
        for album in available {
            let step = counter >= update_every;
            counter += 1;
            if step {
                counter = 0;
                percent = percent.saturating_add(PROGRESS_STEP);
                progress.set(percent);
            }
            albums.push(self.album_view(album, ThumbnailCategory::Search));
        }
        progress.set(crate::progress::PROGRESS_CEILING);

        let count = albums.len();
        let published = self.publish(epoch, |sets| {
            sets.artist = ArtistResultSet {
                artist_uri: artist_uri.clone(),
                albums,
            };
        });

        if published {
            info!(uri = %artist_uri, albums = count, "Artist albums ready");
            progress.finish();
        } else {
            debug!(epoch, "Artist browse superseded during conversion");
        }
    }

    fn complete_album_browse(
        &self,
        epoch: QueryEpoch,
        album_uri: String,
        result: std::result::Result<AlbumBrowseResults, RemoteError>,
    ) {
        if !self.is_current(epoch) {
            debug!(epoch, uri = %album_uri, "Discarding stale album browse completion");
            return;
        }
        let target = ListingTarget::Album(album_uri.clone());
        let mut progress = self.progress(epoch, target);

        let results = match result {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, uri = %album_uri, "Album browse failed");
                self.finish_failed(epoch);
                progress.fail(e.to_string());
                return;
            }
        };

        let available: Vec<&RemoteTrack> =
            results.tracks.iter().filter(|track| track.available).collect();
        let Some((first, rest)) = available.split_first() else {
            warn!(uri = %album_uri, "Album has no available tracks");
            self.finish_failed(epoch);
            progress.fail("Album has no available tracks");
            return;
        };
        progress.set(PROGRESS_RESULTS_RECEIVED);

        let cover = first
            .album
            .as_ref()
            .and_then(|album| album.cover.as_ref())
            .or(results.album.cover.as_ref());
        let first_item = Arc::new(track_item(first, self.paths.as_ref()));
        let shared = self.now_playing_thumbnail(&results.album.uri, cover, &first_item);

        let mut tracks = Vec::with_capacity(available.len());
        tracks.push(first_item);
        for track in rest {
            let item = track_item(track, self.paths.as_ref());
            if let Some(path) = &shared {
                item.set_thumbnail(path.clone());
            }
            tracks.push(Arc::new(item));
        }
        progress.set(crate::progress::PROGRESS_CEILING);

        let count = tracks.len();
        let published = self.publish(epoch, |sets| {
            sets.album = AlbumResultSet {
                album_uri: album_uri.clone(),
                tracks,
            };
        });

        if published {
            info!(uri = %album_uri, tracks = count, "Album tracks ready");
            progress.finish();
        } else {
            debug!(epoch, "Album browse superseded during conversion");
        }
    }

    /// Resolve the album cover once in the now-playing category and return
    /// the path every track of the album shares.
    ///
    /// A cover already cached for search results is copied over first so
    /// that no second fetch is needed.
    fn now_playing_thumbnail(
        &self,
        album_uri: &str,
        cover: Option<&bridge_traits::ImageId>,
        first: &Arc<ViewItem>,
    ) -> Option<String> {
        let cache = self.thumbnails.cache();
        let searched = cache.cache_path(album_uri, ThumbnailCategory::Search);
        match cache.contains(&searched) {
            Ok(true) => {
                if let Err(e) = cache.copy(&searched, album_uri, ThumbnailCategory::NowPlaying) {
                    debug!(error = %e, "Could not reuse search thumbnail");
                }
            }
            Ok(false) => {}
            Err(e) => debug!(error = %e, "Could not check search thumbnail"),
        }

        if !self
            .thumbnails
            .resolve(cover, album_uri, first, ThumbnailCategory::NowPlaying)
        {
            return None;
        }
        Some(
            self.thumbnails
                .cache_path(album_uri, ThumbnailCategory::NowPlaying)
                .display()
                .to_string(),
        )
    }

    /// Catalog entry when the album is already in the library, otherwise the
    /// remote album with a thumbnail request.
    fn album_view(&self, album: &RemoteAlbum, category: ThumbnailCategory) -> Arc<ViewItem> {
        if let Some(item) = self.catalog_album(album) {
            return Arc::new(item);
        }
        let item = Arc::new(album_item(album, self.paths.as_ref()));
        self.thumbnails
            .resolve(album.cover.as_ref(), &album.uri, &item, category);
        item
    }

    fn catalog_album(&self, album: &RemoteAlbum) -> Option<ViewItem> {
        let catalog = self.catalog.as_ref()?;

        let lookup = catalog
            .find_album(&album.name, album.artist_name())
            .and_then(|id| match id {
                Some(id) => catalog.get_album_info(id),
                None => Ok(None),
            });

        let info = match lookup {
            Ok(info) => info?,
            Err(e) => {
                warn!(error = %e, album = %album.name, "Catalog lookup failed");
                return None;
            }
        };

        let thumbnail = catalog.get_album_thumbnail(info.id).unwrap_or_else(|e| {
            debug!(error = %e, id = info.id, "No catalog thumbnail");
            None
        });
        Some(catalog_album_item(&info, thumbnail, self.paths.as_ref()))
    }

    fn track_view(&self, track: &RemoteTrack, category: ThumbnailCategory) -> Arc<ViewItem> {
        let item = Arc::new(track_item(track, self.paths.as_ref()));
        if let Some(album) = &track.album {
            self.thumbnails
                .resolve(album.cover.as_ref(), &album.uri, &item, category);
        }
        item
    }

    fn reset_thumbnails(&self, scope: ResetScope) {
        let outcome = match scope {
            ResetScope::Search => self.thumbnails.reset(ThumbnailCategory::Search),
            ResetScope::All => self.thumbnails.reset_all(),
            ResetScope::ArtistBrowse | ResetScope::AlbumBrowse => Ok(()),
        };
        if let Err(e) = outcome {
            warn!(error = %e, ?scope, "Failed to reset thumbnail cache");
        }
    }
}
