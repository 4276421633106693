//! Query operation types and published result sets.

use bridge_traits::{ListingTarget, RemoteRequest};
use core_metadata::ViewItem;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Search,
    ArtistBrowse,
    AlbumBrowse,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKind::Search => write!(f, "search"),
            QueryKind::ArtistBrowse => write!(f, "artist browse"),
            QueryKind::AlbumBrowse => write!(f, "album browse"),
        }
    }
}

/// What a reset clears before a new query, or on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    /// Search, artist and album results plus the search thumbnails.
    Search,
    ArtistBrowse,
    AlbumBrowse,
    /// Every result set and all four thumbnail directories.
    All,
}

impl From<QueryKind> for ResetScope {
    fn from(kind: QueryKind) -> Self {
        match kind {
            QueryKind::Search => ResetScope::Search,
            QueryKind::ArtistBrowse => ResetScope::ArtistBrowse,
            QueryKind::AlbumBrowse => ResetScope::AlbumBrowse,
        }
    }
}

/// Monotonic token identifying one started query.
pub type QueryEpoch = u64;

/// The single remote request currently owned by the aggregator.
pub(crate) struct InFlight {
    pub kind: QueryKind,
    pub target: ListingTarget,
    pub epoch: QueryEpoch,
    pub request: Option<Box<dyn RemoteRequest>>,
    /// The completion arrived; the request is kept until the next query.
    pub finished: bool,
}

impl InFlight {
    pub fn release(self) {
        if let Some(request) = self.request {
            request.release();
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchResultSet {
    pub query: String,
    pub did_you_mean: Option<String>,
    pub artists: Vec<Arc<ViewItem>>,
    pub albums: Vec<Arc<ViewItem>>,
    pub tracks: Vec<Arc<ViewItem>>,
}

impl SearchResultSet {
    pub fn is_empty(&self) -> bool {
        self.artists.is_empty() && self.albums.is_empty() && self.tracks.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArtistResultSet {
    pub artist_uri: String,
    pub albums: Vec<Arc<ViewItem>>,
}

#[derive(Debug, Clone, Default)]
pub struct AlbumResultSet {
    pub album_uri: String,
    pub tracks: Vec<Arc<ViewItem>>,
}

#[derive(Default)]
pub(crate) struct ResultSets {
    pub search: SearchResultSet,
    pub artist: ArtistResultSet,
    pub album: AlbumResultSet,
}

impl ResultSets {
    pub fn clear(&mut self, scope: ResetScope) {
        match scope {
            ResetScope::Search | ResetScope::All => {
                self.search = SearchResultSet::default();
                self.artist = ArtistResultSet::default();
                self.album = AlbumResultSet::default();
            }
            ResetScope::ArtistBrowse => self.artist = ArtistResultSet::default(),
            ResetScope::AlbumBrowse => self.album = AlbumResultSet::default(),
        }
    }
}
