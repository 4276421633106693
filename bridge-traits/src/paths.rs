//! Virtual listing paths
//!
//! The host UI addresses every listing and every item by a path string. The
//! format of those strings belongs to the host; the core only asks for them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::AlbumId;

/// A virtual listing the host can be asked to refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingTarget {
    /// The search results menu.
    SearchMenu,
    /// Albums of an artist, keyed by artist URI.
    Artist(String),
    /// Tracks of an album, keyed by album URI.
    Album(String),
    /// Tracks of the playlist at this container index.
    Playlist(usize),
}

impl fmt::Display for ListingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingTarget::SearchMenu => write!(f, "search"),
            ListingTarget::Artist(uri) => write!(f, "artist {}", uri),
            ListingTarget::Album(uri) => write!(f, "album {}", uri),
            ListingTarget::Playlist(index) => write!(f, "playlist #{}", index),
        }
    }
}

/// Formats item and listing paths for the host's virtual filesystem.
pub trait ListingPaths: Send + Sync {
    /// Path of an artist item; opening it browses the artist.
    fn artist_item(&self, artist_uri: &str) -> String;

    /// Path of a remote album item; opening it browses the album.
    fn album_item(&self, album_uri: &str) -> String;

    /// Playable path of a track.
    fn track_item(&self, track_uri: &str) -> String;

    /// Path of an album already present in the host catalog.
    fn catalog_album(&self, id: AlbumId) -> String;

    /// Path of the playlists root, used for playlists that are still loading.
    fn playlists_root(&self) -> String;

    /// Path of a listing, used to address "result set updated" notices.
    fn listing_path(&self, target: &ListingTarget) -> String;
}
