//! View Items
//!
//! UI-facing records built from remote entities or catalog entries. Items
//! are shared as `Arc<ViewItem>` between the result lists and pending
//! thumbnail fetches; only the thumbnail field changes after construction.

use bridge_traits::{
    AlbumId, CatalogAlbum, CatalogSong, ListingPaths, ListingTarget, RemoteAlbum, RemoteArtist,
    RemotePlaylist, RemoteTrack,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_ALBUM_THUMB: &str = "DefaultMusicAlbums.png";
pub const DEFAULT_PLAYLIST_THUMB: &str = "DefaultMusicPlaylists.png";
pub const LOADING_PLAYLIST_LABEL: &str = "Loading playlist...";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumInfo {
    pub name: String,
    pub artist: String,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemDetails {
    Artist { name: String },
    Album(AlbumInfo),
    /// An album already in the local catalog.
    CatalogAlbum { id: AlbumId, info: AlbumInfo },
    Track(CatalogSong),
    Playlist { index: usize, loaded: bool },
}

pub struct ViewItem {
    pub path: String,
    pub label: String,
    pub details: ItemDetails,
    thumbnail: RwLock<Option<String>>,
}

impl ViewItem {
    pub fn new(path: impl Into<String>, label: impl Into<String>, details: ItemDetails) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            details,
            thumbnail: RwLock::new(None),
        }
    }

    pub fn with_thumbnail(self, thumbnail: impl Into<String>) -> Self {
        *self.thumbnail.write() = Some(thumbnail.into());
        self
    }

    pub fn thumbnail(&self) -> Option<String> {
        self.thumbnail.read().clone()
    }

    pub fn set_thumbnail(&self, thumbnail: impl Into<String>) {
        *self.thumbnail.write() = Some(thumbnail.into());
    }

    /// Whether the thumbnail is a real image and not a placeholder.
    pub fn has_cached_thumbnail(&self) -> bool {
        match self.thumbnail.read().as_deref() {
            Some(DEFAULT_ALBUM_THUMB) | Some(DEFAULT_PLAYLIST_THUMB) | None => false,
            Some(_) => true,
        }
    }

    pub fn song(&self) -> Option<&CatalogSong> {
        match &self.details {
            ItemDetails::Track(song) => Some(song),
            _ => None,
        }
    }
}

impl fmt::Debug for ViewItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewItem")
            .field("path", &self.path)
            .field("label", &self.label)
            .field("thumbnail", &*self.thumbnail.read())
            .finish()
    }
}

/// Star rating 0..=5 from a popularity score 0..=100.
pub fn rating_from_popularity(popularity: u8) -> u8 {
    match popularity {
        p if p > 80 => 5,
        p if p > 60 => 4,
        p if p > 40 => 3,
        p if p > 20 => 2,
        p if p > 10 => 1,
        _ => 0,
    }
}

pub fn artist_item(artist: &RemoteArtist, paths: &dyn ListingPaths) -> ViewItem {
    ViewItem::new(
        paths.artist_item(&artist.uri),
        artist.name.clone(),
        ItemDetails::Artist {
            name: artist.name.clone(),
        },
    )
}

/// Album from the remote service, with the placeholder thumbnail.
pub fn album_item(album: &RemoteAlbum, paths: &dyn ListingPaths) -> ViewItem {
    ViewItem::new(
        paths.album_item(&album.uri),
        album.name.clone(),
        ItemDetails::Album(AlbumInfo {
            name: album.name.clone(),
            artist: album.artist_name().to_string(),
            year: album.year,
        }),
    )
    .with_thumbnail(DEFAULT_ALBUM_THUMB)
}

/// Album from the local catalog. A missing catalog thumbnail falls back to
/// the placeholder.
pub fn catalog_album_item(
    album: &CatalogAlbum,
    thumbnail: Option<String>,
    paths: &dyn ListingPaths,
) -> ViewItem {
    ViewItem::new(
        paths.catalog_album(album.id),
        album.name.clone(),
        ItemDetails::CatalogAlbum {
            id: album.id,
            info: AlbumInfo {
                name: album.name.clone(),
                artist: album.artist.clone(),
                year: album.year,
            },
        },
    )
    .with_thumbnail(thumbnail.unwrap_or_else(|| DEFAULT_ALBUM_THUMB.to_string()))
}

pub fn track_item(track: &RemoteTrack, paths: &dyn ListingPaths) -> ViewItem {
    let album = track.album.as_ref();
    let song = CatalogSong {
        file_name: paths.track_item(&track.uri),
        title: track.name.clone(),
        duration_secs: track.duration_ms / 1000,
        track_number: track.index,
        album: album.map(|a| a.name.clone()).unwrap_or_default(),
        album_artist: album.map(|a| a.artist_name().to_string()).unwrap_or_default(),
        artist: track.first_artist_name().to_string(),
        year: album.and_then(|a| a.year),
        rating: rating_from_popularity(track.popularity),
    };

    ViewItem::new(song.file_name.clone(), track.name.clone(), ItemDetails::Track(song))
}

pub fn playlist_item(index: usize, playlist: &RemotePlaylist, paths: &dyn ListingPaths) -> ViewItem {
    let item = if playlist.loaded {
        ViewItem::new(
            paths.listing_path(&ListingTarget::Playlist(index)),
            playlist.name.clone(),
            ItemDetails::Playlist {
                index,
                loaded: true,
            },
        )
    } else {
        ViewItem::new(
            paths.playlists_root(),
            LOADING_PLAYLIST_LABEL,
            ItemDetails::Playlist {
                index,
                loaded: false,
            },
        )
    };
    item.with_thumbnail(DEFAULT_PLAYLIST_THUMB)
}
