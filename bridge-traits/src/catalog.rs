//! Local Music Catalog
//!
//! The host media center keeps its own song/album database. Search and
//! browse results prefer a locally catalogued album over the remote one, and
//! "add album to library" writes remote albums into it.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Identifier of an album row in the host catalog.
pub type AlbumId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogAlbum {
    pub id: AlbumId,
    pub name: String,
    pub artist: String,
    pub year: Option<i32>,
    /// Free-form album kind, e.g. `"spotifyalbum"` for imported remote albums.
    pub album_type: Option<String>,
}

/// A song to be inserted into the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSong {
    /// Playable path of the song (`<track uri>.spotify`).
    pub file_name: String,
    pub title: String,
    pub duration_secs: u32,
    pub track_number: u32,
    pub album: String,
    pub album_artist: String,
    pub artist: String,
    pub year: Option<i32>,
    pub rating: u8,
}

/// Host catalog access.
///
/// All calls are synchronous and may run on the remote callback context.
pub trait CatalogStore: Send + Sync {
    /// Look up an album by album name and artist name.
    fn find_album(&self, album: &str, artist: &str) -> Result<Option<AlbumId>>;

    /// Load the stored details of an album.
    fn get_album_info(&self, id: AlbumId) -> Result<Option<CatalogAlbum>>;

    /// Path of the album's cached thumbnail, if the catalog has one.
    fn get_album_thumbnail(&self, id: AlbumId) -> Result<Option<String>>;

    /// Store `image` as the thumbnail of album `id`.
    fn save_album_thumbnail(&self, id: AlbumId, image: &Path) -> Result<()>;

    fn add_song(&self, song: &CatalogSong) -> Result<()>;

    fn set_album_info(&self, album: &CatalogAlbum) -> Result<()>;

    fn begin_transaction(&self) -> Result<()>;

    fn commit_transaction(&self) -> Result<()>;

    fn rollback_transaction(&self) -> Result<()>;
}
