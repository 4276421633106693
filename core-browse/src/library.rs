//! Copy the browsed album into the local catalog.

use crate::aggregator::ResultAggregator;
use crate::error::{BrowseError, Result};
use crate::progress::PROGRESS_HEADING;
use bridge_traits::{AlbumId, BridgeError, CatalogSong, CatalogStore};
use std::path::Path;
use tracing::{info, instrument, warn};

pub const ALBUM_TYPE: &str = "spotifyalbum";

const ADDED_MESSAGE: &str = "Added album to library";
const FAILED_MESSAGE: &str = "Failed to add album to library";

impl ResultAggregator {
    /// Write every track of the current album-browse result to the catalog.
    ///
    /// Runs inside one catalog transaction; any failure rolls it back. The
    /// outcome is reported through [`bridge_traits::Presenter::notify`].
    #[instrument(skip(self))]
    pub fn add_album_to_library(&self) -> Result<AlbumId> {
        self.connected()?;
        let catalog = self
            .inner
            .catalog
            .clone()
            .ok_or_else(|| BridgeError::NotAvailable("catalog".to_string()))?;

        let album = self.album_tracks();
        let songs: Vec<&CatalogSong> = album.tracks.iter().filter_map(|t| t.song()).collect();
        let Some(first) = songs.first() else {
            self.inner.presenter.notify(PROGRESS_HEADING, FAILED_MESSAGE);
            return Err(BrowseError::NothingToAdd);
        };
        let thumbnail = album
            .tracks
            .first()
            .filter(|t| t.has_cached_thumbnail())
            .and_then(|t| t.thumbnail())
            .filter(|path| {
                self.inner
                    .thumbnails
                    .cache()
                    .contains(Path::new(path))
                    .unwrap_or(false)
            });

        catalog.begin_transaction()?;
        let outcome = write_album(
            catalog.as_ref(),
            &songs,
            &first.album,
            &first.album_artist,
            thumbnail.as_deref().map(Path::new),
        )
        .and_then(|id| {
            catalog.commit_transaction()?;
            Ok(id)
        });

        match outcome {
            Ok(id) => {
                info!(id, album = %first.album, tracks = songs.len(), "Album added to library");
                self.inner.presenter.notify(PROGRESS_HEADING, ADDED_MESSAGE);
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, album = %first.album, "Adding album to library failed");
                if let Err(rollback) = catalog.rollback_transaction() {
                    warn!(error = %rollback, "Rollback failed");
                }
                self.inner.presenter.notify(PROGRESS_HEADING, FAILED_MESSAGE);
                Err(e)
            }
        }
    }
}

fn write_album(
    catalog: &dyn CatalogStore,
    songs: &[&CatalogSong],
    album: &str,
    album_artist: &str,
    thumbnail: Option<&Path>,
) -> Result<AlbumId> {
    for song in songs {
        catalog.add_song(song)?;
    }

    let id = catalog
        .find_album(album, album_artist)?
        .ok_or_else(|| {
            BridgeError::CatalogError(format!("album {} - {} not found after insert", album_artist, album))
        })?;

    let mut info = catalog
        .get_album_info(id)?
        .ok_or_else(|| BridgeError::CatalogError(format!("no album info for id {}", id)))?;
    info.album_type = Some(ALBUM_TYPE.to_string());
    catalog.set_album_info(&info)?;

    if let Some(path) = thumbnail {
        catalog.save_album_thumbnail(id, path)?;
    }
    Ok(id)
}
