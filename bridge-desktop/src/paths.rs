//! Music database path conventions of the desktop media center.

use bridge_traits::{
    catalog::AlbumId,
    paths::{ListingPaths, ListingTarget},
};

/// `musicdb://` and `spotify://` paths as understood by the host's virtual
/// filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct MusicDbPaths;

impl ListingPaths for MusicDbPaths {
    fn artist_item(&self, artist_uri: &str) -> String {
        format!("musicdb://1/spotifyartist/{}", artist_uri)
    }

    fn album_item(&self, album_uri: &str) -> String {
        format!("musicdb://2/spotifyalbum/{}", album_uri)
    }

    fn track_item(&self, track_uri: &str) -> String {
        format!("{}.spotify", track_uri)
    }

    fn catalog_album(&self, id: AlbumId) -> String {
        format!("musicdb://3/{}/", id)
    }

    fn playlists_root(&self) -> String {
        "spotify://playlists".to_string()
    }

    fn listing_path(&self, target: &ListingTarget) -> String {
        match target {
            ListingTarget::SearchMenu => "spotify://searchmenu/".to_string(),
            ListingTarget::Artist(uri) => format!("musicdb://1/spotifyartist/{}/", uri),
            ListingTarget::Album(uri) => format!("musicdb://2/spotifyalbum/{}/", uri),
            ListingTarget::Playlist(index) => format!("musicdb://2/spotifyplaylist/{}/", index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_paths() {
        let paths = MusicDbPaths;
        assert_eq!(
            paths.artist_item("spotify:artist:4Z8W4fKeB5YxbusRsdQVPb"),
            "musicdb://1/spotifyartist/spotify:artist:4Z8W4fKeB5YxbusRsdQVPb"
        );
        assert_eq!(
            paths.album_item("spotify:album:6dVIqQ8qmQ5GBnJ9shOYGE"),
            "musicdb://2/spotifyalbum/spotify:album:6dVIqQ8qmQ5GBnJ9shOYGE"
        );
        assert_eq!(
            paths.track_item("spotify:track:3n3Ppam7vgaVa1iaRUc9Lp"),
            "spotify:track:3n3Ppam7vgaVa1iaRUc9Lp.spotify"
        );
        assert_eq!(paths.catalog_album(42), "musicdb://3/42/");
    }

    #[test]
    fn test_listing_paths_end_with_separator() {
        let paths = MusicDbPaths;
        assert_eq!(paths.listing_path(&ListingTarget::SearchMenu), "spotify://searchmenu/");
        assert_eq!(
            paths.listing_path(&ListingTarget::Album("spotify:album:x".to_string())),
            "musicdb://2/spotifyalbum/spotify:album:x/"
        );
        assert_eq!(
            paths.listing_path(&ListingTarget::Playlist(3)),
            "musicdb://2/spotifyplaylist/3/"
        );
    }
}
