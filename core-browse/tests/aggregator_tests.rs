use bridge_desktop::{MemorySecureStore, MusicDbPaths, StdFileSystem};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AlbumBrowseResults, AlbumId, ArtistBrowseResults, CatalogAlbum, CatalogSong, CatalogStore,
    ImageId, ListingTarget, ManualClock, RemoteAlbum, RemoteArtist, RemoteError, RemoteErrorCode,
    RemotePlaylist, RemoteTrack, SearchLimits, SearchResults,
};
use bytes::Bytes;
use chrono::Utc;
use core_browse::{BrowseError, ResultAggregator};
use core_metadata::items::{DEFAULT_ALBUM_THUMB, LOADING_PLAYLIST_LABEL};
use core_metadata::{ThumbnailCache, ThumbnailPipeline};
use core_runtime::events::{BrowseEvent, CoreEvent, EventBus};
use core_session::testing::{settings, FakeRemoteService, ProgressCall, RecordingPresenter};
use core_session::Session;
use mockall::{mock, Sequence};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::broadcast;

mock! {
    pub Catalog {}

    impl CatalogStore for Catalog {
        fn find_album(&self, album: &str, artist: &str) -> BridgeResult<Option<AlbumId>>;
        fn get_album_info(&self, id: AlbumId) -> BridgeResult<Option<CatalogAlbum>>;
        fn get_album_thumbnail(&self, id: AlbumId) -> BridgeResult<Option<String>>;
        fn save_album_thumbnail(&self, id: AlbumId, image: &Path) -> BridgeResult<()>;
        fn add_song(&self, song: &CatalogSong) -> BridgeResult<()>;
        fn set_album_info(&self, album: &CatalogAlbum) -> BridgeResult<()>;
        fn begin_transaction(&self) -> BridgeResult<()>;
        fn commit_transaction(&self) -> BridgeResult<()>;
        fn rollback_transaction(&self) -> BridgeResult<()>;
    }
}

const ALBUM_URI: &str = "spotify:album:1A2GTWGtFfWp7KSQTwWOyo";
const ARTIST_URI: &str = "spotify:artist:0C0XlULifJtAgn6ZNCW2eu";

struct Harness {
    dir: TempDir,
    remote: Arc<FakeRemoteService>,
    presenter: Arc<RecordingPresenter>,
    session: Arc<Session>,
    aggregator: ResultAggregator,
}

impl Harness {
    fn new(catalog: Option<Arc<dyn CatalogStore>>) -> Self {
        let harness = Self::disconnected(catalog);
        harness.session.connect(false).unwrap();
        harness.remote.session().callbacks().logged_in(Ok(()));
        harness.session.tick();
        harness
    }

    fn disconnected(catalog: Option<Arc<dyn CatalogStore>>) -> Self {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(FakeRemoteService::new());
        let presenter = Arc::new(RecordingPresenter::new());
        presenter.answer_text("jdoe");
        presenter.answer_text("hunter2");

        let session = Session::new(
            remote.clone(),
            settings(),
            presenter.clone(),
            Arc::new(MemorySecureStore::new()),
            Arc::new(ManualClock::new(Utc::now())),
            EventBus::new(256),
        );
        let thumbnails = Arc::new(ThumbnailPipeline::new(
            ThumbnailCache::new(dir.path(), Arc::new(StdFileSystem::new())),
            session.clone(),
            session.events().clone(),
        ));
        let aggregator = ResultAggregator::new(
            session.clone(),
            presenter.clone(),
            catalog,
            Arc::new(MusicDbPaths),
            thumbnails,
        );

        Self {
            dir,
            remote,
            presenter,
            session,
            aggregator,
        }
    }

    fn thumb(&self, category: &str, key: &str) -> PathBuf {
        self.dir.path().join(category).join(format!("{}.jpg", key))
    }
}

fn killers() -> RemoteArtist {
    RemoteArtist {
        uri: ARTIST_URI.to_string(),
        name: "The Killers".to_string(),
        available: true,
    }
}

fn hot_fuss() -> RemoteAlbum {
    RemoteAlbum {
        uri: ALBUM_URI.to_string(),
        name: "Hot Fuss".to_string(),
        year: Some(2004),
        available: true,
        artist: Some(killers()),
        cover: Some(ImageId(vec![0x1a; 20])),
    }
}

fn track(index: u32, name: &str, available: bool) -> RemoteTrack {
    RemoteTrack {
        uri: format!("spotify:track:hotfuss{}", index),
        name: name.to_string(),
        duration_ms: 200_000 + index * 1000,
        popularity: 65,
        available,
        loaded: true,
        index,
        album: Some(hot_fuss()),
        artists: vec![killers()],
    }
}

fn drain(rx: &mut broadcast::Receiver<CoreEvent>) -> Vec<BrowseEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let CoreEvent::Browse(event) = event {
            events.push(event);
        }
    }
    events
}

#[test]
fn search_keeps_first_five_available_artists() {
    let h = Harness::new(None);
    let limits = SearchLimits {
        max_artists: 5,
        ..SearchLimits::default()
    };
    h.aggregator.search("the", limits).unwrap();
    assert_eq!(h.remote.session().search_requests()[0].limits.max_artists, 5);

    let artists = (0..8)
        .map(|i| RemoteArtist {
            uri: format!("spotify:artist:a{}", i),
            name: format!("Artist {}", i),
            available: i != 1 && i != 4,
        })
        .collect();
    h.remote.session().complete_search(Ok(SearchResults {
        query: "the".to_string(),
        artists,
        ..SearchResults::default()
    }));

    let labels: Vec<_> = h
        .aggregator
        .search_results()
        .artists
        .iter()
        .map(|a| a.label.clone())
        .collect();
    assert_eq!(
        labels,
        vec!["Artist 0", "Artist 2", "Artist 3", "Artist 5", "Artist 6"]
    );
}

#[test]
fn search_progress_and_single_update_notification() {
    let h = Harness::new(None);
    let mut rx = h.session.events().subscribe();

    h.aggregator.search("hot fuss", SearchLimits::default()).unwrap();
    h.remote.session().complete_search(Ok(SearchResults {
        query: "hot fuss".to_string(),
        did_you_mean: None,
        artists: vec![killers()],
        albums: vec![hot_fuss()],
        tracks: vec![track(1, "Jenny Was a Friend of Mine", true), track(2, "Mr. Brightside", false)],
    }));

    assert_eq!(h.presenter.progress_values(), vec![50, 60, 80, 99]);
    assert_eq!(
        h.presenter.progress().first(),
        Some(&ProgressCall::Show {
            heading: "Spotify".to_string(),
            message: "Searching for hot fuss".to_string(),
        })
    );
    assert_eq!(h.presenter.progress().last(), Some(&ProgressCall::Hide));

    let updates: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, BrowseEvent::ResultSetUpdated { .. }))
        .collect();
    assert_eq!(
        updates,
        vec![BrowseEvent::ResultSetUpdated {
            target: ListingTarget::SearchMenu
        }]
    );

    let results = h.aggregator.search_results();
    assert_eq!(results.albums.len(), 1);
    assert_eq!(results.tracks.len(), 1);
    assert_eq!(results.albums[0].thumbnail().as_deref(), Some(DEFAULT_ALBUM_THUMB));
    // Album item and track item wait on one cover fetch
    assert_eq!(h.remote.session().pending_images().len(), 1);
    h.remote
        .session()
        .complete_image(Ok(Bytes::from_static(b"cover")));
    let cover = h.thumb("thumbs", "1A2GTWGtFfWp7KSQTwWOyo").display().to_string();
    assert_eq!(results.albums[0].thumbnail(), Some(cover.clone()));
    assert_eq!(results.tracks[0].thumbnail(), Some(cover));
}

#[test]
fn stale_completion_is_ignored() {
    let h = Harness::new(None);
    h.aggregator.search("first", SearchLimits::default()).unwrap();
    h.aggregator.search("second", SearchLimits::default()).unwrap();
    assert_eq!(h.remote.session().released(), 1);

    // Oldest parked callback belongs to the released request
    assert!(h.remote.session().complete_search(Ok(SearchResults {
        query: "first".to_string(),
        artists: vec![killers()],
        ..SearchResults::default()
    })));
    assert!(h.aggregator.search_results().is_empty());
    assert!(h.presenter.progress_values().is_empty());
    assert!(h.aggregator.is_in_flight());

    h.remote.session().complete_search(Ok(SearchResults {
        query: "second".to_string(),
        artists: vec![killers()],
        ..SearchResults::default()
    }));
    let results = h.aggregator.search_results();
    assert_eq!(results.query, "second");
    assert_eq!(results.artists.len(), 1);
    assert!(!h.aggregator.is_in_flight());
}

#[test]
fn stale_completion_from_another_thread_is_ignored() {
    let h = Harness::new(None);
    h.remote.session().add_artist(killers());
    h.aggregator.browse_artist(ARTIST_URI).unwrap();
    h.aggregator.search("newer", SearchLimits::default()).unwrap();

    let remote = h.remote.clone();
    std::thread::spawn(move || {
        remote.session().complete_artist_browse(Ok(ArtistBrowseResults {
            artist: killers(),
            albums: vec![hot_fuss()],
        }))
    })
    .join()
    .unwrap();

    assert!(h.aggregator.artist_albums().albums.is_empty());
    assert!(h.presenter.progress_values().is_empty());
}

#[test]
fn query_started_during_conversion_keeps_its_indicator() {
    let newer: Arc<Mutex<Option<ResultAggregator>>> = Arc::new(Mutex::new(None));
    let mut catalog = MockCatalog::new();
    let starter = newer.clone();
    catalog.expect_find_album().returning(move |_, _| {
        let aggregator = starter.lock().take();
        if let Some(aggregator) = aggregator {
            aggregator.search("newer", SearchLimits::default()).unwrap();
        }
        Ok(None)
    });

    let h = Harness::new(Some(Arc::new(catalog)));
    let mut rx = h.session.events().subscribe();
    *newer.lock() = Some(h.aggregator.clone());
    h.remote.session().add_artist(killers());
    h.aggregator.browse_artist(ARTIST_URI).unwrap();

    let albums = (0..20)
        .map(|i| RemoteAlbum {
            uri: format!("spotify:album:k{}", i),
            name: format!("Album {}", i),
            cover: None,
            ..hot_fuss()
        })
        .collect();
    h.remote.session().complete_artist_browse(Ok(ArtistBrowseResults {
        artist: killers(),
        albums,
    }));

    let calls = h.presenter.progress();
    let shown = calls
        .iter()
        .position(|call| matches!(call, ProgressCall::Show { message, .. } if message == "Searching for newer"))
        .unwrap();
    assert!(calls[shown + 1..].is_empty(), "{:?}", &calls[shown + 1..]);
    assert!(h.aggregator.is_in_flight());
    assert!(h.aggregator.artist_albums().albums.is_empty());

    let artist = ListingTarget::Artist(ARTIST_URI.to_string());
    let events = drain(&mut rx);
    let started = events
        .iter()
        .position(|e| *e == BrowseEvent::Started { target: ListingTarget::SearchMenu })
        .unwrap();
    assert!(!events[started + 1..].iter().any(|e| match e {
        BrowseEvent::Progress { target, .. }
        | BrowseEvent::ResultSetUpdated { target }
        | BrowseEvent::Failed { target, .. } => *target == artist,
        _ => false,
    }));

    h.remote.session().complete_search(Ok(SearchResults {
        query: "newer".to_string(),
        artists: vec![killers()],
        ..SearchResults::default()
    }));
    assert_eq!(h.presenter.progress().last(), Some(&ProgressCall::Hide));
    assert_eq!(h.aggregator.search_results().query, "newer");
}

#[test]
fn artist_browse_progress_steps_per_tenth() {
    let h = Harness::new(None);
    h.remote.session().add_artist(killers());
    h.aggregator.browse_artist(ARTIST_URI).unwrap();

    let mut albums: Vec<RemoteAlbum> = (0..20)
        .map(|i| RemoteAlbum {
            uri: format!("spotify:album:k{}", i),
            name: format!("Album {}", i),
            cover: None,
            ..hot_fuss()
        })
        .collect();
    albums.push(RemoteAlbum {
        available: false,
        ..hot_fuss()
    });

    h.remote.session().complete_artist_browse(Ok(ArtistBrowseResults {
        artist: killers(),
        albums,
    }));

    assert_eq!(
        h.presenter.progress_values(),
        vec![50, 55, 60, 65, 70, 75, 80, 99]
    );
    let set = h.aggregator.artist_albums();
    assert_eq!(set.artist_uri, ARTIST_URI);
    assert_eq!(set.albums.len(), 20);
    assert!(matches!(
        h.presenter.progress().first(),
        Some(ProgressCall::Show { message, .. }) if message == "Browsing albums from The Killers"
    ));
}

#[test]
fn album_browse_shares_first_track_thumbnail() {
    let h = Harness::new(None);
    h.remote.session().add_album(hot_fuss());
    h.aggregator.browse_album(ALBUM_URI).unwrap();

    h.remote.session().complete_album_browse(Ok(AlbumBrowseResults {
        album: hot_fuss(),
        tracks: vec![
            track(1, "Jenny Was a Friend of Mine", false),
            track(2, "Mr. Brightside", true),
            track(3, "Smile Like You Mean It", true),
            track(4, "Somebody Told Me", true),
        ],
    }));

    let shared = h.thumb("currentplayingthumbs", "1A2GTWGtFfWp7KSQTwWOyo");
    let set = h.aggregator.album_tracks();
    assert_eq!(set.tracks.len(), 3);
    assert_eq!(set.tracks[0].label, "Mr. Brightside");
    assert!(set.tracks[0].thumbnail().is_none());
    for item in &set.tracks[1..] {
        assert_eq!(item.thumbnail(), Some(shared.display().to_string()));
    }
    assert_eq!(h.remote.session().pending_images().len(), 1);

    h.remote
        .session()
        .complete_image(Ok(Bytes::from_static(b"jpeg")));
    assert_eq!(set.tracks[0].thumbnail(), Some(shared.display().to_string()));
    assert_eq!(std::fs::read(&shared).unwrap(), b"jpeg");
}

#[test]
fn album_browse_reuses_search_thumbnail() {
    let h = Harness::new(None);
    h.aggregator.search("hot fuss", SearchLimits::default()).unwrap();
    h.remote.session().complete_search(Ok(SearchResults {
        query: "hot fuss".to_string(),
        albums: vec![hot_fuss()],
        ..SearchResults::default()
    }));
    h.remote
        .session()
        .complete_image(Ok(Bytes::from_static(b"cover")));
    assert!(h.thumb("thumbs", "1A2GTWGtFfWp7KSQTwWOyo").exists());

    h.remote.session().add_album(hot_fuss());
    h.aggregator.browse_album(ALBUM_URI).unwrap();
    h.remote.session().complete_album_browse(Ok(AlbumBrowseResults {
        album: hot_fuss(),
        tracks: vec![track(1, "Jenny Was a Friend of Mine", true)],
    }));

    let shared = h.thumb("currentplayingthumbs", "1A2GTWGtFfWp7KSQTwWOyo");
    assert!(h.remote.session().pending_images().is_empty());
    assert_eq!(std::fs::read(&shared).unwrap(), b"cover");
    assert_eq!(
        h.aggregator.album_tracks().tracks[0].thumbnail(),
        Some(shared.display().to_string())
    );
}

#[test]
fn failed_album_browse_publishes_no_result_set() {
    let h = Harness::new(None);
    let mut rx = h.session.events().subscribe();
    h.remote.session().add_album(hot_fuss());
    h.aggregator.browse_album(ALBUM_URI).unwrap();

    h.remote.session().complete_album_browse(Err(RemoteError::new(
        RemoteErrorCode::OtherTransient,
        "Browse failed",
    )));

    assert!(h.aggregator.album_tracks().tracks.is_empty());
    assert_eq!(h.presenter.progress().last(), Some(&ProgressCall::Hide));
    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, BrowseEvent::Failed { target, .. } if *target == ListingTarget::Album(ALBUM_URI.to_string()))));
    assert!(!events
        .iter()
        .any(|e| matches!(e, BrowseEvent::ResultSetUpdated { .. })));
}

#[test]
fn query_without_session_fails_and_starts_reconnect() {
    let h = Harness::disconnected(None);

    let err = h
        .aggregator
        .search("anything", SearchLimits::default())
        .unwrap_err();

    assert!(matches!(err, BrowseError::NotConnected));
    assert_eq!(h.presenter.connecting_shown(), 1);
    assert!(h.remote.session().search_requests().is_empty());
}

#[test]
fn search_prefers_catalog_albums() {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_find_album()
        .returning(|album, _| Ok((album == "Hot Fuss").then_some(3)));
    catalog.expect_get_album_info().returning(|id| {
        Ok(Some(CatalogAlbum {
            id,
            name: "Hot Fuss".to_string(),
            artist: "The Killers".to_string(),
            year: Some(2004),
            album_type: None,
        }))
    });
    catalog
        .expect_get_album_thumbnail()
        .returning(|_| Ok(Some("/library/thumbs/3.jpg".to_string())));

    let h = Harness::new(Some(Arc::new(catalog)));
    h.aggregator.search("killers", SearchLimits::default()).unwrap();
    h.remote.session().complete_search(Ok(SearchResults {
        query: "killers".to_string(),
        albums: vec![
            hot_fuss(),
            RemoteAlbum {
                uri: "spotify:album:sawdust".to_string(),
                name: "Sawdust".to_string(),
                ..hot_fuss()
            },
        ],
        ..SearchResults::default()
    }));

    let albums = h.aggregator.search_results().albums;
    assert_eq!(albums[0].path, "musicdb://3/3/");
    assert_eq!(albums[0].thumbnail().as_deref(), Some("/library/thumbs/3.jpg"));
    assert_eq!(albums[1].thumbnail().as_deref(), Some(DEFAULT_ALBUM_THUMB));
    // Only the remote album asks for a cover
    assert_eq!(h.remote.session().pending_images().len(), 1);
}

#[test]
fn playlists_and_playlist_tracks() {
    let h = Harness::new(None);
    h.remote.session().set_playlists(vec![
        RemotePlaylist {
            name: "Road trip".to_string(),
            loaded: true,
            tracks: vec![track(1, "Jenny Was a Friend of Mine", true), track(2, "Mr. Brightside", false)],
        },
        RemotePlaylist {
            name: String::new(),
            loaded: false,
            tracks: Vec::new(),
        },
    ]);

    let playlists = h.aggregator.playlists().unwrap();
    assert_eq!(playlists[0].label, "Road trip");
    assert_eq!(playlists[1].label, LOADING_PLAYLIST_LABEL);

    let tracks = h.aggregator.playlist_tracks(0).unwrap();
    assert_eq!(tracks.len(), 1);
    h.remote
        .session()
        .complete_image(Ok(Bytes::from_static(b"cover")));
    assert_eq!(
        tracks[0].thumbnail(),
        Some(
            h.thumb("playlistthumbs", "1A2GTWGtFfWp7KSQTwWOyo")
                .display()
                .to_string()
        )
    );
    assert!(h.aggregator.current_kind().is_none());
}

fn browse_album_with_cover(h: &Harness) {
    h.remote.session().add_album(hot_fuss());
    h.aggregator.browse_album(ALBUM_URI).unwrap();
    h.remote.session().complete_album_browse(Ok(AlbumBrowseResults {
        album: hot_fuss(),
        tracks: vec![track(1, "Jenny Was a Friend of Mine", true), track(2, "Mr. Brightside", true)],
    }));
    h.remote
        .session()
        .complete_image(Ok(Bytes::from_static(b"cover")));
}

#[test]
fn add_album_to_library_commits_tracks_and_thumbnail() {
    let mut catalog = MockCatalog::new();
    let mut seq = Sequence::new();
    catalog
        .expect_begin_transaction()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    catalog
        .expect_add_song()
        .times(2)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    catalog
        .expect_find_album()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(Some(7)));
    catalog
        .expect_get_album_info()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|id| {
            Ok(Some(CatalogAlbum {
                id,
                name: "Hot Fuss".to_string(),
                artist: "The Killers".to_string(),
                year: Some(2004),
                album_type: None,
            }))
        });
    catalog
        .expect_set_album_info()
        .withf(|album| album.album_type.as_deref() == Some("spotifyalbum"))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    catalog
        .expect_save_album_thumbnail()
        .withf(|id, path| *id == 7 && path.ends_with("currentplayingthumbs/1A2GTWGtFfWp7KSQTwWOyo.jpg"))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    catalog
        .expect_commit_transaction()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    catalog.expect_rollback_transaction().never();

    let h = Harness::new(Some(Arc::new(catalog)));
    browse_album_with_cover(&h);

    assert_eq!(h.aggregator.add_album_to_library().unwrap(), 7);
    assert_eq!(
        h.presenter.notifications(),
        vec![("Spotify".to_string(), "Added album to library".to_string())]
    );
}

#[test]
fn add_album_to_library_rolls_back_when_album_is_missing() {
    let mut catalog = MockCatalog::new();
    catalog.expect_begin_transaction().returning(|| Ok(()));
    catalog.expect_add_song().returning(|_| Ok(()));
    catalog.expect_find_album().returning(|_, _| Ok(None));
    catalog.expect_commit_transaction().never();
    catalog
        .expect_rollback_transaction()
        .times(1)
        .returning(|| Ok(()));

    let h = Harness::new(Some(Arc::new(catalog)));
    browse_album_with_cover(&h);

    assert!(h.aggregator.add_album_to_library().is_err());
    assert_eq!(
        h.presenter.notifications(),
        vec![("Spotify".to_string(), "Failed to add album to library".to_string())]
    );
}

#[test]
fn add_album_to_library_needs_album_results() {
    let catalog = MockCatalog::new();
    let h = Harness::new(Some(Arc::new(catalog)));

    let err = h.aggregator.add_album_to_library().unwrap_err();
    assert!(matches!(err, BrowseError::NothingToAdd));
}
