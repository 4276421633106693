//! # Player
//!
//! Consumer surface over the remote player: load, unload, seek and frame
//! pulls. Audio arrives through the [`AudioSink`] implementation and is held
//! in an [`AudioDeliveryBuffer`].
//!
//! Loads nest. Each [`Player::load`] adds an instance and each
//! [`Player::unload`] removes one; the remote player is torn down only when
//! the last instance goes away.

use crate::delivery_buffer::{AudioDeliveryBuffer, FrameChunk};
use crate::error::{PlaybackError, Result};
use bridge_traits::{DeliveryFormat, RemoteSession};
use core_runtime::config::AudioBufferConfig;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_session::{AudioSink, Session};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// The track currently handed to the remote player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSession {
    pub track_uri: String,
    pub duration_secs: u32,
    /// Nested load count.
    pub instances: u32,
}

pub struct Player {
    session: Arc<Session>,
    buffer: AudioDeliveryBuffer,
    current: Mutex<Option<PlaybackSession>>,
    /// Whether the remote player has the current track loaded and playing.
    loaded: AtomicBool,
    end_reported: AtomicBool,
    events: EventBus,
}

impl Player {
    /// Create a player and register it as the session's audio sink.
    pub fn new(session: Arc<Session>, config: AudioBufferConfig) -> Result<Arc<Self>> {
        config
            .validate()
            .map_err(|e| PlaybackError::InvalidBufferConfig(e.to_string()))?;

        let events = session.events().clone();
        let player = Arc::new(Self {
            session: session.clone(),
            buffer: AudioDeliveryBuffer::new(config),
            current: Mutex::new(None),
            loaded: AtomicBool::new(false),
            end_reported: AtomicBool::new(false),
            events,
        });

        let sink: Arc<dyn AudioSink> = player.clone();
        session.register_audio_sink(&sink);
        Ok(player)
    }

    /// Load `track_uri` and start playback. Returns the duration in seconds.
    ///
    /// Starting the remote player may be deferred until the track's metadata
    /// is loaded; [`Player::pull_frames`] retries it.
    #[instrument(skip(self))]
    pub fn load(&self, track_uri: &str) -> Result<u32> {
        if !self.session.reconnect(false) {
            return Err(PlaybackError::NotConnected);
        }
        let handle = self.session.active_session()?;

        let instances = {
            let mut current = self.current.lock();
            let instances = current.as_ref().map_or(0, |c| c.instances) + 1;
            // Keep the count while the previous track is torn down
            *current = Some(PlaybackSession {
                track_uri: String::new(),
                duration_secs: 0,
                instances,
            });
            instances
        };
        self.unload_player(handle.as_ref());

        let track = handle
            .lookup_track(track_uri)
            .ok_or_else(|| PlaybackError::TrackNotFound(track_uri.to_string()))?;
        let duration_secs = track.duration_ms / 1000;

        self.buffer.reset();
        self.end_reported.store(false, Ordering::SeqCst);
        *self.current.lock() = Some(PlaybackSession {
            track_uri: track_uri.to_string(),
            duration_secs,
            instances,
        });

        if !self.load_player() {
            debug!(uri = %track_uri, "Player start deferred");
        }

        self.events.publish(CoreEvent::Playback(PlaybackEvent::Loaded {
            track_uri: track_uri.to_string(),
            duration_secs,
        }));
        Ok(duration_secs)
    }

    /// Drop one load instance; the last one stops the remote player.
    #[instrument(skip(self))]
    pub fn unload(&self) -> Result<()> {
        let remaining = {
            let mut current = self.current.lock();
            match current.as_mut() {
                Some(session) => {
                    session.instances = session.instances.saturating_sub(1);
                    session.instances
                }
                None => 0,
            }
        };

        if remaining > 0 {
            debug!(instances = remaining, "Player still in use");
            return Ok(());
        }

        if let Some(handle) = self.session.remote_session() {
            self.unload_player(handle.as_ref());
        }
        *self.current.lock() = None;
        self.buffer.reset();
        self.end_reported.store(false, Ordering::SeqCst);
        self.events.publish(CoreEvent::Playback(PlaybackEvent::Unloaded));
        Ok(())
    }

    /// Seek within the current track. Returns the offset on success.
    #[instrument(skip(self))]
    pub fn seek(&self, offset_ms: u32) -> Result<u32> {
        if !self.load_player() {
            return Err(PlaybackError::SeekFailed("Player not loaded".to_string()));
        }
        let handle = self
            .session
            .remote_session()
            .ok_or(PlaybackError::NotConnected)?;

        handle
            .player_seek(offset_ms)
            .map_err(|e| PlaybackError::SeekFailed(e.to_string()))?;
        self.buffer.discard();
        handle
            .player_play(true)
            .map_err(|e| PlaybackError::SeekFailed(e.to_string()))?;

        debug!(offset_ms, "Player seek");
        self.events.publish(CoreEvent::Playback(PlaybackEvent::Seeked {
            offset_secs: offset_ms / 1000,
        }));
        Ok(offset_ms)
    }

    /// Pull up to `max_bytes` of buffered audio.
    ///
    /// An empty chunk means "poll again later". Without a playing track
    /// the chunk is always empty and never reports end of track.
    pub fn pull_frames(&self, max_bytes: usize) -> FrameChunk {
        if !self.load_player() {
            return self.buffer.idle();
        }

        let chunk = self.buffer.pull(max_bytes);
        if chunk.end_of_track && !self.end_reported.swap(true, Ordering::SeqCst) {
            let track_uri = self
                .current
                .lock()
                .as_ref()
                .map(|c| c.track_uri.clone())
                .unwrap_or_default();
            debug!(uri = %track_uri, "Track drained");
            self.events
                .publish(CoreEvent::Playback(PlaybackEvent::EndOfTrack { track_uri }));
        }
        chunk
    }

    pub fn current(&self) -> Option<PlaybackSession> {
        self.current.lock().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn buffer(&self) -> &AudioDeliveryBuffer {
        &self.buffer
    }

    /// Start the remote player on the current track if it is not running.
    fn load_player(&self) -> bool {
        if !self.session.reconnect(false) {
            return false;
        }
        if self.loaded.load(Ordering::SeqCst) {
            return true;
        }

        let Some(track_uri) = self
            .current
            .lock()
            .as_ref()
            .map(|c| c.track_uri.clone())
            .filter(|uri| !uri.is_empty())
        else {
            return false;
        };
        let Some(handle) = self.session.remote_session() else {
            return false;
        };

        match handle.lookup_track(&track_uri) {
            Some(track) if track.loaded => {}
            _ => return false,
        }

        if let Err(e) = handle.player_load(&track_uri) {
            warn!(uri = %track_uri, error = %e, "Player load failed");
            return false;
        }
        if let Err(e) = handle.player_play(true) {
            warn!(uri = %track_uri, error = %e, "Player play failed");
            return false;
        }

        self.loaded.store(true, Ordering::SeqCst);
        debug!(uri = %track_uri, "Player playing");
        true
    }

    fn unload_player(&self, handle: &dyn RemoteSession) {
        if self.loaded.swap(false, Ordering::SeqCst) {
            stop_remote_player(handle);
            debug!("Player unloaded");
        }
    }
}

fn stop_remote_player(handle: &dyn RemoteSession) {
    if let Err(e) = handle.player_play(false) {
        debug!(error = %e, "Player pause failed");
    }
    if let Err(e) = handle.player_unload() {
        debug!(error = %e, "Player unload failed");
    }
}

impl AudioSink for Player {
    fn on_frames_delivered(&self, format: DeliveryFormat, samples: &[i16]) -> usize {
        if !self.loaded.load(Ordering::SeqCst) {
            // Torn down while the remote library kept delivering
            if let Some(handle) = self.session.remote_session() {
                stop_remote_player(handle.as_ref());
            }
            return 0;
        }
        self.buffer.push(format, samples)
    }

    fn on_end_of_track(&self) {
        self.buffer.mark_end_of_track();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::MemorySecureStore;
    use bridge_traits::{ManualClock, RemoteError, RemoteErrorCode, RemoteTrack, SecureStore};
    use chrono::{TimeZone, Utc};
    use core_session::credentials::{PASSWORD_KEY, USERNAME_KEY};
    use core_session::testing::{settings, FakeRemoteService, PlayerCall, RecordingPresenter};

    const TRACK: &str = "spotify:track:4uLU6hMCjMI75M1A2tKUQC";
    const STEREO: DeliveryFormat = DeliveryFormat {
        channels: 2,
        sample_rate: 44100,
    };

    fn track(uri: &str, loaded: bool) -> RemoteTrack {
        RemoteTrack {
            uri: uri.to_string(),
            name: "Never Gonna Give You Up".to_string(),
            duration_ms: 213_573,
            popularity: 70,
            available: true,
            loaded,
            index: 1,
            album: None,
            artists: Vec::new(),
        }
    }

    fn logged_in_player(config: AudioBufferConfig) -> (Arc<FakeRemoteService>, Arc<Player>) {
        let remote = Arc::new(FakeRemoteService::new());
        let store = Arc::new(MemorySecureStore::new());
        store.set_secret(USERNAME_KEY, b"jdoe").unwrap();
        store.set_secret(PASSWORD_KEY, b"hunter2").unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap(),
        ));
        let session = Session::new(
            remote.clone(),
            settings(),
            Arc::new(RecordingPresenter::new()),
            store,
            clock,
            EventBus::new(32),
        );
        session.connect(false).unwrap();
        remote.session().callbacks().logged_in(Ok(()));
        session.tick();

        let player = Player::new(session, config).unwrap();
        (remote, player)
    }

    #[test]
    fn test_invalid_buffer_config_is_rejected() {
        let remote = Arc::new(FakeRemoteService::new());
        let session = Session::new(
            remote,
            settings(),
            Arc::new(RecordingPresenter::new()),
            Arc::new(MemorySecureStore::new()),
            Arc::new(ManualClock::new(Utc::now())),
            EventBus::new(8),
        );

        let result = Player::new(session, AudioBufferConfig::new(6));
        assert!(matches!(result, Err(PlaybackError::InvalidBufferConfig(_))));
    }

    #[test]
    fn test_load_returns_duration_and_starts_player() {
        let (remote, player) = logged_in_player(AudioBufferConfig::default());
        remote.session().add_track(track(TRACK, true));

        assert_eq!(player.load(TRACK).unwrap(), 213);
        assert!(player.is_loaded());
        assert_eq!(
            remote.session().player_calls(),
            vec![PlayerCall::Load(TRACK.to_string()), PlayerCall::Play(true)]
        );
    }

    #[test]
    fn test_load_unknown_track_fails() {
        let (_remote, player) = logged_in_player(AudioBufferConfig::default());
        assert!(matches!(
            player.load("spotify:track:missing"),
            Err(PlaybackError::TrackNotFound(_))
        ));
    }

    #[test]
    fn test_deferred_start_retried_by_pull() {
        let (remote, player) = logged_in_player(AudioBufferConfig::default());
        remote.session().add_track(track(TRACK, false));

        player.load(TRACK).unwrap();
        assert!(!player.is_loaded());
        assert!(player.pull_frames(1024).is_empty());

        remote.session().add_track(track(TRACK, true));
        player.pull_frames(1024);
        assert!(player.is_loaded());
    }

    #[test]
    fn test_nested_unload_keeps_player_until_last() {
        let (remote, player) = logged_in_player(AudioBufferConfig::default());
        remote.session().add_track(track(TRACK, true));

        player.load(TRACK).unwrap();
        player.load(TRACK).unwrap();
        assert_eq!(player.current().unwrap().instances, 2);

        player.unload().unwrap();
        assert!(player.is_loaded());

        player.unload().unwrap();
        assert!(!player.is_loaded());
        assert!(player.current().is_none());
        assert_eq!(remote.session().player_calls().last(), Some(&PlayerCall::Unload));
    }

    #[test]
    fn test_delivery_after_teardown_stops_remote_player() {
        let (remote, player) = logged_in_player(AudioBufferConfig::default());
        remote.session().add_track(track(TRACK, true));
        player.load(TRACK).unwrap();
        player.unload().unwrap();
        let calls_before = remote.session().player_calls().len();

        let accepted = remote.session().callbacks().music_delivery(STEREO, &[0; 64]);

        assert_eq!(accepted, 0);
        assert_eq!(
            remote.session().player_calls()[calls_before..],
            [PlayerCall::Play(false), PlayerCall::Unload]
        );
    }

    #[test]
    fn test_frames_flow_from_callback_to_pull() {
        let config = AudioBufferConfig::new(2048).with_start_threshold(400);
        let (remote, player) = logged_in_player(config);
        remote.session().add_track(track(TRACK, true));
        player.load(TRACK).unwrap();
        let mut events = player.session.events().subscribe();

        let callbacks = remote.session().callbacks();
        assert_eq!(callbacks.music_delivery(STEREO, &[7; 200]), 100);
        callbacks.end_of_track();

        let chunk = player.pull_frames(400);
        assert_eq!(chunk.bytes.len(), 400);
        assert!(!chunk.end_of_track);
        assert_eq!(chunk.bitrate_kbps, 320);

        assert!(player.pull_frames(400).end_of_track);
        assert!(player.pull_frames(400).end_of_track);

        let mut end_events = 0;
        while let Ok(event) = events.try_recv() {
            if let CoreEvent::Playback(PlaybackEvent::EndOfTrack { track_uri }) = event {
                assert_eq!(track_uri, TRACK);
                end_events += 1;
            }
        }
        assert_eq!(end_events, 1);
    }

    #[test]
    fn test_pull_after_unload_is_not_end_of_track() {
        let config = AudioBufferConfig::new(2048).with_start_threshold(0);
        let (remote, player) = logged_in_player(config);
        remote.session().add_track(track(TRACK, true));
        player.load(TRACK).unwrap();
        let callbacks = remote.session().callbacks();
        callbacks.music_delivery(STEREO, &[3; 50]);
        callbacks.end_of_track();
        assert_eq!(player.pull_frames(400).bytes.len(), 100);
        assert!(player.pull_frames(400).end_of_track);

        player.unload().unwrap();
        let mut events = player.session.events().subscribe();

        let chunk = player.pull_frames(400);
        assert!(chunk.is_empty());
        assert!(!chunk.end_of_track);
        assert!(player.buffer().is_empty());
        assert!(!player.buffer().is_ready());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_seek_discards_buffered_audio() {
        let config = AudioBufferConfig::new(2048).with_start_threshold(0);
        let (remote, player) = logged_in_player(config);
        remote.session().add_track(track(TRACK, true));
        player.load(TRACK).unwrap();
        remote.session().callbacks().music_delivery(STEREO, &[1; 100]);

        assert_eq!(player.seek(30_000).unwrap(), 30_000);
        assert!(player.buffer().is_empty());
        assert!(remote
            .session()
            .player_calls()
            .contains(&PlayerCall::Seek(30_000)));
    }

    #[test]
    fn test_seek_failure_is_reported() {
        let (remote, player) = logged_in_player(AudioBufferConfig::default());
        remote.session().add_track(track(TRACK, true));
        player.load(TRACK).unwrap();
        remote.session().fail_player(RemoteError::new(
            RemoteErrorCode::TrackNotPlayable,
            "Track not playable",
        ));

        assert!(matches!(player.seek(1000), Err(PlaybackError::SeekFailed(_))));
    }
}
