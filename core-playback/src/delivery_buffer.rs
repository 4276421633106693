//! # Audio Delivery Buffer
//!
//! Fixed-capacity byte buffer between the remote library's delivery callback
//! (producer) and the host's playback thread (consumer).
//!
//! ## Design
//!
//! - **Locking**: one `parking_lot::Mutex` guards the bytes and cursors, so a
//!   push or pull is never observed half done
//! - **Capacity**: fixed at creation; a push that does not fit is truncated
//!   and the remote library is told how many frames were taken
//! - **Start gate**: the consumer gets nothing until the buffer first reaches
//!   the start threshold or the track ends
//! - **Compaction**: a pull takes bytes from the front and shifts the rest down
//!
//! ## Usage
//!
//! ```rust
//! use bridge_traits::DeliveryFormat;
//! use core_playback::delivery_buffer::AudioDeliveryBuffer;
//! use core_runtime::config::AudioBufferConfig;
//!
//! let buffer = AudioDeliveryBuffer::new(AudioBufferConfig::new(2048).with_start_threshold(400));
//! let format = DeliveryFormat { channels: 2, sample_rate: 44100 };
//!
//! // Producer: 100 stereo frames
//! let accepted = buffer.push(format, &[0i16; 200]);
//! assert_eq!(accepted, 100);
//!
//! // Consumer
//! let chunk = buffer.pull(400);
//! assert_eq!(chunk.bytes.len(), 400);
//! ```

use bridge_traits::DeliveryFormat;
use bytes::Bytes;
use core_runtime::config::AudioBufferConfig;
use parking_lot::Mutex;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_CHANNELS: u16 = 2;
pub const BITS_PER_SAMPLE: u16 = 16;
pub const DEFAULT_BITRATE_KBPS: u32 = 320;

const BYTES_PER_SAMPLE: usize = 2;

/// One consumer pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameChunk {
    /// Interleaved signed 16-bit little-endian samples.
    pub bytes: Bytes,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub bitrate_kbps: u32,
    /// Set only once the track ended and every buffered byte was pulled.
    pub end_of_track: bool,
}

impl FrameChunk {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

struct BufferState {
    data: Vec<u8>,
    write_pos: usize,
    ready: bool,
    end_of_track: bool,
    channels: u16,
    sample_rate: u32,
}

impl BufferState {
    fn chunk(&self, bytes: Bytes, end_of_track: bool) -> FrameChunk {
        FrameChunk {
            bytes,
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: BITS_PER_SAMPLE,
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            end_of_track,
        }
    }
}

pub struct AudioDeliveryBuffer {
    state: Mutex<BufferState>,
    capacity: usize,
    start_threshold: usize,
}

impl AudioDeliveryBuffer {
    /// Create a buffer from a validated config.
    pub fn new(config: AudioBufferConfig) -> Self {
        Self {
            state: Mutex::new(BufferState {
                data: vec![0; config.capacity_bytes],
                write_pos: 0,
                ready: false,
                end_of_track: false,
                channels: DEFAULT_CHANNELS,
                sample_rate: DEFAULT_SAMPLE_RATE,
            }),
            capacity: config.capacity_bytes,
            start_threshold: config.start_threshold_bytes,
        }
    }

    /// Copy as many whole frames of `samples` as fit.
    ///
    /// Returns the number of frames accepted.
    pub fn push(&self, format: DeliveryFormat, samples: &[i16]) -> usize {
        let channels = usize::from(format.channels);
        if channels == 0 {
            return 0;
        }
        let frame_bytes = channels * BYTES_PER_SAMPLE;
        let offered = samples.len() / channels;

        let mut state = self.state.lock();
        let free_frames = (self.capacity - state.write_pos) / frame_bytes;
        let frames = offered.min(free_frames);

        let start = state.write_pos;
        for (i, sample) in samples[..frames * channels].iter().enumerate() {
            let at = start + i * BYTES_PER_SAMPLE;
            state.data[at..at + BYTES_PER_SAMPLE].copy_from_slice(&sample.to_le_bytes());
        }

        state.write_pos += frames * frame_bytes;
        state.channels = format.channels;
        state.sample_rate = format.sample_rate;

        if frames < offered || state.write_pos >= self.start_threshold {
            state.ready = true;
        }

        frames
    }

    /// Record that the producer has no more frames for this track.
    pub fn mark_end_of_track(&self) {
        let mut state = self.state.lock();
        state.end_of_track = true;
        // A track shorter than the threshold must still drain
        state.ready = true;
    }

    /// Take up to `max_bytes` from the front of the buffer.
    pub fn pull(&self, max_bytes: usize) -> FrameChunk {
        let mut state = self.state.lock();

        if !state.ready {
            return state.chunk(Bytes::new(), false);
        }

        if state.write_pos == 0 {
            let end = state.end_of_track;
            return state.chunk(Bytes::new(), end);
        }

        let take = state.write_pos.min(max_bytes);
        let bytes = Bytes::copy_from_slice(&state.data[..take]);
        let write_pos = state.write_pos;
        state.data.copy_within(take..write_pos, 0);
        state.write_pos -= take;

        state.chunk(bytes, false)
    }

    /// Empty chunk in the current format. Never marks end of track.
    pub fn idle(&self) -> FrameChunk {
        self.state.lock().chunk(Bytes::new(), false)
    }

    /// Discard buffered audio after a seek. The start gate stays open.
    pub fn discard(&self) {
        self.state.lock().write_pos = 0;
    }

    /// Prepare for a new track: empty, gated, default format.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.write_pos = 0;
        state.ready = false;
        state.end_of_track = false;
        state.channels = DEFAULT_CHANNELS;
        state.sample_rate = DEFAULT_SAMPLE_RATE;
    }

    /// Bytes buffered and not yet pulled.
    pub fn buffered(&self) -> usize {
        self.state.lock().write_pos
    }

    pub fn free_space(&self) -> usize {
        self.capacity - self.buffered()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    /// Returns `true` if the buffer has no bytes available.
    pub fn is_empty(&self) -> bool {
        self.buffered() == 0
    }
}
