//! # Playback Module
//!
//! Turns the remote library's pushed audio into frames the host pulls.
//!
//! ## Overview
//!
//! This module handles:
//! - The bounded [`AudioDeliveryBuffer`] shared by the delivery callback and
//!   the host's playback thread
//! - Nested load/unload of the remote player
//! - Seeking and end-of-track reporting

pub mod delivery_buffer;
pub mod error;
pub mod player;

pub use delivery_buffer::{AudioDeliveryBuffer, FrameChunk};
pub use error::{PlaybackError, Result};
pub use player::{PlaybackSession, Player};
