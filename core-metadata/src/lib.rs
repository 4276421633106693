//! # Metadata Module
//!
//! View items and their album art.
//!
//! ## Overview
//!
//! This module handles:
//! - Conversion of remote artists, albums, tracks and playlists into view items
//! - Catalog-backed album items with placeholder fallback
//! - The cache-first thumbnail pipeline and its four category directories

pub mod error;
pub mod items;
pub mod thumbnail;

pub use error::{ArtworkError, Result};
pub use items::{AlbumInfo, ItemDetails, ViewItem};
pub use thumbnail::{ResolveOutcome, ThumbnailCache, ThumbnailCategory, ThumbnailPipeline};
