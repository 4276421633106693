//! # Browse Module
//!
//! Search, artist and album browsing over the remote session.
//!
//! ## Overview
//!
//! This module handles:
//! - The single in-flight remote query and its progress indicator
//! - Conversion of results into view items, catalog entries first
//! - Thumbnail requests for every converted album and track
//! - Playlist listings
//! - Copying a browsed album into the local catalog
//!
//! Completed queries are announced with
//! `BrowseEvent::ResultSetUpdated { target }`; the host then reads the result
//! set for that target.

pub mod aggregator;
pub mod error;
pub mod library;
pub mod progress;
pub mod query;

pub use aggregator::ResultAggregator;
pub use error::{BrowseError, Result};
pub use progress::{IndicatorOwner, ProgressReporter};
pub use query::{
    AlbumResultSet, ArtistResultSet, QueryEpoch, QueryKind, ResetScope, SearchResultSet,
};
