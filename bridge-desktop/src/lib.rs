//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop media centers
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FileSystemAccess` using `std::fs`
//! - `SecureStore` using the `keyring` crate, or an in-memory store when the
//!   `secure-store` feature is off
//! - `ListingPaths` using the media center's `musicdb://` conventions
//!
//! The remote service client, the catalog and the presenter are always
//! supplied by the host.
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{MusicDbPaths, StdFileSystem};
//!
//! let fs = StdFileSystem::new();
//! let thumbs = fs.temp_root().join("thumbs");
//! let paths = MusicDbPaths;
//! ```

mod filesystem;
mod memory_store;
mod paths;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use filesystem::StdFileSystem;
pub use memory_store::MemorySecureStore;
pub use paths::MusicDbPaths;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
