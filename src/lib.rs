//! Workspace façade crate.
//!
//! Re-exports [`core_service`] so that host applications can depend on
//! `spotbridge` alone and pick platform defaults through feature flags
//! (`desktop-shims`, `keyring-store`) instead of wiring each crate.

#[cfg(any(feature = "desktop-shims", feature = "keyring-store"))]
pub use core_service::{CoreError, CoreService, Result};
