//! # Session Module
//!
//! Connection lifecycle for the remote media service.
//!
//! ## Overview
//!
//! This module owns the single remote session handle. It handles:
//!
//! - Session construction and login with stored or prompted credentials
//! - The retry dialog after a failed login or a dropped connection
//! - The event pump the host drives from its UI thread
//! - Routing of audio deliveries to the registered [`AudioSink`]
//!
//! Remote callbacks only touch shared state; all UI work happens inside
//! [`Session::pump_events`].

pub mod credentials;
pub mod error;
pub mod session;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use credentials::{CredentialStore, Credentials};
pub use error::{ConnectError, LogoutError, Result, SessionError};
pub use session::Session;
pub use types::{AudioSink, ConnectionState};
