//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the bridge core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Every component crate depends on this one for its logging conventions,
//! its share of the [`CoreConfig`](config::CoreConfig) and the
//! [`EventBus`](events::EventBus) it publishes notifications on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
