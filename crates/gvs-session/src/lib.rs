//! Event wiring for gvs.
//!
//! Turns IDE lifecycle signals into cache refreshes. Every signal is a
//! [`StatusEvent`] delivered to one entry point, [`Session::handle`]; the
//! session also drains repository results into its
//! [`ProjectStatusCache`](gvs_cache::ProjectStatusCache).
//!
//! # Key Types
//!
//! - [`Session`] -- Owns the cache, handles events, runs the main loop
//! - [`StatusEvent`] -- Lifecycle signals from the IDE
//! - [`SessionConfig`] -- TOML configuration

pub mod config;
pub mod error;
pub mod event;
pub mod session;

pub use config::SessionConfig;
pub use error::{ConfigError, ConfigResult};
pub use event::StatusEvent;
pub use session::Session;
