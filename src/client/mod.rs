//! Facility Booking Protocol - Client Library
//!
//! High-level API for booking clients: configuration, one-shot requests,
//! watch subscriptions, and a [`Session`] that owns the request id counter.

#[allow(clippy::module_inception)]
mod client;
mod config;
mod session;
mod watch;

pub use client::{BookingClient, ClientError};
pub use config::{ClientConfig, ClientConfigBuilder, ConfigError};
pub use session::Session;
pub use watch::{PushedUpdate, WatchError, WatchOptions, WatchPhase, WatchSummary, Watcher};
