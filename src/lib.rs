//! guacgate library
//!
//! Access-control and session-bookkeeping layer in front of a guacd-backed
//! remote-desktop tunnel gateway.
//!
//! # Features
//!
//! - **AuthGate**: trusted-header and HTTP Basic authentication wrapping every route
//! - **AccessFilter**: per-connection-profile user allow-lists
//! - **SessionRegistry**: refcounts of live tunnels per session identifier
//! - **ProfileStore**: YAML-persisted catalog of reusable connection profiles
//!
//! The wire protocol, WebSocket tunnel lifecycle and the guacd dialer are
//! external collaborators: embedders mount their tunnel routes via
//! [`server::Gateway::merge_tunnel`] and drive the registry and store through
//! the handles the gateway exposes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod profiles;
pub mod server;
pub mod sessions;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    Ok(())
}
