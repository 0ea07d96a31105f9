//! Error types for guacgate

use std::io;

use thiserror::Error;

/// Result type alias for guacgate
pub type Result<T> = std::result::Result<T, Error>;

/// guacgate errors
///
/// Authentication and authorization rejections are not errors: they are
/// terminal HTTP responses produced at the boundary. The variants here cover
/// configuration, persistence and server plumbing.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
