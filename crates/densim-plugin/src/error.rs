//! Error types for the plugin layer.

use densim_core::{ConfigError, SessionError};
use thiserror::Error;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors reported to the host.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PluginError {
    /// The session rejected the request.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The `method` argument could not be parsed.
    #[error("Invalid measurement method: {0}")]
    InvalidMethod(String),

    /// Invalid plugin configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The tracing subscriber could not be installed.
    #[error("Tracing setup failed: {0}")]
    Tracing(String),
}
