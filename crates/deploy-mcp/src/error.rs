//! Error types for the deploy MCP server.

use thiserror::Error;

/// Bootstrap errors (config loading, listener setup). Tool failures never surface here; they
/// become error-flagged tool results.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid config file contents or flag combinations
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server failed to start
    #[error("Startup error: {0}")]
    Startup(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Outbound HTTP client construction
    #[error("HTTP client error: {0}")]
    Http(#[from] unrelated_provider_http::ProviderHttpError),
}

/// Result type alias for server bootstrap.
pub type Result<T> = std::result::Result<T, ServerError>;
