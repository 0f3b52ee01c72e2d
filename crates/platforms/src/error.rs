//! Error types for the deployment platform adapters.

use crate::model::Platform;
use thiserror::Error;

/// Main error type for adapter and validation operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeployError {
    /// A named input failed sanitization or its schema.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Credential verification failed, or an operation needing credentials ran without them.
    #[error("Authentication failed for {platform}: {message}")]
    Authentication { platform: Platform, message: String },

    /// No adapter is registered for the requested platform id.
    #[error("Platform '{requested}' is not supported. Supported platforms: {supported}")]
    PlatformUnsupported { requested: String, supported: String },

    /// The provider call failed (transport, non-2xx, malformed body).
    #[error("{platform} request failed: {message}")]
    ProviderRequest { platform: Platform, message: String },
}

impl DeployError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn authentication(platform: Platform, message: impl Into<String>) -> Self {
        Self::Authentication {
            platform,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_authenticated(platform: Platform) -> Self {
        Self::authentication(
            platform,
            format!("not authenticated; call the authenticate tool for '{platform}' first"),
        )
    }

    pub fn unsupported<'a>(
        requested: impl Into<String>,
        supported: impl IntoIterator<Item = &'a Platform>,
    ) -> Self {
        Self::PlatformUnsupported {
            requested: requested.into(),
            supported: supported
                .into_iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn provider(platform: Platform, message: impl Into<String>) -> Self {
        Self::ProviderRequest {
            platform,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::ProviderRequest { .. })
    }
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, DeployError>;
