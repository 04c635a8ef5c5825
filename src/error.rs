//! Error types for the Instana provider.

use crate::schema::Diagnostics;
use thiserror::Error;

/// Errors raised by the provider lifecycle and the Instana REST layer.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP transport failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Instana API answered with an unexpected status code.
    #[error("Instana API returned status {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body as returned by the API.
        body: String,
    },

    /// Mapping between state and API object produced error diagnostics.
    #[error("{0}")]
    Diagnostics(Diagnostics),

    /// Permission denied (authentication/authorization failure).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Operation not supported by the API resource (e.g. update of a create-only object).
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// The provider was used before `configure` succeeded.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::PermissionDenied(msg)
            | Self::Unimplemented(msg)
            | Self::FailedPrecondition(msg) => msg.clone(),
            Self::Serialization(err) => err.to_string(),
            Self::Http(err) => err.to_string(),
            Self::Api { body, .. } => body.clone(),
            Self::Diagnostics(diags) => diags.to_string(),
        }
    }

    /// Returns true for 404 style errors, which the read path turns into resource removal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<Diagnostics> for ProviderError {
    fn from(diags: Diagnostics) -> Self {
        Self::Diagnostics(diags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Diagnostic;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("resource-123".to_string());
        assert_eq!(format!("{}", err), "Resource not found: resource-123");

        let err = ProviderError::Validation("invalid input".to_string());
        assert_eq!(format!("{}", err), "Validation error: invalid input");

        let err = ProviderError::UnknownResource("instana_foo".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: instana_foo");

        let err = ProviderError::Api {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(format!("{}", err), "Instana API returned status 500: boom");
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::NotFound("resource-123".to_string());
        assert_eq!(err.message(), "resource-123");

        let err = ProviderError::Configuration("invalid config".to_string());
        assert_eq!(err.message(), "invalid config");

        let err = ProviderError::Unimplemented("update".to_string());
        assert_eq!(err.message(), "update");
    }

    #[test]
    fn test_from_diagnostics() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::error("Unsupported entity type").with_detail("foo"));

        let err: ProviderError = diags.into();
        assert!(matches!(err, ProviderError::Diagnostics(_)));
        assert!(err.message().contains("Unsupported entity type"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_is_not_found() {
        assert!(ProviderError::NotFound("x".into()).is_not_found());
        assert!(!ProviderError::Validation("x".into()).is_not_found());
    }
}
