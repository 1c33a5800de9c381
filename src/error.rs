//! Error types for the Langfuse provider.

use thiserror::Error;

use crate::client::ApiError;
use crate::schema::Diagnostic;

/// Errors that can occur while serving a provider operation.
///
/// Every variant can be rendered as a [`Diagnostic`] with a short summary and
/// a detail string, see [`ProviderError::to_diagnostic`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A lifecycle operation failed. The detail carries the remote message
    /// and the identifiers involved.
    #[error("{summary}: {detail}")]
    Failed {
        /// Short, stable summary (e.g. "Error creating organization").
        summary: String,
        /// Remote message plus resource identifiers.
        detail: String,
    },

    /// A configured attribute holds a value the provider rejects locally.
    #[error("{summary}: {detail}")]
    InvalidAttribute {
        /// Short summary (e.g. "Invalid Role").
        summary: String,
        /// The offending value and the accepted values.
        detail: String,
        /// Path of the attribute.
        attribute: String,
    },

    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The supplied state or configuration does not match the schema.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider is not configured, or is missing a credential.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A remote call failed and no operation context was attached.
    #[error("Remote API error: {0}")]
    Api(#[from] ApiError),
}

impl ProviderError {
    /// Build a [`ProviderError::Failed`].
    pub fn failed(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Failed {
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Short summary suitable for the headline of a diagnostic.
    pub fn summary(&self) -> String {
        match self {
            Self::Failed { summary, .. } | Self::InvalidAttribute { summary, .. } => {
                summary.clone()
            },
            Self::NotFound(_) => "Resource not found".to_string(),
            Self::Validation(_) => "Validation error".to_string(),
            Self::Configuration(_) => "Configuration error".to_string(),
            Self::UnknownResource(_) => "Unknown resource type".to_string(),
            Self::Serialization(_) => "Serialization error".to_string(),
            Self::Api(_) => "Remote API error".to_string(),
        }
    }

    /// Detail string carrying the underlying message.
    pub fn detail(&self) -> String {
        match self {
            Self::Failed { detail, .. } | Self::InvalidAttribute { detail, .. } => detail.clone(),
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg) => msg.clone(),
            Self::Serialization(err) => err.to_string(),
            Self::Api(err) => err.to_string(),
        }
    }

    /// Render the error as an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.summary()).with_detail(self.detail());
        match self {
            Self::InvalidAttribute { attribute, .. } => diagnostic.with_attribute(attribute),
            _ => diagnostic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("resource-123".to_string());
        assert_eq!(format!("{}", err), "Resource not found: resource-123");

        let err = ProviderError::Validation("invalid input".to_string());
        assert_eq!(format!("{}", err), "Validation error: invalid input");

        let err = ProviderError::failed("Error reading project", "boom");
        assert_eq!(format!("{}", err), "Error reading project: boom");
    }

    #[test]
    fn test_summary_and_detail() {
        let err = ProviderError::failed(
            "Invalid import format",
            "Import ID must be in format: a,b",
        );
        assert_eq!(err.summary(), "Invalid import format");
        assert_eq!(err.detail(), "Import ID must be in format: a,b");

        let err = ProviderError::Configuration("admin_api_key is not set".to_string());
        assert_eq!(err.summary(), "Configuration error");
        assert_eq!(err.detail(), "admin_api_key is not set");
    }

    #[test]
    fn test_to_diagnostic() {
        let err = ProviderError::InvalidAttribute {
            summary: "Invalid Role".to_string(),
            detail: "Role must be one of: OWNER. Got: KING".to_string(),
            attribute: "role".to_string(),
        };
        let diagnostic = err.to_diagnostic();

        assert_eq!(diagnostic.severity, DiagnosticSeverity::Error);
        assert_eq!(diagnostic.summary, "Invalid Role");
        assert_eq!(diagnostic.attribute, Some("role".to_string()));
        assert!(diagnostic.detail.unwrap().contains("KING"));
    }

    #[test]
    fn test_api_error_conversion() {
        let err: ProviderError = ApiError::NotFound {
            message: "gone".to_string(),
        }
        .into();
        assert!(matches!(err, ProviderError::Api(_)));
        assert_eq!(err.summary(), "Remote API error");
        assert!(err.detail().contains("gone"));
    }
}
