//! Failures reported by the remote API gateway.

use thiserror::Error;

/// A classified failure of one remote call.
///
/// Variants that originate from the remote keep its message verbatim so
/// callers can inspect it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request could not be sent or its body could not be read.
    #[error("failed to make request {operation}: {message}")]
    Transport {
        /// Gateway operation (e.g. `get_organization`).
        operation: String,
        /// Transport error text.
        message: String,
    },

    /// The remote answered 404.
    #[error("not found: {message}")]
    NotFound {
        /// Remote message.
        message: String,
    },

    /// The remote answered with a non-success status other than 404.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Remote message.
        message: String,
    },

    /// The remote answered 2xx but flagged the call as unsuccessful.
    #[error("request rejected: {message}")]
    Rejected {
        /// Remote message.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("failed to decode response of {operation}: {message}")]
    Decode {
        /// Gateway operation.
        operation: String,
        /// Decoder error text.
        message: String,
    },
}

impl ApiError {
    /// The message supplied by the remote, if the failure came from the remote.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::NotFound { message }
            | Self::Status { message, .. }
            | Self::Rejected { message } => Some(message),
            Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }

    /// Whether the remote reported that the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the remote message contains `needle`.
    pub fn remote_message_contains(&self, needle: &str) -> bool {
        self.remote_message()
            .is_some_and(|message| message.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_message_is_verbatim() {
        let err = ApiError::Status {
            status: 400,
            message: "Cannot delete organization with existing projects".to_string(),
        };
        assert_eq!(
            err.remote_message(),
            Some("Cannot delete organization with existing projects")
        );
        assert!(err.remote_message_contains("existing projects"));
        assert_eq!(
            err.to_string(),
            "HTTP 400: Cannot delete organization with existing projects"
        );
    }

    #[test]
    fn local_failures_have_no_remote_message() {
        let err = ApiError::Transport {
            operation: "list_projects".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(err.remote_message().is_none());
        assert!(!err.remote_message_contains("connection"));
        assert!(!err.is_not_found());
        assert!(ApiError::NotFound {
            message: String::new()
        }
        .is_not_found());
    }
}
