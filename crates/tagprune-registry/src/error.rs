//! Error types for registry operations.

use thiserror::Error;

use crate::deleter::DeletionFailure;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to connect to registry.
    #[error("Failed to connect to registry at {url}: {source}")]
    ConnectionFailed {
        /// Registry URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Error message.
        message: String,
    },

    /// Required credentials are not configured.
    #[error("Missing credentials: {variable} is not set")]
    MissingCredentials {
        /// Name of the missing variable.
        variable: String,
    },

    /// HTTP error from registry.
    #[error("HTTP error from registry: {status} - {message}")]
    HttpError {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// The registry API rejected the request.
    #[error("Registry error {code}: {message}")]
    ServiceError {
        /// Error code reported by the API (e.g. `RepositoryNotFoundException`).
        code: String,
        /// Error message.
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {source}")]
    JsonError {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Invalid URL.
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        /// URL string.
        url: String,
    },

    /// The registry returned an image record that cannot be classified.
    #[error("Invalid image record in {repository}: {source}")]
    InvalidRecord {
        /// Repository being listed.
        repository: String,
        /// Underlying validation error.
        #[source]
        source: tagprune_core::Error,
    },

    /// The registry kept returning continuation tokens.
    #[error("Listing {repository} exceeded {max_pages} pages")]
    PaginationLimit {
        /// Repository being listed.
        repository: String,
        /// Configured page limit.
        max_pages: usize,
    },

    /// The registry rejected some of the images in a delete batch.
    #[error(
        "Failed to delete {} image(s) from {repository} ({} deleted before the failure)",
        .failures.len(),
        .deleted.len()
    )]
    PartialDeletion {
        /// Repository being pruned.
        repository: String,
        /// Digests deleted before the failing batch completed.
        deleted: Vec<String>,
        /// Rejected digests with reasons.
        failures: Vec<DeletionFailure>,
    },

    /// Request signing failed.
    #[error("Failed to sign request: {message}")]
    SigningFailed {
        /// Error message.
        message: String,
    },
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::ConnectionFailed {
                url: err
                    .url()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string),
                source: err,
            }
        } else if err.is_status() {
            let status = err.status().map_or(0, |s| s.as_u16());
            Self::HttpError {
                status,
                message: err.to_string(),
            }
        } else {
            Self::HttpError {
                status: 0,
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError { source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_service_error() {
        let err = RegistryError::ServiceError {
            code: "RepositoryNotFoundException".to_string(),
            message: "The repository 'app' does not exist".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Registry error RepositoryNotFoundException: The repository 'app' does not exist"
        );
    }

    #[test]
    fn test_error_display_pagination_limit() {
        let err = RegistryError::PaginationLimit {
            repository: "app".to_string(),
            max_pages: 3,
        };
        assert_eq!(err.to_string(), "Listing app exceeded 3 pages");
    }

    #[test]
    fn test_error_display_partial_deletion() {
        let err = RegistryError::PartialDeletion {
            repository: "app".to_string(),
            deleted: vec!["sha256:a".to_string(), "sha256:b".to_string()],
            failures: vec![DeletionFailure {
                digest: "sha256:c".to_string(),
                code: "ImageNotFound".to_string(),
                reason: "Requested image not found".to_string(),
            }],
        };
        assert_eq!(
            err.to_string(),
            "Failed to delete 1 image(s) from app (2 deleted before the failure)"
        );
    }

    #[test]
    fn test_error_display_missing_credentials() {
        let err = RegistryError::MissingCredentials {
            variable: "AWS_ACCESS_KEY_ID".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing credentials: AWS_ACCESS_KEY_ID is not set"
        );
    }
}
