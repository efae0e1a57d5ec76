//! GitHub API error types.

use thiserror::Error;

/// Errors that can occur when calling the GitHub API.
///
/// The variants separate the conditions the sync engine reacts to
/// (`NotFound`, `Blocked`) from generic failures it only reports.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// 404 - the resource does not exist (or is not visible to the credential).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// 451, or 403 "Repository access blocked" - the repository has been
    /// taken down.
    #[error("Access blocked: {resource}")]
    Blocked { resource: String },

    /// The credential's quota or the abuse-detection limit was hit.
    #[error("Rate limit exceeded: {message}")]
    RateLimited { message: String },

    /// Any other non-success HTTP status.
    #[error("GitHub API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// Connection, TLS, or timeout failure.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The response body did not have the expected shape.
    #[error("Unexpected response: {message}")]
    Decode { message: String },
}

impl ApiError {
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, resource: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::not_found(resource),
            451 => Self::Blocked {
                resource: resource.to_string(),
            },
            429 => Self::RateLimited { message },
            403 if is_rate_limit_message(&message) => Self::RateLimited { message },
            403 if is_blocked_message(&message) => Self::Blocked {
                resource: resource.to_string(),
            },
            _ => Self::Status { status, message },
        }
    }

    /// Whether the error means the resource is gone for good (not found or blocked).
    #[inline]
    pub fn is_removed_upstream(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Blocked { .. })
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("rate limit") || lower.contains("abuse")
}

fn is_blocked_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains("access blocked")
}

/// Convert an octocrab error, keeping the resource path for context.
pub(crate) fn from_octocrab(err: octocrab::Error, resource: &str) -> ApiError {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            ApiError::from_status(source.status_code.as_u16(), resource, source.message)
        }
        octocrab::Error::Json { source, .. } => ApiError::decode(source.to_string()),
        octocrab::Error::Serde { source, .. } => ApiError::decode(source.to_string()),
        other => ApiError::transport(short_error_message(&other)),
    }
}

/// Take the first line of an error message, dropping backtraces and detail.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classifies_removal() {
        assert!(ApiError::from_status(404, "/repos/a/b", "Not Found").is_removed_upstream());
        assert!(
            ApiError::from_status(451, "/repos/a/b", "Repository access blocked")
                .is_removed_upstream()
        );
        assert!(!ApiError::from_status(500, "/repos/a/b", "boom").is_removed_upstream());
    }

    #[test]
    fn test_forbidden_access_blocked_is_removal() {
        let err = ApiError::from_status(
            403,
            "/repos/a/b/git/refs/tags",
            "Repository access blocked",
        );
        assert!(matches!(err, ApiError::Blocked { .. }));
        assert!(err.is_removed_upstream());

        let err = ApiError::from_status(403, "/repos/a/b", "Must have admin rights");
        assert!(!err.is_removed_upstream());
    }

    #[test]
    fn test_from_status_detects_rate_limits() {
        assert!(matches!(
            ApiError::from_status(403, "/markdown", "API rate limit exceeded for user"),
            ApiError::RateLimited { .. }
        ));
        assert!(matches!(
            ApiError::from_status(429, "/markdown", "slow down"),
            ApiError::RateLimited { .. }
        ));
        assert!(matches!(
            ApiError::from_status(403, "/repos/a/b", "Resource not accessible"),
            ApiError::Status { status: 403, .. }
        ));
    }

    #[test]
    fn test_not_found_is_not_blocked() {
        let err = ApiError::not_found("/users/ghost/starred");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/users/ghost/starred"));

        let blocked = ApiError::from_status(451, "/repos/a/b", "blocked");
        assert!(!blocked.is_not_found());
    }

    #[test]
    fn test_short_error_message_takes_first_line() {
        let err = std::io::Error::other("first line\nsecond line");
        assert_eq!(short_error_message(&err), "first line");
    }
}
