//! Error types for provider access

use eval_core::FailureReason;
use thiserror::Error;

/// Errors raised while talking to an evidence provider
///
/// These never leave an agent: [`FailureReason::from`] turns them into the
/// failure recorded for the run.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The query lacks an input this source needs
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// The source is not configured (missing API key and the like)
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// The provider answered with a non-success status
    #[error("{provider} returned HTTP {status}: {body}")]
    Provider {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The provider reported a failure inside a successful response
    #[error("{provider} error: {message}")]
    Rejected {
        provider: &'static str,
        message: String,
    },

    /// The provider knows nothing about the subject
    #[error("Not found: {0}")]
    NotFound(String),

    /// The response did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// The deadline passed before the provider finished
    #[error("Deadline reached while waiting for {0}")]
    Deadline(&'static str),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;

impl SourceError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            SourceError::Provider { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<SourceError> for FailureReason {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::MissingInput(what) => FailureReason::MissingInput(what),
            SourceError::NotFound(_) => FailureReason::Empty,
            SourceError::Deadline(_) => FailureReason::Timeout,
            SourceError::Network(e) => FailureReason::Network(e.to_string()),
            SourceError::Parse(message) => FailureReason::Parse(message),
            SourceError::Json(e) => FailureReason::Parse(e.to_string()),
            error @ (SourceError::NotConfigured(_)
            | SourceError::Provider { .. }
            | SourceError::Rejected { .. }
            | SourceError::Io(_)) => FailureReason::Provider(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let provider = |status| SourceError::Provider {
            provider: "newsapi",
            status,
            body: String::new(),
        };
        assert!(provider(429).is_transient());
        assert!(provider(503).is_transient());
        assert!(!provider(401).is_transient());
        assert!(!SourceError::Parse("bad".to_string()).is_transient());
    }

    #[test]
    fn test_conversion_to_failure_reason() {
        let missing: FailureReason = SourceError::MissingInput("profile url".to_string()).into();
        assert!(missing.is_missing_input());

        let deadline: FailureReason = SourceError::Deadline("snapshot").into();
        assert!(deadline.is_timeout());

        let unknown: FailureReason = SourceError::NotFound("Acme".to_string()).into();
        assert_eq!(unknown, FailureReason::Empty);

        let rejected: FailureReason = SourceError::Provider {
            provider: "newsapi",
            status: 401,
            body: "apiKeyInvalid".to_string(),
        }
        .into();
        assert_eq!(
            rejected,
            FailureReason::Provider("newsapi returned HTTP 401: apiKeyInvalid".to_string())
        );
    }
}
