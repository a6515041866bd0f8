use thiserror::Error;

/// Errors surfaced by the term sources, the statistics client and the tree core.
///
/// `Clone` so a single failed fetch can be handed to every caller that was
/// waiting on the same in-flight request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PhenoscopeError {
    /// Network failure or non-success status from a remote service.
    #[error("Fetch failed for {target}: {reason}")]
    FetchFailed { target: String, reason: String },

    /// The response arrived but did not have the expected shape.
    #[error("Malformed response for {target}: {reason}")]
    MalformedResponse { target: String, reason: String },

    #[error("Unknown term: {0}")]
    UnknownTerm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Security error: {0}")]
    Security(String),
}

impl PhenoscopeError {
    pub fn fetch_failed(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::FetchFailed { target: target.into(), reason: reason.to_string() }
    }

    pub fn malformed(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedResponse { target: target.into(), reason: reason.to_string() }
    }

    /// True for the two remote-service failures that leave state untouched
    /// and can be retried by repeating the user action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed { .. } | Self::MalformedResponse { .. })
    }
}

impl From<reqwest::Error> for PhenoscopeError {
    fn from(e: reqwest::Error) -> Self {
        let target = e
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown url>".to_string());
        if e.is_decode() {
            Self::malformed(target, e)
        } else {
            Self::fetch_failed(target, e)
        }
    }
}

impl From<serde_json::Error> for PhenoscopeError {
    fn from(e: serde_json::Error) -> Self {
        Self::malformed("<json body>", e)
    }
}

pub type Result<T> = std::result::Result<T, PhenoscopeError>;
