use thiserror::Error;

/// Errors returned by index store operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SearchError {
    /// Transport failures, throttling and server errors are worth retrying;
    /// client errors and bad responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::Request(_) | SearchError::Timeout => true,
            SearchError::Status { status, .. } => *status == 429 || *status >= 500,
            SearchError::Parse(_) | SearchError::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchError::Timeout
        } else {
            SearchError::Request(err.to_string())
        }
    }
}
