use thiserror::Error;

/// Application-wide error types for Harvest.
#[derive(Error, Debug)]
pub enum AppError {
    /// Pattern configuration is missing a section or is malformed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An input artifact (frontier file, job list, HTML dump) is missing or unparsable.
    #[error("Input error: {0}")]
    InputError(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Request could not be built or its body could not be read.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Headless browser failed to launch, navigate, or render.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// The site's robots.txt disallows the URL for our user agent.
    #[error("Disallowed by robots.txt: {0}")]
    Disallowed(String),

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    ///
    /// Timeouts, connection failures and 5xx responses are retried; 4xx
    /// responses never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true for 4xx responses: the server rejected the request itself.
    pub fn is_client_rejection(&self) -> bool {
        matches!(self, AppError::HttpStatus { status, .. } if (400..500).contains(status))
    }
}

/// Why a raw job URL was dropped by the validator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationRejection {
    #[error("empty URL")]
    EmptyUrl,

    #[error("matches invalid pattern {pattern}")]
    InvalidPattern { pattern: String },

    #[error("does not match the valid job URL pattern")]
    NoValidMatch,
}

/// Why a downloaded page produced no record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("error page detected: {marker}")]
    ErrorPage { marker: String },

    #[error("mandatory field `{field}` could not be resolved")]
    MissingField { field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(AppError::NetworkError("reset".into()).is_retryable());
        assert!(AppError::Timeout(30).is_retryable());
        assert!(
            AppError::HttpStatus {
                status: 503,
                url: "https://example.com".into()
            }
            .is_retryable()
        );
        assert!(
            !AppError::HttpStatus {
                status: 404,
                url: "https://example.com".into()
            }
            .is_retryable()
        );
        assert!(!AppError::ConfigError("bad".into()).is_retryable());
        assert!(!AppError::Disallowed("https://example.com".into()).is_retryable());
    }

    #[test]
    fn test_client_rejection() {
        let not_found = AppError::HttpStatus {
            status: 404,
            url: "u".into(),
        };
        let server = AppError::HttpStatus {
            status: 500,
            url: "u".into(),
        };
        assert!(not_found.is_client_rejection());
        assert!(!server.is_client_rejection());
        assert!(!AppError::Timeout(5).is_client_rejection());
    }
}
