//! Website Eater error types

use thiserror::Error;

/// Website Eater error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Page could not be fetched or parsed
    #[error("Failed to fetch URL: {0}")]
    Fetch(String),

    /// LLM API error
    #[error("LLM error: {0}")]
    Llm(String),

    /// LLM API quota exhausted (HTTP 429 / RESOURCE_EXHAUSTED)
    #[error("API quota exceeded: {0}")]
    Quota(String),

    /// Memory store error
    #[error("Memory error: {0}")]
    Memory(String),

    /// Gateway error
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Request rejected before processing
    #[error("{0}")]
    InvalidRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error means the LLM quota is exhausted
    pub fn is_quota(&self) -> bool {
        matches!(self, Error::Quota(_))
    }

    /// Short variant name, reported as `error_type` in API responses
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Fetch(_) => "fetch",
            Error::Llm(_) => "llm",
            Error::Quota(_) => "quota",
            Error::Memory(_) => "memory",
            Error::Gateway(_) => "gateway",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Io(_) => "io",
            Error::Internal(_) => "internal",
        }
    }
}

/// Result type alias for Website Eater operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_detection() {
        assert!(Error::Quota("429".to_string()).is_quota());
        assert!(!Error::Llm("bad request".to_string()).is_quota());
    }

    #[test]
    fn test_error_display() {
        let err = Error::Fetch("HTTP 404 for: https://example.com".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to fetch URL: HTTP 404 for: https://example.com"
        );
        assert_eq!(err.kind(), "fetch");

        let err = Error::InvalidRequest("No URL provided".to_string());
        assert_eq!(err.to_string(), "No URL provided");
    }
}
