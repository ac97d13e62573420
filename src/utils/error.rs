//! Error types for EcoCore

use thiserror::Error;

/// Main error type for EcoCore operations
///
/// Runtime instrumentation never fails; these errors only surface at the
/// construction boundaries (parsing a page, reading options or resource
/// dumps).
#[derive(Debug, Error)]
pub enum EcoError {
    /// Document-related errors
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),
    /// Invalid initialization options
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Malformed JSON input
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Document-specific errors
#[derive(Debug, Error)]
pub enum DomError {
    /// HTML parsing error
    #[error("HTML parse failed: {0}")]
    HtmlParse(String),
    /// Unsupported or malformed selector
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },
}

impl DomError {
    pub(crate) fn selector(selector: &str, reason: impl Into<String>) -> Self {
        Self::Selector {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience Result type for EcoCore operations
pub type Result<T> = std::result::Result<T, EcoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_error_message() {
        let err: EcoError = DomError::selector("div p", "combinators are not supported").into();
        assert_eq!(
            err.to_string(),
            "DOM error: invalid selector `div p`: combinators are not supported"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.html");
        let err = EcoError::from(io);
        assert!(matches!(err, EcoError::Io(_)));
    }
}
