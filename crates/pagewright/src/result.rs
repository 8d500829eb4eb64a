//! Result and error types for pagewright.

use thiserror::Error;

/// Result type for pagewright operations
pub type UiResult<T> = Result<T, UiError>;

/// Errors that can occur while driving a page
#[derive(Debug, Error)]
pub enum UiError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// The driver rejected or failed a primitive
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms: {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// What was being waited for
        waited_for: String,
    },

    /// Page markup kept changing past the stability bound
    #[error("DOM did not settle within {ms}ms")]
    DomNotStable {
        /// Maximum wait in milliseconds
        ms: u64,
    },

    /// No popup page appeared within the discovery window
    #[error("No popup opened within {ms}ms")]
    PopupNotOpened {
        /// Discovery window in milliseconds
        ms: u64,
    },

    /// Selector resolved to no element where one is required
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// Selector that matched nothing
        selector: String,
    },

    /// No page (tab) at the requested index
    #[error("No page at index {index}")]
    PageNotFound {
        /// Requested page index
        index: usize,
    },

    /// Session has no page to act on
    #[error("Session has no active page")]
    NoActivePage,

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl UiError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(ms: u64, waited_for: impl Into<String>) -> Self {
        Self::Timeout {
            ms,
            waited_for: waited_for.into(),
        }
    }

    /// Create an element-not-found error
    #[must_use]
    pub fn element_not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = UiError::timeout(1500, "url https://example.com");
        assert_eq!(
            err.to_string(),
            "Operation timed out after 1500ms: url https://example.com"
        );
    }

    #[test]
    fn test_dom_not_stable_message() {
        let err = UiError::DomNotStable { ms: 30_000 };
        assert!(err.to_string().contains("30000ms"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: UiError = io.into();
        assert!(matches!(err, UiError::Io(_)));
    }

    #[test]
    fn test_element_not_found_names_selector() {
        let err = UiError::element_not_found("#submit");
        assert!(err.to_string().contains("#submit"));
    }
}
