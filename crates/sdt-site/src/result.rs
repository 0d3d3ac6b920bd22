//! Result and error types for the site controller and snapshot harness.

use thiserror::Error;

/// Result type for site operations
pub type SiteResult<T> = Result<T, SiteError>;

/// Errors that can occur while driving the site or comparing snapshots
#[derive(Debug, Error)]
pub enum SiteError {
    /// Selector could not be parsed
    #[error("Unsupported selector `{selector}`: {message}")]
    Selector {
        /// Selector text as given
        selector: String,
        /// What was wrong with it
        message: String,
    },

    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page driver error (evaluate, input, emulation)
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

    /// Element lookup failed where the caller required one
    #[error("No element matches `{selector}` at index {index}")]
    ElementNotFound {
        /// Selector that was queried
        selector: String,
        /// Index into the match list
        index: usize,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms: {waiting_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// What was being waited for
        waiting_for: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Image comparison error
    #[error("Image comparison failed: {message}")]
    ImageComparison {
        /// Error message
        message: String,
    },

    /// Snapshot mismatch
    #[error("Snapshot mismatch: {name} differs by {ratio:.4} (limit {limit:.4})")]
    SnapshotMismatch {
        /// Snapshot file name
        name: String,
        /// Ratio of differing pixels
        ratio: f64,
        /// Allowed ratio
        limit: f64,
    },

    /// Snapshot missing and updates disabled
    #[error("Snapshot not found: {path}")]
    SnapshotMissing {
        /// Expected path
        path: String,
    },

    /// Invalid configuration
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

impl SiteError {
    /// Create a selector error
    #[must_use]
    pub fn selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_error_message() {
        let err = SiteError::selector("a[", "unterminated attribute");
        let text = err.to_string();
        assert!(text.contains("a["));
        assert!(text.contains("unterminated"));
    }

    #[test]
    fn test_mismatch_message_has_ratio() {
        let err = SiteError::SnapshotMismatch {
            name: "baseline-hero.png".to_string(),
            ratio: 0.0234,
            limit: 0.01,
        };
        assert!(err.to_string().contains("0.0234"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SiteError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
