// src/error.rs

//! Unified error handling for the watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Stage of a watch cycle, used to prefix errors shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    Collection,
    Parsing,
    Storage,
    Notification,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::Collection => "collection",
            Stage::Parsing => "parsing",
            Stage::Storage => "storage",
            Stage::Notification => "notification",
        };
        f.write_str(name)
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed configuration or arguments, detected before any network activity
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The source document no longer matches the expected layout
    #[error("Structure changed at {url}: '{selector}' {message}")]
    Structure {
        selector: String,
        url: String,
        message: String,
    },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP request answered with a non-success status
    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// An error tagged with the watch-cycle stage that produced it
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a structural change error for a selector or field path.
    pub fn structure(
        selector: impl Into<String>,
        url: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::Structure {
            selector: selector.into(),
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Tag an error with the stage it failed in. Already-tagged errors keep
    /// their original stage.
    pub fn stage(stage: Stage, error: AppError) -> Self {
        match error {
            tagged @ AppError::Stage { .. } => tagged,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was tagged with, if any.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            AppError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AppError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_prefix() {
        let err = AppError::stage(Stage::Collection, AppError::validation("bad page"));
        assert_eq!(
            err.to_string(),
            "collection failed: Validation error: bad page"
        );
        assert_eq!(err.failed_stage(), Some(Stage::Collection));
    }

    #[test]
    fn test_stage_is_not_nested() {
        let inner = AppError::stage(Stage::Parsing, AppError::validation("x"));
        let outer = AppError::stage(Stage::Collection, inner);
        assert_eq!(outer.failed_stage(), Some(Stage::Parsing));
    }

    #[test]
    fn test_structure_message() {
        let err = AppError::structure("div.price", "https://shop.test/p/1", "matched 0 elements");
        assert_eq!(
            err.to_string(),
            "Structure changed at https://shop.test/p/1: 'div.price' matched 0 elements"
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_status() {
        let server_error = AppError::HttpStatus {
            status: 503,
            url: "https://shop.test".into(),
        };
        let not_found = AppError::HttpStatus {
            status: 404,
            url: "https://shop.test".into(),
        };
        assert!(server_error.is_transient());
        assert!(!not_found.is_transient());
    }
}
