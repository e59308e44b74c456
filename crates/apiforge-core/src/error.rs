//! Error handling for the apiforge code generation library.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. Only the outer layers (spec
//! loading, configuration, file I/O and previous-file parsing) can fail: the
//! resolver and the merger degrade instead of erroring.
//!
//! # Examples
//!
//! ```
//! use apiforge_core::error::{Error, Result};
//!
//! fn might_fail() -> Result<()> {
//!     Err(Error::config("missing output directory"))
//! }
//!
//! assert!(might_fail().is_err());
//! ```

use thiserror::Error;

/// Result type for apiforge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for apiforge operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// OpenAPI loading error
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    /// Boilerplate template rendering error
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A source file could not be read back into a document
    #[error("Document error: {0}")]
    Document(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new OpenAPI error
    pub fn openapi<S: Into<String>>(msg: S) -> Self {
        Self::OpenApi(msg.into())
    }

    /// Create a new document error
    pub fn document<S: Into<String>>(msg: S) -> Self {
        Self::Document(msg.into())
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::Config(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::Config(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_pick_variant() {
        assert!(matches!(Error::config("x"), Error::Config(_)));
        assert!(matches!(Error::openapi("x"), Error::OpenApi(_)));
        assert!(matches!(Error::document("x"), Error::Document(_)));
        assert_eq!(
            Error::document("bad tree").to_string(),
            "Document error: bad tree"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
