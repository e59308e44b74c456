//! OpenAPI document loading.
//!
//! This module loads an OpenAPI 3 document from a file or URL and parses it
//! into the typed `openapiv3` model. Structural validation is whatever the
//! `openapiv3` deserializer enforces; nothing beyond that is checked here.
//!
//! # Examples
//!
//! ```no_run
//! use apiforge_core::openapi::OpenApiContext;
//! use apiforge_core::error::Result;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! // Load an OpenAPI spec from a file
//! let spec = OpenApiContext::from_file("openapi.yaml").await?;
//!
//! // Access common fields
//! println!("API Title: {}", spec.title());
//! println!("API Version: {}", spec.version());
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use std::path::Path;

use crate::Error;

// External imports (alphabetized)
use openapiv3::OpenAPI;
use tokio::fs;

/// A loaded OpenAPI document
#[derive(Debug, Clone)]
pub struct OpenApiContext {
    document: OpenAPI,
}

impl OpenApiContext {
    pub fn new(document: OpenAPI) -> Self {
        Self { document }
    }

    /// Load a document from a file or URL (supports both YAML and JSON)
    pub async fn from_file_or_url<P: AsRef<str>>(location: P) -> crate::Result<Self> {
        let location = location.as_ref();

        // Check if the input looks like a URL
        if location.starts_with("http://") || location.starts_with("https://") {
            return Self::from_url(location).await;
        }

        Self::from_file(location).await
    }

    /// Load a document from a file (supports both YAML and JSON)
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        Self::parse_content(&content).map_err(|e| {
            Error::openapi(format!(
                "Failed to parse OpenAPI spec at {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load a document from a URL (supports both YAML and JSON)
    pub async fn from_url(url: &str) -> crate::Result<Self> {
        log::debug!("Fetching OpenAPI spec from {}", url);
        let response = reqwest::get(url).await.map_err(|e| {
            Error::openapi(format!("Failed to fetch OpenAPI spec from {}: {}", url, e))
        })?;

        if !response.status().is_success() {
            return Err(Error::openapi(format!(
                "Failed to fetch OpenAPI spec from {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let content = response.text().await.map_err(|e| {
            Error::openapi(format!("Failed to read response from {}: {}", url, e))
        })?;

        Self::parse_content(&content).map_err(|e| {
            Error::openapi(format!("Failed to parse OpenAPI spec from {}: {}", url, e))
        })
    }

    /// Parse content as either JSON or YAML
    pub fn parse_content(content: &str) -> Result<Self, String> {
        // Try to parse as JSON first
        if let Ok(document) = serde_json::from_str(content) {
            return Ok(Self { document });
        }

        // YAML is a superset of JSON, so its error is the one worth reporting
        serde_yaml::from_str(content)
            .map(|document| Self { document })
            .map_err(|e| e.to_string())
    }

    pub fn document(&self) -> &OpenAPI {
        &self.document
    }

    /// Get the title of the API
    pub fn title(&self) -> &str {
        &self.document.info.title
    }

    /// Get the version of the API
    pub fn version(&self) -> &str {
        &self.document.info.version
    }

    /// Get the base path of the API, from the first server
    pub fn base_path(&self) -> Option<String> {
        self.document
            .servers
            .first()
            .map(|server| server.url.clone())
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_from_file() -> crate::Result<()> {
        let mut file = NamedTempFile::new()?;
        let json = r#"{
            "openapi": "3.0.0",
            "info": {"title": "Test API", "version": "1.0.0"},
            "servers": [{"url": "https://api.example.com/v1"}],
            "paths": {}
        }"#;
        file.write_all(json.as_bytes())?;

        let spec = OpenApiContext::from_file(file.path()).await?;
        assert_eq!(spec.title(), "Test API");
        assert_eq!(spec.version(), "1.0.0");
        assert_eq!(spec.base_path().as_deref(), Some("https://api.example.com/v1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_from_file_or_url_reads_yaml_files() -> crate::Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"openapi: 3.0.3\ninfo:\n  title: Yaml API\n  version: '2'\npaths: {}\n")?;

        let spec = OpenApiContext::from_file_or_url(file.path().to_string_lossy()).await?;
        assert_eq!(spec.title(), "Yaml API");
        assert_eq!(spec.version(), "2");
        assert_eq!(spec.base_path(), None);
        assert!(spec.document().paths.paths.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_content_is_an_openapi_error() -> crate::Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"just: [unbalanced")?;

        let err = OpenApiContext::from_file(file.path())
            .await
            .expect_err("should not parse");
        assert!(matches!(err, Error::OpenApi(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_an_io_error() {
        let err = OpenApiContext::from_file("/definitely/not/here.yaml")
            .await
            .expect_err("should not load");
        assert!(matches!(err, Error::Io(_)));
    }
}
