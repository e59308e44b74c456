//! Configuration management for apiforge code generation.
//!
//! This module defines the `Config` struct that controls one generation run:
//! where the OpenAPI document comes from, where the generated modules go and
//! which operations are emitted. The configuration can be loaded from a YAML
//! file (conventionally `apiforge.yaml`) or created programmatically.
//!
//! # Examples
//!
//! ```no_run
//! use apiforge_core::config::Config;
//!
//! // Create a new config programmatically
//! let mut config = Config::new("openapi.yaml", "src/api");
//! config.include_tags = vec!["pets".to_string()];
//!
//! // Or load from a config file
//! # async fn load() -> apiforge_core::Result<()> {
//! let config = Config::from_file("apiforge.yaml").await?;
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use std::path::{Path, PathBuf};

use crate::model::{ControllerDescriptor, OperationDescriptor};
use crate::utils::{dasherize, is_rust_keyword};

// External imports (alphabetized)
use serde::{Deserialize, Serialize};
use tokio::fs;
use url::Url;

/// Configuration for one apiforge generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path or URL of the OpenAPI document
    pub openapi_schema_path: String,

    /// Output directory for generated modules
    pub output_dir: String,

    /// Name of the module holding schema types
    #[serde(default = "default_types_module")]
    pub types_module: String,

    /// Only generate controllers for these tags (all when empty)
    #[serde(default)]
    pub include_tags: Vec<String>,

    /// Operations to leave out, by operationId or generated name
    #[serde(default)]
    pub exclude_operations: Vec<String>,

    /// Base URL of the API, overriding the document's first server (Optional)
    #[serde(default)]
    pub base_url: Option<Url>,
}

impl Config {
    /// Create a new Config with default values
    pub fn new(openapi_schema_path: impl Into<String>, output_dir: impl Into<String>) -> Self {
        Self {
            openapi_schema_path: openapi_schema_path.into(),
            output_dir: output_dir.into(),
            types_module: default_types_module(),
            include_tags: Vec::new(),
            exclude_operations: Vec::new(),
            base_url: None,
        }
    }

    /// Load configuration from a file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Reject settings that cannot produce a usable module tree.
    pub fn validate(&self) -> crate::Result<()> {
        if self.openapi_schema_path.trim().is_empty() {
            return Err(crate::Error::config("openapi_schema_path is empty"));
        }
        if self.output_dir.trim().is_empty() {
            return Err(crate::Error::config("output_dir is empty"));
        }
        let valid_module = self
            .types_module
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            && self
                .types_module
                .starts_with(|c: char| c.is_ascii_lowercase());
        if !valid_module || is_rust_keyword(&self.types_module) {
            return Err(crate::Error::config(format!(
                "types_module '{}' is not a valid module name",
                self.types_module
            )));
        }
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    /// Whether a controller passes the `include_tags` filter.
    pub fn includes_controller(&self, controller: &ControllerDescriptor) -> bool {
        self.include_tags.is_empty()
            || self
                .include_tags
                .iter()
                .any(|tag| dasherize(tag) == controller.name)
    }

    /// Whether an operation passes the `exclude_operations` filter.
    pub fn includes_operation(&self, operation: &OperationDescriptor) -> bool {
        !self
            .exclude_operations
            .iter()
            .any(|excluded| dasherize(excluded) == operation.name)
    }
}

fn default_types_module() -> String {
    "types".to_string()
}
