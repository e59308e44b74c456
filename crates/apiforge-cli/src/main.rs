//! apiforge CLI entrypoint
//! Parses command-line arguments and dispatches to the core generator.

mod watch;

// Internal imports (std, crate)
use std::path::{Path, PathBuf};

// External imports (alphabetized)
use anyhow::Context;
use apiforge_core::{Config, FileStatus, Reporter};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "apiforge.yaml";

#[derive(Parser)]
#[command(name = "apiforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate (or regenerate) Rust modules from an OpenAPI spec
    Generate {
        #[command(flatten)]
        options: GenerateOptions,
        /// Regenerate whenever the spec file changes
        #[arg(long)]
        watch: bool,
    },
    /// Write a config file for later `generate` runs
    Init {
        #[command(flatten)]
        options: GenerateOptions,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct GenerateOptions {
    /// Path or URL to OpenAPI schema (YAML or JSON)
    ///
    /// Can be a local file path or an HTTP/HTTPS URL
    /// Example: --schema-path path/to/schema.yaml
    /// Example: --schema-path https://example.com/openapi.json
    #[arg(long)]
    schema_path: Option<String>,
    /// Output directory for generated modules
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Config file (default: apiforge.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Name of the generated types module
    #[arg(long)]
    types_module: Option<String>,
    /// Only generate controllers for these tags
    #[arg(long = "include-tag")]
    include_tags: Vec<String>,
    /// Leave out these operations
    #[arg(long = "exclude-operation")]
    exclude_operations: Vec<String>,
    /// Base URL of the API (Optional)
    #[arg(long)]
    base_url: Option<Url>,
}

impl GenerateOptions {
    fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Load the config file (if any) and apply command-line overrides.
    async fn resolve(&self) -> anyhow::Result<Config> {
        let path = self.config_path();
        let file = if self.config.is_some() || path.exists() {
            let config = Config::from_file(&path)
                .await
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            tracing::debug!("Loaded config from {}", path.display());
            Some(config)
        } else {
            None
        };
        self.apply(file)
    }

    fn apply(&self, file: Option<Config>) -> anyhow::Result<Config> {
        let mut config = match (file, &self.schema_path, &self.output_dir) {
            (Some(config), _, _) => config,
            (None, Some(schema_path), Some(output_dir)) => {
                Config::new(schema_path, output_dir.to_string_lossy())
            }
            (None, _, _) => anyhow::bail!(
                "--schema-path and --output-dir are required without a config file"
            ),
        };
        if let Some(schema_path) = &self.schema_path {
            config.openapi_schema_path = schema_path.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.to_string_lossy().to_string();
        }
        if let Some(types_module) = &self.types_module {
            config.types_module = types_module.clone();
        }
        if !self.include_tags.is_empty() {
            config.include_tags = self.include_tags.clone();
        }
        if !self.exclude_operations.is_empty() {
            config.exclude_operations = self.exclude_operations.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; `log` records from the core are captured too
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Generate { options, watch } => {
            let config = options.resolve().await?;
            run_generation(&config).await?;
            if *watch {
                watch::watch(&config).await?;
            }
        }
        Commands::Init { options } => {
            let config = options.apply(None)?;
            let path = options.config_path();
            write_config(&config, &path).await?;
            tracing::info!("Wrote {}", path.display());
        }
    }
    Ok(())
}

/// One generation run with the default log-backed reporter.
pub(crate) async fn run_generation(config: &Config) -> anyhow::Result<()> {
    let reporter = Reporter::default();
    let report = apiforge_core::generate(config, &reporter)
        .await
        .with_context(|| format!("Failed to generate from {}", config.openapi_schema_path))?;
    for file in &report.files {
        let verb = match file.status {
            FileStatus::Created => "created",
            FileStatus::Updated => "updated",
            FileStatus::Unchanged => "unchanged",
        };
        tracing::debug!("{}: {}", verb, file.path.display());
    }
    tracing::info!(
        "Generated {} files in {}",
        report.files.len(),
        config.output_dir
    );
    Ok(())
}

async fn write_config(config: &Config, path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    config
        .save(path)
        .await
        .with_context(|| format!("Failed to write config to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn options() -> GenerateOptions {
        GenerateOptions {
            schema_path: None,
            output_dir: None,
            config: None,
            types_module: None,
            include_tags: Vec::new(),
            exclude_operations: Vec::new(),
            base_url: None,
        }
    }

    #[test]
    fn test_flags_without_config_file() {
        let mut options = options();
        options.schema_path = Some("api.yaml".to_string());
        options.output_dir = Some(PathBuf::from("src/api"));
        options.include_tags = vec!["pets".to_string()];

        let config = options.apply(None).expect("config");
        assert_eq!(config.openapi_schema_path, "api.yaml");
        assert_eq!(config.output_dir, "src/api");
        assert_eq!(config.include_tags, vec!["pets".to_string()]);
        assert_eq!(config.types_module, "types");
    }

    #[test]
    fn test_missing_required_flags() {
        assert!(options().apply(None).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = Config::new("old.yaml", "old");
        file.types_module = "schema".to_string();
        let mut options = options();
        options.schema_path = Some("new.yaml".to_string());

        let config = options.apply(Some(file)).expect("config");
        assert_eq!(config.openapi_schema_path, "new.yaml");
        assert_eq!(config.output_dir, "old");
        assert_eq!(config.types_module, "schema");
    }

    #[tokio::test]
    async fn test_init_then_resolve() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("apiforge.yaml");
        let mut init = options();
        init.schema_path = Some("api.yaml".to_string());
        init.output_dir = Some(PathBuf::from("out"));
        init.config = Some(path.clone());
        write_config(&init.apply(None)?, &path).await?;
        assert!(write_config(&init.apply(None)?, &path).await.is_err());

        let mut generate = options();
        generate.config = Some(path);
        let config = generate.resolve().await?;
        assert_eq!(config.openapi_schema_path, "api.yaml");
        assert_eq!(config.output_dir, "out");
        Ok(())
    }
}
