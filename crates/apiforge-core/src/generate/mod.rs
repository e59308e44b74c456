//! Code generation for apiforge
//!
//! A run loads the OpenAPI document, resolves it into the type model, plans
//! one [`Document`] per output file (`mod.rs`, the types module and one module
//! per controller) and then, for every file independently, merges the fresh
//! document with what is on disk before writing it back.

mod boilerplate;
mod controller;
mod types;

use std::path::{Path, PathBuf};

use futures::future::join_all;
use tokio::fs;
use url::Url;

use crate::{
    config::Config,
    document::Document,
    error::Result,
    merge::merge,
    model::{OperationDescriptor, SpecDescriptor},
    openapi::OpenApiContext,
    report::Reporter,
    resolver::resolve,
};

pub use boilerplate::banner;
pub use controller::{file_name, module_name, ControllerGenerator, HANDLER_ERROR};
pub use types::{primitive_type, TypeNames, TypesGenerator, Used};

/// A document and the path it is written to, relative to the output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFile {
    pub path: PathBuf,
    pub document: Document,
}

/// What happened to one output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// No previous file existed (or it could not be parsed)
    Created,
    /// Merged with the previous file and rewritten
    Updated,
    /// Merged output was identical to the previous file
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub status: FileStatus,
}

/// Files handled by one run, in planning order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub files: Vec<WrittenFile>,
}

impl GenerationReport {
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|file| file.path.as_path())
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|file| file.status == status).count()
    }
}

/// Main entry point for code generation
pub async fn generate(config: &Config, reporter: &Reporter) -> Result<GenerationReport> {
    config.validate()?;

    // 1. Load OpenAPI schema
    reporter.notice(format!("Loading {}", config.openapi_schema_path));
    let context = OpenApiContext::from_file_or_url(&config.openapi_schema_path).await?;

    // 2. Resolve it into the type model
    let spec = resolve(context.document(), &reporter.nested());

    // 3. Plan the output documents
    let base_url = config
        .base_url
        .as_ref()
        .map(Url::to_string)
        .or_else(|| context.base_path());
    let files = plan(&spec, config, base_url.as_deref(), reporter)?;

    // 4. Merge with the previous files and write
    let report = write_all(&config.output_path(), files, reporter).await?;
    reporter.success(format!(
        "Wrote {} files ({} created, {} updated, {} unchanged)",
        report.files.len(),
        report.count(FileStatus::Created),
        report.count(FileStatus::Updated),
        report.count(FileStatus::Unchanged)
    ));
    Ok(report)
}

/// Build the fresh documents for `spec`, before any merging.
pub fn plan(
    spec: &SpecDescriptor,
    config: &Config,
    base_url: Option<&str>,
    reporter: &Reporter,
) -> Result<Vec<PlannedFile>> {
    let banner = banner(&spec.title, &spec.version)?;
    let names = TypeNames::new(spec);
    let mut files = Vec::new();

    reporter.notice(format!("Generating {}.rs", config.types_module));
    files.push(PlannedFile {
        path: PathBuf::from(format!("{}.rs", config.types_module)),
        document: TypesGenerator::new(&names, reporter).document(&banner),
    });

    let mut modules = vec![config.types_module.clone()];
    let generator = ControllerGenerator::new(&names, &config.types_module, reporter);
    for controller in &spec.controllers {
        if !config.includes_controller(controller) {
            reporter.info(format!("Skipping controller '{}'", controller.name));
            continue;
        }
        let operations: Vec<&OperationDescriptor> = controller
            .operations
            .iter()
            .filter(|operation| {
                let included = config.includes_operation(operation);
                if !included {
                    reporter.info(format!("Excluding operation '{}'", operation.name));
                }
                included
            })
            .collect();
        if operations.is_empty() {
            reporter.info(format!(
                "Skipping controller '{}': no operations left",
                controller.name
            ));
            continue;
        }

        let module = module_name(controller);
        if modules.contains(&module) {
            reporter.warn(format!(
                "Skipping controller '{}': module '{}' is already taken",
                controller.name, module
            ));
            continue;
        }
        reporter.notice(format!("Generating {}", file_name(controller)));
        files.push(PlannedFile {
            path: PathBuf::from(file_name(controller)),
            document: generator.document(controller, &operations, &banner),
        });
        modules.push(module);
    }

    files.push(PlannedFile {
        path: PathBuf::from("mod.rs"),
        document: module_document(&modules, base_url, &banner),
    });
    Ok(files)
}

/// `mod.rs`: module declarations, the handler error type and the base URL.
fn module_document(modules: &[String], base_url: Option<&str>, banner: &[String]) -> Document {
    let mut document = Document::new();
    for line in banner {
        document.add_doc(line.clone());
    }
    for module in modules {
        document.add_verbatim(module, &format!("pub mod {};", module));
    }
    document
        .add_alias_type(HANDLER_ERROR, "Box<dyn std::error::Error + Send + Sync>")
        .decorations
        .doc("Error type returned by every generated handler.");
    if let Some(base_url) = base_url {
        document
            .add_constant_block("server")
            .add_constant("BASE_URL", "&str", &format!("{:?}", base_url));
    }
    document
}

/// Merge and write every planned file. All files are attempted; the first
/// failure is returned once the rest are done.
pub async fn write_all(
    root: &Path,
    files: Vec<PlannedFile>,
    reporter: &Reporter,
) -> Result<GenerationReport> {
    fs::create_dir_all(root).await?;
    let writes = files
        .into_iter()
        .map(|file| write_file(root, file, reporter.nested()));

    let mut report = GenerationReport::default();
    let mut first_error = None;
    for result in join_all(writes).await {
        match result {
            Ok(written) => report.files.push(written),
            Err(e) => {
                reporter.error(e.to_string());
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(report),
    }
}

async fn write_file(root: &Path, file: PlannedFile, reporter: Reporter) -> Result<WrittenFile> {
    let path = root.join(&file.path);
    log::debug!("Output path: {}", path.display());

    let existing = match fs::read_to_string(&path).await {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };
    let previous = existing.as_deref().and_then(|text| match Document::parse(text) {
        Ok(document) => Some(document),
        Err(e) => {
            reporter.warn(format!(
                "Could not read back {}, regenerating it from scratch: {}",
                file.path.display(),
                e
            ));
            None
        }
    });

    let merged = merge(file.document, previous.as_ref(), &reporter);
    let text = merged.render();

    let status = match (&existing, &previous) {
        (Some(existing), Some(_)) if *existing == text => FileStatus::Unchanged,
        (_, Some(_)) => FileStatus::Updated,
        (_, None) => FileStatus::Created,
    };
    if status != FileStatus::Unchanged {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &text).await?;
    }
    reporter.success(format!("{} ({:?})", file.path.display(), status));

    Ok(WrittenFile {
        path: file.path,
        status,
    })
}
