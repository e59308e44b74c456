//! Watch mode: regenerate whenever the spec file changes.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use anyhow::Context;
use apiforge_core::Config;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Sleep;

/// Quiet period after the last change before regenerating
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Run until interrupted, regenerating after each burst of changes.
pub async fn watch(config: &Config) -> anyhow::Result<()> {
    let location = &config.openapi_schema_path;
    if location.starts_with("http://") || location.starts_with("https://") {
        anyhow::bail!("--watch needs a local spec file, not {}", location);
    }
    let spec = std::fs::canonicalize(location)
        .with_context(|| format!("Failed to resolve {}", location))?;
    let directory = spec
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |result| {
        let _ = tx.send(result);
    })
    .context("Failed to create file watcher")?;
    // Editors often replace the file, so the directory is watched
    watcher
        .watch(&directory, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", directory.display()))?;
    tracing::info!("Watching {} (Ctrl-C to stop)", spec.display());

    let mut debounce: Option<Pin<Box<Sleep>>> = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping watch mode");
                break;
            }
            maybe = rx.recv() => {
                let Some(result) = maybe else {
                    tracing::debug!("Watcher channel closed");
                    break;
                };
                match result {
                    Ok(event) if touches(&event, &spec) => {
                        debounce = Some(Box::pin(tokio::time::sleep(DEBOUNCE)));
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!("Watcher error: {err}"),
                }
            }
            _ = async { if let Some(sleep) = debounce.as_mut() { sleep.await } }, if debounce.is_some() => {
                debounce = None;
                tracing::info!("{} changed, regenerating", spec.display());
                // a broken intermediate save must not end the session
                if let Err(err) = crate::run_generation(config).await {
                    tracing::error!("{err:#}");
                }
            }
        }
    }
    Ok(())
}

fn touches(event: &Event, spec: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_)
    ) && event.paths.iter().any(|path| path == spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn test_touches_only_the_spec_file() {
        let spec = PathBuf::from("/work/api.yaml");
        let modified = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(spec.clone());
        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(spec.clone());
        let other = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/work/notes.md"));
        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(spec.clone());

        assert!(touches(&modified, &spec));
        assert!(touches(&created, &spec));
        assert!(!touches(&other, &spec));
        assert!(!touches(&removed, &spec));
    }

    #[tokio::test]
    async fn test_remote_specs_cannot_be_watched() {
        let config = Config::new("https://example.com/openapi.yaml", "out");
        let err = watch(&config).await.expect_err("remote spec");
        assert!(err.to_string().contains("local spec file"));
    }
}
