//! Leveled, hierarchical progress reporting.
//!
//! The resolver, generators and merger narrate what they do through a
//! [`Reporter`]. Reporting is purely observational: nothing in the pipeline
//! reads it back, so swapping sinks never changes generated output.
//!
//! # Examples
//!
//! ```
//! use apiforge_core::report::{MemorySink, Reporter, Severity};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::default());
//! let reporter = Reporter::new(sink.clone());
//! reporter.notice("resolving");
//! reporter.nested().success("pet");
//! reporter.with(Severity::Warn).info("filtered out");
//!
//! let lines = sink.lines();
//! assert_eq!(lines.len(), 2);
//! assert_eq!(lines[1].depth, 1);
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a reported message, ordered from least to most important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Success,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Success => "success",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for reported messages.
pub trait ReportSink: Send + Sync {
    fn emit(&self, severity: Severity, depth: usize, message: &str);
}

/// Sink that forwards to the `log` facade, indenting nested messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn emit(&self, severity: Severity, depth: usize, message: &str) {
        let indent = "  ".repeat(depth);
        match severity {
            Severity::Debug => log::debug!("{}{}", indent, message),
            Severity::Info => log::info!("{}{}", indent, message),
            Severity::Notice => log::info!("{}» {}", indent, message),
            Severity::Success => log::info!("{}✓ {}", indent, message),
            Severity::Warn => log::warn!("{}{}", indent, message),
            Severity::Error => log::error!("{}{}", indent, message),
        }
    }
}

/// One message captured by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub severity: Severity,
    pub depth: usize,
    pub message: String,
}

/// Sink that keeps every message in memory, for tests and previews.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<ReportLine>>,
}

impl MemorySink {
    /// Snapshot of everything reported so far.
    pub fn lines(&self) -> Vec<ReportLine> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Messages reported at exactly `severity`.
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.severity == severity)
            .map(|line| line.message)
            .collect()
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, severity: Severity, depth: usize, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(ReportLine {
                severity,
                depth,
                message: message.to_string(),
            });
        }
    }
}

/// Handle used by the pipeline to narrate progress.
///
/// Cloning is cheap; `nested` and `with` derive handles that share the sink.
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn ReportSink>,
    depth: usize,
    threshold: Severity,
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("depth", &self.depth)
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(Arc::new(LogSink))
    }
}

impl Reporter {
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self {
            sink,
            depth: 0,
            threshold: Severity::Debug,
        }
    }

    /// A reporter that drops everything below `severity`.
    pub fn with(&self, severity: Severity) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            depth: self.depth,
            threshold: severity,
        }
    }

    /// A reporter one level deeper in the hierarchy.
    pub fn nested(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            depth: self.depth + 1,
            threshold: self.threshold,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn report(&self, severity: Severity, message: impl AsRef<str>) {
        if severity >= self.threshold {
            self.sink.emit(severity, self.depth, message.as_ref());
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.report(Severity::Debug, message);
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.report(Severity::Info, message);
    }

    pub fn notice(&self, message: impl AsRef<str>) {
        self.report(Severity::Notice, message);
    }

    pub fn success(&self, message: impl AsRef<str>) {
        self.report(Severity::Success, message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.report(Severity::Warn, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.report(Severity::Error, message);
    }
}
