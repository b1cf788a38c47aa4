use crate::domain::ports::Reporter;
use std::cell::RefCell;

/// Routes diagnostics to `tracing`. Notes are debug-level unless verbose.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter {
    verbose: bool,
}

impl TracingReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Reporter for TracingReporter {
    fn note(&self, unit: &str, message: &str) {
        if self.verbose {
            tracing::info!(unit, "{}", message);
        } else {
            tracing::debug!(unit, "{}", message);
        }
    }

    fn warn(&self, unit: &str, message: &str) {
        tracing::warn!(unit, "{}", message);
    }

    fn error(&self, unit: &str, message: &str) {
        tracing::error!(unit, "{}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Note,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub unit: String,
    pub message: String,
}

/// Keeps every diagnostic in memory and forwards it to an inner reporter.
#[derive(Debug, Default)]
pub struct CollectingReporter<R: Reporter = TracingReporter> {
    inner: R,
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl<R: Reporter> CollectingReporter<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn errors(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .cloned()
            .collect()
    }

    fn record(&self, level: Level, unit: &str, message: &str) {
        self.diagnostics.borrow_mut().push(Diagnostic {
            level,
            unit: unit.to_string(),
            message: message.to_string(),
        });
    }
}

impl<R: Reporter> Reporter for CollectingReporter<R> {
    fn note(&self, unit: &str, message: &str) {
        self.record(Level::Note, unit, message);
        self.inner.note(unit, message);
    }

    fn warn(&self, unit: &str, message: &str) {
        self.record(Level::Warning, unit, message);
        self.inner.warn(unit, message);
    }

    fn error(&self, unit: &str, message: &str) {
        self.record(Level::Error, unit, message);
        self.inner.error(unit, message);
    }
}
