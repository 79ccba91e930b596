//! Diagnostics reporting
//!
//! The converter reports progress and recoverable defects through a
//! `Diagnostics` handle passed in by the caller.

use std::cell::RefCell;

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warning,
}

/// Sink for conversion diagnostics
pub trait Diagnostics {
    fn report(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.report(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.report(Level::Info, message);
    }

    /// A defect the conversion recovered from by dropping the offending input
    fn warning(&self, message: &str) {
        self.report(Level::Warning, message);
    }
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "heurist_rocrate", "{}", message),
            Level::Info => tracing::info!(target: "heurist_rocrate", "{}", message),
            Level::Warning => tracing::warn!(target: "heurist_rocrate", "{}", message),
        }
    }
}

/// A recorded diagnostic message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

/// Keeps every diagnostic in memory, optionally forwarding to another sink
#[derive(Default)]
pub struct CollectedDiagnostics<'a> {
    messages: RefCell<Vec<Diagnostic>>,
    forward: Option<&'a dyn Diagnostics>,
}

impl<'a> CollectedDiagnostics<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarding(inner: &'a dyn Diagnostics) -> Self {
        Self {
            messages: RefCell::new(Vec::new()),
            forward: Some(inner),
        }
    }

    pub fn messages(&self) -> Vec<Diagnostic> {
        self.messages.borrow().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Warning)
            .map(|d| d.message.clone())
            .collect()
    }

    pub fn warning_count(&self) -> usize {
        self.messages
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Warning)
            .count()
    }
}

impl Diagnostics for CollectedDiagnostics<'_> {
    fn report(&self, level: Level, message: &str) {
        self.messages.borrow_mut().push(Diagnostic {
            level,
            message: message.to_string(),
        });
        if let Some(inner) = self.forward {
            inner.report(level, message);
        }
    }
}
