//! Accumulated warnings and errors for long-lived detector objects.
//!
//! Detection calls never fail outright; recoverable problems (bad windows,
//! out-of-range queries, mixed frames) are recorded here and mirrored to
//! `tracing`. Callers poll with [`ErrorReporter`].

use std::cell::RefCell;
use std::fmt;

/// Severity of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct LogEntry {
    severity: Severity,
    text: String,
}

/// Something that collects messages which callers may later drain.
pub trait ErrorReporter {
    /// True if any error (not just a warning) is pending.
    fn has_error(&self) -> bool;
    /// True if any message is pending.
    fn has_message(&self) -> bool;
    /// All pending messages, one per line. Clears the log.
    fn get_message(&self) -> String;
    /// All pending messages without clearing them.
    fn get_message_no_clear(&self) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    name: String,
    entries: RefCell<Vec<LogEntry>>,
}

impl ErrorLog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_warning(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!(source = %self.name, "{}", text);
        self.push(Severity::Warning, text);
    }

    pub fn add_error(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::error!(source = %self.name, "{}", text);
        self.push(Severity::Error, text);
    }

    /// Move the pending messages of `other` into this log.
    pub fn absorb(&self, other: &ErrorLog) {
        let drained: Vec<LogEntry> = other.entries.borrow_mut().drain(..).collect();
        self.entries.borrow_mut().extend(drained);
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn push(&self, severity: Severity, text: String) {
        self.entries.borrow_mut().push(LogEntry { severity, text });
    }

    fn render(&self) -> String {
        self.entries
            .borrow()
            .iter()
            .map(|e| format!("[{}] {}: {}", self.name, e.severity, e.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ErrorReporter for ErrorLog {
    fn has_error(&self) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|e| e.severity == Severity::Error)
    }

    fn has_message(&self) -> bool {
        !self.is_empty()
    }

    fn get_message(&self) -> String {
        let msg = self.render();
        self.clear();
        msg
    }

    fn get_message_no_clear(&self) -> String {
        self.render()
    }
}
