//! Advisory diagnostics collected during decoding.
//!
//! Every diagnostic is logged through `tracing` at `warn` level and also
//! kept in a [`Diagnostics`] sink, so callers can report what was passed
//! through undecoded without scraping logs. Diagnostics never change the
//! decoded output beyond the documented `Raw` fallbacks.

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;
use tracing::warn;

use crate::error::BlockError;
use crate::format::{BlockKey, TypeCode};

/// Category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// No decoder is registered for the chunk's type code
    UnrecognizedChunkType,

    /// A section divider carries a section type outside the known set
    UnrecognizedSectionType,

    /// A decoder failed and the raw payload was kept
    Fallback,

    /// Part of a record could not be decoded; the rest was kept
    Partial,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::UnrecognizedChunkType => "unrecognized chunk type",
            DiagnosticKind::UnrecognizedSectionType => "unrecognized section type",
            DiagnosticKind::Fallback => "fallback",
            DiagnosticKind::Partial => "partial",
        };
        f.write_str(name)
    }
}

/// A single advisory message about one chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: TypeCode,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.kind, self.message)
    }
}

/// Thread-safe collection of diagnostics.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it.
    pub fn push(&self, code: TypeCode, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        warn!(code = %code, kind = %kind, "{}", message);

        let diagnostic = Diagnostic {
            code,
            kind,
            message,
        };
        // A poisoned lock only means another thread panicked mid-push
        match self.entries.lock() {
            Ok(mut entries) => entries.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }

    /// Record that a chunk had no registered decoder.
    ///
    /// The message tells codes that are known but not decoded apart from
    /// codes that are not known at all.
    pub fn unrecognized_chunk(&self, code: TypeCode) {
        let message = match BlockKey::from_code(code) {
            Some(key) => format!("{} is not decoded, keeping raw payload", key.name()),
            None => "Unknown tagged block, keeping raw payload".to_string(),
        };
        self.push(code, DiagnosticKind::UnrecognizedChunkType, message);
    }

    /// Record that a decoder failed and the raw payload was kept.
    pub fn fallback(&self, code: TypeCode, error: &BlockError) {
        self.push(
            code,
            DiagnosticKind::Fallback,
            format!("Ignoring tagged block: {}", error),
        );
    }

    /// Snapshot of everything recorded so far.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(mut entries) => std::mem::take(&mut *entries),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
