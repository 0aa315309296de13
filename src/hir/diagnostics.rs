//! Diagnostics reported while fixing a file's imports.
//!
//! Nothing here is fatal: structural problems abort through
//! [`StructureError`](super::StructureError). Diagnostics describe what the
//! fixer could not do or chose to do.

use std::fmt;
use std::sync::Arc;

use crate::base::{LineCol, QualifiedName};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Info,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// A diagnostic message with a position in the fixed file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub position: LineCol,
    pub severity: Severity,
    /// Diagnostic code (e.g., "W0001").
    pub code: Option<Arc<str>>,
    pub message: Arc<str>,
}

impl Diagnostic {
    pub fn warning(position: LineCol, message: impl Into<Arc<str>>) -> Self {
        Self {
            position,
            severity: Severity::Warning,
            code: None,
            message: message.into(),
        }
    }

    pub fn info(position: LineCol, message: impl Into<Arc<str>>) -> Self {
        Self {
            position,
            severity: Severity::Info,
            code: None,
            message: message.into(),
        }
    }

    /// Set the diagnostic code.
    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Diagnostic {
    /// `warning[W0001] 12:9: unresolved reference 'Foo'`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.severity.label())?;
        if let Some(code) = &self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, " {}: {}", self.position, self.message)
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

pub mod codes {
    /// Reference with no match in the symbol index.
    pub const UNRESOLVED_REFERENCE: &str = "W0001";
    /// Resolved import not added because its local name is already bound.
    pub const IMPORT_SKIPPED: &str = "W0002";
    /// Unused import removed.
    pub const REMOVED_IMPORT: &str = "I0001";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics for one file.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn unresolved_reference(&mut self, position: LineCol, name: &QualifiedName) {
        self.add(
            Diagnostic::warning(position, format!("unresolved reference '{name}'"))
                .with_code(codes::UNRESOLVED_REFERENCE),
        );
    }

    pub fn import_skipped(&mut self, position: LineCol, name: &QualifiedName, alias: &str) {
        self.add(
            Diagnostic::warning(
                position,
                format!("not importing '{name}': '{alias}' is already bound"),
            )
            .with_code(codes::IMPORT_SKIPPED),
        );
    }

    pub fn removed_import(&mut self, position: LineCol, name: &QualifiedName) {
        self.add(
            Diagnostic::info(position, format!("removed unused import '{name}'"))
                .with_code(codes::REMOVED_IMPORT),
        );
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
