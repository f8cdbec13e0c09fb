//! Diagnostics reported by a parse backend

use super::position::TextRange;
use crate::snapshot::FileIdentity;

/// Backend severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Ignored,
    Note,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Human-readable severity, used as the tooltip heading
    pub fn spelling(&self) -> &'static str {
        match self {
            Severity::Ignored => "Ignored",
            Severity::Note => "Note",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal error",
        }
    }

    /// Visual class: everything up to warnings renders as a warning
    pub fn class(&self) -> DiagnosticClass {
        if *self <= Severity::Warning {
            DiagnosticClass::Warning
        } else {
            DiagnosticClass::Error
        }
    }
}

/// The two visual buckets diagnostics are rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticClass {
    Warning,
    Error,
}

impl DiagnosticClass {
    /// Tag name applied to the diagnostic's range
    pub fn tag_name(&self) -> &'static str {
        match self {
            DiagnosticClass::Warning => "diagnostic_warning",
            DiagnosticClass::Error => "diagnostic_error",
        }
    }
}

/// A diagnostic tagged with the file it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: FileIdentity,
    pub severity: Severity,
    pub range: TextRange,
    pub message: String,
}
