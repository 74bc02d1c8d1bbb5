//! Semantic diagnostics: a message attached to a source location.

use crate::error::AstError;
use std::fmt;

/// One-based line and column in the schema source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Location { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A semantic error found while building the model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    pub location: Location,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_message"))]
    pub error: AstError,
}

impl Diagnostic {
    pub fn new(error: AstError, location: Location) -> Self {
        Diagnostic { location, error }
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: error: {}", self.location, self.error)
    }
}

#[cfg(feature = "serde")]
fn serialize_message<S: serde::Serializer>(error: &AstError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

/// Receives diagnostics as the builder finds them. Reporting never aborts the walk.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Counts diagnostics without keeping them.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub count: usize,
}

impl DiagnosticSink for CountingSink {
    fn report(&mut self, _diagnostic: Diagnostic) {
        self.count += 1;
    }
}
