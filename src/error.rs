//! Error types for model construction and compilation.

use crate::ast::FieldKind;
use crate::cst::Rule;
use crate::diagnostics::Diagnostic;

/// A violated invariant of the schema model, or an unresolvable name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AstError {
    #[error("packet `{0}` redefined")]
    PacketRedefinition(String),
    #[error("field `{0}` redefined in this scope or an enclosing one")]
    FieldRedefinition(String),
    #[error("variable `{ident}`: {conflict}")]
    VariantRedefinition { ident: String, conflict: VariantConflict },
    #[error("packet `{packet}` derives from unknown packet `{parent}`")]
    UnresolvedParent { packet: String, parent: String },
    #[error("unresolved reference `&{ident}`: {reason}")]
    UnresolvedReference { ident: String, reason: Unresolved },
    #[error("malformed descriptor for field `{0}`: neither width nor count given")]
    MalformedDescriptor(String),
    #[error("packet `{parent}` already dispatches to a subtype {condition}")]
    DispatchConflict { parent: String, condition: String },
    #[error("integer literal `{0}` out of range")]
    IntegerOutOfRange(String),
}

/// Which invariant of a variable field an arm violates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VariantConflict {
    #[error("multiple otherwise arms")]
    DuplicateDefault,
    #[error("case {0} already defined")]
    DuplicateCondition(String),
    #[error("tag label `{0}` already used")]
    DuplicateLabel(String),
    #[error("tag value {0} already used")]
    DuplicateValue(i64),
}

/// Why a reference did not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Unresolved {
    #[error("no such field in scope")]
    NotVisible,
    #[error("{0} field is not a scalar")]
    NotScalar(FieldKind),
}

/// Failure of a whole compilation.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Syntax: {0}")]
    Syntax(Box<pest::error::Error<Rule>>),
    #[error("{} semantic error(s), first: {}", .0.len(), first_message(.0))]
    Semantic(Vec<Diagnostic>),
}

fn first_message(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .first()
        .map(|d| d.to_string())
        .unwrap_or_default()
}
