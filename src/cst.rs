//! Concrete syntax tree: parse schema source into pest pairs.
//!
//! The builder walks the [`Rule::module`] pair returned by [`parse`]. Node
//! kinds mirror the grammar in `grammar.pest` one-to-one.

use crate::diagnostics::Location;
use crate::error::CompileError;
use pest::error::{Error, ErrorVariant};
use pest::iterators::Pair;
use pest::Position;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct SchemaParser;

/// A node of the concrete syntax tree.
pub type Node<'i> = Pair<'i, Rule>;

/// Parse schema source into its module node.
pub fn parse(source: &str) -> Result<Node<'_>, CompileError> {
    let mut pairs = SchemaParser::parse(Rule::module, source)
        .map_err(|e| CompileError::Syntax(Box::new(e)))?;
    pairs.next().ok_or_else(|| {
        let error = Error::new_from_pos(
            ErrorVariant::CustomError {
                message: "expected a module".to_string(),
            },
            Position::from_start(source),
        );
        CompileError::Syntax(Box::new(error))
    })
}

/// Source position of the start of a node.
pub fn location(node: &Node<'_>) -> Location {
    let (line, column) = node.as_span().start_pos().line_col();
    Location::new(line, column)
}

/// Parse an integer token (decimal or `0x` hexadecimal).
pub fn parse_integer(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    s.parse().ok()
}
