//! Condition expressions: packet applicability, optional presence and
//! variable case selection.
//!
//! Values hold either an integer literal or a [`FieldRef`] the builder has
//! already resolved; the model itself does no resolution.
//!
//! `Display` renders the canonical form: every relation and conjunction is
//! parenthesised regardless of depth, negation is a `!` prefix, and field
//! references render as their bare identifier.
//!
//! ```text
//! (((foo < 3) && (bar > 20)) || !bas)
//! ```

use crate::scope::FieldRef;
use std::fmt;

/// A boolean/value condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Condition {
    pub root: Expr,
}

impl Condition {
    pub fn new(root: Expr) -> Self {
        Condition { root }
    }

    /// Field references in the condition, left to right.
    pub fn references(&self) -> Vec<&FieldRef> {
        let mut out = Vec::new();
        self.root.collect_references(&mut out);
        out
    }
}

impl From<Expr> for Condition {
    fn from(root: Expr) -> Self {
        Condition { root }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root, f)
    }
}

/// A leaf value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Value {
    Int(i64),
    Field(FieldRef),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Field(r) => write!(f, "{}", r.ident),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RelOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    NotEq,
}

impl RelOp {
    pub fn symbol(self) -> &'static str {
        match self {
            RelOp::Eq => "==",
            RelOp::Gt => ">",
            RelOp::Gte => ">=",
            RelOp::Lt => "<",
            RelOp::Lte => "<=",
            RelOp::NotEq => "!=",
        }
    }

    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "==" => Some(RelOp::Eq),
            ">" => Some(RelOp::Gt),
            ">=" => Some(RelOp::Gte),
            "<" => Some(RelOp::Lt),
            "<=" => Some(RelOp::Lte),
            "!=" => Some(RelOp::NotEq),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ConjOp {
    And,
    Or,
}

impl ConjOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ConjOp::And => "&&",
            ConjOp::Or => "||",
        }
    }
}

/// Expression tree node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Expr {
    Value(Value),
    Negation(Box<Expr>),
    Relation {
        left: Box<Expr>,
        right: Box<Expr>,
        op: RelOp,
    },
    Conjunction {
        left: Box<Expr>,
        right: Box<Expr>,
        op: ConjOp,
    },
}

impl Expr {
    pub fn int(n: i64) -> Self {
        Expr::Value(Value::Int(n))
    }

    pub fn field(r: FieldRef) -> Self {
        Expr::Value(Value::Field(r))
    }

    pub fn not(expr: Expr) -> Self {
        Expr::Negation(Box::new(expr))
    }

    pub fn relation(left: Expr, right: Expr, op: RelOp) -> Self {
        Expr::Relation {
            left: Box::new(left),
            right: Box::new(right),
            op,
        }
    }

    pub fn conjunction(left: Expr, right: Expr, op: ConjOp) -> Self {
        Expr::Conjunction {
            left: Box::new(left),
            right: Box::new(right),
            op,
        }
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a FieldRef>) {
        match self {
            Expr::Value(Value::Field(r)) => out.push(r),
            Expr::Value(Value::Int(_)) => {}
            Expr::Negation(e) => e.collect_references(out),
            Expr::Relation { left, right, .. } | Expr::Conjunction { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Value(v) => fmt::Display::fmt(v, f),
            Expr::Negation(e) => write!(f, "!{}", e),
            Expr::Relation { left, right, op } => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::Conjunction { left, right, op } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
        }
    }
}
