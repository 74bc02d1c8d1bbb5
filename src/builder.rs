//! Build the schema model from the syntax tree.
//!
//! The walk is depth-first and single-pass. The scope that new fields go into
//! is passed explicitly to every visit function, so returning from a nested
//! block restores the enclosing scope.
//!
//! Semantic errors never stop the walk (unless [`BuildOptions::fail_fast`] is
//! set): each one is reported to the [`DiagnosticSink`] with its location and
//! the construct that caused it is left out of the model, so one compilation
//! surfaces every independent problem.

use crate::ast::{Always, Field, Module, Optional, Packet, PacketId, Tag, Variable, Variant};
use crate::condition::{Condition, ConjOp, Expr, RelOp};
use crate::cst::{self, Node, Rule};
use crate::data::{Data, DataType, Endianness, Size, Width};
use crate::diagnostics::{Diagnostic, DiagnosticSink, Location};
use crate::error::AstError;
use crate::scope::{FieldRef, ScopeId};
use tracing::{debug, trace};

/// Builder configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Stop walking after the first diagnostic and return what was built so far.
    pub fail_fast: bool,
}

/// A resolved parent edge. `resolved` is false when a condition was written
/// but did not resolve.
struct Inheritance {
    parent: PacketId,
    condition: Option<Condition>,
    resolved: bool,
}

/// One compilation's tree walk. Not reusable: [`Builder::build`] consumes it.
pub struct Builder<'s, S: DiagnosticSink + ?Sized> {
    module: Module,
    sink: &'s mut S,
    options: BuildOptions,
    errors: usize,
}

/// Build a module from `tree`, reporting semantic errors to `sink`.
pub fn build_module<S: DiagnosticSink + ?Sized>(tree: Node<'_>, sink: &mut S) -> Module {
    Builder::new(sink).build(tree)
}

impl<'s, S: DiagnosticSink + ?Sized> Builder<'s, S> {
    pub fn new(sink: &'s mut S) -> Self {
        Builder {
            module: Module::new(),
            sink,
            options: BuildOptions::default(),
            errors: 0,
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Walk a [`Rule::module`] node.
    pub fn build(mut self, tree: Node<'_>) -> Module {
        for packet in tree.into_inner().filter(|p| p.as_rule() == Rule::packet) {
            if self.halted() {
                break;
            }
            self.visit_packet(packet);
        }
        debug!(packets = self.module.len(), errors = self.errors, "module built");
        self.module
    }

    fn halted(&self) -> bool {
        self.options.fail_fast && self.errors > 0
    }

    fn report(&mut self, error: AstError, location: Location) {
        debug!(%location, %error, "semantic error");
        self.errors += 1;
        self.sink.report(Diagnostic::new(error, location));
    }

    fn append(&mut self, scope: ScopeId, field: Field, location: Location) -> bool {
        let ident = field.ident().to_string();
        let kind = field.kind();
        match self.module.scopes_mut().append_field(scope, field) {
            Ok(()) => {
                trace!(field = %ident, %kind, scope = scope.index(), "field appended");
                true
            }
            Err(e) => {
                self.report(e, location);
                false
            }
        }
    }

    // ==================== Packets ====================

    fn visit_packet(&mut self, node: Node<'_>) {
        let mut inner = node.into_inner();
        let Some(ident_node) = inner.next() else {
            return;
        };
        let ident = ident_node.as_str();
        let location = cst::location(&ident_node);

        let mut inheritance = None;
        let mut body = Vec::new();
        for child in inner {
            if child.as_rule() == Rule::inheritance {
                inheritance = self.visit_inheritance(ident, child);
            } else {
                body.push(child);
            }
        }

        let parent = inheritance.as_ref().map(|i| i.parent);
        let scope = self.module.packet_scope(parent);
        let packet = match &inheritance {
            Some(i) => Packet::derived(ident, i.parent, i.condition.clone(), scope),
            None => Packet::new(ident, scope),
        };
        self.visit_block(body, scope);

        match self.module.append_packet(packet) {
            Ok(id) => {
                debug!(packet = ident, fields = self.module.scopes()[scope].len(), "packet registered");
                // A subtype whose condition did not resolve keeps its parent but
                // gets no dispatch edge.
                if let Some(Inheritance { parent, condition, resolved: true }) = inheritance {
                    if let Err(e) = self.module.packet_mut(parent).append_child(id, condition) {
                        self.report(e, location);
                    }
                }
            }
            Err(e) => self.report(e, location),
        }
    }

    /// Resolve the parent and its selecting condition. The condition tests
    /// fields the parent declares, so it is resolved in the parent's scope.
    fn visit_inheritance(&mut self, ident: &str, node: Node<'_>) -> Option<Inheritance> {
        let mut inner = node.into_inner();
        let parent_node = inner.next()?;
        let Some(parent) = self.module.packet_id(parent_node.as_str()) else {
            self.report(
                AstError::UnresolvedParent {
                    packet: ident.to_string(),
                    parent: parent_node.as_str().to_string(),
                },
                cst::location(&parent_node),
            );
            return None;
        };
        let parent_scope = self.module.packet(parent).scope();
        let (condition, resolved) = match inner.next() {
            Some(c) => {
                let condition = self.visit_condition(c, parent_scope);
                let resolved = condition.is_some();
                (condition, resolved)
            }
            None => (None, true),
        };
        Some(Inheritance {
            parent,
            condition,
            resolved,
        })
    }

    // ==================== Statements ====================

    fn visit_block<'i>(&mut self, statements: impl IntoIterator<Item = Node<'i>>, scope: ScopeId) {
        for stmt in statements {
            if self.halted() {
                break;
            }
            match stmt.as_rule() {
                Rule::always_stmt => self.visit_always(stmt, scope),
                Rule::optional_stmt => self.visit_optional(stmt, scope),
                Rule::variable_stmt => self.visit_variable(stmt, scope),
                _ => {}
            }
        }
    }

    fn visit_always(&mut self, node: Node<'_>, scope: ScopeId) {
        let location = cst::location(&node);
        let mut inner = node.into_inner();
        let (Some(ident), Some(desc)) = (inner.next(), inner.next()) else {
            return;
        };
        if let Some(data) = self.visit_field_desc(ident.as_str(), desc, scope) {
            self.append(scope, Field::Always(Always::new(ident.as_str(), data)), location);
        }
    }

    /// The field is bound in `scope` before its body is walked, so the body
    /// cannot reuse its identifier. With an unresolved condition the field is
    /// left out but the body is still checked.
    fn visit_optional(&mut self, node: Node<'_>, scope: ScopeId) {
        let location = cst::location(&node);
        let mut inner = node.into_inner();
        let (Some(ident), Some(cond)) = (inner.next(), inner.next()) else {
            return;
        };
        let condition = self.visit_condition(cond, scope);
        let child = self.module.scopes_mut().child(scope);
        if let Some(condition) = condition {
            self.append(
                scope,
                Field::Optional(Optional::new(ident.as_str(), condition, child)),
                location,
            );
        }
        self.visit_block(inner, child);
    }

    fn visit_variable(&mut self, node: Node<'_>, scope: ScopeId) {
        let location = cst::location(&node);
        let mut inner = node.into_inner();
        let Some(ident_node) = inner.next() else {
            return;
        };
        let ident = ident_node.as_str();
        let attached = self.append(scope, Field::Variable(Variable::new(ident)), location);
        // Arms of a variable that failed to bind are still checked against each other.
        let mut detached = Variable::new(ident);
        for arm in inner {
            if self.halted() {
                break;
            }
            self.visit_arm(arm, scope, ident, attached, &mut detached);
        }
    }

    fn visit_arm(
        &mut self,
        node: Node<'_>,
        scope: ScopeId,
        ident: &str,
        attached: bool,
        detached: &mut Variable,
    ) {
        let location = cst::location(&node);
        let is_case = node.as_rule() == Rule::case_block;
        let mut inner = node.into_inner();

        let mut condition = None;
        if is_case {
            let Some(cond) = inner.next() else {
                return;
            };
            condition = self.visit_condition(cond, scope);
        }
        let resolved = !is_case || condition.is_some();
        let Some(tag_node) = inner.next() else {
            return;
        };
        let tag = self.visit_tag(tag_node);

        let child = self.module.scopes_mut().child(scope);
        self.visit_block(inner, child);

        let Some(tag) = tag else {
            return;
        };
        if !resolved {
            return;
        }
        let label = tag.label.clone();
        let variant = Variant::new(tag, child);
        let target = if attached {
            self.module
                .scopes_mut()
                .field_mut(scope, ident)
                .and_then(Field::as_variable_mut)
        } else {
            None
        };
        let result = match target {
            Some(var) => var.append_variant(variant, condition),
            None => detached.append_variant(variant, condition),
        };
        match result {
            Ok(()) => trace!(variable = ident, arm = %label, "arm appended"),
            Err(e) => self.report(e, location),
        }
    }

    fn visit_tag(&mut self, node: Node<'_>) -> Option<Tag> {
        let mut inner = node.into_inner();
        let label = inner.next()?.as_str();
        let value = inner.next()?;
        let n = self.signed_integer(&value)?;
        Some(Tag::new(label, n))
    }

    // ==================== Field descriptors ====================

    /// `type : count unit : value`. The unit-carrying count is the width; the
    /// bare value is the repetition count. At least one must be present.
    fn visit_field_desc(&mut self, ident: &str, node: Node<'_>, scope: ScopeId) -> Option<Data> {
        let location = cst::location(&node);
        let mut ty = DataType::Ignore;
        let mut width = None;
        let mut count = None;
        let mut resolved = true;
        for part in node.into_inner() {
            match part.as_rule() {
                Rule::scalar_type => {
                    ty = match part.as_str() {
                        "sint" => DataType::Sint,
                        "uint" => DataType::Uint,
                        _ => DataType::Ignore,
                    }
                }
                Rule::count => match self.visit_width(part, scope) {
                    Some(w) => width = Some(w),
                    None => resolved = false,
                },
                Rule::value => match self.visit_size(part, scope) {
                    Some(s) => count = Some(s),
                    None => resolved = false,
                },
                _ => {}
            }
        }
        if !resolved {
            return None;
        }
        if width.is_none() && count.is_none() {
            self.report(AstError::MalformedDescriptor(ident.to_string()), location);
            return None;
        }
        let mut data = Data::new(ty);
        if let Some(w) = width {
            data = data.with_width(w);
        }
        if let Some(c) = count {
            data = data.with_count(c);
        }
        Some(data)
    }

    fn visit_width(&mut self, node: Node<'_>, scope: ScopeId) -> Option<Width> {
        let mut inner = node.into_inner();
        let value = inner.next()?;
        let unit = inner.next()?.into_inner().next()?;
        let count = self.visit_size(value, scope)?;
        match unit.as_rule() {
            Rule::bytes => {
                let order = unit.into_inner().next().map(|o| match o.as_str() {
                    "be" => Endianness::Big,
                    _ => Endianness::Little,
                });
                Some(Width::bytes(count, order))
            }
            _ => Some(Width::bits(count)),
        }
    }

    fn visit_size(&mut self, node: Node<'_>, scope: ScopeId) -> Option<Size> {
        let inner = node.into_inner().next()?;
        match inner.as_rule() {
            Rule::integer => match cst::parse_integer(inner.as_str()) {
                Some(n) => Some(Size::Literal(n)),
                None => {
                    self.report(
                        AstError::IntegerOutOfRange(inner.as_str().to_string()),
                        cst::location(&inner),
                    );
                    None
                }
            },
            Rule::reference => self.visit_reference(inner, scope).map(Size::Field),
            _ => None,
        }
    }

    fn visit_reference(&mut self, node: Node<'_>, scope: ScopeId) -> Option<FieldRef> {
        let location = cst::location(&node);
        let ident = node.into_inner().next()?.as_str();
        match self.module.scopes().resolve(scope, ident) {
            Ok(r) => Some(r),
            Err(e) => {
                self.report(e, location);
                None
            }
        }
    }

    fn signed_integer(&mut self, node: &Node<'_>) -> Option<i64> {
        match cst::parse_integer(node.as_str()).and_then(|n| i64::try_from(n).ok()) {
            Some(n) => Some(n),
            None => {
                self.report(
                    AstError::IntegerOutOfRange(node.as_str().to_string()),
                    cst::location(node),
                );
                None
            }
        }
    }

    // ==================== Conditions ====================

    fn visit_condition(&mut self, node: Node<'_>, scope: ScopeId) -> Option<Condition> {
        self.visit_expr(node, scope).map(Condition::new)
    }

    /// Every operand is visited even after one fails, so all unresolved
    /// references in a condition are reported.
    fn visit_expr(&mut self, node: Node<'_>, scope: ScopeId) -> Option<Expr> {
        match node.as_rule() {
            Rule::cond_exp => self.fold_conjunction(node, scope, ConjOp::Or),
            Rule::cond_and => self.fold_conjunction(node, scope, ConjOp::And),
            Rule::cond_rel => {
                let mut inner = node.into_inner();
                let left = self.visit_expr(inner.next()?, scope);
                match (inner.next(), inner.next()) {
                    (Some(op), Some(right)) => {
                        let right = self.visit_expr(right, scope);
                        let op = RelOp::from_symbol(op.as_str())?;
                        Some(Expr::relation(left?, right?, op))
                    }
                    _ => left,
                }
            }
            Rule::negation => {
                let operand = node.into_inner().next()?;
                self.visit_expr(operand, scope).map(Expr::not)
            }
            Rule::value => {
                let inner = node.into_inner().next()?;
                match inner.as_rule() {
                    Rule::integer => self.signed_integer(&inner).map(Expr::int),
                    Rule::reference => self.visit_reference(inner, scope).map(Expr::field),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Left-associative fold: `a || b || c` is `((a || b) || c)`.
    fn fold_conjunction(&mut self, node: Node<'_>, scope: ScopeId, op: ConjOp) -> Option<Expr> {
        let operands: Vec<Option<Expr>> = node
            .into_inner()
            .map(|n| self.visit_expr(n, scope))
            .collect();
        let mut operands = operands.into_iter().collect::<Option<Vec<_>>>()?.into_iter();
        let first = operands.next()?;
        Some(operands.fold(first, |acc, e| Expr::conjunction(acc, e, op)))
    }
}
