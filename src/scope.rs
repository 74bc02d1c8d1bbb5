//! Lexical scopes of field identifiers.
//!
//! Every scope of a compilation lives in one [`ScopeArena`] and is addressed by
//! a [`ScopeId`]. A scope links to at most one parent, fixed when the scope is
//! created, so a scope's lineage (itself, then its ancestors up to a root) is a
//! simple chain and can never form a cycle.
//!
//! Uniqueness is checked upward only: a field may not reuse an identifier bound
//! anywhere in the lineage of the scope it is appended to, but sibling scopes
//! (two `optional` blocks, two variable arms) never see each other's fields, and
//! an ancestor does not see fields of its children.

use crate::ast::Field;
use crate::error::{AstError, Unresolved};
use std::collections::HashMap;
use std::ops::Index;

/// Index of a scope in its [`ScopeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScopeId(usize);

impl ScopeId {
    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        ScopeId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// A resolved reference to an `always` field: its identifier and the scope that
/// declares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldRef {
    pub scope: ScopeId,
    pub ident: String,
}

impl FieldRef {
    pub fn new(scope: ScopeId, ident: impl Into<String>) -> Self {
        FieldRef {
            scope,
            ident: ident.into(),
        }
    }
}

/// Fields declared directly in one scope, in declaration order.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Scope {
    parent: Option<ScopeId>,
    fields: Vec<Field>,
    #[cfg_attr(feature = "serde", serde(skip))]
    by_ident: HashMap<String, usize>,
}

impl Scope {
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, ident: &str) -> Option<&Field> {
        self.by_ident.get(ident).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, ident: &str) -> bool {
        self.by_ident.contains_key(ident)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn get_mut(&mut self, ident: &str) -> Option<&mut Field> {
        match self.by_ident.get(ident) {
            Some(&i) => self.fields.get_mut(i),
            None => None,
        }
    }
}

/// Owner of every scope in a compilation.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        ScopeArena::default()
    }

    /// Create a scope with no parent.
    pub fn root(&mut self) -> ScopeId {
        self.push(None)
    }

    /// Create a scope chained to `parent`.
    pub fn child(&mut self, parent: ScopeId) -> ScopeId {
        self.push(Some(parent))
    }

    fn push(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent,
            ..Scope::default()
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// `id`, then each ancestor up to the root.
    pub fn lineage(&self, id: ScopeId) -> Lineage<'_> {
        Lineage {
            arena: self,
            next: Some(id),
        }
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_in_lineage(&self, id: ScopeId, ancestor: ScopeId) -> bool {
        self.lineage(id).any(|s| s == ancestor)
    }

    /// Append `field` to scope `id`.
    ///
    /// Fails with [`AstError::FieldRedefinition`] if the identifier is already
    /// bound anywhere in the lineage of `id`; no scope changes in that case.
    ///
    /// # Panics
    ///
    /// If `id` was not created by this arena.
    pub fn append_field(&mut self, id: ScopeId, field: Field) -> Result<(), AstError> {
        if self.lookup(id, field.ident()).is_some() {
            return Err(AstError::FieldRedefinition(field.ident().to_string()));
        }
        let scope = &mut self.scopes[id.0];
        scope
            .by_ident
            .insert(field.ident().to_string(), scope.fields.len());
        scope.fields.push(field);
        Ok(())
    }

    /// Nearest binding of `ident` in the lineage of `id`, with its owning scope.
    pub fn lookup(&self, id: ScopeId, ident: &str) -> Option<(ScopeId, &Field)> {
        self.lineage(id)
            .find_map(|s| self.scopes[s.0].get(ident).map(|f| (s, f)))
    }

    /// Resolve `ident` to an `always` field visible from `id`.
    pub fn resolve(&self, id: ScopeId, ident: &str) -> Result<FieldRef, AstError> {
        match self.lookup(id, ident) {
            Some((owner, Field::Always(_))) => Ok(FieldRef::new(owner, ident)),
            Some((_, other)) => Err(AstError::UnresolvedReference {
                ident: ident.to_string(),
                reason: Unresolved::NotScalar(other.kind()),
            }),
            None => Err(AstError::UnresolvedReference {
                ident: ident.to_string(),
                reason: Unresolved::NotVisible,
            }),
        }
    }

    /// The field a resolved reference points at.
    pub fn field(&self, r: &FieldRef) -> Option<&Field> {
        self.get(r.scope).and_then(|s| s.get(&r.ident))
    }

    /// Mutable access to a field declared directly in scope `id`.
    pub fn field_mut(&mut self, id: ScopeId, ident: &str) -> Option<&mut Field> {
        self.scopes.get_mut(id.0).and_then(|s| s.get_mut(ident))
    }
}

impl Index<ScopeId> for ScopeArena {
    type Output = Scope;

    fn index(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }
}

/// Iterator over a scope and its ancestors.
pub struct Lineage<'a> {
    arena: &'a ScopeArena,
    next: Option<ScopeId>,
}

impl Iterator for Lineage<'_> {
    type Item = ScopeId;

    fn next(&mut self) -> Option<ScopeId> {
        let id = self.next?;
        self.next = self.arena.get(id).and_then(Scope::parent);
        Some(id)
    }
}
