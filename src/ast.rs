//! Schema model: modules, packets and fields.
//!
//! A [`Module`] owns its packets in declaration order and the [`ScopeArena`]
//! holding every scope. Packets form a single-inheritance forest: a derived
//! packet's scope is chained to its parent's, and the parent records each child
//! with the condition that selects it.
//!
//! All mutators are append-only and validate before committing: on error the
//! model is unchanged.

use crate::condition::Condition;
use crate::data::Data;
use crate::error::{AstError, VariantConflict};
use crate::scope::{ScopeArena, ScopeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

// ==================== Fields ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FieldKind {
    Always,
    Optional,
    Variable,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldKind::Always => "always",
            FieldKind::Optional => "optional",
            FieldKind::Variable => "variable",
        })
    }
}

/// A field of a packet or of a nested block. Equality and hashing use the
/// identifier only.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Field {
    Always(Always),
    Optional(Optional),
    Variable(Variable),
}

impl Field {
    pub fn ident(&self) -> &str {
        match self {
            Field::Always(f) => &f.ident,
            Field::Optional(f) => &f.ident,
            Field::Variable(f) => &f.ident,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Always(_) => FieldKind::Always,
            Field::Optional(_) => FieldKind::Optional,
            Field::Variable(_) => FieldKind::Variable,
        }
    }

    pub fn as_always(&self) -> Option<&Always> {
        match self {
            Field::Always(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_optional(&self) -> Option<&Optional> {
        match self {
            Field::Optional(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Field::Variable(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_variable_mut(&mut self) -> Option<&mut Variable> {
        match self {
            Field::Variable(f) => Some(f),
            _ => None,
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.ident() == other.ident()
    }
}

impl Eq for Field {}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ident().hash(state);
    }
}

/// An unconditionally present scalar.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Always {
    pub ident: String,
    pub data: Data,
}

impl Always {
    pub fn new(ident: impl Into<String>, data: Data) -> Self {
        Always {
            ident: ident.into(),
            data,
        }
    }
}

/// Fields present only when `condition` holds. They live in `scope`, a child
/// of the scope the optional is declared in.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Optional {
    pub ident: String,
    pub condition: Condition,
    pub scope: ScopeId,
}

impl Optional {
    /// `scope` must be a fresh child of the declaring scope.
    pub fn new(ident: impl Into<String>, condition: Condition, scope: ScopeId) -> Self {
        Optional {
            ident: ident.into(),
            condition,
            scope,
        }
    }
}

/// Label and discriminant of a variable arm.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Tag {
    pub label: String,
    pub value: i64,
}

impl Tag {
    pub fn new(label: impl Into<String>, value: i64) -> Self {
        Tag {
            label: label.into(),
            value,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|{}: {}|", self.label, self.value)
    }
}

/// One arm of a variable field.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Variant {
    pub tag: Tag,
    pub scope: ScopeId,
}

impl Variant {
    /// `scope` must be a fresh child of the scope the variable is declared in.
    pub fn new(tag: Tag, scope: ScopeId) -> Self {
        Variant { tag, scope }
    }
}

/// An arm: the condition selecting it (`None` for `otherwise`) and its variant.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Arm {
    pub condition: Option<Condition>,
    pub variant: Variant,
}

/// A tagged union. Arms are kept in declaration order, which is also the order
/// a decoder tests their conditions in; the `otherwise` arm is taken when no
/// other arm matched.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Variable {
    pub ident: String,
    arms: Vec<Arm>,
    #[cfg_attr(feature = "serde", serde(skip))]
    labels: HashSet<String>,
    #[cfg_attr(feature = "serde", serde(skip))]
    values: HashSet<i64>,
}

impl Variable {
    pub fn new(ident: impl Into<String>) -> Self {
        Variable {
            ident: ident.into(),
            arms: Vec::new(),
            labels: HashSet::new(),
            values: HashSet::new(),
        }
    }

    /// Add an arm. Checked in order: a second `otherwise`, a repeated
    /// condition, a repeated tag label, a repeated tag value.
    pub fn append_variant(
        &mut self,
        variant: Variant,
        condition: Option<Condition>,
    ) -> Result<(), AstError> {
        let conflict = match &condition {
            None if self.default_arm().is_some() => Some(VariantConflict::DuplicateDefault),
            Some(c) if self.arms.iter().any(|a| a.condition.as_ref() == Some(c)) => {
                Some(VariantConflict::DuplicateCondition(c.to_string()))
            }
            _ if self.labels.contains(&variant.tag.label) => {
                Some(VariantConflict::DuplicateLabel(variant.tag.label.clone()))
            }
            _ if self.values.contains(&variant.tag.value) => {
                Some(VariantConflict::DuplicateValue(variant.tag.value))
            }
            _ => None,
        };
        if let Some(conflict) = conflict {
            return Err(AstError::VariantRedefinition {
                ident: self.ident.clone(),
                conflict,
            });
        }
        self.labels.insert(variant.tag.label.clone());
        self.values.insert(variant.tag.value);
        self.arms.push(Arm { condition, variant });
        Ok(())
    }

    pub fn arms(&self) -> &[Arm] {
        &self.arms
    }

    pub fn default_arm(&self) -> Option<&Arm> {
        self.arms.iter().find(|a| a.condition.is_none())
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }
}

// ==================== Packets ====================

/// Index of a packet in its [`Module`], in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PacketId(usize);

impl PacketId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A subtype edge: the child packet and the condition on the parent's fields
/// that selects it.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Child {
    pub packet: PacketId,
    pub condition: Option<Condition>,
}

/// A named record type. Equality and hashing use the identifier only.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Packet {
    ident: String,
    parent: Option<PacketId>,
    condition: Option<Condition>,
    scope: ScopeId,
    children: Vec<Child>,
}

impl Packet {
    /// A packet with no parent. `scope` should be a fresh root scope.
    pub fn new(ident: impl Into<String>, scope: ScopeId) -> Self {
        Packet {
            ident: ident.into(),
            parent: None,
            condition: None,
            scope,
            children: Vec::new(),
        }
    }

    /// A packet deriving from `parent`, applicable when `condition` holds on the
    /// parent's fields. `scope` should be a fresh child of the parent's scope;
    /// see [`Module::packet_scope`].
    pub fn derived(
        ident: impl Into<String>,
        parent: PacketId,
        condition: Option<Condition>,
        scope: ScopeId,
    ) -> Self {
        Packet {
            ident: ident.into(),
            parent: Some(parent),
            condition,
            scope,
            children: Vec::new(),
        }
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn parent(&self) -> Option<PacketId> {
        self.parent
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Record a subtype. At most one child may lack a condition, and no two
    /// children may share one; either would make dispatch ambiguous.
    pub fn append_child(
        &mut self,
        packet: PacketId,
        condition: Option<Condition>,
    ) -> Result<(), AstError> {
        if self.children.iter().any(|c| c.condition == condition) {
            return Err(AstError::DispatchConflict {
                parent: self.ident.clone(),
                condition: match &condition {
                    Some(c) => format!("when {}", c),
                    None => "unconditionally".to_string(),
                },
            });
        }
        self.children.push(Child { packet, condition });
        Ok(())
    }
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.ident == other.ident
    }
}

impl Eq for Packet {}

impl Hash for Packet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ident.hash(state);
    }
}

// ==================== Module ====================

/// Root of the model: packets by identifier, in declaration order.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Module {
    packets: Vec<Packet>,
    #[cfg_attr(feature = "serde", serde(skip))]
    by_ident: HashMap<String, PacketId>,
    scopes: ScopeArena,
}

impl Module {
    pub fn new() -> Self {
        Module::default()
    }

    /// Register a packet. Fails with [`AstError::PacketRedefinition`] if one
    /// with the same identifier exists; the module is unchanged in that case.
    pub fn append_packet(&mut self, packet: Packet) -> Result<PacketId, AstError> {
        if self.by_ident.contains_key(&packet.ident) {
            return Err(AstError::PacketRedefinition(packet.ident));
        }
        let id = PacketId(self.packets.len());
        self.by_ident.insert(packet.ident.clone(), id);
        self.packets.push(packet);
        Ok(id)
    }

    /// A fresh scope for a packet body: chained to the parent packet's scope,
    /// or a new root.
    pub fn packet_scope(&mut self, parent: Option<PacketId>) -> ScopeId {
        let parent_scope = parent.and_then(|p| self.packets.get(p.0)).map(Packet::scope);
        match parent_scope {
            Some(scope) => self.scopes.child(scope),
            None => self.scopes.root(),
        }
    }

    /// Append a field to a registered packet's own scope.
    ///
    /// # Panics
    ///
    /// If `packet` was not returned by this module's [`Module::append_packet`].
    pub fn append_field(&mut self, packet: PacketId, field: Field) -> Result<(), AstError> {
        let scope = self.packets[packet.0].scope;
        self.scopes.append_field(scope, field)
    }

    /// The packet registered under `id`.
    ///
    /// # Panics
    ///
    /// If `id` was not returned by this module's [`Module::append_packet`];
    /// use [`Module::get`] to look packets up by identifier instead.
    pub fn packet(&self, id: PacketId) -> &Packet {
        &self.packets[id.0]
    }

    /// Mutable [`Module::packet`], with the same precondition.
    pub fn packet_mut(&mut self, id: PacketId) -> &mut Packet {
        &mut self.packets[id.0]
    }

    pub fn packet_id(&self, ident: &str) -> Option<PacketId> {
        self.by_ident.get(ident).copied()
    }

    pub fn get(&self, ident: &str) -> Option<&Packet> {
        self.packet_id(ident).map(|id| self.packet(id))
    }

    pub fn packets(&self) -> impl Iterator<Item = (PacketId, &Packet)> {
        self.packets
            .iter()
            .enumerate()
            .map(|(i, p)| (PacketId(i), p))
    }

    /// `id`'s parent, grandparent and so on. Panics like [`Module::packet`].
    pub fn ancestors(&self, id: PacketId) -> Vec<PacketId> {
        let mut out = Vec::new();
        let mut next = self.packet(id).parent;
        while let Some(p) = next {
            out.push(p);
            next = self.packet(p).parent;
        }
        out
    }

    pub fn scopes(&self) -> &ScopeArena {
        &self.scopes
    }

    pub fn scopes_mut(&mut self) -> &mut ScopeArena {
        &mut self.scopes
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}
