//! Source model provider trait and the syntax data it produces.
//!
//! This module defines the seam between the core and a language front end:
//!
//! - [`SourceModelProvider`] parses unit text into a [`UnitSyntax`] and builds
//!   a [`Binder`] over a set of parsed units.
//! - [`Binder`] resolves a span in a unit to a [`SymbolId`].
//!
//! # Ownership
//!
//! - **Providers own identity.** Symbol identities come from the binder; the
//!   core never derives identity from a name.
//! - **The core never parses text.** Everything it knows about a unit comes
//!   from [`UnitSyntax`].
//!
//! # Deterministic Ordering
//!
//! `UnitSyntax.fragments`, `FragmentData.members`, and
//! `UnitSyntax.occurrences` **must be in source order**. Merge order and
//! diagnostic order depend on it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::patch::{FileId, Span};
use crate::snapshot::SourceUnit;

// ============================================================================
// Symbol Identity
// ============================================================================

/// Stable identity of a declared member, distinct from its textual name.
///
/// Assigned by the provider's binder. Renaming a member changes its name,
/// never its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn new(id: u32) -> Self {
        SymbolId(id)
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym_{}", self.0)
    }
}

// ============================================================================
// Kinds
// ============================================================================

/// Kind of aggregate a fragment declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    Class,
    Struct,
    Interface,
    Record,
    Enum,
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateKind::Class => "class",
            AggregateKind::Struct => "struct",
            AggregateKind::Interface => "interface",
            AggregateKind::Record => "record",
            AggregateKind::Enum => "enum",
        };
        f.write_str(s)
    }
}

/// Kind of member declared inside a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Method,
    Constructor,
    Destructor,
    Operator,
    Property,
    Field,
    Event,
}

impl MemberKind {
    /// Whether members of this kind take part in same-name collision groups.
    ///
    /// Only ordinary methods do. Constructors share the aggregate's name by
    /// construction, and operators are named by their token.
    pub fn is_method_like(&self) -> bool {
        matches!(self, MemberKind::Method)
    }

    /// Whether a member of this kind occupies a name in the aggregate's
    /// member namespace (so a rename must not reuse it).
    pub fn occupies_name(&self) -> bool {
        matches!(
            self,
            MemberKind::Method | MemberKind::Property | MemberKind::Field | MemberKind::Event
        )
    }
}

/// What a name occurrence is syntactically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccurrenceKind {
    /// The declaring identifier of a member.
    Declaration,
    /// An invocation (`Name(...)`, `x.Name(...)`).
    Call,
    /// Any other use (method group, `nameof`, delegate conversion).
    Reference,
}

// ============================================================================
// Unit Syntax
// ============================================================================

/// One declared member inside a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberData {
    pub kind: MemberKind,
    pub name: String,
    /// Span of the declaring identifier.
    pub name_span: Span,
    /// Parameter count (0 for non-callable members).
    pub arity: usize,
}

/// One declaration fragment of an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentData {
    pub kind: AggregateKind,
    /// Simple name (what the allow-list tests).
    pub name: String,
    /// Enclosing namespace, if any.
    pub namespace: Option<String>,
    /// Whole fragment subtree.
    pub span: Span,
    pub name_span: Span,
    pub members: Vec<MemberData>,
}

impl FragmentData {
    /// Namespace-qualified name; fragments merge on this plus kind.
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{}.{}", ns, self.name),
            _ => self.name.clone(),
        }
    }
}

/// A name occurrence that may bind to a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceData {
    pub name: String,
    pub span: Span,
    pub kind: OccurrenceKind,
}

/// Everything the core needs to know about one parsed unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSyntax {
    pub fragments: Vec<FragmentData>,
    /// Declarations and uses, in source order.
    pub occurrences: Vec<OccurrenceData>,
    /// Tool-generated unit; diagnostics located here are suppressed by default.
    pub generated: bool,
}

// ============================================================================
// Provider Traits
// ============================================================================

/// Resolves spans to member identities over one snapshot's units.
///
/// Returns `None` for anything it cannot resolve; callers treat that as
/// "not a reference", never as an error.
pub trait Binder: Send + Sync {
    fn resolve(&self, file_id: FileId, span: Span) -> Option<SymbolId>;
}

/// A language front end that the core drives.
pub trait SourceModelProvider: Send + Sync {
    /// Parse failure type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short language name, used in logs.
    fn language(&self) -> &'static str;

    /// Whether this provider handles the unit at `path`.
    fn can_handle(&self, path: &str) -> bool;

    /// Parse one unit's text.
    fn parse(&self, path: &str, text: &str) -> Result<UnitSyntax, Self::Error>;

    /// Build a binder over `units` (sorted by path, `FileId` = index).
    fn bind(&self, units: &[Arc<SourceUnit>]) -> Arc<dyn Binder>;
}
