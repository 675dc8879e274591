//! Syntax produced by the parser.
//!
//! This is deliberately shallow: declarations are modeled precisely,
//! bodies only as the call sites and method-group references found in
//! them.

use overcheck_core::patch::Span;
use overcheck_core::provider::{AggregateKind, MemberKind};

/// One parsed `.cs` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFile {
    /// Type declarations in source order; a nested type follows its outer type.
    pub types: Vec<TypeDecl>,
    /// Namespaces imported with `using X.Y;`.
    pub usings: Vec<String>,
}

/// One type declaration (a fragment, when it is `partial`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub kind: AggregateKind,
    pub name: String,
    pub name_span: Span,
    /// Enclosing namespace, extended with outer type names for nested types.
    pub namespace: Option<String>,
    /// Qualified name of the enclosing type, for nested types.
    pub outer: Option<String>,
    pub span: Span,
    pub modifiers: Vec<String>,
    pub type_params: Vec<String>,
    pub members: Vec<MemberDecl>,
    /// Call sites and references in this type's bodies (not nested types').
    pub calls: Vec<CallSite>,
}

impl TypeDecl {
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{}.{}", ns, self.name),
            _ => self.name.clone(),
        }
    }

    pub fn is_partial(&self) -> bool {
        self.modifiers.iter().any(|m| m == "partial")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDecl {
    pub kind: MemberKind,
    pub name: String,
    pub name_span: Span,
    /// Return type for methods and operators, declared type for fields,
    /// properties, and events.
    pub ty: Option<String>,
    pub params: Vec<Param>,
    pub type_params: Vec<String>,
    /// A body-less `partial` method declaration. It names the same method as
    /// its implementing declaration and is not a member of its own.
    pub partial_declaration: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: String,
    pub name: String,
    pub name_span: Span,
    pub optional: bool,
    /// `params T[] name`
    pub is_params: bool,
}

/// What a call site is invoked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// `Name(...)`
    Implicit,
    /// `this.Name(...)`
    This,
    /// `base.Name(...)`
    Base,
    /// A local or parameter, with its declared type when it has one.
    Local(Option<String>),
    /// An identifier or dotted name that is not a local: a field,
    /// property, or type.
    Name(String),
    /// Anything more complex; never resolved.
    Expression,
}

/// Statically known type of a call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    Known(String),
    Null,
    /// A bare identifier that is not a local; may name a field.
    Name(String),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub name: String,
    pub span: Span,
    pub receiver: Receiver,
    /// `None` for a method-group reference (`Handler`, `nameof(Run)`).
    pub args: Option<Vec<ArgType>>,
}

impl CallSite {
    pub fn is_invocation(&self) -> bool {
        self.args.is_some()
    }
}
