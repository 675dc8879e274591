//! Name binding for the C# subset.
//!
//! The binder re-reads every unit's syntax, indexes the declared types by
//! qualified name (merging `partial` fragments), and resolves each call
//! site to at most one method. Resolution is deliberately conservative: a
//! site whose receiver or overload cannot be decided from declarations,
//! parameter types, and literal argument types binds to nothing.
//!
//! Symbol identities are assigned in `(unit, fragment, member)` order over
//! the provider's own `UnitSyntax`, so a rename that only changes names
//! leaves every identity unchanged.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use overcheck_core::patch::{FileId, Span};
use overcheck_core::provider::{Binder, MemberKind, SymbolId};
use overcheck_core::snapshot::SourceUnit;
use tracing::{debug, trace};

use crate::parser::parse_source;
use crate::syntax::{ArgType, CallSite, Param, Receiver, SourceFile};

// ============================================================================
// Type Index
// ============================================================================

#[derive(Debug)]
struct MethodEntry {
    id: SymbolId,
    name: String,
    params: Vec<Param>,
    type_params: Vec<String>,
}

#[derive(Debug, Default)]
struct TypeEntry {
    outer: Option<String>,
    methods: Vec<MethodEntry>,
    /// Declared types of fields, properties, and events.
    member_types: HashMap<String, String>,
}

/// Lexical context of a call site.
struct Scope<'a> {
    enclosing: String,
    namespace: Option<&'a str>,
    usings: &'a [String],
}

// ============================================================================
// Binder
// ============================================================================

/// Span-to-symbol map built once per snapshot.
#[derive(Debug, Default)]
pub struct CSharpBinder {
    spans: HashMap<(FileId, Span), SymbolId>,
}

impl CSharpBinder {
    pub fn build(units: &[Arc<SourceUnit>]) -> Self {
        let mut spans = HashMap::new();
        let mut next = 0u32;
        for unit in units {
            for fragment in &unit.syntax.fragments {
                for member in &fragment.members {
                    spans.insert((unit.file_id, member.name_span), SymbolId::new(next));
                    next += 1;
                }
            }
        }

        let parsed: Vec<(FileId, SourceFile)> = units
            .iter()
            .filter_map(|unit| match parse_source(&unit.text) {
                Ok(file) => Some((unit.file_id, file)),
                Err(err) => {
                    trace!(path = %unit.path, error = %err, "skipping unit in binder");
                    None
                }
            })
            .collect();

        let types = index_types(&parsed, &spans);
        bind_partial_declarations(&parsed, &types, &mut spans);

        let mut bound = 0usize;
        for (file_id, file) in &parsed {
            for decl in &file.types {
                let scope = Scope {
                    enclosing: decl.qualified_name(),
                    namespace: decl.namespace.as_deref(),
                    usings: &file.usings,
                };
                for call in &decl.calls {
                    if let Some(id) = resolve_call(&types, &scope, call) {
                        spans.insert((*file_id, call.span), id);
                        bound += 1;
                    }
                }
            }
        }

        debug!(symbols = next, bound_sites = bound, types = types.len(), "bound units");
        CSharpBinder { spans }
    }
}

impl Binder for CSharpBinder {
    fn resolve(&self, file_id: FileId, span: Span) -> Option<SymbolId> {
        self.spans.get(&(file_id, span)).copied()
    }
}

fn index_types(
    parsed: &[(FileId, SourceFile)],
    spans: &HashMap<(FileId, Span), SymbolId>,
) -> BTreeMap<String, TypeEntry> {
    let mut types: BTreeMap<String, TypeEntry> = BTreeMap::new();
    for (file_id, file) in parsed {
        for decl in &file.types {
            let entry = types.entry(decl.qualified_name()).or_default();
            entry.outer = decl.outer.clone();
            for member in &decl.members {
                match member.kind {
                    MemberKind::Method if !member.partial_declaration => {
                        if let Some(&id) = spans.get(&(*file_id, member.name_span)) {
                            entry.methods.push(MethodEntry {
                                id,
                                name: member.name.clone(),
                                params: member.params.clone(),
                                type_params: member.type_params.clone(),
                            });
                        }
                    }
                    MemberKind::Field | MemberKind::Property | MemberKind::Event => {
                        if let Some(ty) = &member.ty {
                            entry.member_types.insert(member.name.clone(), ty.clone());
                        }
                    }
                    _ => {}
                }
            }
        }
    }
    types
}

/// Give each body-less `partial` method declaration the identity of its
/// implementing declaration.
fn bind_partial_declarations(
    parsed: &[(FileId, SourceFile)],
    types: &BTreeMap<String, TypeEntry>,
    spans: &mut HashMap<(FileId, Span), SymbolId>,
) {
    for (file_id, file) in parsed {
        for decl in &file.types {
            let Some(entry) = types.get(&decl.qualified_name()) else {
                continue;
            };
            for member in decl.members.iter().filter(|m| m.partial_declaration) {
                let implementation = entry.methods.iter().find(|m| {
                    m.name == member.name
                        && m.params.len() == member.params.len()
                        && m.params
                            .iter()
                            .zip(&member.params)
                            .all(|(a, b)| canonical(&a.ty) == canonical(&b.ty))
                });
                if let Some(implementation) = implementation {
                    spans.insert((*file_id, member.name_span), implementation.id);
                }
            }
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

fn resolve_call(
    types: &BTreeMap<String, TypeEntry>,
    scope: &Scope<'_>,
    call: &CallSite,
) -> Option<SymbolId> {
    let target = match &call.receiver {
        Receiver::Implicit => {
            let mut current = Some(scope.enclosing.as_str());
            let mut found = None;
            while let Some(qualified) = current {
                let entry = types.get(qualified)?;
                if entry.methods.iter().any(|m| m.name == call.name) {
                    found = Some(entry);
                    break;
                }
                current = entry.outer.as_deref();
            }
            found?
        }
        Receiver::This => types.get(&scope.enclosing)?,
        Receiver::Local(Some(ty)) => resolve_type(types, scope, ty)?,
        Receiver::Name(name) => match member_type(types, scope, name) {
            Some(ty) => resolve_type(types, scope, &ty)?,
            None => resolve_type(types, scope, name)?,
        },
        Receiver::Base | Receiver::Local(None) | Receiver::Expression => return None,
    };

    let candidates: Vec<&MethodEntry> = target
        .methods
        .iter()
        .filter(|m| m.name == call.name)
        .collect();

    match &call.args {
        None => match candidates.as_slice() {
            [only] => Some(only.id),
            _ => None,
        },
        Some(args) => {
            let args: Vec<ArgType> = args
                .iter()
                .map(|arg| match arg {
                    ArgType::Name(name) => member_type(types, scope, name)
                        .map(ArgType::Known)
                        .unwrap_or(ArgType::Unknown),
                    other => other.clone(),
                })
                .collect();
            select_overload(&candidates, &args)
        }
    }
}

/// Declared type of a field, property, or event visible from `scope`.
fn member_type(
    types: &BTreeMap<String, TypeEntry>,
    scope: &Scope<'_>,
    name: &str,
) -> Option<String> {
    let mut current = Some(scope.enclosing.as_str());
    while let Some(qualified) = current {
        let entry = types.get(qualified)?;
        if let Some(ty) = entry.member_types.get(name) {
            return Some(ty.clone());
        }
        current = entry.outer.as_deref();
    }
    None
}

/// Find the declared type a type name refers to from `scope`.
fn resolve_type<'t>(
    types: &'t BTreeMap<String, TypeEntry>,
    scope: &Scope<'_>,
    ty: &str,
) -> Option<&'t TypeEntry> {
    let name = strip_type_decorations(ty);
    if name.is_empty() {
        return None;
    }
    let suffix = format!(".{}", name);
    let mut matches = types
        .iter()
        .filter(|(qualified, _)| *qualified == name || qualified.ends_with(&suffix));
    let first = matches.next()?;
    if matches.next().is_none() {
        return Some(first.1);
    }

    // Ambiguous simple name: nearest namespace first, then the global
    // namespace, then imported namespaces.
    let mut candidates = Vec::new();
    let mut namespace = scope.namespace;
    while let Some(ns) = namespace {
        candidates.push(format!("{}.{}", ns, name));
        namespace = ns.rsplit_once('.').map(|(parent, _)| parent);
    }
    candidates.push(name.to_string());
    candidates.extend(scope.usings.iter().map(|u| format!("{}.{}", u, name)));
    candidates.iter().find_map(|q| types.get(q))
}

/// `List<int>?[]` -> `List`
fn strip_type_decorations(ty: &str) -> &str {
    let ty = ty.strip_prefix("global::").unwrap_or(ty);
    let end = ty.find(['<', '?', '[']).unwrap_or(ty.len());
    &ty[..end]
}

// ============================================================================
// Overload Selection
// ============================================================================

fn select_overload(candidates: &[&MethodEntry], args: &[ArgType]) -> Option<SymbolId> {
    let applicable: Vec<&MethodEntry> = candidates
        .iter()
        .copied()
        .filter(|m| accepts_count(m, args.len()))
        .filter(|m| {
            args.iter()
                .enumerate()
                .all(|(i, arg)| param_accepts(m, i, arg))
        })
        .collect();

    match applicable.as_slice() {
        [] => None,
        [only] => Some(only.id),
        many => {
            let exact: Vec<&&MethodEntry> = many.iter().filter(|m| is_exact(m, args)).collect();
            match exact.as_slice() {
                [only] => Some(only.id),
                _ => None,
            }
        }
    }
}

fn accepts_count(method: &MethodEntry, count: usize) -> bool {
    let has_params_array = method.params.last().is_some_and(|p| p.is_params);
    let required = method
        .params
        .iter()
        .filter(|p| !p.optional && !p.is_params)
        .count();
    count >= required && (count <= method.params.len() || has_params_array)
}

fn param_accepts(method: &MethodEntry, index: usize, arg: &ArgType) -> bool {
    let Some(param) = method
        .params
        .get(index)
        .or_else(|| method.params.last().filter(|p| p.is_params))
    else {
        return false;
    };
    if param.is_params {
        let element = param.ty.strip_suffix("[]").unwrap_or(&param.ty);
        type_accepts(method, element, arg) || type_accepts(method, &param.ty, arg)
    } else {
        type_accepts(method, &param.ty, arg)
    }
}

fn type_accepts(method: &MethodEntry, param: &str, arg: &ArgType) -> bool {
    if mentions_type_param(method, param) {
        return true;
    }
    match arg {
        ArgType::Unknown | ArgType::Name(_) => true,
        ArgType::Null => param.ends_with('?') || !is_value_type(param),
        ArgType::Known(arg) => {
            let param = canonical(param.strip_suffix('?').unwrap_or(param));
            let arg = canonical(arg);
            param == arg
                || matches!(param.as_str(), "object" | "dynamic")
                || simple_name(&param) == simple_name(&arg)
                || widens(&arg, &param)
        }
    }
}

/// Every argument's type is statically known and identical to its parameter's.
fn is_exact(method: &MethodEntry, args: &[ArgType]) -> bool {
    args.iter().enumerate().all(|(i, arg)| {
        let Some(param) = method.params.get(i) else {
            return false;
        };
        match arg {
            ArgType::Known(arg) => canonical(&param.ty) == canonical(arg),
            ArgType::Null => !is_value_type(&param.ty),
            _ => false,
        }
    })
}

fn mentions_type_param(method: &MethodEntry, ty: &str) -> bool {
    ty.split(|c: char| !(c == '_' || c.is_alphanumeric()))
        .any(|word| method.type_params.iter().any(|t| t == word))
}

fn simple_name(ty: &str) -> &str {
    ty.rsplit('.').next().unwrap_or(ty)
}

/// Fold framework type names onto their keyword aliases.
fn canonical(ty: &str) -> String {
    let ty = ty.strip_prefix("System.").unwrap_or(ty);
    let alias = match ty {
        "String" => "string",
        "Object" => "object",
        "Boolean" => "bool",
        "Char" => "char",
        "Byte" => "byte",
        "SByte" => "sbyte",
        "Int16" => "short",
        "UInt16" => "ushort",
        "Int32" => "int",
        "UInt32" => "uint",
        "Int64" => "long",
        "UInt64" => "ulong",
        "Single" => "float",
        "Double" => "double",
        "Decimal" => "decimal",
        other => other,
    };
    alias.to_string()
}

fn is_value_type(ty: &str) -> bool {
    matches!(
        canonical(ty).as_str(),
        "bool"
            | "byte"
            | "sbyte"
            | "char"
            | "decimal"
            | "double"
            | "float"
            | "int"
            | "uint"
            | "long"
            | "ulong"
            | "short"
            | "ushort"
            | "nint"
            | "nuint"
    )
}

/// Implicit numeric conversions.
fn widens(from: &str, to: &str) -> bool {
    let targets: &[&str] = match from {
        "sbyte" => &["short", "int", "long", "float", "double", "decimal"],
        "byte" => &[
            "short", "ushort", "int", "uint", "long", "ulong", "float", "double", "decimal",
        ],
        "short" => &["int", "long", "float", "double", "decimal"],
        "ushort" => &["int", "uint", "long", "ulong", "float", "double", "decimal"],
        "int" => &["long", "float", "double", "decimal"],
        "uint" => &["long", "ulong", "float", "double", "decimal"],
        "long" | "ulong" => &["float", "double", "decimal"],
        "char" => &[
            "ushort", "int", "uint", "long", "ulong", "float", "double", "decimal",
        ],
        "float" => &["double"],
        _ => &[],
    };
    targets.contains(&to)
}
