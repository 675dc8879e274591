//! A line-oriented toy provider for unit tests.
//!
//! ```text
//! namespace Api          # namespace for following aggregates
//! class Query            # open a fragment (class|struct|interface|record|enum)
//! method MethodA 1       # method with arity 1 (default 0)
//! ctor Query             # also: field, property, event, operator
//! call MethodA 1         # unqualified call inside a fragment
//! call Query.MethodA     # qualified call, anywhere
//! ref Query.MethodA      # method-group reference
//! end                    # close the fragment
//! generated              # mark the unit generated
//! ```
//!
//! Calls bind by (aggregate, name, arity); a call that matches zero or
//! several methods is left unresolved.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::patch::{FileId, Span};
use crate::provider::{
    AggregateKind, Binder, FragmentData, MemberData, MemberKind, OccurrenceData, OccurrenceKind,
    SourceModelProvider, SymbolId, UnitSyntax,
};
use crate::snapshot::SourceUnit;

const RESERVED: &[&str] = &[
    "namespace", "class", "struct", "interface", "record", "enum", "method", "ctor", "field",
    "property", "event", "operator", "call", "ref", "end", "generated",
];

#[derive(Debug)]
pub struct ToyError(pub String);

impl fmt::Display for ToyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ToyError {}

struct ToyCall {
    target: Option<String>,
    enclosing: Option<String>,
    arity: Option<usize>,
    span: Span,
}

struct ToyUnit {
    syntax: UnitSyntax,
    calls: Vec<ToyCall>,
}

fn words(line: &str, line_start: usize) -> Vec<(&str, usize)> {
    let mut out = Vec::new();
    let mut offset = 0;
    for w in line.split(' ') {
        if !w.is_empty() {
            out.push((w, line_start + offset));
        }
        offset += w.len() + 1;
    }
    out
}

fn check_name(name: &str) -> Result<(), ToyError> {
    if RESERVED.contains(&name) || !crate::text::is_identifier(name) {
        return Err(ToyError(format!("invalid name '{}'", name)));
    }
    Ok(())
}

fn parse_toy(text: &str) -> Result<ToyUnit, ToyError> {
    let mut syntax = UnitSyntax::default();
    let mut calls = Vec::new();
    let mut namespace: Option<String> = None;
    let mut open: Option<FragmentData> = None;
    let mut line_start = 0;

    for raw in text.split('\n') {
        let line = raw.split('#').next().unwrap_or_default();
        let w = words(line, line_start);
        line_start += raw.len() + 1;
        let Some(&(head, head_at)) = w.first() else {
            continue;
        };
        let arg = w.get(1).copied();
        let arity = w.get(2).and_then(|(a, _)| a.parse::<usize>().ok());

        let kind = match head {
            "class" => Some(AggregateKind::Class),
            "struct" => Some(AggregateKind::Struct),
            "interface" => Some(AggregateKind::Interface),
            "record" => Some(AggregateKind::Record),
            "enum" => Some(AggregateKind::Enum),
            _ => None,
        };
        if let Some(kind) = kind {
            let (name, at) = arg.ok_or_else(|| ToyError("missing aggregate name".into()))?;
            check_name(name)?;
            if open.is_some() {
                return Err(ToyError("nested aggregate".into()));
            }
            open = Some(FragmentData {
                kind,
                name: name.to_string(),
                namespace: namespace.clone(),
                span: Span::new(head_at, head_at),
                name_span: Span::new(at, at + name.len()),
                members: Vec::new(),
            });
            continue;
        }

        match head {
            "generated" => syntax.generated = true,
            "namespace" => namespace = arg.map(|(n, _)| n.to_string()),
            "end" => {
                let mut fragment = open.take().ok_or_else(|| ToyError("unmatched end".into()))?;
                fragment.span.end = head_at + 3;
                syntax.fragments.push(fragment);
            }
            "method" | "ctor" | "field" | "property" | "event" | "operator" => {
                let fragment = open
                    .as_mut()
                    .ok_or_else(|| ToyError("member outside aggregate".into()))?;
                let (name, at) = arg.ok_or_else(|| ToyError("missing member name".into()))?;
                let kind = match head {
                    "method" => MemberKind::Method,
                    "ctor" => MemberKind::Constructor,
                    "field" => MemberKind::Field,
                    "property" => MemberKind::Property,
                    "event" => MemberKind::Event,
                    _ => MemberKind::Operator,
                };
                if kind != MemberKind::Operator {
                    check_name(name)?;
                }
                let name_span = Span::new(at, at + name.len());
                fragment.members.push(MemberData {
                    kind,
                    name: name.to_string(),
                    name_span,
                    arity: arity.unwrap_or(0),
                });
                syntax.occurrences.push(OccurrenceData {
                    name: name.to_string(),
                    span: name_span,
                    kind: OccurrenceKind::Declaration,
                });
            }
            "call" | "ref" => {
                let (path, at) = arg.ok_or_else(|| ToyError("missing call target".into()))?;
                let (target, name, name_at) = match path.rsplit_once('.') {
                    Some((t, n)) => (Some(t.to_string()), n, at + t.len() + 1),
                    None => (None, path, at),
                };
                check_name(name)?;
                let enclosing = open.as_ref().map(|f| f.qualified_name());
                if target.is_none() && enclosing.is_none() {
                    return Err(ToyError("unqualified call outside aggregate".into()));
                }
                let span = Span::new(name_at, name_at + name.len());
                let kind = if head == "call" {
                    OccurrenceKind::Call
                } else {
                    OccurrenceKind::Reference
                };
                syntax.occurrences.push(OccurrenceData {
                    name: name.to_string(),
                    span,
                    kind,
                });
                calls.push(ToyCall {
                    target,
                    enclosing,
                    arity: if head == "call" { Some(arity.unwrap_or(0)) } else { None },
                    span,
                });
            }
            other => return Err(ToyError(format!("unknown directive '{}'", other))),
        }
    }

    if open.is_some() {
        return Err(ToyError("unterminated aggregate".into()));
    }
    Ok(ToyUnit { syntax, calls })
}

/// The toy provider. Handles `*.toy` paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToyProvider;

struct ToyMethod {
    simple: String,
    qualified: String,
    name: String,
    arity: usize,
    id: SymbolId,
}

#[derive(Default)]
struct ToyBinder {
    spans: HashMap<(FileId, Span), SymbolId>,
}

impl Binder for ToyBinder {
    fn resolve(&self, file_id: FileId, span: Span) -> Option<SymbolId> {
        self.spans.get(&(file_id, span)).copied()
    }
}

impl SourceModelProvider for ToyProvider {
    type Error = ToyError;

    fn language(&self) -> &'static str {
        "toy"
    }

    fn can_handle(&self, path: &str) -> bool {
        path.ends_with(".toy")
    }

    fn parse(&self, _path: &str, text: &str) -> Result<UnitSyntax, ToyError> {
        parse_toy(text).map(|u| u.syntax)
    }

    fn bind(&self, units: &[Arc<SourceUnit>]) -> Arc<dyn Binder> {
        let mut binder = ToyBinder::default();
        let mut methods = Vec::new();
        let mut next = 0u32;
        for unit in units {
            for fragment in &unit.syntax.fragments {
                for member in &fragment.members {
                    let id = SymbolId::new(next);
                    next += 1;
                    binder.spans.insert((unit.file_id, member.name_span), id);
                    if member.kind == MemberKind::Method {
                        methods.push(ToyMethod {
                            simple: fragment.name.clone(),
                            qualified: fragment.qualified_name(),
                            name: member.name.clone(),
                            arity: member.arity,
                            id,
                        });
                    }
                }
            }
        }
        for unit in units {
            let Ok(parsed) = parse_toy(&unit.text) else {
                continue;
            };
            for call in parsed.calls {
                let name = &unit.text[call.span.as_range()];
                let candidates: Vec<&ToyMethod> = methods
                    .iter()
                    .filter(|m| m.name == name)
                    .filter(|m| match (&call.target, &call.enclosing) {
                        (Some(t), _) => &m.simple == t || &m.qualified == t,
                        (None, Some(q)) => &m.qualified == q,
                        (None, None) => false,
                    })
                    .filter(|m| call.arity.is_none_or(|a| a == m.arity))
                    .collect();
                if let [only] = candidates.as_slice() {
                    binder.spans.insert((unit.file_id, call.span), only.id);
                }
            }
        }
        Arc::new(binder)
    }
}
