//! [`SourceModelProvider`] implementation for `.cs` units.

use std::sync::Arc;

use overcheck_core::provider::{
    Binder, FragmentData, MemberData, OccurrenceData, OccurrenceKind, SourceModelProvider,
    UnitSyntax,
};
use overcheck_core::snapshot::SourceUnit;
use tracing::trace;

use crate::binder::CSharpBinder;
use crate::parser::{parse_source, ParseError};
use crate::syntax::SourceFile;

/// Marker that tools put in the header comment of generated files.
const GENERATED_MARKER: &str = "<auto-generated";

#[derive(Debug, Clone, Copy, Default)]
pub struct CSharpProvider;

impl CSharpProvider {
    pub fn new() -> Self {
        CSharpProvider
    }
}

impl SourceModelProvider for CSharpProvider {
    type Error = ParseError;

    fn language(&self) -> &'static str {
        "csharp"
    }

    fn can_handle(&self, path: &str) -> bool {
        path.ends_with(".cs")
    }

    fn parse(&self, path: &str, text: &str) -> Result<UnitSyntax, ParseError> {
        let file = parse_source(text)?;
        let syntax = unit_syntax(&file, is_generated(path, text));
        trace!(
            path,
            fragments = syntax.fragments.len(),
            occurrences = syntax.occurrences.len(),
            generated = syntax.generated,
            "parsed unit"
        );
        Ok(syntax)
    }

    fn bind(&self, units: &[Arc<SourceUnit>]) -> Arc<dyn Binder> {
        Arc::new(CSharpBinder::build(units))
    }
}

/// Whether a unit is tool-generated: a `.g.cs` / `.g.i.cs` file name or an
/// `<auto-generated` marker in the leading comments.
pub fn is_generated(path: &str, text: &str) -> bool {
    if path.ends_with(".g.cs") || path.ends_with(".g.i.cs") {
        return true;
    }
    text.lines()
        .map(str::trim_start)
        .take_while(|line| line.is_empty() || line.starts_with("//") || line.starts_with("/*"))
        .any(|line| line.contains(GENERATED_MARKER))
}

fn unit_syntax(file: &SourceFile, generated: bool) -> UnitSyntax {
    let fragments = file
        .types
        .iter()
        .map(|decl| FragmentData {
            kind: decl.kind,
            name: decl.name.clone(),
            namespace: decl.namespace.clone(),
            span: decl.span,
            name_span: decl.name_span,
            members: decl
                .members
                .iter()
                .filter(|m| !m.partial_declaration)
                .map(|m| MemberData {
                    kind: m.kind,
                    name: m.name.clone(),
                    name_span: m.name_span,
                    arity: m.params.len(),
                })
                .collect(),
        })
        .collect();

    let mut occurrences: Vec<OccurrenceData> = Vec::new();
    for decl in &file.types {
        occurrences.extend(decl.members.iter().map(|m| OccurrenceData {
            name: m.name.clone(),
            span: m.name_span,
            kind: OccurrenceKind::Declaration,
        }));
        occurrences.extend(decl.calls.iter().map(|c| OccurrenceData {
            name: c.name.clone(),
            span: c.span,
            kind: if c.is_invocation() {
                OccurrenceKind::Call
            } else {
                OccurrenceKind::Reference
            },
        }));
    }
    occurrences.sort_by_key(|o| o.span.start);

    UnitSyntax {
        fragments,
        occurrences,
        generated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overcheck_core::patch::Span;
    use overcheck_core::provider::{AggregateKind, MemberKind};

    fn parse(path: &str, text: &str) -> UnitSyntax {
        CSharpProvider.parse(path, text).unwrap()
    }

    #[test]
    fn handles_only_cs_files() {
        assert!(CSharpProvider.can_handle("src/Query.cs"));
        assert!(!CSharpProvider.can_handle("README.md"));
        assert_eq!(CSharpProvider.language(), "csharp");
    }

    #[test]
    fn fragments_and_members() {
        let text = "namespace Api { public partial class Query { public string MethodA() => \"\"; int _x; } }";
        let syntax = parse("Query.cs", text);
        assert_eq!(syntax.fragments.len(), 1);
        let fragment = &syntax.fragments[0];
        assert_eq!(fragment.kind, AggregateKind::Class);
        assert_eq!(fragment.qualified_name(), "Api.Query");
        let members: Vec<(MemberKind, &str, usize)> = fragment
            .members
            .iter()
            .map(|m| (m.kind, m.name.as_str(), m.arity))
            .collect();
        assert_eq!(
            members,
            vec![(MemberKind::Method, "MethodA", 0), (MemberKind::Field, "_x", 0)]
        );
    }

    #[test]
    fn occurrences_are_in_source_order() {
        let text = "class Query {\n  void A() { B(); }\n  void B() { Action a = A; }\n}";
        let syntax = parse("Query.cs", text);
        let occurrences: Vec<(&str, OccurrenceKind)> = syntax
            .occurrences
            .iter()
            .map(|o| (o.name.as_str(), o.kind))
            .collect();
        assert_eq!(
            occurrences,
            vec![
                ("A", OccurrenceKind::Declaration),
                ("B", OccurrenceKind::Call),
                ("B", OccurrenceKind::Declaration),
                ("A", OccurrenceKind::Reference),
            ]
        );
        assert!(syntax
            .occurrences
            .windows(2)
            .all(|w| w[0].span.start < w[1].span.start));
    }

    #[test]
    fn partial_declarations_are_occurrences_not_members() {
        let text = "partial class Query { partial void OnLoad(); partial void OnLoad() { } }";
        let syntax = parse("Query.cs", text);
        assert_eq!(syntax.fragments[0].members.len(), 1);
        let declarations = syntax
            .occurrences
            .iter()
            .filter(|o| o.kind == OccurrenceKind::Declaration)
            .count();
        assert_eq!(declarations, 2);
        assert_eq!(syntax.fragments[0].members[0].name_span, Span::new(58, 64));
    }

    #[test]
    fn generated_units() {
        assert!(is_generated("obj/Query.g.cs", "class Query { }"));
        assert!(is_generated(
            "Query.cs",
            "// <auto-generated>\n// tool output\n// </auto-generated>\nclass Query { }"
        ));
        assert!(!is_generated("Query.cs", "class Query { }\n// <auto-generated>"));
        assert!(parse("Query.g.cs", "class Query { }").generated);
    }

    #[test]
    fn parse_errors_propagate() {
        assert!(matches!(
            CSharpProvider.parse("Query.cs", "class Query {"),
            Err(ParseError::UnexpectedEof { .. })
        ));
    }
}
