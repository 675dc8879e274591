//! Integration tests for collision analysis over C# partial classes.
//!
//! Each test lays out a small project, loads it through the C# provider,
//! and checks the diagnostics the analyzer reports for the merged
//! aggregates.

use std::fs;

use overcheck_core::analysis::{Analyzer, Diagnostic, OVERLOAD_RULE};
use overcheck_core::config::AnalyzerConfig;
use overcheck_core::snapshot::ProjectSnapshot;
use overcheck_csharp::{load_dir, CSharpProvider};
use tempfile::TempDir;

const QUERY_ONE: &str = r#"namespace Api
{
    public partial class Query
    {
        public string MethodA() => "a";

        public string MethodB()
        {
            return MethodA();
        }
    }
}
"#;

const QUERY_TWO: &str = r#"namespace Api
{
    public partial class Query
    {
        public string MethodA(int x) => x.ToString();
    }
}
"#;

/// Build a snapshot from in-memory files.
fn snapshot(files: &[(&str, &str)]) -> ProjectSnapshot {
    ProjectSnapshot::build(&CSharpProvider, files.iter().copied())
}

fn analyze(files: &[(&str, &str)]) -> Vec<Diagnostic> {
    let analyzer = Analyzer::new(&AnalyzerConfig::default()).expect("default config is valid");
    analyzer.analyze(&snapshot(files))
}

/// `(path, line, name)` for each diagnostic, in report order.
fn summary(diags: &[Diagnostic]) -> Vec<(String, u32, String)> {
    diags
        .iter()
        .map(|d| (d.location.file.clone(), d.location.line, d.name.clone()))
        .collect()
}

// ============================================================================
// Collision Detection
// ============================================================================

#[test]
fn test_overloads_split_across_fragments_are_reported() {
    let diags = analyze(&[("Query1.cs", QUERY_ONE), ("Query2.cs", QUERY_TWO)]);
    assert_eq!(
        summary(&diags),
        vec![
            ("Query1.cs".to_string(), 5, "MethodA".to_string()),
            ("Query2.cs".to_string(), 5, "MethodA".to_string()),
        ]
    );
    for diag in &diags {
        assert_eq!(diag.code, OVERLOAD_RULE.id);
        assert_eq!(diag.aggregate, "Api.Query");
        assert_eq!(diag.message, "Method 'MethodA' has overloads in the same class");
    }
    assert_ne!(diags[0].symbol, diags[1].symbol);
}

#[test]
fn test_single_fragment_without_overloads_is_clean() {
    assert!(analyze(&[("Query1.cs", QUERY_ONE)]).is_empty());
}

#[test]
fn test_unlisted_class_is_ignored() {
    let other = r#"public class OtherClass
{
    public void Save() { }
    public void Save(int id) { }
}
"#;
    assert!(analyze(&[("Other.cs", other)]).is_empty());
}

#[test]
fn test_same_name_in_other_namespace_is_a_different_aggregate() {
    let other = r#"namespace Legacy
{
    public partial class Query
    {
        public string MethodA(string s) => s;
    }
}
"#;
    let diags = analyze(&[("Query1.cs", QUERY_ONE), ("Legacy.cs", other)]);
    assert!(diags.is_empty());
}

#[test]
fn test_properties_and_constructors_do_not_collide() {
    let code = r#"public class Mutation
{
    public Mutation() { }
    public Mutation(int seed) { }
    public string Name { get; set; }
    public void Name2() { }
    public static Mutation operator +(Mutation a, Mutation b) => a;
    public static Mutation operator +(Mutation a, int b) => a;
}
"#;
    assert!(analyze(&[("Mutation.cs", code)]).is_empty());
}

#[test]
fn test_generated_fragment_counts_but_is_not_reported() {
    let generated = r#"// <auto-generated>
//     Produced by a schema tool.
// </auto-generated>
namespace Api
{
    public partial class Query
    {
        public string MethodB(bool flag) => "";
    }
}
"#;
    let diags = analyze(&[("Query1.cs", QUERY_ONE), ("Query.Schema.cs", generated)]);
    assert_eq!(
        summary(&diags),
        vec![("Query1.cs".to_string(), 7, "MethodB".to_string())]
    );

    let analyzer =
        Analyzer::new(&AnalyzerConfig::default().with_include_generated(true)).unwrap();
    let all = analyzer.analyze(&snapshot(&[
        ("Query1.cs", QUERY_ONE),
        ("Query.Schema.cs", generated),
    ]));
    assert_eq!(all.len(), 2);
}

#[test]
fn test_unparseable_fragment_is_excluded() {
    let snap = snapshot(&[
        ("Query1.cs", QUERY_ONE),
        ("Query2.cs", QUERY_TWO),
        ("Query3.cs", "namespace Api { public partial class Query { public void MethodA(bool b) {"),
    ]);
    assert_eq!(snap.failed_units().len(), 1);
    let analyzer = Analyzer::new(&AnalyzerConfig::default()).unwrap();
    assert_eq!(analyzer.analyze(&snap).len(), 2);
}

#[test]
fn test_analysis_is_deterministic() {
    let files = [("Query2.cs", QUERY_TWO), ("Query1.cs", QUERY_ONE)];
    let first = analyze(&files);
    let second = analyze(&[files[1], files[0]]);
    assert_eq!(first, second);
    assert_eq!(
        snapshot(&files).id(),
        snapshot(&[files[1], files[0]]).id()
    );
}

#[test]
fn test_allow_list_from_toml() {
    let config = AnalyzerConfig::from_toml_str(
        r#"
aggregate_names = ["*Resolver"]
"#,
    )
    .unwrap();
    let analyzer = Analyzer::new(&config).unwrap();
    let code = r#"public partial class UserResolver
{
    public void Fetch() { }
    public void Fetch(int id) { }
}
"#;
    let diags = analyzer.analyze(&snapshot(&[("UserResolver.cs", code)]));
    assert_eq!(diags.len(), 2);
    assert!(analyzer
        .analyze(&snapshot(&[("Query1.cs", QUERY_ONE), ("Query2.cs", QUERY_TWO)]))
        .is_empty());
}

// ============================================================================
// On-Disk Projects
// ============================================================================

#[test]
fn test_load_dir_merges_fragments_in_subdirectories() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::create_dir_all(dir.path().join("Api/Queries")).unwrap();
    fs::create_dir_all(dir.path().join("obj")).unwrap();
    fs::write(dir.path().join("Api/Query.cs"), QUERY_ONE).unwrap();
    fs::write(dir.path().join("Api/Queries/Query.Extra.cs"), QUERY_TWO).unwrap();
    fs::write(dir.path().join("obj/Query.Copy.cs"), QUERY_TWO).unwrap();

    let snap = load_dir(dir.path()).expect("Failed to load project");
    assert_eq!(snap.len(), 2);

    let analyzer = Analyzer::new(&AnalyzerConfig::default()).unwrap();
    let merged = analyzer.merge(&snap);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].qualified_name, "Api.Query");
    assert_eq!(merged[0].fragments.len(), 2);
    let names: Vec<&str> = merged[0].members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["MethodA", "MethodA", "MethodB"]);

    let files: Vec<&str> = analyzer
        .analyze(&snap)
        .iter()
        .map(|d| d.location.file.as_str())
        .map(|f| if f.starts_with("Api/Queries") { "extra" } else { "main" })
        .collect();
    assert_eq!(files, vec!["extra", "main"]);
}
