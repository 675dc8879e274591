//! Integration tests for fixes and renames across C# units.
//!
//! These tests drive the full pipeline: parse, bind, analyze, plan the
//! rename, apply it, and (for on-disk projects) write the changed units
//! back.

use std::fs;
use std::sync::Arc;

use overcheck_core::config::{AnalyzerConfig, NamingPolicyKind};
use overcheck_core::error::RenameError;
use overcheck_core::project::Project;
use overcheck_core::provider::OccurrenceKind;
use overcheck_core::CancellationToken;
use overcheck_csharp::{load_dir, write_changes, CSharpProvider};
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

const CONSUMER: &str = r#"using Api;

namespace Client
{
    public class Consumer
    {
        private readonly Query _query = new Query();

        public string Run(Query q)
        {
            var local = new Query();
            return q.MethodA() + _query.MethodA(1) + local.MethodA(2);
        }
    }
}
"#;

fn project(config: AnalyzerConfig) -> Project<CSharpProvider> {
    Project::new(
        CSharpProvider,
        config,
        vec![
            ("Consumer.cs", CONSUMER),
            ("Query1.cs", QUERY_ONE),
            ("Query2.cs", QUERY_TWO),
        ],
    )
    .expect("config is valid")
}

fn text(project: &Project<CSharpProvider>, path: &str) -> String {
    project.snapshot().unit_by_path(path).unwrap().text.clone()
}

// ============================================================================
// Reference Location
// ============================================================================

#[test]
fn test_references_follow_overload_resolution() {
    let project = project(AnalyzerConfig::default());
    let diags = project.analyze();
    assert_eq!(diags.len(), 2);
    let cancel = CancellationToken::new();

    let no_args = project.find_references(diags[0].symbol, &cancel).unwrap();
    let kinds: Vec<(&str, OccurrenceKind)> = no_args
        .iter()
        .map(|r| (r.location.file.as_str(), r.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("Consumer.cs", OccurrenceKind::Call),
            ("Query1.cs", OccurrenceKind::Declaration),
            ("Query1.cs", OccurrenceKind::Call),
        ]
    );

    let one_arg = project.find_references(diags[1].symbol, &cancel).unwrap();
    assert_eq!(one_arg.len(), 3);
    assert_eq!(one_arg[2].location.file, "Query2.cs");
    assert_eq!(one_arg[2].kind, OccurrenceKind::Declaration);
}

// ============================================================================
// Fixes
// ============================================================================

#[test]
fn test_uppercase_fix_rewrites_every_reference() {
    let project = project(AnalyzerConfig::default());
    let diag = project.analyze().remove(0);
    let outcome = project.fix(&diag, &CancellationToken::new()).unwrap();

    assert_eq!(outcome.plan.old_name, "MethodA");
    assert_eq!(outcome.plan.new_name, "METHODA");
    assert_eq!(outcome.plan.edit_count(), 3);
    assert_eq!(outcome.plan.file_count(), 2);

    assert!(text(&project, "Query1.cs").contains("public string METHODA() => \"a\";"));
    assert!(text(&project, "Query1.cs").contains("return METHODA();"));
    assert!(text(&project, "Consumer.cs")
        .contains("q.METHODA() + _query.MethodA(1) + local.MethodA(2)"));
    assert_eq!(text(&project, "Query2.cs"), QUERY_TWO);
    assert!(project.analyze().is_empty());
}

#[test]
fn test_fix_into_taken_name_changes_nothing() {
    let query = r#"public partial class Query
{
    public string Status() => "";
    public string Status(int code) => "";
    public string STATUS { get; set; }
}
"#;
    let project = Project::new(
        CSharpProvider,
        AnalyzerConfig::default(),
        vec![("Query.cs", query)],
    )
    .unwrap();
    let before = project.snapshot();
    let diag = project.analyze().remove(0);

    match project.fix(&diag, &CancellationToken::new()) {
        Err(RenameError::WouldCollide {
            old_name,
            new_name,
            colliding,
        }) => {
            assert_eq!(old_name, "Status");
            assert_eq!(new_name, "STATUS");
            assert_eq!(colliding.len(), 1);
            assert_eq!(colliding[0].line, 5);
        }
        other => panic!("Expected WouldCollide, got {:?}", other),
    }
    assert!(Arc::ptr_eq(&before, &project.snapshot()));
}

#[test]
fn test_fix_captured_by_nested_member_changes_nothing() {
    let query = r#"namespace Api
{
    public partial class Query
    {
        public string find() => "all";

        public string find(int id) => id.ToString();

        public class Inner
        {
            public string FIND(string s) => s;

            public string Go()
            {
                return find();
            }
        }
    }
}
"#;
    let project = Project::new(
        CSharpProvider,
        AnalyzerConfig::default(),
        vec![("Query.cs", query)],
    )
    .unwrap();
    let before = project.snapshot();
    let cancel = CancellationToken::new();
    let diags = project.analyze();
    let no_args = diags.iter().find(|d| d.location.line == 5).unwrap();
    assert_eq!(project.find_references(no_args.symbol, &cancel).unwrap().len(), 2);

    match project.fix(no_args, &cancel) {
        Err(RenameError::WouldCollide {
            new_name,
            colliding,
            ..
        }) => {
            assert_eq!(new_name, "FIND");
            assert_eq!(colliding.len(), 1);
            assert_eq!(colliding[0].line, 11);
        }
        other => panic!("Expected WouldCollide, got {:?}", other),
    }
    assert!(Arc::ptr_eq(&before, &project.snapshot()));

    // The one-argument overload has no call the nested member could capture.
    let outcome = project.fix_all(&cancel).unwrap();
    let applied: Vec<&str> = outcome.applied.iter().map(|f| f.new_name.as_str()).collect();
    assert_eq!(applied, vec!["FIND"]);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].symbol, no_args.symbol);
    assert!(text(&project, "Query.cs").contains("return find();"));
    assert_eq!(
        project.find_references(no_args.symbol, &cancel).unwrap().len(),
        2
    );
}

#[test]
fn test_preview_diff_merges_edits_on_one_line() {
    let query = r#"public class Query
{
    public string Ping() => "pong";
    public string Ping(int n) => "pong";
}
"#;
    let caller = r#"public class Caller
{
    public string Twice(Query q)
    {
        return q.Ping() + q.Ping();
    }
}
"#;
    let project = Project::new(
        CSharpProvider,
        AnalyzerConfig::default(),
        vec![("Caller.cs", caller), ("Query.cs", query)],
    )
    .unwrap();
    let base = project.snapshot();
    let diag = project.analyze().remove(0);
    let plan = project
        .fixer()
        .plan_fix(&base, &diag, &CancellationToken::new())
        .unwrap();
    assert_eq!(plan.edit_count(), 3);

    let preview = plan.materialize(&base);
    assert_eq!(preview.edits.len(), 3);
    assert_eq!(
        preview.unified_diff,
        "--- a/Caller.cs\n+++ b/Caller.cs\n\
         @@ -5,1 +5,1 @@\n\
         -        return q.Ping() + q.Ping();\n\
         +        return q.PING() + q.PING();\n\
         --- a/Query.cs\n+++ b/Query.cs\n\
         @@ -3,1 +3,1 @@\n\
         -    public string Ping() => \"pong\";\n\
         +    public string PING() => \"pong\";\n"
    );
}

#[test]
fn test_rename_to_keyword_rolls_back() {
    let project = project(AnalyzerConfig::default());
    let before = project.snapshot();
    let symbol = project.analyze()[0].symbol;

    match project.rename(symbol, "class", &CancellationToken::new()) {
        Err(RenameError::ApplyFailed { path, .. }) => assert!(path.ends_with(".cs")),
        other => panic!("Expected ApplyFailed, got {:?}", other),
    }
    assert!(Arc::ptr_eq(&before, &project.snapshot()));
    assert_eq!(text(&project, "Query1.cs"), QUERY_ONE);
}

#[test]
fn test_cancelled_fix_changes_nothing() {
    let project = project(AnalyzerConfig::default());
    let before = project.snapshot();
    let diag = project.analyze().remove(0);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = project.fix(&diag, &cancel).unwrap_err();
    assert_eq!(err, RenameError::Cancelled);
    assert_eq!(err.code().code(), 6);
    assert!(Arc::ptr_eq(&before, &project.snapshot()));
}

#[test]
fn test_fix_all_with_suffix_policy() {
    let third = r#"namespace Api
{
    public partial class Query
    {
        public string MethodA(string s) => s;
    }
}
"#;
    let project = Project::new(
        CSharpProvider,
        AnalyzerConfig::default().with_naming(NamingPolicyKind::Suffix),
        vec![
            ("Consumer.cs", CONSUMER),
            ("Query1.cs", QUERY_ONE),
            ("Query2.cs", QUERY_TWO),
            ("Query3.cs", third),
        ],
    )
    .unwrap();
    assert_eq!(project.analyze().len(), 3);

    let outcome = project.fix_all(&CancellationToken::new()).unwrap();
    let renames: Vec<(&str, &str)> = outcome
        .applied
        .iter()
        .map(|f| (f.old_name.as_str(), f.new_name.as_str()))
        .collect();
    assert_eq!(renames, vec![("MethodA", "MethodA2"), ("MethodA", "MethodA3")]);
    assert!(outcome.skipped.is_empty());
    assert!(project.analyze().is_empty());
    assert!(text(&project, "Consumer.cs")
        .contains("q.MethodA2() + _query.MethodA3(1) + local.MethodA3(2)"));
    assert_eq!(text(&project, "Query3.cs"), third);
}

// ============================================================================
// On-Disk Projects
// ============================================================================

#[test]
fn test_fix_written_back_to_disk() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for (path, content) in [
        ("Consumer.cs", CONSUMER),
        ("Query1.cs", QUERY_ONE),
        ("Query2.cs", QUERY_TWO),
    ] {
        fs::write(dir.path().join(path), content).unwrap();
    }

    let snapshot = load_dir(dir.path()).expect("Failed to load project");
    let project = Project::from_snapshot(CSharpProvider, AnalyzerConfig::default(), snapshot)
        .unwrap();
    let base = project.snapshot();
    let diag = project.analyze().remove(1);
    project.fix(&diag, &CancellationToken::new()).unwrap();

    let written = write_changes(dir.path(), &base, &project.snapshot()).unwrap();
    assert_eq!(written, vec!["Consumer.cs", "Query2.cs"]);
    assert!(fs::read_to_string(dir.path().join("Query2.cs"))
        .unwrap()
        .contains("public string METHODA(int x)"));
    assert_eq!(
        fs::read_to_string(dir.path().join("Query1.cs")).unwrap(),
        QUERY_ONE
    );

    let reloaded = load_dir(dir.path()).unwrap();
    assert_eq!(reloaded.id(), project.snapshot().id());
}
