//! Compile-only test to verify public API surface.
//!
//! This file is a compile-time contract for the public API. If it fails to
//! compile, the public API has regressed.
//!
//! Run with: cargo test -- api_surface

// Unused imports are the point: this test checks names, not behavior.
#![allow(unused_imports)]

// ============================================================================
// Core Types
// ============================================================================

use overcheck::patch::{
    Anchor, AnchorResolution, Conflict, ContentHash, Edit, EditLabels, EditPlan, FileId,
    MaterializedPlan, OutputEdit, SnapshotId, Span,
};

use overcheck::provider::{
    AggregateKind, Binder, FragmentData, MemberData, MemberKind, OccurrenceData, OccurrenceKind,
    SourceModelProvider, SymbolId, UnitSyntax,
};

use overcheck::snapshot::{FailedUnit, ProjectSnapshot, SourceUnit};

use overcheck::types::Location;

use overcheck::text::{byte_offset_to_position, identifier_problem, is_identifier};

use overcheck::CancellationToken;

// ============================================================================
// Analysis and Configuration
// ============================================================================

use overcheck::analysis::{
    aggregate_of, collision_groups, detect, merge_aggregates, partition_by_name, Analyzer,
    CollisionGroup, DetectOptions, Diagnostic, DiagnosticDescriptor, FragmentLocation,
    MergedAggregate, MethodSymbol, OtherMember, Severity, OVERLOAD_RULE,
};

use overcheck::config::{AggregateFilter, AnalyzerConfig, ConfigError, NamingPolicyKind};

// ============================================================================
// Rename and Fix
// ============================================================================

use overcheck::error::{check_cancelled, ErrorCode, RenameError, RenameResult};

use overcheck::rename::{
    apply_plan, find_references, plan_rename, NamingPolicy, Reference, SuffixedName,
    UppercaseName,
};

use overcheck::fix::{AppliedFix, FixAllOutcome, FixOutcome, Fixer, SkippedFix};

use overcheck::project::Project;

// ============================================================================
// Output
// ============================================================================

use overcheck::output::{
    emit_response, emit_response_compact, AnalyzeResponse, ErrorResponse, FixAllResponse,
    FixResponse, FixSummary, SkippedInfo, SCHEMA_VERSION,
};

// ============================================================================
// C# Provider
// ============================================================================

use overcheck::csharp::binder::CSharpBinder;
use overcheck::csharp::lexer::{numeric_literal_type, tokenize, LexError, Token, TokenKind};
use overcheck::csharp::parser::ParseResult;
use overcheck::csharp::provider::is_generated;
use overcheck::csharp::syntax::{
    ArgType, CallSite, MemberDecl, Param, Receiver, SourceFile, TypeDecl,
};
use overcheck::csharp::{
    collect_csharp_files, load_dir, parse_source, write_changes, CSharpProvider, FileError,
    FileResult, ParseError,
};

#[test]
fn api_surface_compiles() {
    // The imports above are the test.
}
