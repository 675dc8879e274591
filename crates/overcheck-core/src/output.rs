//! JSON response types for hosts that want machine-readable results.
//!
//! ## Conventions
//!
//! - Every response starts with `status` and `schema_version`
//! - Every response names the snapshot it describes
//! - Arrays keep the core's deterministic order (diagnostics in merge order,
//!   edits by path then offset)

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::analysis::{Diagnostic, DiagnosticDescriptor};
use crate::error::RenameError;
use crate::fix::{AppliedFix, FixAllOutcome, FixOutcome};
use crate::patch::{MaterializedPlan, OutputEdit};
use crate::provider::SymbolId;
use crate::snapshot::{FailedUnit, ProjectSnapshot};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Analysis
// ============================================================================

/// Result of one analysis pass.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub status: String,
    pub schema_version: String,
    pub snapshot_id: String,
    pub rule: DiagnosticDescriptor,
    pub diagnostics: Vec<Diagnostic>,
    /// Units excluded from analysis because they failed to parse.
    pub failed_units: Vec<FailedUnit>,
}

impl AnalyzeResponse {
    pub fn new(
        snapshot: &ProjectSnapshot,
        rule: DiagnosticDescriptor,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        AnalyzeResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            snapshot_id: snapshot.id().to_string(),
            rule,
            diagnostics,
            failed_units: snapshot.failed_units().to_vec(),
        }
    }
}

// ============================================================================
// Fixes
// ============================================================================

/// Edit statistics for a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixSummary {
    pub files_changed: usize,
    pub edits_count: usize,
}

/// Result of a single fix (or a fix preview when `snapshot_id` is absent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixResponse {
    pub status: String,
    pub schema_version: String,
    /// Snapshot the plan was computed against.
    pub base_snapshot_id: String,
    /// Snapshot produced by the fix; absent for a preview.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    pub old_name: String,
    pub new_name: String,
    pub edits: Vec<OutputEdit>,
    pub unified_diff: String,
    pub summary: FixSummary,
}

impl FixResponse {
    /// Build a response from a materialized plan.
    pub fn preview(
        base: &ProjectSnapshot,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
        materialized: MaterializedPlan,
    ) -> Self {
        let mut files: Vec<&str> = materialized.edits.iter().map(|e| e.file.as_str()).collect();
        files.dedup();
        let summary = FixSummary {
            files_changed: files.len(),
            edits_count: materialized.edits.len(),
        };
        FixResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            base_snapshot_id: base.id().to_string(),
            snapshot_id: None,
            old_name: old_name.into(),
            new_name: new_name.into(),
            edits: materialized.edits,
            unified_diff: materialized.unified_diff,
            summary,
        }
    }

    /// Build a response for an applied fix. `base` must be the snapshot the
    /// plan was computed against.
    pub fn applied(base: &ProjectSnapshot, outcome: &FixOutcome) -> Self {
        let plan = &outcome.plan;
        let mut response = FixResponse::preview(
            base,
            plan.old_name.clone(),
            plan.new_name.clone(),
            plan.materialize(base),
        );
        response.snapshot_id = Some(outcome.snapshot.id().to_string());
        response
    }
}

/// A skipped fix as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedInfo {
    pub symbol: SymbolId,
    pub name: String,
    pub code: u8,
    pub message: String,
}

/// Result of fix-all.
#[derive(Debug, Clone, Serialize)]
pub struct FixAllResponse {
    pub status: String,
    pub schema_version: String,
    pub base_snapshot_id: String,
    pub snapshot_id: String,
    pub applied: Vec<AppliedFix>,
    pub skipped: Vec<SkippedInfo>,
}

impl FixAllResponse {
    pub fn new(base: &ProjectSnapshot, outcome: &FixAllOutcome) -> Self {
        FixAllResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            base_snapshot_id: base.id().to_string(),
            snapshot_id: outcome.snapshot.id().to_string(),
            applied: outcome.applied.clone(),
            skipped: outcome
                .skipped
                .iter()
                .map(|s| SkippedInfo {
                    symbol: s.symbol,
                    name: s.name.clone(),
                    code: s.error.code().code(),
                    message: s.error.to_string(),
                })
                .collect(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub schema_version: String,
    pub code: u8,
    pub message: String,
}

impl From<&RenameError> for ErrorResponse {
    fn from(err: &RenameError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            code: err.code().code(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Write a response as pretty-printed JSON followed by a newline.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Write a response as single-line JSON followed by a newline.
pub fn emit_response_compact<T: Serialize>(
    response: &T,
    writer: &mut impl Write,
) -> io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}
