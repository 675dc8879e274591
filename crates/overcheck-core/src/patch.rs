//! Edit plan IR: anchored replacements grouped per source unit.
//!
//! This module implements the edit infrastructure for renames:
//! - Hash-anchored replacement edits
//! - Conflict detection (overlapping spans, stale anchors)
//! - Pure per-unit text application (highest offset first)
//! - Plan materialization (per-edit output and unified diff)

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use crate::provider::SymbolId;
use crate::snapshot::ProjectSnapshot;
use crate::text::byte_offset_to_position;

/// Hex-encoded SHA-256 of a unit's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Core Types
// ============================================================================

/// Identifies one immutable project snapshot.
///
/// Derived from unit paths and content hashes, so equal contents give equal IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub String);

impl SnapshotId {
    pub fn new(id: impl Into<String>) -> Self {
        SnapshotId(id.into())
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable source unit identifier within a snapshot.
///
/// A unit keeps its `FileId` when a rename replaces its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    pub fn new(id: u32) -> Self {
        FileId(id)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file_{}", self.0)
    }
}

/// Byte offsets into unit text.
///
/// Half-open: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Touching spans do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Anchor Model
// ============================================================================

/// Exact span plus the hash of the bytes it is expected to cover.
///
/// An edit only applies if the bytes at `span` still hash to
/// `expected_before_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub span: Span,
    pub expected_before_hash: ContentHash,
}

/// Result of attempting to resolve an anchor against unit text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorResolution {
    Resolved(Span),
    HashMismatch {
        span: Span,
        expected: ContentHash,
        actual: ContentHash,
    },
    OutOfBounds {
        span: Span,
        len: usize,
    },
}

impl Anchor {
    /// Anchor `span`, hashing the bytes it currently covers.
    pub fn span_exact(span: Span, content: &[u8]) -> Self {
        Anchor {
            span,
            expected_before_hash: ContentHash::compute(content),
        }
    }

    pub fn resolve(&self, content: &[u8]) -> AnchorResolution {
        let Some(slice) = content.get(self.span.as_range()) else {
            return AnchorResolution::OutOfBounds {
                span: self.span,
                len: content.len(),
            };
        };
        let actual = ContentHash::compute(slice);
        if actual != self.expected_before_hash {
            return AnchorResolution::HashMismatch {
                span: self.span,
                expected: self.expected_before_hash.clone(),
                actual,
            };
        }
        AnchorResolution::Resolved(self.span)
    }
}

// ============================================================================
// Conflict Detection
// ============================================================================

/// A detected overlap or invalidation that prevents apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conflict {
    /// Two edits have overlapping spans in the same unit.
    OverlappingSpans {
        file_id: FileId,
        edit1_span: Span,
        edit2_span: Span,
    },

    /// Anchor hash mismatch.
    AnchorHashMismatch {
        file_id: FileId,
        span: Span,
        expected: ContentHash,
        actual: ContentHash,
    },

    /// Span is out of bounds for the unit.
    SpanOutOfBounds {
        file_id: FileId,
        span: Span,
        len: usize,
    },

    /// The plan names a unit the snapshot does not have.
    FileMissing { file_id: FileId },

    /// Replacement left the unit text as invalid UTF-8.
    InvalidUtf8 { file_id: FileId },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::OverlappingSpans {
                file_id,
                edit1_span,
                edit2_span,
            } => write!(
                f,
                "overlapping edits {} and {} in {}",
                edit1_span, edit2_span, file_id
            ),
            Conflict::AnchorHashMismatch { file_id, span, .. } => {
                write!(f, "content at {} in {} changed since planning", span, file_id)
            }
            Conflict::SpanOutOfBounds { file_id, span, len } => {
                write!(f, "span {} out of bounds for {} ({} bytes)", span, file_id, len)
            }
            Conflict::FileMissing { file_id } => write!(f, "{} is not in the snapshot", file_id),
            Conflict::InvalidUtf8 { file_id } => {
                write!(f, "edits left {} with invalid UTF-8", file_id)
            }
        }
    }
}

// ============================================================================
// Edit Operations
// ============================================================================

/// Where an edit came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLabels {
    /// The symbol this edit renames.
    pub symbol_id: Option<SymbolId>,
    pub reason: Option<String>,
}

/// A single replacement anchored in one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// Position of the edit within its plan.
    pub id: u32,
    pub file_id: FileId,
    pub anchor: Anchor,
    /// The replacement text.
    pub text: String,
    pub labels: EditLabels,
}

impl Edit {
    pub fn replace(id: u32, file_id: FileId, anchor: Anchor, text: impl Into<String>) -> Self {
        Edit {
            id,
            file_id,
            anchor,
            text: text.into(),
            labels: EditLabels::default(),
        }
    }

    pub fn with_labels(mut self, labels: EditLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn span(&self) -> Span {
        self.anchor.span
    }
}

// ============================================================================
// EditPlan
// ============================================================================

/// A precomputed set of replacements describing one rename.
///
/// Edits are grouped per unit and kept sorted by span start. A plan is tied
/// to the snapshot it was computed against (`base`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPlan {
    /// The snapshot this plan is based on.
    pub base: SnapshotId,
    /// The symbol being renamed.
    pub symbol: SymbolId,
    pub old_name: String,
    pub new_name: String,
    /// Edits per unit, each list ordered by span start.
    pub edits: BTreeMap<FileId, Vec<Edit>>,
    /// Mapping from FileId to unit path (for materialization).
    pub file_paths: BTreeMap<FileId, String>,
}

impl EditPlan {
    pub fn new(
        base: SnapshotId,
        symbol: SymbolId,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        EditPlan {
            base,
            symbol,
            old_name: old_name.into(),
            new_name: new_name.into(),
            edits: BTreeMap::new(),
            file_paths: BTreeMap::new(),
        }
    }

    /// Add an edit, keeping the unit's list ordered by span start then edit ID.
    pub fn push(&mut self, edit: Edit, path: impl Into<String>) {
        self.file_paths
            .entry(edit.file_id)
            .or_insert_with(|| path.into());
        let list = self.edits.entry(edit.file_id).or_default();
        let key = (edit.span().start, edit.id);
        let pos = list.partition_point(|e| (e.span().start, e.id) < key);
        list.insert(pos, edit);
    }

    pub fn has_edits(&self) -> bool {
        self.edits.values().any(|list| !list.is_empty())
    }

    pub fn edit_count(&self) -> usize {
        self.edits.values().map(Vec::len).sum()
    }

    pub fn file_count(&self) -> usize {
        self.edits.values().filter(|list| !list.is_empty()).count()
    }

    pub fn edits_for(&self, file_id: FileId) -> &[Edit] {
        self.edits.get(&file_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All edits in deterministic order: by FileId, then span start.
    pub fn iter(&self) -> impl Iterator<Item = &Edit> {
        self.edits.values().flatten()
    }

    /// Detect overlapping edits within each unit.
    ///
    /// Every conflict in the plan; empty when the plan can be applied.
    #[must_use]
    pub fn detect_conflicts(&self) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        for (file_id, edits) in &self.edits {
            // Lists are sorted by start, so only neighbours can overlap first.
            for pair in edits.windows(2) {
                let (a, b) = (pair[0].span(), pair[1].span());
                if a.overlaps(&b) {
                    conflicts.push(Conflict::OverlappingSpans {
                        file_id: *file_id,
                        edit1_span: a,
                        edit2_span: b,
                    });
                }
            }
        }
        conflicts
    }

    /// Apply this plan's edits for one unit to `content`.
    ///
    /// All anchors are resolved before any byte changes; any failure returns
    /// every conflict found and no text. Edits are applied from the highest
    /// offset to the lowest so earlier spans stay valid.
    pub fn apply_to_text(&self, file_id: FileId, content: &str) -> Result<String, Vec<Conflict>> {
        let edits = self.edits_for(file_id);
        let bytes = content.as_bytes();
        let mut conflicts = Vec::new();

        for edit in edits {
            match edit.anchor.resolve(bytes) {
                AnchorResolution::Resolved(_) => {}
                AnchorResolution::HashMismatch {
                    span,
                    expected,
                    actual,
                } => conflicts.push(Conflict::AnchorHashMismatch {
                    file_id,
                    span,
                    expected,
                    actual,
                }),
                AnchorResolution::OutOfBounds { span, len } => {
                    conflicts.push(Conflict::SpanOutOfBounds { file_id, span, len })
                }
            }
        }
        conflicts.extend(
            self.detect_conflicts()
                .into_iter()
                .filter(|c| matches!(c, Conflict::OverlappingSpans { file_id: f, .. } if *f == file_id)),
        );
        if !conflicts.is_empty() {
            return Err(conflicts);
        }

        let mut out = bytes.to_vec();
        for edit in edits.iter().rev() {
            out.splice(edit.span().as_range(), edit.text.bytes());
        }
        String::from_utf8(out).map_err(|_| vec![Conflict::InvalidUtf8 { file_id }])
    }
}

// ============================================================================
// Plan Materialization
// ============================================================================

/// One edit as reported to a host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputEdit {
    /// Unit path.
    pub file: String,
    pub span: Span,
    pub old_text: String,
    pub new_text: String,
    /// 1-based.
    pub line: u32,
    /// 1-based, in bytes.
    pub col: u32,
}

/// Materialized plan output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializedPlan {
    /// Individual edits (ordered by file path, then span.start).
    pub edits: Vec<OutputEdit>,
    /// Unified diff of every affected unit.
    pub unified_diff: String,
}

impl EditPlan {
    /// Materialize this plan against the snapshot it was built from.
    ///
    /// Nothing is applied; this is a preview.
    pub fn materialize(&self, snapshot: &ProjectSnapshot) -> MaterializedPlan {
        let mut output_edits = Vec::new();
        let mut by_path: BTreeMap<&str, (FileId, Vec<&Edit>)> = BTreeMap::new();
        for (file_id, edits) in &self.edits {
            let path = self
                .file_paths
                .get(file_id)
                .map(String::as_str)
                .unwrap_or_default();
            by_path
                .entry(path)
                .or_insert_with(|| (*file_id, Vec::new()))
                .1
                .extend(edits.iter());
        }

        let mut diff = String::new();
        for (path, (file_id, edits)) in &by_path {
            let content = snapshot
                .unit(*file_id)
                .map(|u| u.text.as_bytes())
                .unwrap_or_default();

            diff.push_str(&format!("--- a/{}\n", path));
            diff.push_str(&format!("+++ b/{}\n", path));

            let mut same_line: Vec<&Edit> = Vec::new();
            let mut current_line = 0;
            for edit in edits {
                let span = edit.span();
                let old_text = content
                    .get(span.as_range())
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .unwrap_or_default();
                let (line, col) = byte_offset_to_position(content, span.start);
                if line != current_line && !same_line.is_empty() {
                    push_hunk(&mut diff, content, &same_line, current_line);
                    same_line.clear();
                }
                current_line = line;
                same_line.push(edit);
                output_edits.push(OutputEdit {
                    file: path.to_string(),
                    span,
                    old_text,
                    new_text: edit.text.clone(),
                    line,
                    col,
                });
            }
            if !same_line.is_empty() {
                push_hunk(&mut diff, content, &same_line, current_line);
            }
        }

        MaterializedPlan {
            edits: output_edits,
            unified_diff: diff,
        }
    }
}

/// Write a one-line hunk showing `line` before and after all of its edits.
///
/// `edits` are ordered by start and all begin on `line`.
fn push_hunk(diff: &mut String, content: &[u8], edits: &[&Edit], line: u32) {
    let (Some(first), Some(last)) = (edits.first(), edits.last()) else {
        return;
    };
    let start = first.span().start.min(content.len());
    let end = last.span().end.min(content.len());
    let line_start = content[..start]
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|p| p + 1)
        .unwrap_or(0);
    let line_end = content[end..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| end + p)
        .unwrap_or(content.len());

    let mut after = Vec::with_capacity(line_end - line_start);
    let mut cursor = line_start;
    for edit in edits {
        let span = edit.span();
        let from = span.start.clamp(cursor, line_end);
        after.extend_from_slice(&content[cursor..from]);
        after.extend_from_slice(edit.text.as_bytes());
        cursor = span.end.clamp(from, line_end);
    }
    after.extend_from_slice(&content[cursor..line_end]);

    diff.push_str(&format!("@@ -{},1 +{},1 @@\n", line, line));
    diff.push_str(&format!("-{}\n", String::from_utf8_lossy(&content[line_start..line_end])));
    diff.push_str(&format!("+{}\n", String::from_utf8_lossy(&after)));
}
