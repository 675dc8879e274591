//! Common types shared between diagnostics, references, and errors.

use serde::{Deserialize, Serialize};

use crate::patch::Span;
use crate::text::byte_offset_to_position_str;

// ============================================================================
// Location Type
// ============================================================================

/// Location in a source unit.
///
/// - `file`: project-relative path
/// - `line`: 1-indexed line number
/// - `col`: 1-indexed column, UTF-8 bytes
/// - `byte_start` / `byte_end`: the identifier's byte span
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub col: u32,
    pub byte_start: usize,
    pub byte_end: usize,
}

impl Location {
    /// Locate `span` in `text`, computing line and column.
    pub fn from_span(file: impl Into<String>, text: &str, span: Span) -> Self {
        let (line, col) = byte_offset_to_position_str(text, span.start);
        Location {
            file: file.into(),
            line,
            col,
            byte_start: span.start,
            byte_end: span.end,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.byte_start, self.byte_end.max(self.byte_start))
    }

    /// Comparison key for deterministic sorting: (file, byte_start, byte_end).
    fn sort_key(&self) -> (&str, usize, usize) {
        (&self.file, self.byte_start, self.byte_end)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}
