//! Error types and error codes for rename and fix operations.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad candidate name)
//! - `3`: Resolution errors (symbol not found, no references)
//! - `4`: Apply errors (re-parse failure, stale snapshot, conflicting edits)
//! - `5`: Rename would introduce a collision
//! - `6`: Cancelled
//!
//! Analysis itself has no error type: it degrades by excluding what it
//! cannot see. Every rename failure leaves the snapshot unchanged.

use std::fmt;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::patch::{Conflict, SnapshotId};
use crate::provider::SymbolId;
use crate::types::Location;

// ============================================================================
// Error Codes
// ============================================================================

/// Stable numeric codes for hosts that report failures without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    InvalidArguments = 2,
    ResolutionError = 3,
    ApplyError = 4,
    WouldCollide = 5,
    Cancelled = 6,
}

impl ErrorCode {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Rename Errors
// ============================================================================

/// Failure of a rename or fix request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenameError {
    /// The rename target has no locatable occurrences.
    #[error("no references found for {symbol}")]
    NoReferences { symbol: SymbolId },

    /// The candidate name collides with a sibling member.
    #[error("renaming '{old_name}' to '{new_name}' would collide with {count} existing member(s)", count = .colliding.len())]
    WouldCollide {
        old_name: String,
        new_name: String,
        colliding: Vec<Location>,
    },

    /// Post-edit text failed to re-parse, or an edit no longer applies.
    #[error("rename failed in {path}: {reason}")]
    ApplyFailed { path: String, reason: String },

    /// Cooperative cancellation was observed.
    #[error("operation cancelled")]
    Cancelled,

    /// The candidate is not an identifier.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// No member symbol resolves at the requested location.
    #[error("no symbol found at {file}:{line}:{col}")]
    SymbolNotFound { file: String, line: u32, col: u32 },

    /// The symbol is not a method of the aggregate being renamed in.
    #[error("{symbol} is not a method of {aggregate}")]
    NotAMember { symbol: SymbolId, aggregate: String },

    /// The plan or commit targets a snapshot that is no longer current.
    #[error("snapshot {expected} is stale (current is {actual})")]
    StaleSnapshot {
        expected: SnapshotId,
        actual: SnapshotId,
    },

    /// The plan violates the no-overlap invariant.
    #[error("edit plan has {count} conflicting edit(s)", count = .conflicts.len())]
    ConflictingEdits { conflicts: Vec<Conflict> },
}

/// Result type for rename operations.
pub type RenameResult<T> = Result<T, RenameError>;

impl RenameError {
    pub fn symbol_not_found(location: &Location) -> Self {
        RenameError::SymbolNotFound {
            file: location.file.clone(),
            line: location.line,
            col: location.col,
        }
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::from(self)
    }
}

impl From<&RenameError> for ErrorCode {
    fn from(err: &RenameError) -> Self {
        match err {
            RenameError::InvalidName { .. } => ErrorCode::InvalidArguments,
            RenameError::NoReferences { .. } => ErrorCode::ResolutionError,
            RenameError::SymbolNotFound { .. } => ErrorCode::ResolutionError,
            RenameError::NotAMember { .. } => ErrorCode::ResolutionError,
            RenameError::ApplyFailed { .. } => ErrorCode::ApplyError,
            RenameError::StaleSnapshot { .. } => ErrorCode::ApplyError,
            RenameError::ConflictingEdits { .. } => ErrorCode::ApplyError,
            RenameError::WouldCollide { .. } => ErrorCode::WouldCollide,
            RenameError::Cancelled => ErrorCode::Cancelled,
        }
    }
}

/// Return `Cancelled` if `token` has been cancelled.
pub fn check_cancelled(token: &CancellationToken) -> RenameResult<()> {
    if token.is_cancelled() {
        Err(RenameError::Cancelled)
    } else {
        Ok(())
    }
}
