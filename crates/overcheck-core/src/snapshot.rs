//! Immutable, versioned project snapshots.
//!
//! A [`ProjectSnapshot`] is the unit of consistency for every pass:
//! - Source units sorted by path, `FileId` = position in that order
//! - Content-derived [`SnapshotId`] plus a monotonically increasing version
//! - One binder built by the provider over exactly these units
//! - Units shared through `Arc`, so a rename copies only what it rewrites

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::patch::{ContentHash, FileId, SnapshotId};
use crate::provider::{Binder, SourceModelProvider, UnitSyntax};

// ============================================================================
// Source Units
// ============================================================================

/// One parsed source file. Read-only once built.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub file_id: FileId,
    /// Project-relative path.
    pub path: String,
    pub text: String,
    pub content_hash: ContentHash,
    pub syntax: UnitSyntax,
}

impl SourceUnit {
    pub fn new(file_id: FileId, path: impl Into<String>, text: impl Into<String>, syntax: UnitSyntax) -> Self {
        let text = text.into();
        SourceUnit {
            file_id,
            path: path.into(),
            content_hash: ContentHash::compute(text.as_bytes()),
            text,
            syntax,
        }
    }

    pub fn is_generated(&self) -> bool {
        self.syntax.generated
    }
}

/// A unit the provider could not parse when the snapshot was built.
///
/// Failed units are excluded from analysis, not fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUnit {
    pub path: String,
    pub reason: String,
}

// ============================================================================
// Project Snapshot
// ============================================================================

/// An immutable view of every source unit in a project.
#[derive(Clone)]
pub struct ProjectSnapshot {
    id: SnapshotId,
    version: u64,
    units: Vec<Arc<SourceUnit>>,
    failed: Vec<FailedUnit>,
    binder: Arc<dyn Binder>,
}

impl fmt::Debug for ProjectSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectSnapshot")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("units", &self.units.len())
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl ProjectSnapshot {
    /// Parse `files` (path, text) with `provider` and bind the result.
    ///
    /// Files the provider does not handle are skipped. Files that fail to
    /// parse are recorded in [`ProjectSnapshot::failed_units`]. Duplicate
    /// paths keep the last text given.
    pub fn build<P, I, S, T>(provider: &P, files: I) -> Self
    where
        P: SourceModelProvider,
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut inputs: Vec<(String, String)> = files
            .into_iter()
            .map(|(p, t)| (p.into(), t.into()))
            .filter(|(p, _)| provider.can_handle(p))
            .collect();
        inputs.sort_by(|a, b| a.0.cmp(&b.0));
        // Stable sort keeps input order among equal paths; keep the last one.
        inputs.reverse();
        inputs.dedup_by(|a, b| a.0 == b.0);
        inputs.reverse();

        let mut units = Vec::with_capacity(inputs.len());
        let mut failed = Vec::new();
        for (path, text) in inputs {
            match provider.parse(&path, &text) {
                Ok(syntax) => {
                    let file_id = FileId::new(units.len() as u32);
                    units.push(Arc::new(SourceUnit::new(file_id, path, text, syntax)));
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "unit failed to parse; excluded from analysis");
                    failed.push(FailedUnit {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let binder = provider.bind(&units);
        let id = generate_snapshot_id(&units);
        debug!(
            snapshot = %id,
            language = provider.language(),
            units = units.len(),
            failed = failed.len(),
            "built project snapshot"
        );
        ProjectSnapshot {
            id,
            version: 0,
            units,
            failed,
            binder,
        }
    }

    /// Produce the next snapshot with some units replaced.
    ///
    /// Replacement units must carry the `FileId` of the unit they replace.
    /// Unreplaced units are shared with `self`.
    pub(crate) fn with_replaced_units<P: SourceModelProvider>(
        &self,
        provider: &P,
        replaced: Vec<SourceUnit>,
    ) -> Self {
        let mut units = self.units.clone();
        for unit in replaced {
            let idx = unit.file_id.0 as usize;
            if let Some(slot) = units.get_mut(idx) {
                *slot = Arc::new(unit);
            }
        }
        let binder = provider.bind(&units);
        let id = generate_snapshot_id(&units);
        ProjectSnapshot {
            id,
            version: self.version + 1,
            units,
            failed: self.failed.clone(),
            binder,
        }
    }

    pub fn id(&self) -> &SnapshotId {
        &self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn units(&self) -> &[Arc<SourceUnit>] {
        &self.units
    }

    pub fn unit(&self, file_id: FileId) -> Option<&Arc<SourceUnit>> {
        self.units
            .get(file_id.0 as usize)
            .filter(|u| u.file_id == file_id)
    }

    pub fn unit_by_path(&self, path: &str) -> Option<&Arc<SourceUnit>> {
        self.units
            .binary_search_by(|u| u.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.units[i])
    }

    pub fn failed_units(&self) -> &[FailedUnit] {
        &self.failed
    }

    pub fn binder(&self) -> &dyn Binder {
        self.binder.as_ref()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Snapshot ID from unit paths and content hashes, in path order.
fn generate_snapshot_id(units: &[Arc<SourceUnit>]) -> SnapshotId {
    let mut hasher = Sha256::new();
    for unit in units {
        hasher.update(unit.path.as_bytes());
        hasher.update(b":");
        hasher.update(unit.content_hash.0.as_bytes());
        hasher.update(b"\n");
    }
    let result = hasher.finalize();
    SnapshotId::new(format!("snap_{}", hex::encode(&result[..6])))
}
