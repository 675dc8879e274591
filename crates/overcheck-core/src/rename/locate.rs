//! Reference location by binder identity.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{check_cancelled, RenameResult};
use crate::patch::{FileId, Span};
use crate::provider::{OccurrenceKind, SymbolId};
use crate::snapshot::ProjectSnapshot;
use crate::types::Location;

/// A syntactic occurrence that binds to a specific member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub file_id: FileId,
    pub span: Span,
    pub kind: OccurrenceKind,
    pub location: Location,
}

/// Find the declaration and every use of `symbol` across the snapshot.
///
/// Only occurrences the binder resolves to `symbol` are returned; a
/// same-named member of another aggregate never matches, and occurrences
/// the binder cannot resolve are left out. Results are ordered by unit,
/// then by offset, with duplicates removed.
pub fn find_references(
    snapshot: &ProjectSnapshot,
    symbol: SymbolId,
    cancel: &CancellationToken,
) -> RenameResult<Vec<Reference>> {
    let binder = snapshot.binder();
    let mut seen: BTreeSet<(FileId, Span)> = BTreeSet::new();
    let mut refs = Vec::new();

    for unit in snapshot.units() {
        check_cancelled(cancel)?;
        for occ in &unit.syntax.occurrences {
            if binder.resolve(unit.file_id, occ.span) != Some(symbol) {
                continue;
            }
            if !seen.insert((unit.file_id, occ.span)) {
                continue;
            }
            refs.push(Reference {
                file_id: unit.file_id,
                span: occ.span,
                kind: occ.kind,
                location: Location::from_span(&unit.path, &unit.text, occ.span),
            });
        }
    }

    refs.sort_by_key(|r| (r.file_id, r.span.start));
    debug!(symbol = %symbol, references = refs.len(), "located references");
    Ok(refs)
}
