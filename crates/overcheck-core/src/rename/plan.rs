//! Rename planning: validate a candidate name and build the edit plan.
//!
//! The plan replaces exactly each reference's identifier span. Nothing else
//! in any unit is touched.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::locate::Reference;
use crate::analysis::{partition_by_name, MergedAggregate};
use crate::error::{check_cancelled, RenameError, RenameResult};
use crate::patch::{Anchor, Conflict, Edit, EditLabels, EditPlan};
use crate::provider::SymbolId;
use crate::snapshot::ProjectSnapshot;
use crate::text::identifier_problem;

/// Build an edit plan renaming `symbol` to `candidate`.
///
/// # Errors
///
/// - `InvalidName` if `candidate` is not an identifier
/// - `NotAMember` if `symbol` is not a method of `aggregate`
/// - `NoReferences` if `references` is empty
/// - `WouldCollide` if, after the rename, `symbol` would share its name with
///   another method of `aggregate`, or the name is taken by a property,
///   field, or event
/// - `ConflictingEdits` if references overlap or fall outside their unit
/// - `Cancelled` if `cancel` fires
pub fn plan_rename(
    snapshot: &ProjectSnapshot,
    aggregate: &MergedAggregate,
    symbol: SymbolId,
    references: &[Reference],
    candidate: &str,
    cancel: &CancellationToken,
) -> RenameResult<EditPlan> {
    check_cancelled(cancel)?;

    if let Some(reason) = identifier_problem(candidate) {
        return Err(RenameError::InvalidName {
            name: candidate.to_string(),
            reason: reason.to_string(),
        });
    }

    let Some(target_index) = aggregate.members.iter().position(|m| m.id == symbol) else {
        return Err(RenameError::NotAMember {
            symbol,
            aggregate: aggregate.qualified_name.clone(),
        });
    };
    let target = &aggregate.members[target_index];

    if references.is_empty() {
        return Err(RenameError::NoReferences { symbol });
    }

    // Run grouping over the hypothetical post-rename member set.
    let names = aggregate
        .members
        .iter()
        .enumerate()
        .map(|(i, m)| if i == target_index { candidate } else { m.name.as_str() });
    let mut colliding: Vec<_> = partition_by_name(names)
        .into_iter()
        .find(|(_, idx)| idx.contains(&target_index))
        .map(|(_, idx)| idx)
        .unwrap_or_default()
        .into_iter()
        .filter(|&i| i != target_index)
        .map(|i| aggregate.members[i].location.clone())
        .collect();
    colliding.extend(
        aggregate
            .other_members
            .iter()
            .filter(|m| m.name == candidate)
            .map(|m| m.location.clone()),
    );
    if !colliding.is_empty() {
        return Err(RenameError::WouldCollide {
            old_name: target.name.clone(),
            new_name: candidate.to_string(),
            colliding,
        });
    }

    check_cancelled(cancel)?;

    let mut plan = EditPlan::new(snapshot.id().clone(), symbol, &target.name, candidate);
    let mut conflicts = Vec::new();
    for (i, reference) in references.iter().enumerate() {
        let Some(unit) = snapshot.unit(reference.file_id) else {
            conflicts.push(Conflict::FileMissing {
                file_id: reference.file_id,
            });
            continue;
        };
        let Some(before) = unit.text.as_bytes().get(reference.span.as_range()) else {
            conflicts.push(Conflict::SpanOutOfBounds {
                file_id: reference.file_id,
                span: reference.span,
                len: unit.text.len(),
            });
            continue;
        };
        let edit = Edit::replace(
            i as u32,
            reference.file_id,
            Anchor::span_exact(reference.span, before),
            candidate,
        )
        .with_labels(EditLabels {
            symbol_id: Some(symbol),
            reason: Some(format!("rename {:?} reference", reference.kind).to_lowercase()),
        });
        plan.push(edit, &unit.path);
    }
    conflicts.extend(plan.detect_conflicts());
    if !conflicts.is_empty() {
        return Err(RenameError::ConflictingEdits { conflicts });
    }

    debug!(
        symbol = %symbol,
        old = %target.name,
        new = %candidate,
        edits = plan.edit_count(),
        files = plan.file_count(),
        "planned rename"
    );
    Ok(plan)
}
