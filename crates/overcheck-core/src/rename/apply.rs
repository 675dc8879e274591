//! Atomic application of an edit plan.
//!
//! Application is a copy-on-write transition: every affected unit is
//! rewritten and re-parsed first, and only if all of them succeed is a new
//! snapshot assembled. The new snapshot is then re-bound and must resolve
//! the renamed symbol at exactly the rewritten sites; otherwise it is
//! dropped. The input snapshot is never modified.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::locate::find_references;
use crate::error::{check_cancelled, RenameError, RenameResult};
use crate::patch::{EditPlan, FileId, Span};
use crate::provider::{OccurrenceKind, SourceModelProvider};
use crate::snapshot::{ProjectSnapshot, SourceUnit};
use crate::types::Location;

/// Apply `plan` to `snapshot`, returning the next snapshot.
///
/// # Errors
///
/// - `StaleSnapshot` if the plan was computed against a different snapshot
/// - `ApplyFailed` if an edit no longer matches its unit, a rewritten unit
///   fails to re-parse, or the rename changes which sites bind to the symbol
/// - `WouldCollide` if a same-named member captures a rewritten reference
/// - `Cancelled` if `cancel` fires before the new snapshot is assembled
pub fn apply_plan<P: SourceModelProvider>(
    provider: &P,
    snapshot: &ProjectSnapshot,
    plan: &EditPlan,
    cancel: &CancellationToken,
) -> RenameResult<ProjectSnapshot> {
    check_cancelled(cancel)?;

    if &plan.base != snapshot.id() {
        return Err(RenameError::StaleSnapshot {
            expected: plan.base.clone(),
            actual: snapshot.id().clone(),
        });
    }

    let mut rewritten = Vec::with_capacity(plan.file_count());
    for (file_id, edits) in &plan.edits {
        if edits.is_empty() {
            continue;
        }
        check_cancelled(cancel)?;

        let path = plan
            .file_paths
            .get(file_id)
            .cloned()
            .unwrap_or_else(|| file_id.to_string());
        let Some(unit) = snapshot.unit(*file_id) else {
            return Err(RenameError::ApplyFailed {
                path,
                reason: format!("{} is not in the snapshot", file_id),
            });
        };

        let text = plan.apply_to_text(*file_id, &unit.text).map_err(|conflicts| {
            RenameError::ApplyFailed {
                path: unit.path.clone(),
                reason: conflicts
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            }
        })?;

        let syntax = provider.parse(&unit.path, &text).map_err(|e| {
            warn!(path = %unit.path, error = %e, "rewritten unit failed to re-parse");
            RenameError::ApplyFailed {
                path: unit.path.clone(),
                reason: e.to_string(),
            }
        })?;

        rewritten.push(SourceUnit::new(*file_id, unit.path.clone(), text, syntax));
    }

    check_cancelled(cancel)?;
    let units = rewritten.len();
    let next = snapshot.with_replaced_units(provider, rewritten);
    verify_references(&next, plan, cancel)?;
    debug!(
        from = %snapshot.id(),
        to = %next.id(),
        version = next.version(),
        units,
        "applied rename {} -> {}",
        plan.old_name,
        plan.new_name
    );
    Ok(next)
}

/// Sites the plan's edits occupy once applied, ordered like `find_references`.
fn rewritten_sites(plan: &EditPlan) -> Vec<(FileId, Span)> {
    let mut sites = Vec::with_capacity(plan.edit_count());
    for (file_id, edits) in &plan.edits {
        let (mut grown, mut shrunk) = (0usize, 0usize);
        for edit in edits {
            let span = edit.span();
            let start = span.start + grown - shrunk;
            sites.push((*file_id, Span::new(start, start + edit.text.len())));
            if edit.text.len() >= span.len() {
                grown += edit.text.len() - span.len();
            } else {
                shrunk += span.len() - edit.text.len();
            }
        }
    }
    sites
}

/// Require the renamed symbol to bind at exactly the rewritten sites.
///
/// A member with the new name in a closer scope can capture a rewritten
/// call, and an occurrence that bound nothing before can start binding to
/// the new name. Both change what the program means.
fn verify_references(
    next: &ProjectSnapshot,
    plan: &EditPlan,
    cancel: &CancellationToken,
) -> RenameResult<()> {
    let expected = rewritten_sites(plan);
    let actual: Vec<(FileId, Span)> = find_references(next, plan.symbol, cancel)?
        .into_iter()
        .map(|r| (r.file_id, r.span))
        .collect();
    if actual == expected {
        return Ok(());
    }

    let lost = expected.iter().find(|site| !actual.contains(site));
    let gained = actual.iter().find(|site| !expected.contains(site));
    // Both lists are sorted and free of duplicates.
    let Some(&(file_id, span)) = lost.or(gained) else {
        return Ok(());
    };
    let Some(unit) = next.unit(file_id) else {
        return Err(RenameError::ApplyFailed {
            path: file_id.to_string(),
            reason: format!("{} is not in the snapshot", file_id),
        });
    };
    let at = Location::from_span(&unit.path, &unit.text, span);

    if lost.is_some() {
        let binder = next.binder();
        let capturing: Vec<Location> = unit
            .syntax
            .occurrences
            .iter()
            .filter(|o| o.kind == OccurrenceKind::Declaration && o.name == plan.new_name)
            .filter(|o| matches!(binder.resolve(file_id, o.span), Some(id) if id != plan.symbol))
            .map(|o| Location::from_span(&unit.path, &unit.text, o.span))
            .collect();
        if !capturing.is_empty() {
            warn!(
                path = %unit.path,
                line = at.line,
                col = at.col,
                "renamed reference captured by another member"
            );
            return Err(RenameError::WouldCollide {
                old_name: plan.old_name.clone(),
                new_name: plan.new_name.clone(),
                colliding: capturing,
            });
        }
    }

    let reason = if lost.is_some() {
        format!(
            "reference at {}:{} no longer binds to '{}' after the rename",
            at.line, at.col, plan.old_name
        )
    } else {
        format!(
            "'{}' at {}:{} would start binding to the renamed member",
            plan.new_name, at.line, at.col
        )
    };
    warn!(path = %unit.path, reason = %reason, "rename changes bindings");
    Err(RenameError::ApplyFailed {
        path: unit.path.clone(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::merge_aggregates;
    use crate::config::AnalyzerConfig;
    use crate::patch::SnapshotId;
    use crate::rename::locate::find_references;
    use crate::rename::plan::plan_rename;
    use crate::testing::ToyProvider;

    fn plan_for(snap: &ProjectSnapshot, candidate: &str) -> EditPlan {
        let token = CancellationToken::new();
        let filter = AnalyzerConfig::default().filter().unwrap();
        let query = merge_aggregates(snap, &filter).remove(0);
        let symbol = query.members[0].id;
        let refs = find_references(snap, symbol, &token).unwrap();
        plan_rename(snap, &query, symbol, &refs, candidate, &token).unwrap()
    }

    fn project() -> ProjectSnapshot {
        ProjectSnapshot::build(
            &ToyProvider,
            vec![
                ("a.toy", "class Query\nmethod myMethod\nmethod myMethod 1\nend\n"),
                ("b.toy", "class Client\ncall Query.myMethod\ncall Query.myMethod\nend\n"),
                ("c.toy", "class Untouched\nfield x\nend\n"),
            ],
        )
    }

    #[test]
    fn rewrites_every_reference_and_shares_untouched_units() {
        let snap = project();
        let plan = plan_for(&snap, "MYMETHOD");
        let next = apply_plan(&ToyProvider, &snap, &plan, &CancellationToken::new()).unwrap();

        assert_eq!(
            next.unit_by_path("a.toy").unwrap().text,
            "class Query\nmethod MYMETHOD\nmethod myMethod 1\nend\n"
        );
        assert_eq!(
            next.unit_by_path("b.toy").unwrap().text,
            "class Client\ncall Query.MYMETHOD\ncall Query.MYMETHOD\nend\n"
        );
        assert!(std::sync::Arc::ptr_eq(
            snap.unit_by_path("c.toy").unwrap(),
            next.unit_by_path("c.toy").unwrap()
        ));
        assert_eq!(next.version(), snap.version() + 1);
    }

    #[test]
    fn identity_and_reference_count_survive_rename() {
        let snap = project();
        let plan = plan_for(&snap, "MYMETHOD");
        let token = CancellationToken::new();
        let before = find_references(&snap, plan.symbol, &token).unwrap();
        let next = apply_plan(&ToyProvider, &snap, &plan, &token).unwrap();
        let after = find_references(&next, plan.symbol, &token).unwrap();
        assert_eq!(before.len(), after.len());
        let files_before: Vec<_> = before.iter().map(|r| (r.file_id, r.location.line)).collect();
        let files_after: Vec<_> = after.iter().map(|r| (r.file_id, r.location.line)).collect();
        assert_eq!(files_before, files_after);
    }

    #[test]
    fn reparse_failure_leaves_snapshot_unchanged() {
        let snap = project();
        // `end` lexes as an identifier but is a directive in the toy language.
        let plan = plan_for(&snap, "end");
        let before: Vec<String> = snap.units().iter().map(|u| u.text.clone()).collect();
        match apply_plan(&ToyProvider, &snap, &plan, &CancellationToken::new()) {
            Err(RenameError::ApplyFailed { path, .. }) => assert_eq!(path, "a.toy"),
            other => panic!("Expected ApplyFailed, got {:?}", other),
        }
        let after: Vec<String> = snap.units().iter().map(|u| u.text.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn newly_bound_occurrence_fails_apply() {
        let snap = ProjectSnapshot::build(
            &ToyProvider,
            vec![
                ("a.toy", "class Query\nmethod run\ncall run\nend\n"),
                ("b.toy", "class Client\ncall Query.RUN\nend\n"),
            ],
        );
        let plan = plan_for(&snap, "RUN");
        assert_eq!(plan.edit_count(), 2);
        match apply_plan(&ToyProvider, &snap, &plan, &CancellationToken::new()) {
            Err(RenameError::ApplyFailed { path, reason }) => {
                assert_eq!(path, "b.toy");
                assert!(reason.contains("2:12"), "{}", reason);
            }
            other => panic!("Expected ApplyFailed, got {:?}", other),
        }
    }

    #[test]
    fn rewritten_sites_shift_by_earlier_edits() {
        let snap = project();
        let plan = plan_for(&snap, "MYMETHOD_X");
        let sites: Vec<usize> = rewritten_sites(&plan)
            .into_iter()
            .filter(|(file_id, _)| snap.unit(*file_id).unwrap().path == "b.toy")
            .map(|(_, span)| span.start)
            .collect();
        let text = "class Client\ncall Query.MYMETHOD_X\ncall Query.MYMETHOD_X\nend\n";
        let expected: Vec<usize> = text.match_indices("MYMETHOD_X").map(|(i, _)| i).collect();
        assert_eq!(sites, expected);
    }

    #[test]
    fn stale_plan_is_rejected() {
        let snap = project();
        let mut plan = plan_for(&snap, "MYMETHOD");
        plan.base = SnapshotId::new("snap_elsewhere");
        match apply_plan(&ToyProvider, &snap, &plan, &CancellationToken::new()) {
            Err(RenameError::StaleSnapshot { expected, .. }) => {
                assert_eq!(expected, SnapshotId::new("snap_elsewhere"))
            }
            other => panic!("Expected StaleSnapshot, got {:?}", other),
        }
    }

    #[test]
    fn changed_anchor_text_fails_apply() {
        let snap = project();
        let mut plan = plan_for(&snap, "MYMETHOD");
        let edits = plan.edits.values_mut().next().unwrap();
        edits[0].anchor.expected_before_hash = crate::patch::ContentHash::compute(b"other");
        assert!(matches!(
            apply_plan(&ToyProvider, &snap, &plan, &CancellationToken::new()),
            Err(RenameError::ApplyFailed { .. })
        ));
    }

    #[test]
    fn cancelled_apply_returns_no_snapshot() {
        let snap = project();
        let plan = plan_for(&snap, "MYMETHOD");
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            apply_plan(&ToyProvider, &snap, &plan, &token),
            Err(RenameError::Cancelled)
        ));
    }
}
