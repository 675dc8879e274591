//! Fix requests: turn one diagnostic into a rename, or fix every diagnostic.
//!
//! A fix request carries a diagnostic and the snapshot to fix it in. The
//! diagnostic's location is re-resolved against that snapshot, so a
//! diagnostic from an older snapshot either still points at its member or
//! fails with `SymbolNotFound`.
//!
//! Fix-all works one rename at a time, re-analyzing the newest snapshot
//! after each, so every rename is validated against the members as they
//! are at that moment.

use std::collections::HashSet;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::analysis::{aggregate_of, Analyzer, Diagnostic, MergedAggregate};
use crate::error::{check_cancelled, RenameError, RenameResult};
use crate::patch::EditPlan;
use crate::provider::{SourceModelProvider, SymbolId};
use crate::rename::{apply_plan, find_references, plan_rename, NamingPolicy};
use crate::snapshot::ProjectSnapshot;

/// The result of one successful fix.
#[derive(Debug, Clone)]
pub struct FixOutcome {
    pub snapshot: ProjectSnapshot,
    pub plan: EditPlan,
}

/// A fix that fix-all applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFix {
    pub symbol: SymbolId,
    pub old_name: String,
    pub new_name: String,
    pub edits: usize,
}

/// A diagnostic fix-all could not fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFix {
    pub symbol: SymbolId,
    pub name: String,
    pub error: RenameError,
}

/// The result of fix-all.
#[derive(Debug, Clone)]
pub struct FixAllOutcome {
    pub snapshot: ProjectSnapshot,
    pub applied: Vec<AppliedFix>,
    pub skipped: Vec<SkippedFix>,
}

/// Runs fix requests with one provider, analyzer, and naming policy.
pub struct Fixer<'a, P: SourceModelProvider> {
    provider: &'a P,
    analyzer: &'a Analyzer,
    naming: &'a dyn NamingPolicy,
}

impl<'a, P: SourceModelProvider> Fixer<'a, P> {
    pub fn new(provider: &'a P, analyzer: &'a Analyzer, naming: &'a dyn NamingPolicy) -> Self {
        Fixer {
            provider,
            analyzer,
            naming,
        }
    }

    /// Resolve the member a diagnostic points at in `snapshot`.
    pub fn resolve_target(
        &self,
        snapshot: &ProjectSnapshot,
        diagnostic: &Diagnostic,
    ) -> RenameResult<(MergedAggregate, SymbolId)> {
        let not_found = || RenameError::symbol_not_found(&diagnostic.location);
        let unit = snapshot
            .unit_by_path(&diagnostic.location.file)
            .ok_or_else(not_found)?;
        let symbol = snapshot
            .binder()
            .resolve(unit.file_id, diagnostic.location.span())
            .ok_or_else(not_found)?;
        let aggregate =
            aggregate_of(snapshot, self.analyzer.filter(), symbol).ok_or_else(not_found)?;
        Ok((aggregate, symbol))
    }

    /// Compute the edit plan a fix would apply, without applying it.
    pub fn plan_fix(
        &self,
        snapshot: &ProjectSnapshot,
        diagnostic: &Diagnostic,
        cancel: &CancellationToken,
    ) -> RenameResult<EditPlan> {
        check_cancelled(cancel)?;
        let (aggregate, symbol) = self.resolve_target(snapshot, diagnostic)?;
        let Some(member) = aggregate.member(symbol) else {
            return Err(RenameError::NotAMember {
                symbol,
                aggregate: aggregate.qualified_name.clone(),
            });
        };
        let candidate = self.naming.candidate(member, &aggregate);
        let references = find_references(snapshot, symbol, cancel)?;
        plan_rename(snapshot, &aggregate, symbol, &references, &candidate, cancel)
    }

    /// Fix one diagnostic: locate, plan, and apply the rename.
    pub fn fix(
        &self,
        snapshot: &ProjectSnapshot,
        diagnostic: &Diagnostic,
        cancel: &CancellationToken,
    ) -> RenameResult<FixOutcome> {
        let plan = self.plan_fix(snapshot, diagnostic, cancel)?;
        let next = apply_plan(self.provider, snapshot, &plan, cancel)?;
        Ok(FixOutcome {
            snapshot: next,
            plan,
        })
    }

    /// Fix diagnostics until none are left or none can be fixed.
    ///
    /// Each successful rename takes its member out of its collision group
    /// and cannot create a new one, so the loop always ends. Only
    /// cancellation aborts; other failures are recorded as skipped.
    pub fn fix_all(
        &self,
        snapshot: &ProjectSnapshot,
        cancel: &CancellationToken,
    ) -> RenameResult<FixAllOutcome> {
        let mut current = snapshot.clone();
        let mut applied = Vec::new();
        let mut skipped = Vec::new();
        let mut skipped_ids: HashSet<SymbolId> = HashSet::new();

        loop {
            check_cancelled(cancel)?;
            let diagnostics = self.analyzer.analyze(&current);
            let mut progressed = false;

            for diagnostic in &diagnostics {
                if skipped_ids.contains(&diagnostic.symbol) {
                    continue;
                }
                match self.fix(&current, diagnostic, cancel) {
                    Ok(outcome) => {
                        applied.push(AppliedFix {
                            symbol: outcome.plan.symbol,
                            old_name: outcome.plan.old_name.clone(),
                            new_name: outcome.plan.new_name.clone(),
                            edits: outcome.plan.edit_count(),
                        });
                        current = outcome.snapshot;
                        progressed = true;
                        break;
                    }
                    Err(RenameError::Cancelled) => return Err(RenameError::Cancelled),
                    Err(error) => {
                        debug!(symbol = %diagnostic.symbol, error = %error, "fix skipped");
                        skipped_ids.insert(diagnostic.symbol);
                        skipped.push(SkippedFix {
                            symbol: diagnostic.symbol,
                            name: diagnostic.name.clone(),
                            error,
                        });
                    }
                }
            }

            if !progressed {
                break;
            }
        }

        info!(
            applied = applied.len(),
            skipped = skipped.len(),
            snapshot = %current.id(),
            "fix-all complete"
        );
        Ok(FixAllOutcome {
            snapshot: current,
            applied,
            skipped,
        })
    }
}
