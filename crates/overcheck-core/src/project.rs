//! Single-writer project handle.
//!
//! A [`Project`] owns a provider, the compiled analyzer and naming policy,
//! and the current [`ProjectSnapshot`]. Readers take a cheap `Arc` of the
//! current snapshot and never block. Every write is a copy-on-write
//! transition: compute the next snapshot from a base, then [`Project::commit`]
//! it, which succeeds only if the base is still current. A rename computed
//! against an older snapshot is rejected with `StaleSnapshot`, never merged.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::analysis::{aggregate_of, Analyzer, Diagnostic};
use crate::config::{AnalyzerConfig, ConfigError};
use crate::error::{RenameError, RenameResult};
use crate::fix::{FixAllOutcome, FixOutcome, Fixer};
use crate::patch::EditPlan;
use crate::provider::{SourceModelProvider, SymbolId};
use crate::rename::{apply_plan, find_references, plan_rename, NamingPolicy, Reference};
use crate::snapshot::ProjectSnapshot;

pub struct Project<P: SourceModelProvider> {
    provider: P,
    config: AnalyzerConfig,
    analyzer: Analyzer,
    naming: Box<dyn NamingPolicy>,
    current: ArcSwap<ProjectSnapshot>,
}

impl<P: SourceModelProvider> Project<P> {
    /// Build the initial snapshot from `(path, text)` pairs.
    pub fn new<I, S, T>(provider: P, config: AnalyzerConfig, files: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let snapshot = ProjectSnapshot::build(&provider, files);
        Project::from_snapshot(provider, config, snapshot)
    }

    /// Wrap an existing snapshot built with `provider`.
    pub fn from_snapshot(
        provider: P,
        config: AnalyzerConfig,
        snapshot: ProjectSnapshot,
    ) -> Result<Self, ConfigError> {
        let analyzer = Analyzer::new(&config)?;
        let naming = config.naming.policy();
        Ok(Project {
            provider,
            config,
            analyzer,
            naming,
            current: ArcSwap::from_pointee(snapshot),
        })
    }

    /// Replace the naming policy used by fix requests.
    pub fn with_naming(mut self, naming: Box<dyn NamingPolicy>) -> Self {
        self.naming = naming;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<ProjectSnapshot> {
        self.current.load_full()
    }

    /// A fixer bound to this project's provider, analyzer and naming policy.
    pub fn fixer(&self) -> Fixer<'_, P> {
        Fixer::new(&self.provider, &self.analyzer, self.naming.as_ref())
    }

    /// Analyze the current snapshot.
    pub fn analyze(&self) -> Vec<Diagnostic> {
        self.analyzer.analyze(&self.snapshot())
    }

    pub fn find_references(
        &self,
        symbol: SymbolId,
        cancel: &CancellationToken,
    ) -> RenameResult<Vec<Reference>> {
        find_references(&self.snapshot(), symbol, cancel)
    }

    /// Plan renaming an allow-listed method to an explicit name.
    ///
    /// A symbol that is not a method of an allow-listed aggregate has no
    /// references this project can rename, so it fails with `NoReferences`.
    pub fn plan_rename(
        &self,
        symbol: SymbolId,
        new_name: &str,
        cancel: &CancellationToken,
    ) -> RenameResult<EditPlan> {
        self.plan_rename_in(&self.snapshot(), symbol, new_name, cancel)
    }

    fn plan_rename_in(
        &self,
        snapshot: &ProjectSnapshot,
        symbol: SymbolId,
        new_name: &str,
        cancel: &CancellationToken,
    ) -> RenameResult<EditPlan> {
        let aggregate = aggregate_of(snapshot, self.analyzer.filter(), symbol)
            .ok_or(RenameError::NoReferences { symbol })?;
        let references = find_references(snapshot, symbol, cancel)?;
        plan_rename(snapshot, &aggregate, symbol, &references, new_name, cancel)
    }

    /// Rename an allow-listed method to an explicit name and commit the result.
    pub fn rename(
        &self,
        symbol: SymbolId,
        new_name: &str,
        cancel: &CancellationToken,
    ) -> RenameResult<Arc<ProjectSnapshot>> {
        let base = self.snapshot();
        let plan = self.plan_rename_in(&base, symbol, new_name, cancel)?;
        let next = apply_plan(&self.provider, &base, &plan, cancel)?;
        self.commit(&base, next)
    }

    /// Fix one diagnostic against the current snapshot and commit the result.
    pub fn fix(
        &self,
        diagnostic: &Diagnostic,
        cancel: &CancellationToken,
    ) -> RenameResult<FixOutcome> {
        let base = self.snapshot();
        let outcome = self.fixer().fix(&base, diagnostic, cancel)?;
        self.commit(&base, outcome.snapshot.clone())?;
        Ok(outcome)
    }

    /// Fix every fixable diagnostic and commit the final snapshot.
    ///
    /// Nothing is committed when no fix applied.
    pub fn fix_all(&self, cancel: &CancellationToken) -> RenameResult<FixAllOutcome> {
        let base = self.snapshot();
        let outcome = self.fixer().fix_all(&base, cancel)?;
        if !outcome.applied.is_empty() {
            self.commit(&base, outcome.snapshot.clone())?;
        }
        Ok(outcome)
    }

    /// Make `next` current if `base` is still the current snapshot.
    ///
    /// # Errors
    ///
    /// `StaleSnapshot` if another commit replaced `base` first.
    pub fn commit(
        &self,
        base: &Arc<ProjectSnapshot>,
        next: ProjectSnapshot,
    ) -> RenameResult<Arc<ProjectSnapshot>> {
        let next = Arc::new(next);
        let previous = self.current.compare_and_swap(base, Arc::clone(&next));
        if !Arc::ptr_eq(&previous, base) {
            return Err(RenameError::StaleSnapshot {
                expected: base.id().clone(),
                actual: previous.id().clone(),
            });
        }
        debug!(
            from = %base.id(),
            to = %next.id(),
            version = next.version(),
            "committed snapshot"
        );
        Ok(next)
    }
}
