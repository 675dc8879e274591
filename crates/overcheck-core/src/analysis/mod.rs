//! Analysis pass: fragment merging followed by collision detection.
//!
//! Analysis is read-only over an immutable snapshot. Merged aggregates are
//! independent, so detection runs across them in parallel; the output
//! order is still the merge order.

pub mod detect;
pub mod merge;

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AggregateFilter, AnalyzerConfig, ConfigError};
use crate::snapshot::ProjectSnapshot;

pub use detect::{
    collision_groups, detect, partition_by_name, CollisionGroup, DetectOptions, Diagnostic,
    DiagnosticDescriptor, OVERLOAD_RULE,
};
pub use merge::{aggregate_of, merge_aggregates, FragmentLocation, MergedAggregate, MethodSymbol, OtherMember};

/// Reported severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Hidden,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Hidden => "hidden",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// A compiled analyzer: filter plus detection options.
#[derive(Debug, Clone)]
pub struct Analyzer {
    filter: AggregateFilter,
    options: DetectOptions,
}

impl Analyzer {
    pub fn new(config: &AnalyzerConfig) -> Result<Self, ConfigError> {
        Ok(Analyzer {
            filter: config.filter()?,
            options: DetectOptions {
                severity: config.severity,
                include_generated: config.include_generated,
            },
        })
    }

    pub fn filter(&self) -> &AggregateFilter {
        &self.filter
    }

    pub fn merge(&self, snapshot: &ProjectSnapshot) -> Vec<MergedAggregate> {
        merge_aggregates(snapshot, &self.filter)
    }

    /// Run one analysis pass and return the ordered diagnostic stream.
    ///
    /// Running twice on the same snapshot yields identical output.
    #[must_use]
    pub fn analyze(&self, snapshot: &ProjectSnapshot) -> Vec<Diagnostic> {
        let aggregates = self.merge(snapshot);
        let per_aggregate: Vec<Vec<Diagnostic>> = aggregates
            .par_iter()
            .map(|aggregate| detect(aggregate, &self.options))
            .collect();
        let diagnostics: Vec<Diagnostic> = per_aggregate.into_iter().flatten().collect();
        debug!(
            snapshot = %snapshot.id(),
            aggregates = aggregates.len(),
            diagnostics = diagnostics.len(),
            "analysis pass complete"
        );
        diagnostics
    }
}
