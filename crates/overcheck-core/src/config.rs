//! Analyzer configuration.
//!
//! Configuration is passed in, never compiled in. Every field has a default,
//! so an empty TOML document yields the reference behavior:
//!
//! ```toml
//! aggregate_names = ["Query", "Mutation"]
//! aggregate_kinds = ["class"]
//! severity = "error"
//! include_generated = false
//! naming = "uppercase"
//! ```
//!
//! Allow-list entries are glob patterns; a plain name matches only itself.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::Severity;
use crate::provider::{AggregateKind, FragmentData};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid aggregate name pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("aggregate_names must not be empty")]
    EmptyAllowList,
}

/// Which candidate-name policy fix requests use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingPolicyKind {
    /// Upper-case the whole declared name.
    #[default]
    Uppercase,
    /// Append the first free numeric suffix.
    Suffix,
}

/// Analyzer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Allow-listed aggregate simple names (glob patterns).
    pub aggregate_names: Vec<String>,
    /// Aggregate kinds that are analyzed.
    pub aggregate_kinds: Vec<AggregateKind>,
    /// Severity reported on every diagnostic.
    pub severity: Severity,
    /// Report diagnostics located in generated units.
    pub include_generated: bool,
    /// Candidate-name policy for fixes.
    pub naming: NamingPolicyKind,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            aggregate_names: vec!["Query".to_string(), "Mutation".to_string()],
            aggregate_kinds: vec![AggregateKind::Class],
            severity: Severity::Error,
            include_generated: false,
            naming: NamingPolicyKind::Uppercase,
        }
    }
}

impl AnalyzerConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: AnalyzerConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the allow-list.
    pub fn with_aggregate_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aggregate_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_aggregate_kinds(mut self, kinds: impl IntoIterator<Item = AggregateKind>) -> Self {
        self.aggregate_kinds = kinds.into_iter().collect();
        self
    }

    pub fn with_naming(mut self, naming: NamingPolicyKind) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_include_generated(mut self, include: bool) -> Self {
        self.include_generated = include;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregate_names.is_empty() {
            return Err(ConfigError::EmptyAllowList);
        }
        Ok(())
    }

    /// Compile the allow-list and kinds into an [`AggregateFilter`].
    pub fn filter(&self) -> Result<AggregateFilter, ConfigError> {
        self.validate()?;
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.aggregate_names {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        let names = builder.build().map_err(|e| ConfigError::InvalidPattern {
            pattern: self.aggregate_names.join(","),
            message: e.to_string(),
        })?;
        Ok(AggregateFilter {
            names,
            kinds: self.aggregate_kinds.clone(),
        })
    }
}

/// The aggregate-name predicate: which fragments the merger looks at.
#[derive(Debug, Clone)]
pub struct AggregateFilter {
    names: GlobSet,
    kinds: Vec<AggregateKind>,
}

impl AggregateFilter {
    /// Exact, case-sensitive match of the simple name against the allow-list.
    pub fn matches_name(&self, name: &str) -> bool {
        self.names.is_match(name)
    }

    pub fn matches(&self, fragment: &FragmentData) -> bool {
        self.kinds.contains(&fragment.kind) && self.matches_name(&fragment.name)
    }
}
