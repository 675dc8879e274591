//! Collision detection: same-name method groups within one merged aggregate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::merge::{MergedAggregate, MethodSymbol};
use super::Severity;
use crate::provider::SymbolId;
use crate::types::Location;

// ============================================================================
// Rule Descriptor
// ============================================================================

/// Static description of the single rule this analyzer reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiagnosticDescriptor {
    pub id: &'static str,
    pub title: &'static str,
    /// Message template; `{0}` is replaced with the shared method name.
    pub message_format: &'static str,
    pub category: &'static str,
    pub default_severity: Severity,
    pub enabled_by_default: bool,
}

impl DiagnosticDescriptor {
    pub fn format_message(&self, name: &str) -> String {
        self.message_format.replace("{0}", name)
    }
}

/// The method-overload rule.
pub const OVERLOAD_RULE: DiagnosticDescriptor = DiagnosticDescriptor {
    id: "GQLDA001NOL",
    title: "Method overload detected",
    message_format: "Method '{0}' has overloads in the same class",
    category: "Naming",
    default_severity: Severity::Error,
    enabled_by_default: true,
};

// ============================================================================
// Diagnostics
// ============================================================================

/// One reported colliding declaration. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule identifier, shared by every diagnostic.
    pub code: String,
    pub severity: Severity,
    pub message: String,
    /// The shared method name (the message argument).
    pub name: String,
    /// Identity of the member this diagnostic is about.
    pub symbol: SymbolId,
    /// Qualified name of the owning aggregate.
    pub aggregate: String,
    /// Declaration span of the member.
    pub location: Location,
}

/// How diagnostics are stamped and filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectOptions {
    pub severity: Severity,
    pub include_generated: bool,
}

impl Default for DetectOptions {
    fn default() -> Self {
        DetectOptions {
            severity: OVERLOAD_RULE.default_severity,
            include_generated: false,
        }
    }
}

// ============================================================================
// Grouping
// ============================================================================

/// Partition `names` by exact, case-sensitive equality.
///
/// Returns `(name, indices)` pairs. Groups are ordered by first occurrence
/// and indices within a group are ascending.
pub fn partition_by_name<'a, I>(names: I) -> Vec<(&'a str, Vec<usize>)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut groups: Vec<(&'a str, Vec<usize>)> = Vec::new();
    let mut slots: HashMap<&'a str, usize> = HashMap::new();
    for (i, name) in names.into_iter().enumerate() {
        match slots.get(name) {
            Some(&slot) => groups[slot].1.push(i),
            None => {
                slots.insert(name, groups.len());
                groups.push((name, vec![i]));
            }
        }
    }
    groups
}

/// An ordered run of members sharing one name; always two or more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionGroup<'a> {
    pub name: &'a str,
    pub members: Vec<&'a MethodSymbol>,
}

/// Every collision group in `aggregate`, first-declared group first.
pub fn collision_groups(aggregate: &MergedAggregate) -> Vec<CollisionGroup<'_>> {
    partition_by_name(aggregate.members.iter().map(|m| m.name.as_str()))
        .into_iter()
        .filter(|(_, idx)| idx.len() >= 2)
        .map(|(name, idx)| CollisionGroup {
            name,
            members: idx.into_iter().map(|i| &aggregate.members[i]).collect(),
        })
        .collect()
}

/// Emit one diagnostic per member of every collision group in `aggregate`.
///
/// Members declared in generated units still count toward their group but
/// are not reported unless `options.include_generated` is set.
#[must_use]
pub fn detect(aggregate: &MergedAggregate, options: &DetectOptions) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for group in collision_groups(aggregate) {
        let message = OVERLOAD_RULE.format_message(group.name);
        for member in group.members {
            if member.generated && !options.include_generated {
                continue;
            }
            out.push(Diagnostic {
                code: OVERLOAD_RULE.id.to_string(),
                severity: options.severity,
                message: message.clone(),
                name: group.name.to_string(),
                symbol: member.id,
                aggregate: aggregate.qualified_name.clone(),
                location: member.location.clone(),
            });
        }
    }
    out
}
