//! Candidate-name policies for fix requests.
//!
//! A policy only proposes a name. The planner validates every candidate
//! against the aggregate's other members, whatever policy produced it.

use crate::analysis::{MergedAggregate, MethodSymbol};
use crate::config::NamingPolicyKind;

/// Proposes a new name for a colliding member.
pub trait NamingPolicy: Send + Sync {
    fn candidate(&self, symbol: &MethodSymbol, aggregate: &MergedAggregate) -> String;
}

/// Upper-case the whole declared name (locale-independent).
///
/// A name that is already upper case maps to itself. The planner rejects
/// that as `WouldCollide`, so fix-all skips such overloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct UppercaseName;

impl NamingPolicy for UppercaseName {
    fn candidate(&self, symbol: &MethodSymbol, _aggregate: &MergedAggregate) -> String {
        symbol.name.to_uppercase()
    }
}

/// Append the first numeric suffix (`2`, `3`, ...) no sibling uses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixedName;

impl NamingPolicy for SuffixedName {
    fn candidate(&self, symbol: &MethodSymbol, aggregate: &MergedAggregate) -> String {
        let taken = |name: &str| {
            aggregate.members.iter().any(|m| m.name == name)
                || aggregate.other_members.iter().any(|m| m.name == name)
        };
        (2..)
            .map(|n| format!("{}{}", symbol.name, n))
            .find(|name| !taken(name))
            .unwrap_or_else(|| symbol.name.clone())
    }
}

impl NamingPolicyKind {
    pub fn policy(&self) -> Box<dyn NamingPolicy> {
        match self {
            NamingPolicyKind::Uppercase => Box::new(UppercaseName),
            NamingPolicyKind::Suffix => Box::new(SuffixedName),
        }
    }
}
