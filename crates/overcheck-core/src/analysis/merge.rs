//! Fragment merging: one logical member set per allow-listed aggregate.
//!
//! Fragments merge on (qualified name, kind). Member order is unit path
//! order, then fragment order within a unit, then declaration order, which
//! makes every downstream ordering deterministic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::AggregateFilter;
use crate::patch::{FileId, Span};
use crate::provider::{AggregateKind, MemberKind, SymbolId};
use crate::snapshot::ProjectSnapshot;
use crate::types::Location;

/// One method-like member of a merged aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSymbol {
    pub id: SymbolId,
    pub name: String,
    /// Qualified name of the owning aggregate.
    pub aggregate: String,
    pub file_id: FileId,
    pub decl_span: Span,
    pub location: Location,
    pub arity: usize,
    /// Declared in a generated unit.
    pub generated: bool,
}

/// A member that is not method-like but still occupies a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherMember {
    pub name: String,
    pub kind: MemberKind,
    pub location: Location,
}

/// Where one fragment of the aggregate lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentLocation {
    pub file_id: FileId,
    pub path: String,
    pub span: Span,
}

/// All fragments of one aggregate, unioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedAggregate {
    /// Simple name.
    pub name: String,
    pub qualified_name: String,
    pub kind: AggregateKind,
    pub fragments: Vec<FragmentLocation>,
    /// Method-like members in merge order.
    pub members: Vec<MethodSymbol>,
    /// Properties, fields, and events.
    pub other_members: Vec<OtherMember>,
}

impl MergedAggregate {
    fn new(name: &str, qualified_name: String, kind: AggregateKind) -> Self {
        MergedAggregate {
            name: name.to_string(),
            qualified_name,
            kind,
            fragments: Vec::new(),
            members: Vec::new(),
            other_members: Vec::new(),
        }
    }

    pub fn member(&self, id: SymbolId) -> Option<&MethodSymbol> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: SymbolId) -> bool {
        self.member(id).is_some()
    }
}

/// Merge every aggregate whose fragments satisfy `filter`.
///
/// Aggregates come back in order of their first fragment. An aggregate
/// whose fragments declare no methods yields an empty member list.
/// Members the binder cannot resolve are excluded.
pub fn merge_aggregates(snapshot: &ProjectSnapshot, filter: &AggregateFilter) -> Vec<MergedAggregate> {
    let mut merged: Vec<MergedAggregate> = Vec::new();
    let mut index: HashMap<(String, AggregateKind), usize> = HashMap::new();
    let binder = snapshot.binder();

    for unit in snapshot.units() {
        for fragment in unit.syntax.fragments.iter().filter(|f| filter.matches(f)) {
            let qualified = fragment.qualified_name();
            let slot = *index
                .entry((qualified.clone(), fragment.kind))
                .or_insert_with(|| {
                    merged.push(MergedAggregate::new(&fragment.name, qualified, fragment.kind));
                    merged.len() - 1
                });
            let aggregate = &mut merged[slot];
            aggregate.fragments.push(FragmentLocation {
                file_id: unit.file_id,
                path: unit.path.clone(),
                span: fragment.span,
            });

            for member in &fragment.members {
                let location = Location::from_span(&unit.path, &unit.text, member.name_span);
                if member.kind.is_method_like() {
                    let Some(id) = binder.resolve(unit.file_id, member.name_span) else {
                        trace!(member = %member.name, at = %location, "unresolved declaration skipped");
                        continue;
                    };
                    aggregate.members.push(MethodSymbol {
                        id,
                        name: member.name.clone(),
                        aggregate: aggregate.qualified_name.clone(),
                        file_id: unit.file_id,
                        decl_span: member.name_span,
                        location,
                        arity: member.arity,
                        generated: unit.is_generated(),
                    });
                } else if member.kind.occupies_name() {
                    aggregate.other_members.push(OtherMember {
                        name: member.name.clone(),
                        kind: member.kind,
                        location,
                    });
                }
            }
        }
    }

    merged
}

/// Find the merged aggregate that owns `symbol`.
pub fn aggregate_of(
    snapshot: &ProjectSnapshot,
    filter: &AggregateFilter,
    symbol: SymbolId,
) -> Option<MergedAggregate> {
    merge_aggregates(snapshot, filter)
        .into_iter()
        .find(|a| a.contains(symbol))
}
