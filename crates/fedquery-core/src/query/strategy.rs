//! Execution strategy selection.

use serde::Serialize;

use super::filter_analyzer::{FilterAnalyzer, RelationId};
use super::sort_analyzer::SortAnalyzer;

/// How a federated call is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    /// LEFT-join semantics: page the root, then fetch relations keyed by
    /// the page's ids. Single pass.
    RootFirst,
    /// INNER-join or relation-ordered semantics: discover root ids from the
    /// relations first, iterating until the page is filled.
    RelationFirst,
}

/// The chosen strategy together with the relations that drive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStrategy {
    kind: StrategyKind,
    driving: Option<RelationId>,
    chain: Vec<RelationId>,
}

impl ExecutionStrategy {
    /// Select a strategy from the analyzers' output.
    ///
    /// Relation-first is used iff some sort key or some condition targets a
    /// relation. The driving relation is the sorted relation if there is
    /// one, otherwise the first relation carrying a condition. The constraint
    /// chain starts at the driving relation and continues through every
    /// other constrained forward relation in declaration order.
    pub fn select(filters: &FilterAnalyzer, sorts: &SortAnalyzer) -> Self {
        let constrained = filters.constrained_relations();

        if !sorts.has_relation_sorts() && constrained.is_empty() {
            return Self {
                kind: StrategyKind::RootFirst,
                driving: None,
                chain: vec![],
            };
        }

        let driving = sorts.driving_relation().or_else(|| constrained.first().copied());
        let mut chain: Vec<RelationId> = driving.into_iter().collect();
        chain.extend(
            constrained
                .into_iter()
                .filter(|id| Some(*id) != driving && !filters.relation(*id).owner),
        );

        Self {
            kind: StrategyKind::RelationFirst,
            driving,
            chain,
        }
    }

    /// Strategy kind.
    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    /// Check for relation-first execution.
    pub fn is_relation_first(&self) -> bool {
        self.kind == StrategyKind::RelationFirst
    }

    /// Relation driving discovery, if relation-first.
    pub fn driving_relation(&self) -> Option<RelationId> {
        self.driving
    }

    /// Relations queried during discovery, driving relation first.
    pub fn chain(&self) -> &[RelationId] {
        &self.chain
    }
}
