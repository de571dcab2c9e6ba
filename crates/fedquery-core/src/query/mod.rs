//! Federated query engine.
//!
//! This module plans a request against a [`FederationSchema`](crate::catalog::FederationSchema),
//! executes it across the root and relation providers, and hydrates the
//! resulting roots.

mod buffer;
mod filter;
mod filter_analyzer;
mod hydrate;
mod orchestrator;
mod planner;
mod sort_analyzer;
mod strategy;

pub use buffer::{BufferStrategy, BufferWindow};
pub use filter::FilterEvaluator;
pub use filter_analyzer::{FilterAnalyzer, RelationFilterSet, RelationId, Scope};
pub use hydrate::{attach, attach_empty, collect_keys, RelationIndex};
pub use orchestrator::Federation;
pub use planner::{ExecutionPlan, FederationPlanner, PlanDescription};
pub use sort_analyzer::SortAnalyzer;
pub use strategy::{ExecutionStrategy, StrategyKind};
