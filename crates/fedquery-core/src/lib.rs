//! Fedquery Core - Join federation over independently owned collections.
//!
//! This crate reconstructs relational joins, filtering, sorting and exact
//! pagination across sources that only expose `get_many`/`get_one`.

pub mod catalog;
pub mod config;
pub mod error;
pub mod provider;
pub mod query;
pub mod registry;

pub use catalog::{Cardinality, FederationSchema, JoinType, RelationDecl, RootDecl};
pub use config::FederationConfig;
pub use error::{Error, ProviderError};
pub use provider::{CollectionProvider, MemoryProvider};
pub use query::{
    ExecutionPlan, Federation, FederationPlanner, FilterAnalyzer, FilterEvaluator,
    PlanDescription, SortAnalyzer, StrategyKind,
};
pub use registry::{RelationBinding, RelationRegistry};

/// Re-export protocol types.
pub use fedquery_proto as proto;
