//! Federation planner: validates a request and fixes its execution plan.
//!
//! Every configuration and unsupported-query error is raised here, before
//! any provider is called.

use fedquery_proto::{FilterCondition, Request, SortKey};
use serde::Serialize;

use super::filter_analyzer::{FilterAnalyzer, RelationId};
use super::sort_analyzer::SortAnalyzer;
use super::strategy::{ExecutionStrategy, StrategyKind};
use crate::catalog::FederationSchema;
use crate::config::FederationConfig;
use crate::error::Error;

/// A validated request together with everything needed to execute it.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Filter partition.
    pub filters: FilterAnalyzer,
    /// Sort partition.
    pub sorts: SortAnalyzer,
    /// Chosen strategy.
    pub strategy: ExecutionStrategy,
    /// Relations hydrated onto the result, in declaration order.
    pub hydrated: Vec<RelationId>,
    /// Effective page size.
    pub limit: u64,
    /// Effective number of roots skipped.
    pub offset: u64,
}

/// Serializable summary of an execution plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanDescription {
    /// Chosen strategy.
    pub strategy: StrategyKind,
    /// Relation driving discovery.
    pub driving_relation: Option<String>,
    /// Relations queried during discovery, in order.
    pub chain: Vec<String>,
    /// Relations hydrated onto the result.
    pub hydrated: Vec<String>,
    /// Conditions forwarded to the root provider.
    pub root_filters: Vec<FilterCondition>,
    /// Sort keys applied to the driving relation.
    pub relation_sorts: Vec<SortKey>,
    /// Sort keys forwarded to the root provider.
    pub root_sorts: Vec<SortKey>,
    /// Effective page size.
    pub limit: u64,
    /// Effective offset.
    pub offset: u64,
}

impl ExecutionPlan {
    /// Property name of a relation.
    pub fn property(&self, id: RelationId) -> &str {
        &self.filters.relation(id).property
    }

    /// Summarize the plan.
    pub fn describe(&self) -> PlanDescription {
        let names = |ids: &[RelationId]| -> Vec<String> {
            ids.iter().map(|id| self.property(*id).to_string()).collect()
        };

        PlanDescription {
            strategy: self.strategy.kind(),
            driving_relation: self
                .strategy
                .driving_relation()
                .map(|id| self.property(id).to_string()),
            chain: names(self.strategy.chain()),
            hydrated: names(&self.hydrated),
            root_filters: self.filters.root_filters().to_vec(),
            relation_sorts: self.sorts.relation_sorts(),
            root_sorts: self.sorts.root_sorts().to_vec(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Planner that turns a request into an [`ExecutionPlan`].
pub struct FederationPlanner<'a> {
    schema: &'a FederationSchema,
    config: &'a FederationConfig,
}

impl<'a> FederationPlanner<'a> {
    /// Create a planner for a schema.
    pub fn new(schema: &'a FederationSchema, config: &'a FederationConfig) -> Self {
        Self { schema, config }
    }

    /// Validate a request and plan its execution.
    pub fn plan(&self, request: &Request) -> Result<ExecutionPlan, Error> {
        if request.search.is_some() {
            return Err(Error::UnsupportedSearch);
        }
        for condition in request.filters.iter().chain(&request.or_filters) {
            condition.validate()?;
        }

        let filters = FilterAnalyzer::new(request, &self.schema.relations);
        if let Some(relation) = filters.unresolved().first() {
            return Err(Error::UnknownRelation {
                relation: relation.clone(),
            });
        }
        if !filters.root_or_filters().is_empty() {
            return Err(Error::UnsupportedRootOr);
        }

        let sorts = SortAnalyzer::new(request, &filters)?;
        self.check_owner_constraints(&filters, &sorts)?;
        self.check_existence_uniqueness(&filters)?;

        let strategy = ExecutionStrategy::select(&filters, &sorts);
        self.check_chain_keys(&filters, &strategy)?;

        let hydrated = self.hydrated_relations(request, &filters, &strategy)?;
        let limit = request.limit.unwrap_or(self.config.default_limit).max(1);
        let offset = request.offset_for_limit(limit);

        Ok(ExecutionPlan {
            filters,
            sorts,
            strategy,
            hydrated,
            limit,
            offset,
        })
    }

    fn check_owner_constraints(
        &self,
        filters: &FilterAnalyzer,
        sorts: &SortAnalyzer,
    ) -> Result<(), Error> {
        let targeted = filters
            .constrained_relations()
            .into_iter()
            .chain(sorts.driving_relation());

        for id in targeted {
            let decl = filters.relation(id);
            if decl.owner {
                return Err(Error::OwnerRelationConstraint {
                    relation: decl.property.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_existence_uniqueness(&self, filters: &FilterAnalyzer) -> Result<(), Error> {
        for id in filters.existence_relations() {
            let decl = filters.relation(*id);
            if decl.is_many() && !decl.has_distinct_filter() {
                return Err(Error::MissingDistinctFilter {
                    relation: decl.property.clone(),
                    field: decl.foreign_key.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_chain_keys(
        &self,
        filters: &FilterAnalyzer,
        strategy: &ExecutionStrategy,
    ) -> Result<(), Error> {
        let Some(driving) = strategy.driving_relation() else {
            return Ok(());
        };
        let expected = filters.relation(driving).root_key_field();

        for id in strategy.chain() {
            let decl = filters.relation(*id);
            if decl.root_key_field() != expected {
                return Err(Error::MismatchedJoinKey {
                    relation: decl.property.clone(),
                    expected: expected.to_string(),
                    actual: decl.root_key_field().to_string(),
                });
            }
        }
        Ok(())
    }

    fn hydrated_relations(
        &self,
        request: &Request,
        filters: &FilterAnalyzer,
        strategy: &ExecutionStrategy,
    ) -> Result<Vec<RelationId>, Error> {
        let declared = filters.relations().len();
        if request.relations.is_empty() {
            return Ok((0..declared).map(RelationId).collect());
        }

        let mut selected = vec![false; declared];
        for property in &request.relations {
            let id = filters.resolve(property).ok_or_else(|| Error::UnknownRelation {
                relation: property.clone(),
            })?;
            selected[id.index()] = true;
        }
        for id in strategy.chain() {
            selected[id.index()] = true;
        }

        Ok((0..declared)
            .filter(|i| selected[*i])
            .map(RelationId)
            .collect())
    }
}
