//! Federation orchestrator: the `get_many` / `get_one` entry points.
//!
//! The orchestrator owns no state across calls. Each call plans the request,
//! sequences the root and relation fetches the plan calls for, and hydrates
//! the resulting roots.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use fedquery_proto::{Entity, JoinKey, PaginatedResponse, Request, SortKey, Value};
use futures::future::try_join_all;
use tracing::{debug, info, instrument};

use super::buffer::BufferStrategy;
use super::filter::FilterEvaluator;
use super::filter_analyzer::{FilterAnalyzer, RelationId};
use super::hydrate::{attach, attach_empty, collect_keys, RelationIndex};
use super::planner::{ExecutionPlan, FederationPlanner, PlanDescription};
use crate::catalog::FederationSchema;
use crate::config::{FederationConfig, UNCONSTRAINED_TOTAL};
use crate::error::{Error, ProviderError};
use crate::provider::CollectionProvider;
use crate::registry::{RelationBinding, RelationRegistry};

/// Federated view over a root collection and its relations.
pub struct Federation {
    schema: FederationSchema,
    root: Arc<dyn CollectionProvider>,
    bindings: Vec<RelationBinding>,
    config: FederationConfig,
}

/// Per-call state of relation-first discovery.
#[derive(Debug, Default)]
struct Discovery {
    /// Discovered root keys, in first-occurrence order.
    keys: Vec<JoinKey>,
    seen: HashSet<JoinKey>,
    /// Driving relation returned a short page.
    exhausted: bool,
    /// Total last reported by the driving relation.
    reported_total: Option<u64>,
    iterations: usize,
    /// Record the first driving row per key for tie-breaking.
    track_ranks: bool,
    ranks: HashMap<JoinKey, Entity>,
}

impl Discovery {
    fn extend(&mut self, keys: impl IntoIterator<Item = JoinKey>) {
        for key in keys {
            if self.seen.insert(key.clone()) {
                self.keys.push(key);
            }
        }
    }

    /// Relation-side bound on the number of matching roots.
    fn relation_total(&self) -> u64 {
        if self.exhausted {
            return self.keys.len() as u64;
        }
        self.reported_total.unwrap_or(self.keys.len() as u64)
    }
}

/// Order runs of roots whose driving rows compare equal by the root sorts.
///
/// Runs are contiguous in discovery order, so relation ordering is kept.
fn break_ties(
    roots: &mut [(JoinKey, Entity)],
    ranks: &HashMap<JoinKey, Entity>,
    relation_sorts: &[SortKey],
    root_sorts: &[SortKey],
) {
    let tied = |a: &JoinKey, b: &JoinKey| match (ranks.get(a), ranks.get(b)) {
        (Some(a), Some(b)) => FilterEvaluator::compare_entities(a, b, relation_sorts).is_eq(),
        _ => false,
    };

    let mut start = 0;
    while start < roots.len() {
        let mut end = start + 1;
        while end < roots.len() && tied(&roots[start].0, &roots[end].0) {
            end += 1;
        }
        roots[start..end]
            .sort_by(|a, b| FilterEvaluator::compare_entities(&a.1, &b.1, root_sorts));
        start = end;
    }
}

/// One relation fetch issued during hydration.
struct HydrationFetch<'a> {
    id: RelationId,
    binding: &'a RelationBinding,
    request: Request,
}

impl Federation {
    /// Create a federation over a root provider and the relation providers
    /// found in `registry`.
    ///
    /// Fails if the schema is invalid or a declared relation has no provider.
    pub fn new(
        schema: FederationSchema,
        root: Arc<dyn CollectionProvider>,
        registry: &RelationRegistry,
        config: FederationConfig,
    ) -> Result<Self, Error> {
        schema.validate()?;
        let bindings = registry.resolve(&schema.relations)?;
        Ok(Self {
            schema,
            root,
            bindings,
            config,
        })
    }

    /// Schema this federation serves.
    pub fn schema(&self) -> &FederationSchema {
        &self.schema
    }

    /// Active configuration.
    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// Validate and plan a request without calling any provider.
    pub fn plan(&self, request: &Request) -> Result<ExecutionPlan, Error> {
        FederationPlanner::new(&self.schema, &self.config).plan(request)
    }

    /// Describe how a request would be executed.
    pub fn explain(&self, request: &Request) -> Result<PlanDescription, Error> {
        Ok(self.plan(request)?.describe())
    }

    /// Fetch one page of roots with their relations attached.
    #[instrument(skip(self, request), fields(root = %self.schema.root.entity))]
    pub async fn get_many(&self, request: &Request) -> Result<PaginatedResponse, Error> {
        let plan = self.plan(request)?;
        debug!(
            strategy = ?plan.strategy.kind(),
            driving = plan.strategy.driving_relation().map(|id| plan.property(id)),
            limit = plan.limit,
            offset = plan.offset,
            "planned federated request"
        );

        let response = if plan.strategy.is_relation_first() {
            self.relation_first(&plan).await?
        } else {
            self.root_first(&plan).await?
        };

        info!(
            count = response.count,
            total = response.total,
            page = response.page,
            "federated request complete"
        );
        Ok(response)
    }

    /// Fetch a single root with every requested relation attached.
    ///
    /// A relation whose join key is null on the root is not fetched and
    /// hydrates to its empty value.
    #[instrument(skip(self, request), fields(root = %self.schema.root.entity))]
    pub async fn get_one(&self, request: &Request) -> Result<Entity, Error> {
        let plan = self.plan(request)?;

        let mut root_request = Request::new();
        plan.filters.apply_root_filters(&mut root_request);
        let root = self.root.get_one(&root_request).await?;

        let mut roots = vec![root];
        self.hydrate(&plan, &mut roots).await?;

        let Some(root) = roots.pop() else {
            return Err(ProviderError::NotFound {
                entity: self.schema.root.entity.clone(),
            }
            .into());
        };
        Ok(root)
    }

    /// Page the root, then fetch relations keyed by the page's keys.
    async fn root_first(&self, plan: &ExecutionPlan) -> Result<PaginatedResponse, Error> {
        let mut root_request = Request::new();
        plan.filters.apply_root_filters(&mut root_request);
        plan.sorts.apply_root_sorts(&mut root_request);
        root_request.limit = Some(plan.limit);
        root_request.offset = Some(plan.offset);

        let page = self.root.get_many(&root_request).await?;
        debug!(count = page.data.len(), total = page.total, "fetched root page");

        let mut roots = page.data;
        self.hydrate(plan, &mut roots).await?;

        Ok(PaginatedResponse::new(roots, page.total, plan.offset, plan.limit))
    }

    /// Discover root keys from the relations, then fetch, order and hydrate
    /// the roots.
    ///
    /// With a relation sort the page follows discovery order, and root sorts
    /// only order roots whose driving rows tie. Without one, every matching
    /// key is discovered first and the root provider orders and pages them.
    async fn relation_first(&self, plan: &ExecutionPlan) -> Result<PaginatedResponse, Error> {
        let Some(driving) = plan.strategy.driving_relation() else {
            return self.root_first(plan).await;
        };
        let root_key = self.bindings[driving.index()].decl.root_key_field();
        let root_sorts = plan.sorts.root_sorts();

        let mut buffer = BufferStrategy::new(plan.limit, self.config.max_offset);
        let mut discovery = Discovery {
            track_ranks: !root_sorts.is_empty() && plan.sorts.has_relation_sorts(),
            ..Discovery::default()
        };

        if !root_sorts.is_empty() && !plan.sorts.has_relation_sorts() {
            // only the offset cap bounds the scan
            self.discover_until(plan, &mut buffer, &mut discovery, usize::MAX, usize::MAX)
                .await?;
            return self.root_ordered(plan, root_key, &discovery).await;
        }

        let target = plan.offset.saturating_add(plan.limit);
        let target_len = usize::try_from(target).unwrap_or(usize::MAX);
        let budget = self.iteration_budget(target, buffer.batch_size());
        let mut found: HashMap<JoinKey, Entity> = HashMap::new();
        let mut fetched = 0;
        let mut wanted = target_len;

        loop {
            self.discover_until(plan, &mut buffer, &mut discovery, wanted, budget)
                .await?;

            if discovery.keys.is_empty() {
                debug!(
                    iterations = discovery.iterations,
                    "relation constraints matched no roots"
                );
                return Ok(PaginatedResponse::empty(plan.offset, plan.limit));
            }

            let pending = &discovery.keys[fetched..];
            if !pending.is_empty() {
                let mut root_request = Request::new();
                plan.filters.apply_root_filters(&mut root_request);
                plan.sorts.apply_root_sorts(&mut root_request);
                FilterAnalyzer::constrain(
                    &mut root_request,
                    root_key,
                    pending.iter().cloned().map(Value::from).collect(),
                );
                let page = self.root.get_many(&root_request).await?;
                for root in page.data {
                    if let Some(key) = root.join_key(root_key) {
                        found.entry(key).or_insert(root);
                    }
                }
                fetched = discovery.keys.len();
            }

            let can_continue = !discovery.exhausted
                && discovery.iterations < budget
                && !buffer.has_reached_limit();
            if found.len() >= target_len || !can_continue {
                break;
            }
            // root filters eliminated part of the discovered keys
            wanted = discovery.keys.len() + (target_len - found.len());
            debug!(
                survivors = found.len(),
                discovered = discovery.keys.len(),
                "resuming discovery"
            );
        }

        let mut ordered: Vec<(JoinKey, Entity)> = discovery
            .keys
            .iter()
            .filter_map(|key| found.remove(key).map(|root| (key.clone(), root)))
            .collect();
        if !root_sorts.is_empty() {
            break_ties(
                &mut ordered,
                &discovery.ranks,
                &plan.sorts.relation_sorts(),
                root_sorts,
            );
        }

        let offset = usize::try_from(plan.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(plan.limit).unwrap_or(usize::MAX);
        let mut roots: Vec<Entity> = ordered
            .into_iter()
            .map(|(_, root)| root)
            .skip(offset)
            .take(limit)
            .collect();

        let root_total = self.root_filter_total(plan).await?;
        let total = root_total.min(discovery.relation_total());
        debug!(
            iterations = discovery.iterations,
            discovered = discovery.keys.len(),
            root_total,
            relation_total = discovery.relation_total(),
            "discovery complete"
        );

        self.hydrate(plan, &mut roots).await?;
        Ok(PaginatedResponse::new(roots, total, plan.offset, plan.limit))
    }

    /// Page the discovered keys through the root provider using its sorts.
    async fn root_ordered(
        &self,
        plan: &ExecutionPlan,
        root_key: &str,
        discovery: &Discovery,
    ) -> Result<PaginatedResponse, Error> {
        if discovery.keys.is_empty() {
            debug!(
                iterations = discovery.iterations,
                "relation constraints matched no roots"
            );
            return Ok(PaginatedResponse::empty(plan.offset, plan.limit));
        }

        let mut root_request = Request::new();
        plan.filters.apply_root_filters(&mut root_request);
        plan.sorts.apply_root_sorts(&mut root_request);
        FilterAnalyzer::constrain(
            &mut root_request,
            root_key,
            discovery.keys.iter().cloned().map(Value::from).collect(),
        );
        root_request.limit = Some(plan.limit);
        root_request.offset = Some(plan.offset);

        let page = self.root.get_many(&root_request).await?;
        let total = if discovery.exhausted {
            page.total
        } else {
            self.root_filter_total(plan)
                .await?
                .min(discovery.relation_total())
                .max(page.total)
        };
        debug!(
            iterations = discovery.iterations,
            discovered = discovery.keys.len(),
            count = page.data.len(),
            total,
            "root-ordered discovery complete"
        );

        let mut roots = page.data;
        self.hydrate(plan, &mut roots).await?;
        Ok(PaginatedResponse::new(roots, total, plan.offset, plan.limit))
    }

    /// Read windows until `wanted` keys are known or discovery is capped.
    async fn discover_until(
        &self,
        plan: &ExecutionPlan,
        buffer: &mut BufferStrategy,
        discovery: &mut Discovery,
        wanted: usize,
        budget: usize,
    ) -> Result<(), Error> {
        while discovery.keys.len() < wanted
            && !discovery.exhausted
            && discovery.iterations < budget
            && !buffer.has_reached_limit()
        {
            self.discover(plan, buffer, discovery).await?;
        }
        Ok(())
    }

    /// Windows needed to reach `target` rows, plus the configured
    /// `max_iterations` for windows lost to duplicate or filtered keys.
    fn iteration_budget(&self, target: u64, batch_size: u64) -> usize {
        let windows = target.div_ceil(batch_size.max(1));
        usize::try_from(windows)
            .unwrap_or(usize::MAX)
            .saturating_add(self.config.max_iterations)
    }

    /// Run one discovery iteration along the constraint chain.
    async fn discover(
        &self,
        plan: &ExecutionPlan,
        buffer: &mut BufferStrategy,
        discovery: &mut Discovery,
    ) -> Result<(), Error> {
        let chain = plan.strategy.chain();
        let Some((&driving, rest)) = chain.split_first() else {
            discovery.exhausted = true;
            return Ok(());
        };
        let binding = &self.bindings[driving.index()];

        let window = buffer.advance();
        discovery.iterations += 1;

        let mut request = Request::new();
        plan.filters.apply_relation_filters(driving, &mut request, true);
        request.sorts = plan.sorts.relation_sorts();
        request.limit = Some(window.limit);
        request.offset = Some(window.offset);

        let page = binding.provider.get_many(&request).await?;
        if (page.data.len() as u64) < window.limit {
            discovery.exhausted = true;
        }
        discovery.reported_total = Some(page.total);

        let field = binding.decl.relation_key_field();
        if discovery.track_ranks {
            for row in &page.data {
                if let Some(key) = row.join_key(field) {
                    discovery.ranks.entry(key).or_insert_with(|| row.clone());
                }
            }
        }
        let mut keys = collect_keys(&page.data, field);
        debug!(
            relation = binding.property(),
            offset = window.offset,
            rows = page.data.len(),
            keys = keys.len(),
            "fetched driving relation window"
        );

        for &next in rest {
            if keys.is_empty() {
                break;
            }
            let link = &self.bindings[next.index()];
            let field = link.decl.relation_key_field();

            let mut request = Request::new();
            plan.filters.apply_relation_filters(next, &mut request, true);
            FilterAnalyzer::constrain(
                &mut request,
                field,
                keys.iter().cloned().map(Value::from).collect(),
            );
            let rows = link.provider.get_many(&request).await?.data;

            let survivors: HashSet<JoinKey> = collect_keys(&rows, field).into_iter().collect();
            keys.retain(|key| survivors.contains(key));
            debug!(
                relation = link.property(),
                survivors = keys.len(),
                "applied chained relation constraint"
            );
        }

        discovery.extend(keys);
        Ok(())
    }

    /// Root-side bound on the number of matching roots.
    async fn root_filter_total(&self, plan: &ExecutionPlan) -> Result<u64, Error> {
        if !plan.filters.has_root_filters() {
            return Ok(UNCONSTRAINED_TOTAL);
        }
        let mut request = Request::new();
        plan.filters.apply_root_filters(&mut request);
        request.limit = Some(1);
        Ok(self.root.get_many(&request).await?.total)
    }

    /// Fetch complete relation data for the given roots and attach it.
    async fn hydrate(&self, plan: &ExecutionPlan, roots: &mut [Entity]) -> Result<(), Error> {
        let mut fetches = Vec::with_capacity(plan.hydrated.len());

        for &id in &plan.hydrated {
            let binding = &self.bindings[id.index()];
            let keys = collect_keys(roots.iter(), binding.decl.root_key_field());
            if keys.is_empty() {
                attach_empty(roots, &binding.decl);
                continue;
            }

            let mut request = Request::new();
            plan.filters.apply_relation_filters(id, &mut request, false);
            FilterAnalyzer::constrain(
                &mut request,
                binding.decl.relation_key_field(),
                keys.into_iter().map(Value::from).collect(),
            );
            fetches.push(HydrationFetch {
                id,
                binding,
                request,
            });
        }

        let pages = if self.config.concurrent_fan_out {
            try_join_all(
                fetches
                    .iter()
                    .map(|fetch| fetch.binding.provider.get_many(&fetch.request)),
            )
            .await?
        } else {
            let mut pages = Vec::with_capacity(fetches.len());
            for fetch in &fetches {
                pages.push(fetch.binding.provider.get_many(&fetch.request).await?);
            }
            pages
        };

        for (fetch, page) in fetches.iter().zip(pages) {
            debug!(
                relation = plan.property(fetch.id),
                rows = page.data.len(),
                "hydrating relation"
            );
            let index = RelationIndex::build(&fetch.binding.decl, page.data);
            attach(roots, &fetch.binding.decl, &index);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Federation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Federation")
            .field("schema", &self.schema)
            .field("bindings", &self.bindings)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
