//! In-memory collection provider.

use async_trait::async_trait;
use fedquery_proto::{Entity, PaginatedResponse, Request};
use parking_lot::{Mutex, RwLock};

use super::CollectionProvider;
use crate::error::ProviderError;
use crate::query::FilterEvaluator;

/// A collection held in memory.
///
/// Serves the full request contract (search tree, multi-key sort,
/// offset/page pagination) and records every request it answers so callers
/// can inspect how federation talked to it.
pub struct MemoryProvider {
    entity: String,
    rows: RwLock<Vec<Entity>>,
    served: Mutex<Vec<Request>>,
}

impl MemoryProvider {
    /// Create a provider over the given records.
    pub fn new(entity: impl Into<String>, rows: Vec<Entity>) -> Self {
        Self {
            entity: entity.into(),
            rows: RwLock::new(rows),
            served: Mutex::new(Vec::new()),
        }
    }

    /// Create an empty provider.
    pub fn empty(entity: impl Into<String>) -> Self {
        Self::new(entity, vec![])
    }

    /// Entity name used in not-found errors.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Append a record.
    pub fn insert(&self, row: Entity) {
        self.rows.write().push(row);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Check if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Requests answered so far, oldest first.
    pub fn served_requests(&self) -> Vec<Request> {
        self.served.lock().clone()
    }

    /// Number of requests answered so far.
    pub fn call_count(&self) -> usize {
        self.served.lock().len()
    }

    /// Forget recorded requests.
    pub fn reset_log(&self) {
        self.served.lock().clear();
    }

    fn select(&self, request: &Request) -> Vec<Entity> {
        self.served.lock().push(request.clone());

        let search = request.search_expression();
        let mut matched: Vec<Entity> = self
            .rows
            .read()
            .iter()
            .filter(|row| FilterEvaluator::evaluate(&search, row))
            .cloned()
            .collect();

        if !request.sorts.is_empty() {
            matched.sort_by(|a, b| FilterEvaluator::compare_entities(a, b, &request.sorts));
        }
        matched
    }
}

#[async_trait]
impl CollectionProvider for MemoryProvider {
    async fn get_many(&self, request: &Request) -> Result<PaginatedResponse, ProviderError> {
        let matched = self.select(request);
        let total = matched.len() as u64;
        let offset = request.resolved_offset();
        let limit = request.limit.unwrap_or(total);

        let page: Vec<Entity> = matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok(PaginatedResponse::new(page, total, offset, limit))
    }

    async fn get_one(&self, request: &Request) -> Result<Entity, ProviderError> {
        self.select(request)
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound {
                entity: self.entity.clone(),
            })
    }
}
