//! The collection contract every root and relation source implements.

mod memory;

pub use memory::MemoryProvider;

use async_trait::async_trait;
use fedquery_proto::{Entity, PaginatedResponse, Request};

use crate::error::ProviderError;

/// A paginated collection reachable only through `get_many`/`get_one`.
///
/// Requests and responses have the same shape for root and relation
/// sources. Implementations receive a request cloned for them and must not
/// assume anything about how it was derived.
#[async_trait]
pub trait CollectionProvider: Send + Sync {
    /// Fetch one page of records matching the request.
    async fn get_many(&self, request: &Request) -> Result<PaginatedResponse, ProviderError>;

    /// Fetch the single record matching the request.
    ///
    /// Fails with [`ProviderError::NotFound`] when nothing matches.
    async fn get_one(&self, request: &Request) -> Result<Entity, ProviderError>;
}
