//! Registry mapping relation provider names to collection providers.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::catalog::RelationDecl;
use crate::error::Error;
use crate::provider::CollectionProvider;

/// A relation declaration bound to the provider that serves it.
#[derive(Clone)]
pub struct RelationBinding {
    /// The declaration.
    pub decl: RelationDecl,
    /// The provider serving the relation's records.
    pub provider: Arc<dyn CollectionProvider>,
}

impl RelationBinding {
    /// Relation property name.
    pub fn property(&self) -> &str {
        &self.decl.property
    }
}

impl fmt::Debug for RelationBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationBinding")
            .field("decl", &self.decl)
            .finish_non_exhaustive()
    }
}

/// Thread-safe map from provider name to provider.
#[derive(Default)]
pub struct RelationRegistry {
    providers: DashMap<String, Arc<dyn CollectionProvider>>,
}

impl RelationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under a name, replacing any previous one.
    pub fn register(&self, name: impl Into<String>, provider: Arc<dyn CollectionProvider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Register a provider, returning the registry for chaining.
    pub fn with_provider(
        self,
        name: impl Into<String>,
        provider: Arc<dyn CollectionProvider>,
    ) -> Self {
        self.register(name, provider);
        self
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn CollectionProvider>> {
        self.providers.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Check if a provider is registered under a name.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if no providers are registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Bind every declaration to its provider.
    ///
    /// Fails on the first declaration whose provider is not registered.
    pub fn resolve(&self, declarations: &[RelationDecl]) -> Result<Vec<RelationBinding>, Error> {
        declarations
            .iter()
            .map(|decl| {
                let provider = self.get(&decl.provider).ok_or_else(|| Error::MissingProvider {
                    relation: decl.property.clone(),
                    provider: decl.provider.clone(),
                })?;
                Ok(RelationBinding {
                    decl: decl.clone(),
                    provider,
                })
            })
            .collect()
    }
}
