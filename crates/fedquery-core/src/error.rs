//! Core error types.

use thiserror::Error;

/// Failure reported by a collection provider.
///
/// Federation never inspects or rewraps these; they reach the caller as-is.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested record does not exist.
    #[error("{entity} not found")]
    NotFound { entity: String },

    /// The provider could not serve the request.
    #[error("provider failure: {0}")]
    Failed(String),

    /// Any other provider-side error.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Federation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A many-cardinality relation drives ordering or existence without a
    /// distinct filter.
    #[error(
        "relation '{relation}' is one-to-many and used by '{field}' but declares no distinct filter"
    )]
    MissingDistinctFilter { relation: String, field: String },

    /// A sort or filter targets a relation whose foreign key lives on the root.
    #[error(
        "relation '{relation}' is an owner relation; sorting or filtering on it cannot constrain root ids"
    )]
    OwnerRelationConstraint { relation: String },

    /// No provider is registered for a declared relation.
    #[error("no provider '{provider}' registered for relation '{relation}'")]
    MissingProvider { relation: String, provider: String },

    /// The root collection declares no primary key.
    #[error("root entity '{entity}' declares no primary key")]
    MissingRootKey { entity: String },

    /// A request or schema refers to an undeclared relation.
    #[error("unknown relation '{relation}'")]
    UnknownRelation { relation: String },

    /// Two relations share the same property name.
    #[error("relation '{relation}' is declared more than once")]
    DuplicateRelation { relation: String },

    /// A constraint-chain relation references a different root key than the
    /// driving relation.
    #[error("relation '{relation}' joins on root field '{actual}', expected '{expected}'")]
    MismatchedJoinKey {
        relation: String,
        expected: String,
        actual: String,
    },

    /// Raw search expressions are not federated.
    #[error("raw search expressions are not supported; use structured filters")]
    UnsupportedSearch,

    /// OR conditions on the root scope are not federated.
    #[error("OR conditions on the root collection are not supported; only AND is federated")]
    UnsupportedRootOr,

    /// Sort keys target more than one relation.
    #[error("sorting by more than one relation is not supported ('{first}' and '{second}')")]
    MultipleSortRelations { first: String, second: String },

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] fedquery_proto::Error),

    /// Provider error.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl Error {
    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingDistinctFilter { .. }
                | Error::OwnerRelationConstraint { .. }
                | Error::MissingProvider { .. }
                | Error::MissingRootKey { .. }
                | Error::UnknownRelation { .. }
                | Error::DuplicateRelation { .. }
                | Error::MismatchedJoinKey { .. }
        )
    }

    /// Check if the request uses a feature federation does not support.
    pub fn is_unsupported_query(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedSearch
                | Error::UnsupportedRootOr
                | Error::MultipleSortRelations { .. }
                | Error::Protocol(_)
        )
    }

    /// Check if the error came from a provider call.
    pub fn is_provider(&self) -> bool {
        matches!(self, Error::Provider(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = Error::MissingDistinctFilter {
            relation: "posts".into(),
            field: "created_at".into(),
        };
        assert!(err.is_configuration());
        assert!(err.to_string().contains("posts"));
        assert!(err.to_string().contains("created_at"));

        assert!(Error::UnsupportedRootOr.is_unsupported_query());

        let err: Error = ProviderError::Failed("timeout".into()).into();
        assert!(err.is_provider());
        assert_eq!(err.to_string(), "provider failure: timeout");
    }
}
