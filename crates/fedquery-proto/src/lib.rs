//! Fedquery protocol types.
//!
//! This crate defines the homogeneous collection contract that every root and
//! relation provider speaks. Federation is only possible because requests and
//! responses have the same shape on both sides of a join.
//!
//! # Modules
//!
//! - [`value`] - Filter operands and hashable join keys
//! - [`entity`] - Schemaless records returned by providers
//! - [`query`] - Filter conditions, sort keys, search trees and requests
//! - [`result`] - Paginated responses
//! - [`error`] - Protocol error types

pub mod entity;
pub mod error;
pub mod query;
pub mod result;
pub mod value;

pub use entity::Entity;
pub use error::Error;
pub use query::{FilterCondition, Operator, Request, SearchExpr, SortKey, SortOrder};
pub use result::{page_count, PaginatedResponse};
pub use value::{JoinKey, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let request = Request::new()
            .filter(FilterCondition::eq("status", "active").on("orders"))
            .or_filter(FilterCondition::in_values("tier", vec!["gold".into(), "silver".into()]))
            .sort(SortKey::asc("placed_at").on("orders"))
            .with_limit(10);

        let json = serde_json::to_string(&request).unwrap();
        let decoded: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(request, decoded);
    }
}
