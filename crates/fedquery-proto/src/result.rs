//! Paginated response type returned by providers and by federation.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// One page of a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse {
    /// Records on this page.
    pub data: Vec<Entity>,
    /// Number of records on this page.
    pub count: u64,
    /// Number of records matching the request across all pages.
    pub total: u64,
    /// One-based page number.
    pub page: u64,
    /// Page size used.
    pub limit: u64,
    /// Number of pages, `ceil(total / limit)`.
    pub page_count: u64,
}

impl PaginatedResponse {
    /// Build a page from its records, the overall total and the window used.
    ///
    /// A zero `limit` is treated as one so the page arithmetic stays defined.
    pub fn new(data: Vec<Entity>, total: u64, offset: u64, limit: u64) -> Self {
        let limit = limit.max(1);
        Self {
            count: data.len() as u64,
            data,
            total,
            page: offset / limit + 1,
            limit,
            page_count: page_count(total, limit),
        }
    }

    /// An empty page.
    pub fn empty(offset: u64, limit: u64) -> Self {
        Self::new(vec![], 0, offset, limit)
    }

    /// Check if the page holds no records.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over the page's records.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.data.iter()
    }
}

/// Number of pages needed for `total` records at `limit` per page.
pub fn page_count(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_arithmetic() {
        let page = PaginatedResponse::new(vec![Entity::new(), Entity::new()], 7, 4, 2);
        assert_eq!(page.count, 2);
        assert_eq!(page.page, 3);
        assert_eq!(page.page_count, 4);
    }

    #[test]
    fn test_page_count_edges() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(u64::MAX, 1), u64::MAX);
        assert_eq!(page_count(5, 0), 0);
    }

    #[test]
    fn test_empty_page() {
        let page = PaginatedResponse::empty(0, 25);
        assert!(page.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_count, 0);
    }

    #[test]
    fn test_camel_case_serialization() {
        let page = PaginatedResponse::empty(0, 10);
        let json = serde_json::to_value(&page).unwrap();
        assert!(json.get("pageCount").is_some());
    }
}
