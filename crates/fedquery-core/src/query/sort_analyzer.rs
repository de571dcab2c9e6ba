//! Classification of sort keys as root- or relation-driven.

use std::collections::HashSet;

use fedquery_proto::{Request, SortKey};

use super::filter_analyzer::{FilterAnalyzer, RelationId, Scope};
use crate::error::Error;

/// Partition of a request's sort keys.
#[derive(Debug, Clone, Default)]
pub struct SortAnalyzer {
    relation_sorts: Vec<(RelationId, SortKey)>,
    root_sorts: Vec<SortKey>,
}

impl SortAnalyzer {
    /// Classify every sort key of the request.
    ///
    /// A many-cardinality relation may only drive ordering when it declares
    /// a distinct filter; the check runs once per relation. All relation
    /// sorts must target the same relation.
    pub fn new(request: &Request, filters: &FilterAnalyzer) -> Result<Self, Error> {
        let mut analyzer = Self::default();
        let mut validated: HashSet<RelationId> = HashSet::new();

        for key in &request.sorts {
            let id = match filters.scope(key.relation.as_deref()) {
                Scope::Root => {
                    analyzer.root_sorts.push(key.clone());
                    continue;
                }
                Scope::Relation(id) => id,
                Scope::Unknown(relation) => return Err(Error::UnknownRelation { relation }),
            };

            if validated.insert(id) {
                let decl = filters.relation(id);
                if decl.is_many() && !decl.has_distinct_filter() {
                    return Err(Error::MissingDistinctFilter {
                        relation: decl.property.clone(),
                        field: key.field.clone(),
                    });
                }
            }

            if let Some((first, _)) = analyzer.relation_sorts.first() {
                if *first != id {
                    return Err(Error::MultipleSortRelations {
                        first: filters.relation(*first).property.clone(),
                        second: filters.relation(id).property.clone(),
                    });
                }
            }

            analyzer.relation_sorts.push((id, key.unscoped()));
        }

        Ok(analyzer)
    }

    /// Relation whose ordering drives this call, if any.
    pub fn driving_relation(&self) -> Option<RelationId> {
        self.relation_sorts.first().map(|(id, _)| *id)
    }

    /// Check whether any sort key targets a relation.
    pub fn has_relation_sorts(&self) -> bool {
        !self.relation_sorts.is_empty()
    }

    /// Relation sort keys in request order, tags stripped.
    pub fn relation_sorts(&self) -> Vec<SortKey> {
        self.relation_sorts.iter().map(|(_, key)| key.clone()).collect()
    }

    /// Sort keys applying to the root collection.
    pub fn root_sorts(&self) -> &[SortKey] {
        &self.root_sorts
    }

    /// Replace a request's sorts with the root scope's keys.
    pub fn apply_root_sorts(&self, request: &mut Request) {
        request.sorts = self.root_sorts.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RelationDecl;
    use fedquery_proto::{FilterCondition, SortOrder};

    fn relations() -> Vec<RelationDecl> {
        vec![
            RelationDecl::has_many("posts", "posts", "id", "author_id"),
            RelationDecl::has_many("orders", "orders", "id", "user_id")
                .with_distinct_filter(FilterCondition::eq("is_last", true)),
            RelationDecl::has_one("profile", "profiles", "id", "user_id"),
        ]
    }

    fn analyze(request: &Request) -> Result<SortAnalyzer, Error> {
        let filters = FilterAnalyzer::new(request, &relations());
        SortAnalyzer::new(request, &filters)
    }

    #[test]
    fn test_partitions_root_and_relation_sorts() {
        let request = Request::new()
            .sort(SortKey::asc("name"))
            .sort(SortKey::desc("total").on("orders"))
            .sort(SortKey::asc("placed_at").on("orders"));
        let sorts = analyze(&request).unwrap();

        assert_eq!(sorts.root_sorts().len(), 1);
        assert_eq!(sorts.driving_relation(), Some(RelationId(1)));
        let relation_sorts = sorts.relation_sorts();
        assert_eq!(relation_sorts.len(), 2);
        assert_eq!(relation_sorts[0].order, SortOrder::Desc);
        assert!(relation_sorts.iter().all(|k| k.relation.is_none()));

        let mut forwarded = request.clone();
        sorts.apply_root_sorts(&mut forwarded);
        assert_eq!(forwarded.sorts, vec![SortKey::asc("name")]);
    }

    #[test]
    fn test_many_relation_without_distinct_filter() {
        let request = Request::new().sort(SortKey::desc("created_at").on("posts"));
        let err = analyze(&request).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingDistinctFilter { ref relation, ref field }
                if relation == "posts" && field == "created_at"
        ));
    }

    #[test]
    fn test_one_relation_needs_no_distinct_filter() {
        let request = Request::new().sort(SortKey::asc("nickname").on("profile"));
        let sorts = analyze(&request).unwrap();
        assert_eq!(sorts.driving_relation(), Some(RelationId(2)));
        assert!(sorts.root_sorts().is_empty());
    }

    #[test]
    fn test_multiple_sort_relations_rejected() {
        let request = Request::new()
            .sort(SortKey::asc("nickname").on("profile"))
            .sort(SortKey::asc("total").on("orders"));
        let err = analyze(&request).unwrap_err();
        assert!(matches!(err, Error::MultipleSortRelations { .. }));
    }

    #[test]
    fn test_unknown_sort_relation() {
        let request = Request::new().sort(SortKey::asc("x").on("ghost"));
        assert!(matches!(
            analyze(&request).unwrap_err(),
            Error::UnknownRelation { ref relation } if relation == "ghost"
        ));
    }
}
