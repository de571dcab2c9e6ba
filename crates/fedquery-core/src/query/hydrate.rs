//! Attaching fetched relation records onto root records.
//!
//! Hydration is a hash join:
//! 1. Build phase: group relation rows by their join key, dropping
//!    duplicate rows within a group
//! 2. Probe phase: look up each root's join key and attach the group
//!
//! Complexity: O(N + M) where N = root count, M = relation row count

use std::collections::{HashMap, HashSet};

use fedquery_proto::{Entity, JoinKey};
use serde_json::Value as JsonValue;

use crate::catalog::RelationDecl;

/// Distinct join keys of `field` across records, in first-occurrence order.
///
/// Records whose field is missing or null contribute nothing.
pub fn collect_keys<'a>(records: impl IntoIterator<Item = &'a Entity>, field: &str) -> Vec<JoinKey> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter_map(|record| record.join_key(field))
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Relation rows grouped by join key.
#[derive(Debug, Default)]
pub struct RelationIndex {
    groups: HashMap<JoinKey, Vec<Entity>>,
}

impl RelationIndex {
    /// Group rows by the relation-side join field of `decl`.
    pub fn build(decl: &RelationDecl, rows: impl IntoIterator<Item = Entity>) -> Self {
        let field = decl.relation_key_field();
        let mut groups: HashMap<JoinKey, Vec<Entity>> = HashMap::new();
        let mut seen: HashMap<JoinKey, HashSet<String>> = HashMap::new();

        for row in rows {
            let Some(key) = row.join_key(field) else {
                continue;
            };
            if !seen.entry(key.clone()).or_default().insert(row.fingerprint()) {
                continue;
            }
            groups.entry(key).or_default().push(row);
        }

        Self { groups }
    }

    /// Rows grouped under a key.
    pub fn get(&self, key: &JoinKey) -> &[Entity] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if no rows were indexed.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Attach a relation to every root.
///
/// One-cardinality relations get the first matching row or `null`;
/// many-cardinality relations get an array, empty when nothing matched.
pub fn attach(roots: &mut [Entity], decl: &RelationDecl, index: &RelationIndex) {
    let root_field = decl.root_key_field();

    for root in roots.iter_mut() {
        let matched = root
            .join_key(root_field)
            .map(|key| index.get(&key))
            .unwrap_or(&[]);

        let value = if decl.is_many() {
            JsonValue::Array(matched.iter().cloned().map(Entity::into_json).collect())
        } else {
            matched
                .first()
                .cloned()
                .map(Entity::into_json)
                .unwrap_or(JsonValue::Null)
        };
        root.set(decl.property.clone(), value);
    }
}

/// Attach the relation's empty value to every root.
pub fn attach_empty(roots: &mut [Entity], decl: &RelationDecl) {
    for root in roots.iter_mut() {
        root.set(decl.property.clone(), decl.empty_value());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roots() -> Vec<Entity> {
        (1..=3)
            .map(|i| Entity::new().with("id", i).with("team_id", i % 2))
            .collect()
    }

    fn post(id: i64, author: i64) -> Entity {
        Entity::new().with("id", id).with("author_id", author)
    }

    #[test]
    fn test_collect_keys_preserves_first_occurrence() {
        let rows = vec![post(1, 3), post(2, 1), post(3, 3), post(4, 2)];
        let keys = collect_keys(&rows, "author_id");
        assert_eq!(keys, vec![JoinKey::Int(3), JoinKey::Int(1), JoinKey::Int(2)]);

        let with_null = vec![Entity::new().with("author_id", JsonValue::Null)];
        assert!(collect_keys(&with_null, "author_id").is_empty());
    }

    #[test]
    fn test_attach_many_forward() {
        let decl = RelationDecl::has_many("posts", "posts", "id", "author_id");
        let index = RelationIndex::build(&decl, vec![post(10, 1), post(11, 2), post(12, 2)]);
        let mut roots = roots();
        attach(&mut roots, &decl, &index);

        assert_eq!(roots[0].get("posts").unwrap().as_array().unwrap().len(), 1);
        assert_eq!(roots[1].get("posts").unwrap().as_array().unwrap().len(), 2);
        assert_eq!(roots[2].get("posts"), Some(&json!([])));
    }

    #[test]
    fn test_attach_deduplicates_rows() {
        let decl = RelationDecl::has_many("posts", "posts", "id", "author_id");
        let index = RelationIndex::build(&decl, vec![post(10, 1), post(10, 1), post(11, 1)]);
        assert_eq!(index.get(&JoinKey::Int(1)).len(), 2);
    }

    #[test]
    fn test_attach_one_owner() {
        let decl = RelationDecl::belongs_to("team", "teams", "id", "team_id");
        let teams = vec![Entity::new().with("id", 1).with("name", "odd")];
        let index = RelationIndex::build(&decl, teams);
        let mut roots = roots();
        attach(&mut roots, &decl, &index);

        assert_eq!(roots[0].get("team").unwrap()["name"], json!("odd"));
        assert_eq!(roots[1].get("team"), Some(&JsonValue::Null));
        assert_eq!(roots[2].get("team").unwrap()["name"], json!("odd"));
    }

    #[test]
    fn test_attach_empty() {
        let decl = RelationDecl::has_one("profile", "profiles", "id", "user_id");
        let mut roots = roots();
        attach_empty(&mut roots, &decl);
        assert!(roots.iter().all(|r| r.get("profile") == Some(&JsonValue::Null)));
    }
}
