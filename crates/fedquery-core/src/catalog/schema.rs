//! Federation schema: the root collection plus its relation declarations.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::relation::RelationDecl;
use crate::error::Error;

/// Declaration of the root collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootDecl {
    /// Entity name, used in logs and not-found errors.
    pub entity: String,
    /// Identity field of root records.
    pub primary_key: String,
}

impl RootDecl {
    /// Create a root declaration.
    pub fn new(entity: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            primary_key: primary_key.into(),
        }
    }
}

/// A root collection and the relations joined onto it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederationSchema {
    /// Root collection.
    pub root: RootDecl,
    /// Declared relations.
    #[serde(default)]
    pub relations: Vec<RelationDecl>,
}

impl FederationSchema {
    /// Create a schema with no relations.
    pub fn new(root: RootDecl) -> Self {
        Self {
            root,
            relations: vec![],
        }
    }

    /// Add a relation declaration.
    pub fn with_relation(mut self, relation: RelationDecl) -> Self {
        self.relations.push(relation);
        self
    }

    /// Look up a relation by property name.
    pub fn get_relation(&self, property: &str) -> Option<&RelationDecl> {
        self.relations.iter().find(|r| r.property == property)
    }

    /// Check the schema for declaration errors.
    pub fn validate(&self) -> Result<(), Error> {
        if self.root.primary_key.is_empty() {
            return Err(Error::MissingRootKey {
                entity: self.root.entity.clone(),
            });
        }

        let mut seen = HashSet::new();
        for relation in &self.relations {
            if !seen.insert(relation.property.as_str()) {
                return Err(Error::DuplicateRelation {
                    relation: relation.property.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_schema() -> FederationSchema {
        FederationSchema::new(RootDecl::new("User", "id"))
            .with_relation(RelationDecl::has_many("posts", "posts", "id", "author_id"))
            .with_relation(RelationDecl::belongs_to("team", "teams", "id", "team_id"))
    }

    #[test]
    fn test_valid_schema() {
        let schema = user_schema();
        assert!(schema.validate().is_ok());
        assert!(schema.get_relation("team").unwrap().owner);
        assert!(schema.get_relation("missing").is_none());
    }

    #[test]
    fn test_missing_root_key() {
        let schema = FederationSchema::new(RootDecl::new("User", ""));
        let err = schema.validate().unwrap_err();
        assert!(matches!(err, Error::MissingRootKey { ref entity } if entity == "User"));
    }

    #[test]
    fn test_duplicate_relation() {
        let schema =
            user_schema().with_relation(RelationDecl::has_one("posts", "other", "id", "user_id"));
        let err = schema.validate().unwrap_err();
        assert!(matches!(err, Error::DuplicateRelation { ref relation } if relation == "posts"));
    }
}
