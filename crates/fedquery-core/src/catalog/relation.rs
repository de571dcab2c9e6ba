//! Relation declarations between the root collection and its relations.

use fedquery_proto::FilterCondition;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Cardinality of a relation as seen from one root record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// At most one related record; hydrated as an object or `null`.
    One,
    /// Any number of related records; hydrated as an array.
    Many,
}

/// Join semantics of a relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinType {
    /// Every root is returned whether or not related records exist.
    #[default]
    Left,
    /// Only roots with at least one related record are returned.
    Inner,
}

/// A relation declaration.
///
/// For a forward relation (`owner == false`) the relation row's
/// `foreign_key` references the root's `primary_key`. For an owner relation
/// the root's `foreign_key` references the relation's `primary_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDecl {
    /// Property the relation is hydrated into on each root.
    pub property: String,
    /// Relation cardinality.
    pub cardinality: Cardinality,
    /// Join semantics.
    #[serde(default)]
    pub join: JoinType,
    /// Whether the root holds the foreign key.
    #[serde(default)]
    pub owner: bool,
    /// Referenced key field.
    pub primary_key: String,
    /// Referencing key field.
    pub foreign_key: String,
    /// Conditions guaranteeing at most one relation row per root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distinct_filter: Vec<FilterCondition>,
    /// Registry name of the provider serving this relation.
    pub provider: String,
}

impl RelationDecl {
    /// Declare a forward one-to-one relation.
    pub fn has_one(
        property: impl Into<String>,
        provider: impl Into<String>,
        primary_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            cardinality: Cardinality::One,
            join: JoinType::Left,
            owner: false,
            primary_key: primary_key.into(),
            foreign_key: foreign_key.into(),
            distinct_filter: vec![],
            provider: provider.into(),
        }
    }

    /// Declare a forward one-to-many relation.
    pub fn has_many(
        property: impl Into<String>,
        provider: impl Into<String>,
        primary_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            cardinality: Cardinality::Many,
            ..Self::has_one(property, provider, primary_key, foreign_key)
        }
    }

    /// Declare an owner relation: the root's `foreign_key` references the
    /// relation's `primary_key`.
    pub fn belongs_to(
        property: impl Into<String>,
        provider: impl Into<String>,
        primary_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            owner: true,
            ..Self::has_one(property, provider, primary_key, foreign_key)
        }
    }

    /// Set the join type.
    pub fn with_join(mut self, join: JoinType) -> Self {
        self.join = join;
        self
    }

    /// Use INNER join semantics.
    pub fn inner(self) -> Self {
        self.with_join(JoinType::Inner)
    }

    /// Add a distinct-filter condition.
    pub fn with_distinct_filter(mut self, condition: FilterCondition) -> Self {
        self.distinct_filter.push(condition.unscoped());
        self
    }

    /// Check if this relation hydrates into an array.
    pub fn is_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }

    /// Check if this relation uses INNER join semantics.
    pub fn is_inner(&self) -> bool {
        self.join == JoinType::Inner
    }

    /// Check if a distinct filter is declared.
    pub fn has_distinct_filter(&self) -> bool {
        !self.distinct_filter.is_empty()
    }

    /// Field on the root record that takes part in the join.
    pub fn root_key_field(&self) -> &str {
        if self.owner {
            &self.foreign_key
        } else {
            &self.primary_key
        }
    }

    /// Field on the relation record that takes part in the join.
    pub fn relation_key_field(&self) -> &str {
        if self.owner {
            &self.primary_key
        } else {
            &self.foreign_key
        }
    }

    /// Value hydrated onto a root with no related records.
    pub fn empty_value(&self) -> JsonValue {
        match self.cardinality {
            Cardinality::One => JsonValue::Null,
            Cardinality::Many => JsonValue::Array(vec![]),
        }
    }
}
