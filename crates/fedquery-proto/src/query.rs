//! Request types for paginated collection queries.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::value::Value;

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Field equals value.
    #[serde(rename = "$eq")]
    Eq,
    /// Field not equals value.
    #[serde(rename = "$ne")]
    Ne,
    /// Field greater than value.
    #[serde(rename = "$gt")]
    Gt,
    /// Field less than value.
    #[serde(rename = "$lt")]
    Lt,
    /// Field greater than or equal to value.
    #[serde(rename = "$gte")]
    Gte,
    /// Field less than or equal to value.
    #[serde(rename = "$lte")]
    Lte,
    /// String field starts with value.
    #[serde(rename = "$starts")]
    Starts,
    /// String field ends with value.
    #[serde(rename = "$ends")]
    Ends,
    /// String field contains value.
    #[serde(rename = "$cont")]
    Cont,
    /// String field does not contain value.
    #[serde(rename = "$excl")]
    Excl,
    /// Field is in a list of values.
    #[serde(rename = "$in")]
    In,
    /// Field is not in a list of values.
    #[serde(rename = "$notin")]
    NotIn,
    /// Field is null.
    #[serde(rename = "$isnull")]
    IsNull,
    /// Field is not null.
    #[serde(rename = "$notnull")]
    NotNull,
    /// Field lies within an inclusive `[low, high]` range.
    #[serde(rename = "$between")]
    Between,
}

impl Operator {
    /// Wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::Gt => "$gt",
            Operator::Lt => "$lt",
            Operator::Gte => "$gte",
            Operator::Lte => "$lte",
            Operator::Starts => "$starts",
            Operator::Ends => "$ends",
            Operator::Cont => "$cont",
            Operator::Excl => "$excl",
            Operator::In => "$in",
            Operator::NotIn => "$notin",
            Operator::IsNull => "$isnull",
            Operator::NotNull => "$notnull",
            Operator::Between => "$between",
        }
    }

    /// Whether the operator ignores its operand.
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::NotNull)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `field operator value` condition.
///
/// `relation` unset means the condition applies to the root collection;
/// set, it names the relation property whose own query it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// Field the condition tests.
    pub field: String,
    /// Comparison operator.
    pub operator: Operator,
    /// Operand (ignored by unary operators).
    #[serde(default = "null_value")]
    pub value: Value,
    /// Relation property this condition is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
}

fn null_value() -> Value {
    Value::Null
}

impl FilterCondition {
    /// Create a condition with an explicit operator.
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            relation: None,
        }
    }

    /// Create an equality condition.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    /// Create a not-equal condition.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Ne, value)
    }

    /// Create a greater-than condition.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Gt, value)
    }

    /// Create a less-than condition.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Lt, value)
    }

    /// Create an `$in` condition.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, Operator::In, Value::List(values))
    }

    /// Create an `$isnull` condition.
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::IsNull, Value::Null)
    }

    /// Create a `$notnull` condition.
    pub fn not_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::NotNull, Value::Null)
    }

    /// Scope this condition to a relation property.
    pub fn on(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// The same condition with its relation tag removed.
    pub fn unscoped(&self) -> Self {
        Self {
            relation: None,
            ..self.clone()
        }
    }

    /// Check that the operand shape matches the operator.
    pub fn validate(&self) -> Result<(), Error> {
        match self.operator {
            Operator::In | Operator::NotIn if !self.value.is_list() => {
                Err(Error::InvalidOperand {
                    operator: self.operator.as_str(),
                    reason: format!("field '{}' expects a list", self.field),
                })
            }
            Operator::Between => match &self.value {
                Value::List(range) if range.len() == 2 => Ok(()),
                _ => Err(Error::InvalidOperand {
                    operator: self.operator.as_str(),
                    reason: format!("field '{}' expects [low, high]", self.field),
                }),
            },
            Operator::Starts | Operator::Ends | Operator::Cont | Operator::Excl
                if self.value.as_str().is_none() =>
            {
                Err(Error::InvalidOperand {
                    operator: self.operator.as_str(),
                    reason: format!("field '{}' expects a string", self.field),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// A sort key, tagged with a relation the same way filters are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    /// Field to order by.
    pub field: String,
    /// Sort direction.
    #[serde(default)]
    pub order: SortOrder,
    /// Relation property whose field drives this ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
}

impl SortKey {
    /// Create an ascending sort key.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
            relation: None,
        }
    }

    /// Create a descending sort key.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
            relation: None,
        }
    }

    /// Scope this sort key to a relation property.
    pub fn on(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// The same sort key with its relation tag removed.
    pub fn unscoped(&self) -> Self {
        Self {
            relation: None,
            ..self.clone()
        }
    }
}

/// A boolean search tree over filter conditions.
///
/// Serialized as `{"$and": [...]}`, `{"$or": [...]}` and
/// `{"$cond": {"field": ..., "operator": ..., "value": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchExpr {
    /// All children must match. An empty list matches everything.
    #[serde(rename = "$and")]
    And(Vec<SearchExpr>),
    /// At least one child must match. An empty list matches nothing.
    #[serde(rename = "$or")]
    Or(Vec<SearchExpr>),
    /// A leaf condition.
    #[serde(rename = "$cond")]
    Condition(FilterCondition),
}

impl SearchExpr {
    /// Conjunction of conditions, collapsing a single condition to a leaf.
    pub fn all(conditions: &[FilterCondition]) -> Self {
        match conditions {
            [single] => SearchExpr::Condition(single.unscoped()),
            many => SearchExpr::And(
                many.iter()
                    .map(|c| SearchExpr::Condition(c.unscoped()))
                    .collect(),
            ),
        }
    }

    /// Check whether this tree places no constraint at all.
    pub fn is_trivial(&self) -> bool {
        matches!(self, SearchExpr::And(children) if children.iter().all(SearchExpr::is_trivial))
    }
}

/// A paginated collection request.
///
/// The same shape is accepted by the federation layer and by every provider.
/// Federation never mutates a caller's request; it clones and narrows it
/// before forwarding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    /// Conditions combined with AND.
    pub filters: Vec<FilterCondition>,
    /// Conditions combined with OR.
    pub or_filters: Vec<FilterCondition>,
    /// Sort keys in priority order.
    pub sorts: Vec<SortKey>,
    /// One-based page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    /// Number of records to skip. Takes precedence over `page`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Maximum number of records to return. `None` means unpaginated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Relation properties to hydrate. Empty means all declared relations.
    pub relations: Vec<String>,
    /// Raw search expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchExpr>,
}

impl Request {
    /// Create an empty, unpaginated request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an AND condition.
    pub fn filter(mut self, condition: FilterCondition) -> Self {
        self.filters.push(condition);
        self
    }

    /// Add an OR condition.
    pub fn or_filter(mut self, condition: FilterCondition) -> Self {
        self.or_filters.push(condition);
        self
    }

    /// Add a sort key.
    pub fn sort(mut self, key: SortKey) -> Self {
        self.sorts.push(key);
        self
    }

    /// Request a relation to be hydrated.
    pub fn join(mut self, relation: impl Into<String>) -> Self {
        self.relations.push(relation.into());
        self
    }

    /// Set the page size.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the number of records to skip.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the one-based page number.
    pub fn with_page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    /// Set a raw search expression.
    pub fn with_search(mut self, search: SearchExpr) -> Self {
        self.search = Some(search);
        self
    }

    /// Offset implied by `offset`, or by `page` and `limit`.
    pub fn resolved_offset(&self) -> u64 {
        match self.limit {
            Some(limit) => self.offset_for_limit(limit),
            None => self.offset.unwrap_or(0),
        }
    }

    /// Offset implied by `offset`, or by `page` at the given page size.
    pub fn offset_for_limit(&self, limit: u64) -> u64 {
        match (self.offset, self.page) {
            (Some(offset), _) => offset,
            (None, Some(page)) => page.saturating_sub(1).saturating_mul(limit),
            (None, None) => 0,
        }
    }

    /// Build the search tree a provider should evaluate.
    ///
    /// AND conditions alone form a conjunction. When OR conditions are also
    /// present the result is `$or[$and(filters), $and(or_filters)]`, a lone
    /// OR list becomes a plain disjunction, and a raw `search` is AND-ed
    /// onto whatever the lists produce.
    pub fn search_expression(&self) -> SearchExpr {
        let lists = match (self.filters.is_empty(), self.or_filters.is_empty()) {
            (true, true) => SearchExpr::And(vec![]),
            (false, true) => SearchExpr::all(&self.filters),
            (true, false) => SearchExpr::Or(
                self.or_filters
                    .iter()
                    .map(|c| SearchExpr::Condition(c.unscoped()))
                    .collect(),
            ),
            (false, false) => SearchExpr::Or(vec![
                SearchExpr::all(&self.filters),
                SearchExpr::all(&self.or_filters),
            ]),
        };

        match &self.search {
            Some(search) if lists.is_trivial() => search.clone(),
            Some(search) => SearchExpr::And(vec![lists, search.clone()]),
            None => lists,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = Request::new()
            .filter(FilterCondition::eq("status", "active"))
            .filter(FilterCondition::gt("score", 10).on("reviews"))
            .sort(SortKey::desc("created_at"))
            .join("reviews")
            .with_limit(20)
            .with_page(3);

        assert_eq!(request.filters.len(), 2);
        assert_eq!(request.filters[1].relation.as_deref(), Some("reviews"));
        assert_eq!(request.resolved_offset(), 40);
    }

    #[test]
    fn test_offset_wins_over_page() {
        let request = Request::new().with_limit(10).with_page(5).with_offset(3);
        assert_eq!(request.resolved_offset(), 3);
        assert_eq!(Request::new().with_page(2).resolved_offset(), 0);
    }

    #[test]
    fn test_search_expression_shapes() {
        let and_only = Request::new()
            .filter(FilterCondition::eq("a", 1))
            .filter(FilterCondition::eq("b", 2));
        assert!(matches!(and_only.search_expression(), SearchExpr::And(ref c) if c.len() == 2));

        let single = Request::new().filter(FilterCondition::eq("a", 1));
        assert!(matches!(single.search_expression(), SearchExpr::Condition(_)));

        let mixed = Request::new()
            .filter(FilterCondition::eq("a", 1))
            .or_filter(FilterCondition::eq("b", 2));
        match mixed.search_expression() {
            SearchExpr::Or(groups) => assert_eq!(groups.len(), 2),
            other => panic!("expected $or, got {other:?}"),
        }

        assert!(Request::new().search_expression().is_trivial());
    }

    #[test]
    fn test_search_expression_strips_relation_tags() {
        let request = Request::new().filter(FilterCondition::eq("a", 1).on("posts"));
        match request.search_expression() {
            SearchExpr::Condition(c) => assert!(c.relation.is_none()),
            other => panic!("expected leaf, got {other:?}"),
        }
    }

    #[test]
    fn test_condition_validation() {
        assert!(FilterCondition::in_values("id", vec![1.into()]).validate().is_ok());
        assert!(FilterCondition::new("id", Operator::In, 1).validate().is_err());
        assert!(FilterCondition::new("age", Operator::Between, vec![1, 5]).validate().is_ok());
        assert!(FilterCondition::new("age", Operator::Between, vec![1]).validate().is_err());
        assert!(FilterCondition::new("name", Operator::Cont, 3).validate().is_err());
        assert!(FilterCondition::not_null("x").validate().is_ok());
    }

    #[test]
    fn test_request_from_json() {
        let request: Request = serde_json::from_value(json!({
            "filters": [
                {"field": "status", "operator": "$eq", "value": "active", "relation": "orders"},
                {"field": "deleted_at", "operator": "$isnull"}
            ],
            "sorts": [{"field": "total", "order": "DESC", "relation": "orders"}],
            "limit": 10
        }))
        .unwrap();

        assert_eq!(request.filters.len(), 2);
        assert_eq!(request.filters[1].value, Value::Null);
        assert_eq!(request.sorts[0].order, SortOrder::Desc);
        assert_eq!(request.limit, Some(10));
        assert!(request.search.is_none());
    }
}
