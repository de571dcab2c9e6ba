//! Filter evaluation against entity records.
//!
//! Providers that hold their data in memory use `FilterEvaluator` to apply a
//! request's search tree. The federation engine itself never evaluates
//! filters; it only routes them.

use std::cmp::Ordering;

use fedquery_proto::{Entity, FilterCondition, Operator, SearchExpr, SortKey, SortOrder, Value};

/// Evaluates search expressions against entities.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Evaluate a search tree against a record.
    pub fn evaluate(expr: &SearchExpr, entity: &Entity) -> bool {
        match expr {
            SearchExpr::And(children) => children.iter().all(|c| Self::evaluate(c, entity)),
            SearchExpr::Or(children) => children.iter().any(|c| Self::evaluate(c, entity)),
            SearchExpr::Condition(condition) => Self::evaluate_condition(condition, entity),
        }
    }

    /// Evaluate a single condition against a record.
    pub fn evaluate_condition(condition: &FilterCondition, entity: &Entity) -> bool {
        let field_value = entity.value(&condition.field);
        let operand = &condition.value;

        match condition.operator {
            Operator::IsNull => field_value.is_null(),
            Operator::NotNull => !field_value.is_null(),
            // NULL never compares, only the null checks above see it
            _ if field_value.is_null() => matches!(
                condition.operator,
                Operator::Ne | Operator::NotIn | Operator::Excl
            ),
            Operator::Eq => Self::values_equal(&field_value, operand),
            Operator::Ne => !Self::values_equal(&field_value, operand),
            Operator::Gt => Self::ordering(&field_value, operand).is_some_and(Ordering::is_gt),
            Operator::Lt => Self::ordering(&field_value, operand).is_some_and(Ordering::is_lt),
            Operator::Gte => Self::ordering(&field_value, operand).is_some_and(Ordering::is_ge),
            Operator::Lte => Self::ordering(&field_value, operand).is_some_and(Ordering::is_le),
            Operator::Starts => Self::string_test(&field_value, operand, |s, p| s.starts_with(p)),
            Operator::Ends => Self::string_test(&field_value, operand, |s, p| s.ends_with(p)),
            Operator::Cont => Self::string_test(&field_value, operand, |s, p| s.contains(p)),
            Operator::Excl => !Self::string_test(&field_value, operand, |s, p| s.contains(p)),
            Operator::In => operand
                .as_slice()
                .iter()
                .any(|v| Self::values_equal(&field_value, v)),
            Operator::NotIn => !operand
                .as_slice()
                .iter()
                .any(|v| Self::values_equal(&field_value, v)),
            Operator::Between => match operand.as_slice() {
                [low, high] => {
                    Self::ordering(&field_value, low).is_some_and(Ordering::is_ge)
                        && Self::ordering(&field_value, high).is_some_and(Ordering::is_le)
                }
                _ => false,
            },
        }
    }

    /// Order two records by a list of sort keys.
    pub fn compare_entities(a: &Entity, b: &Entity, sorts: &[SortKey]) -> Ordering {
        for key in sorts {
            let cmp = Self::compare_values(&a.value(&key.field), &b.value(&key.field));
            let cmp = match key.order {
                SortOrder::Asc => cmp,
                SortOrder::Desc => cmp.reverse(),
            };
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    }

    /// Total order used for sorting: NULLs first, incompatible types equal.
    pub fn compare_values(a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            _ => Self::ordering(a, b).unwrap_or(Ordering::Equal),
        }
    }

    /// Check if two values are equal, treating integers and floats as numbers.
    fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Int(a), Value::Float(b)) => (*a as f64) == *b,
            (Value::Float(a), Value::Int(b)) => *a == (*b as f64),
            _ => a == b,
        }
    }

    /// Compare two values, returning their ordering if comparable.
    fn ordering(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn string_test(value: &Value, operand: &Value, test: fn(&str, &str) -> bool) -> bool {
        match (value.as_str(), operand.as_str()) {
            (Some(s), Some(p)) => test(s, p),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedquery_proto::Request;

    fn user() -> Entity {
        Entity::new()
            .with("id", 1)
            .with("name", "Alice")
            .with("age", 30)
            .with("score", 7.5)
            .with("team_id", serde_json::Value::Null)
    }

    fn check(condition: FilterCondition) -> bool {
        FilterEvaluator::evaluate(&SearchExpr::Condition(condition), &user())
    }

    #[test]
    fn test_eq_and_ne() {
        assert!(check(FilterCondition::eq("name", "Alice")));
        assert!(!check(FilterCondition::eq("name", "Bob")));
        assert!(check(FilterCondition::eq("age", 30.0)));
        assert!(check(FilterCondition::ne("age", 31)));
    }

    #[test]
    fn test_comparison_filters() {
        assert!(check(FilterCondition::gt("age", 29)));
        assert!(!check(FilterCondition::gt("age", 30)));
        assert!(check(FilterCondition::new("age", Operator::Gte, 30)));
        assert!(check(FilterCondition::lt("score", 8)));
        assert!(check(FilterCondition::new("score", Operator::Lte, 7.5)));
        assert!(check(FilterCondition::new("age", Operator::Between, vec![18, 30])));
        assert!(!check(FilterCondition::new("age", Operator::Between, vec![31, 40])));
    }

    #[test]
    fn test_string_filters() {
        assert!(check(FilterCondition::new("name", Operator::Starts, "Al")));
        assert!(check(FilterCondition::new("name", Operator::Ends, "ce")));
        assert!(check(FilterCondition::new("name", Operator::Cont, "lic")));
        assert!(check(FilterCondition::new("name", Operator::Excl, "Bob")));
        assert!(!check(FilterCondition::new("age", Operator::Starts, "3")));
    }

    #[test]
    fn test_null_handling() {
        assert!(check(FilterCondition::is_null("team_id")));
        assert!(check(FilterCondition::is_null("missing")));
        assert!(check(FilterCondition::not_null("name")));
        assert!(!check(FilterCondition::not_null("team_id")));
        assert!(!check(FilterCondition::eq("team_id", 1)));
        assert!(check(FilterCondition::ne("team_id", 1)));
        assert!(!check(FilterCondition::in_values("team_id", vec![1.into()])));
    }

    #[test]
    fn test_in_filters() {
        assert!(check(FilterCondition::in_values("id", vec![3.into(), 1.into()])));
        assert!(!check(FilterCondition::in_values("id", vec![])));
        assert!(check(FilterCondition::new("id", Operator::NotIn, vec![2, 3])));
    }

    #[test]
    fn test_compound_expressions() {
        let request = Request::new()
            .filter(FilterCondition::eq("name", "Bob"))
            .or_filter(FilterCondition::gt("age", 20));
        assert!(FilterEvaluator::evaluate(&request.search_expression(), &user()));

        let request = Request::new()
            .filter(FilterCondition::eq("name", "Alice"))
            .filter(FilterCondition::gt("age", 40));
        assert!(!FilterEvaluator::evaluate(&request.search_expression(), &user()));

        assert!(FilterEvaluator::evaluate(&SearchExpr::And(vec![]), &user()));
        assert!(!FilterEvaluator::evaluate(&SearchExpr::Or(vec![]), &user()));
    }

    #[test]
    fn test_compare_entities_multi_key() {
        let a = Entity::new().with("team", "x").with("age", 30);
        let b = Entity::new().with("team", "x").with("age", 25);
        let c = Entity::new().with("age", 40);

        let sorts = vec![SortKey::asc("team"), SortKey::desc("age")];
        assert_eq!(FilterEvaluator::compare_entities(&a, &b, &sorts), Ordering::Less);
        // NULLs first
        assert_eq!(FilterEvaluator::compare_entities(&c, &a, &sorts), Ordering::Less);
    }
}
