//! Routing of request filters to the root or to relation-scoped queries.
//!
//! The analyzer makes a single pass over the request, resolving each
//! condition's relation tag once through a lookup map. Afterwards it injects
//! the existence and distinct conditions that INNER joins and relation-driven
//! ordering depend on.

use std::collections::HashMap;

use fedquery_proto::{FilterCondition, Operator, Request, Value};

use crate::catalog::RelationDecl;

/// Position of a relation in the declaration list of one federation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId(pub(crate) usize);

impl RelationId {
    /// Index into the declaration list.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a tagged condition or sort key belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The root collection.
    Root,
    /// A declared relation.
    Relation(RelationId),
    /// A tag naming no declared relation.
    Unknown(String),
}

/// Conditions cached for one relation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationFilterSet {
    /// Conditions combined with AND, including injected existence checks.
    pub and: Vec<FilterCondition>,
    /// Conditions combined with OR.
    pub or: Vec<FilterCondition>,
    /// Distinct-filter conditions, applied only while discovering root ids.
    pub distinct: Vec<FilterCondition>,
}

impl RelationFilterSet {
    /// Check whether any condition constrains the relation.
    pub fn has_constraints(&self) -> bool {
        !self.and.is_empty() || !self.or.is_empty()
    }
}

/// Partition of a request's filters by scope.
#[derive(Debug, Clone)]
pub struct FilterAnalyzer {
    lookup: HashMap<String, RelationId>,
    relations: Vec<RelationDecl>,
    root_and: Vec<FilterCondition>,
    root_or: Vec<FilterCondition>,
    sets: Vec<RelationFilterSet>,
    existence: Vec<RelationId>,
    unresolved: Vec<String>,
}

impl FilterAnalyzer {
    /// Analyze a request against the declared relations.
    pub fn new(request: &Request, relations: &[RelationDecl]) -> Self {
        let lookup = relations
            .iter()
            .enumerate()
            .map(|(i, r)| (r.property.clone(), RelationId(i)))
            .collect();

        let mut analyzer = Self {
            lookup,
            relations: relations.to_vec(),
            root_and: Vec::new(),
            root_or: Vec::new(),
            sets: vec![RelationFilterSet::default(); relations.len()],
            existence: Vec::new(),
            unresolved: Vec::new(),
        };

        for condition in &request.filters {
            match analyzer.scope(condition.relation.as_deref()) {
                Scope::Root => analyzer.root_and.push(condition.clone()),
                Scope::Relation(id) => analyzer.sets[id.0].and.push(condition.unscoped()),
                Scope::Unknown(name) => analyzer.note_unresolved(name),
            }
        }
        for condition in &request.or_filters {
            match analyzer.scope(condition.relation.as_deref()) {
                Scope::Root => analyzer.root_or.push(condition.clone()),
                Scope::Relation(id) => analyzer.sets[id.0].or.push(condition.unscoped()),
                Scope::Unknown(name) => analyzer.note_unresolved(name),
            }
        }

        let sort_targets: Vec<RelationId> = request
            .sorts
            .iter()
            .filter_map(|key| match analyzer.scope(key.relation.as_deref()) {
                Scope::Relation(id) => Some(id),
                _ => None,
            })
            .collect();

        for i in 0..relations.len() {
            let id = RelationId(i);
            if relations[i].is_inner() || sort_targets.contains(&id) {
                analyzer.ensure_existence(id);
            }
        }

        analyzer
    }

    /// Resolve a relation tag.
    pub fn scope(&self, relation: Option<&str>) -> Scope {
        match relation {
            None => Scope::Root,
            Some(name) => match self.lookup.get(name) {
                Some(id) => Scope::Relation(*id),
                None => Scope::Unknown(name.to_string()),
            },
        }
    }

    /// Resolve a relation property name to its id.
    pub fn resolve(&self, property: &str) -> Option<RelationId> {
        self.lookup.get(property).copied()
    }

    /// Declaration of a relation.
    pub fn relation(&self, id: RelationId) -> &RelationDecl {
        &self.relations[id.0]
    }

    /// All declarations, indexed by [`RelationId`].
    pub fn relations(&self) -> &[RelationDecl] {
        &self.relations
    }

    /// Ensure the relation carries its existence condition, then its
    /// distinct filter. Calling this more than once has no further effect.
    ///
    /// Owner relations keep their foreign key on the root, so their
    /// existence condition lands in the root scope and no distinct filter
    /// applies.
    pub fn ensure_existence(&mut self, id: RelationId) {
        let decl = &self.relations[id.0];
        let condition = FilterCondition::not_null(decl.foreign_key.clone());

        if decl.owner {
            if !self.root_and.iter().any(|c| is_same_check(c, &condition)) {
                self.root_and.push(condition);
            }
            return;
        }

        let set = &mut self.sets[id.0];
        if !set.and.iter().any(|c| is_same_check(c, &condition)) {
            set.and.push(condition);
        }
        if set.distinct.is_empty() {
            set.distinct = decl.distinct_filter.clone();
        }
        if !self.existence.contains(&id) {
            self.existence.push(id);
        }
    }

    /// Root conditions combined with AND.
    pub fn root_filters(&self) -> &[FilterCondition] {
        &self.root_and
    }

    /// Root conditions combined with OR.
    pub fn root_or_filters(&self) -> &[FilterCondition] {
        &self.root_or
    }

    /// Check whether the root scope is constrained at all.
    pub fn has_root_filters(&self) -> bool {
        !self.root_and.is_empty() || !self.root_or.is_empty()
    }

    /// Conditions cached for a relation.
    pub fn relation_filters(&self, id: RelationId) -> &RelationFilterSet {
        &self.sets[id.0]
    }

    /// Relations carrying at least one condition, in declaration order.
    pub fn constrained_relations(&self) -> Vec<RelationId> {
        (0..self.sets.len())
            .map(RelationId)
            .filter(|id| self.sets[id.0].has_constraints())
            .collect()
    }

    /// Check whether any relation carries a condition.
    pub fn has_relation_filters(&self) -> bool {
        self.sets.iter().any(RelationFilterSet::has_constraints)
    }

    /// Forward relations that received an existence condition.
    pub fn existence_relations(&self) -> &[RelationId] {
        &self.existence
    }

    /// Relation tags that matched no declaration.
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    /// Replace a request's filters with the root scope's conditions.
    pub fn apply_root_filters(&self, request: &mut Request) {
        request.filters = self.root_and.clone();
        request.or_filters = self.root_or.clone();
    }

    /// Copy a relation's cached conditions onto a relation-scoped request.
    ///
    /// The distinct filter is only wanted while discovering root ids;
    /// hydration fetches leave it out to see every related record.
    pub fn apply_relation_filters(
        &self,
        id: RelationId,
        request: &mut Request,
        with_distinct: bool,
    ) {
        let set = &self.sets[id.0];
        request.filters.extend(set.and.iter().cloned());
        if with_distinct {
            request.filters.extend(set.distinct.iter().cloned());
        }
        request.or_filters.extend(set.or.iter().cloned());
    }

    /// Append an equality (one value) or `$in` (several values) constraint.
    pub fn constrain(request: &mut Request, field: &str, values: Vec<Value>) {
        let condition = match <[Value; 1]>::try_from(values) {
            Ok([single]) => FilterCondition::eq(field, single),
            Err(values) => FilterCondition::in_values(field, values),
        };
        request.filters.push(condition);
    }

    fn note_unresolved(&mut self, name: String) {
        if !self.unresolved.contains(&name) {
            self.unresolved.push(name);
        }
    }
}

fn is_same_check(existing: &FilterCondition, wanted: &FilterCondition) -> bool {
    existing.field == wanted.field
        && existing.operator == wanted.operator
        && (existing.operator == Operator::NotNull || existing.value == wanted.value)
}
