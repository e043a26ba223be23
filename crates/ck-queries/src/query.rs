//! Abstract query description
//!
//! A `Query` names an entity's registry plus the predicates, ordering, seek
//! position, and window the composers attach to it. Executors render it into
//! SQL or evaluate it over in-memory records.

use std::cmp::Ordering;

use crate::registry::{FieldDef, FieldRegistry, FieldValue};
use crate::sorts::SortDirection;

/// Comparison operator of a `Predicate::Compare`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Comparison {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }

    /// Does `actual.cmp(expected) == ordering` satisfy this comparison
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Lt => ordering == Ordering::Less,
            Self::Ge => ordering != Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
        }
    }
}

/// A WHERE clause condition. Conditions are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        field: FieldDef,
        op: Comparison,
        value: FieldValue,
    },
    /// Substring match on a text field
    Contains { field: FieldDef, needle: String },
    /// Membership in a non-empty set
    InSet {
        field: FieldDef,
        values: Vec<FieldValue>,
    },
    /// Matches nothing
    Never,
}

/// One ORDER BY term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub field: FieldDef,
    pub direction: SortDirection,
}

impl OrderTerm {
    pub fn asc(field: FieldDef) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: FieldDef) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }
}

/// Keyset position: the sort key of the last row already returned
#[derive(Debug, Clone, PartialEq)]
pub struct SeekKey {
    pub term: OrderTerm,
    pub value: FieldValue,
}

#[derive(Debug, Clone)]
pub struct Query {
    registry: &'static FieldRegistry,
    predicates: Vec<Predicate>,
    order: Vec<OrderTerm>,
    seek: Option<Vec<SeekKey>>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Query {
    /// Base query over every row of the registry's entity
    pub fn new(registry: &'static FieldRegistry) -> Self {
        Self {
            registry,
            predicates: Vec::new(),
            order: Vec::new(),
            seek: None,
            limit: None,
            offset: None,
        }
    }

    pub fn registry(&self) -> &'static FieldRegistry {
        self.registry
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn order(&self) -> &[OrderTerm] {
        &self.order
    }

    pub fn seek(&self) -> Option<&[SeekKey]> {
        self.seek.as_deref()
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    pub fn is_ordered(&self) -> bool {
        !self.order.is_empty()
    }

    /// True when a predicate guarantees zero rows
    pub fn is_empty_set(&self) -> bool {
        self.predicates.iter().any(|p| matches!(p, Predicate::Never))
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Replace the ordering
    pub fn with_order(mut self, order: Vec<OrderTerm>) -> Self {
        self.order = order;
        self
    }

    pub fn with_seek(mut self, keys: Vec<SeekKey>) -> Self {
        self.seek = Some(keys);
        self
    }

    pub fn with_window(mut self, limit: i64, offset: Option<i64>) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    /// The same predicates with no ordering, seek, or window
    pub fn count_query(&self) -> Self {
        Self {
            registry: self.registry,
            predicates: self.predicates.clone(),
            order: Vec::new(),
            seek: None,
            limit: None,
            offset: None,
        }
    }

    /// `created_at DESC, id ASC`
    pub fn default_order(registry: &FieldRegistry) -> Vec<OrderTerm> {
        vec![OrderTerm::desc(registry.created_at), OrderTerm::asc(registry.id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static THINGS: FieldRegistry = FieldRegistry {
        entity: "Thing",
        table: "things",
        id: FieldDef::integer("id"),
        created_at: FieldDef::timestamp("created_at"),
        fields: &[FieldDef::integer("id"), FieldDef::timestamp("created_at")],
    };

    #[test]
    fn test_comparison_matches() {
        assert!(Comparison::Ge.matches(Ordering::Equal));
        assert!(Comparison::Ge.matches(Ordering::Greater));
        assert!(!Comparison::Ge.matches(Ordering::Less));
        assert!(Comparison::Ne.matches(Ordering::Less));
        assert!(!Comparison::Eq.matches(Ordering::Greater));
    }

    #[test]
    fn test_count_query_drops_window_and_order() {
        let query = Query::new(&THINGS)
            .with_predicate(Predicate::Compare {
                field: THINGS.id,
                op: Comparison::Gt,
                value: FieldValue::Integer(3),
            })
            .with_order(Query::default_order(&THINGS))
            .with_window(10, Some(20));

        let count = query.count_query();
        assert_eq!(count.predicates().len(), 1);
        assert!(!count.is_ordered());
        assert_eq!(count.limit(), None);
        assert_eq!(count.offset(), None);
    }

    #[test]
    fn test_never_marks_empty_set() {
        let query = Query::new(&THINGS);
        assert!(!query.is_empty_set());
        assert!(query.with_predicate(Predicate::Never).is_empty_set());
    }
}
