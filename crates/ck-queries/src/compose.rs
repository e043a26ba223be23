//! Filter and sort composers
//!
//! Both are pure: they validate the request against the query's field
//! registry and return a new `Query`. Nothing touches storage here.

use std::collections::HashSet;

use ck_core::ValidationError;

use crate::filters::{Filter, FilterOperator, FilterSpec, FilterValue};
use crate::query::{Comparison, OrderTerm, Predicate, Query};
use crate::registry::{FieldDef, FieldType, FieldValue};
use crate::sorts::SortSpec;

/// Append one predicate per filter, in order
pub fn apply_filters(query: Query, spec: &FilterSpec) -> Result<Query, ValidationError> {
    let registry = query.registry();
    let mut query = query;

    for filter in spec.iter() {
        let field = *registry.require(&filter.field)?;
        query = query.with_predicate(predicate_for(field, filter)?);
    }

    Ok(query)
}

fn predicate_for(field: FieldDef, filter: &Filter) -> Result<Predicate, ValidationError> {
    match (filter.operator, &filter.value) {
        (FilterOperator::In, FilterValue::Set(values)) => {
            for value in values {
                field.check_type(value)?;
            }
            if values.is_empty() {
                Ok(Predicate::Never)
            } else {
                Ok(Predicate::InSet {
                    field,
                    values: values.clone(),
                })
            }
        }
        (FilterOperator::In, FilterValue::Single(_)) => Err(ValidationError::new(
            field.name,
            "in expects a list of values",
        )),
        (op, FilterValue::Set(_)) => Err(ValidationError::new(
            field.name,
            format!("{} expects a single value", op.as_str()),
        )),
        (FilterOperator::Contains, FilterValue::Single(value)) => {
            if field.field_type != FieldType::Text {
                return Err(ValidationError::new(
                    field.name,
                    format!("~ is not supported on {} fields", field.field_type.as_str()),
                ));
            }
            match value {
                FieldValue::Text(needle) => Ok(Predicate::Contains {
                    field,
                    needle: needle.clone(),
                }),
                other => Err(ValidationError::new(
                    field.name,
                    format!("~ expects a text value, got {}", other.field_type().as_str()),
                )),
            }
        }
        (op, FilterValue::Single(value)) => {
            field.check_type(value)?;
            if op.is_ordering() && field.field_type == FieldType::Boolean {
                return Err(ValidationError::new(
                    field.name,
                    format!("{} is not supported on boolean fields", op.as_str()),
                ));
            }
            Ok(Predicate::Compare {
                field,
                op: comparison(op),
                value: value.clone(),
            })
        }
    }
}

fn comparison(op: FilterOperator) -> Comparison {
    match op {
        FilterOperator::NotEquals => Comparison::Ne,
        FilterOperator::GreaterThan => Comparison::Gt,
        FilterOperator::LessThan => Comparison::Lt,
        FilterOperator::GreaterOrEqual => Comparison::Ge,
        FilterOperator::LessOrEqual => Comparison::Le,
        FilterOperator::Equals | FilterOperator::Contains | FilterOperator::In => Comparison::Eq,
    }
}

/// Replace the query's ordering with the spec's terms.
///
/// An empty spec yields `created_at DESC, id ASC`; otherwise `id ASC` is
/// appended unless the spec already orders by id.
pub fn apply_sort(query: Query, spec: &SortSpec) -> Result<Query, ValidationError> {
    let registry = query.registry();

    if spec.is_empty() {
        return Ok(query.with_order(Query::default_order(registry)));
    }

    let mut seen = HashSet::new();
    let mut terms = Vec::with_capacity(spec.len() + 1);

    for criterion in spec.criteria() {
        let field = *registry.require(&criterion.field)?;
        if !seen.insert(field.name) {
            return Err(ValidationError::new(field.name, "is sorted more than once"));
        }
        if !field.sortable() {
            return Err(ValidationError::new(field.name, "is not sortable"));
        }
        terms.push(OrderTerm {
            field,
            direction: criterion.direction,
        });
    }

    if !seen.contains(registry.id.name) {
        terms.push(OrderTerm::asc(registry.id));
    }

    Ok(query.with_order(terms))
}
