//! In-memory query evaluation
//!
//! Evaluates a `Query` over a slice of records with the same semantics the
//! SQL renderer produces: NULLs never match a comparison, case-insensitive
//! fields compare lowercased, and seeks are strict.

use std::cmp::Ordering;

use async_trait::async_trait;
use ck_core::ValidationError;

use crate::paginate::{QueryExecutor, Record};
use crate::query::{OrderTerm, Predicate, Query, SeekKey};
use crate::registry::FieldValue;
use crate::sorts::SortDirection;

/// Does `row` satisfy `predicate`
pub fn matches<R: Record>(predicate: &Predicate, row: &R) -> bool {
    match predicate {
        Predicate::Never => false,
        Predicate::Compare { field, op, value } => row
            .field_value(field.name)
            .and_then(|actual| actual.compare(value, field.case_insensitive))
            .map_or(false, |ordering| op.matches(ordering)),
        Predicate::Contains { field, needle } => match row.field_value(field.name) {
            Some(FieldValue::Text(haystack)) if field.case_insensitive => haystack
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Some(FieldValue::Text(haystack)) => haystack.contains(needle.as_str()),
            _ => false,
        },
        Predicate::InSet { field, values } => match row.field_value(field.name) {
            Some(actual) => values
                .iter()
                .any(|v| actual.compare(v, field.case_insensitive) == Some(Ordering::Equal)),
            None => false,
        },
    }
}

/// Compare two rows under an ordering
pub fn compare_rows<R: Record>(order: &[OrderTerm], a: &R, b: &R) -> Ordering {
    for term in order {
        let ordering = compare_keys(
            a.field_value(term.field.name).as_ref(),
            b.field_value(term.field.name).as_ref(),
            term,
        );
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Is `row` strictly after the seek position
pub fn after_seek<R: Record>(keys: &[SeekKey], row: &R) -> bool {
    for key in keys {
        let actual = row.field_value(key.term.field.name);
        match compare_keys(actual.as_ref(), Some(&key.value), &key.term) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => continue,
        }
    }
    false
}

/// NULL sorts after every value ascending, matching Postgres defaults
fn compare_keys(a: Option<&FieldValue>, b: Option<&FieldValue>, term: &OrderTerm) -> Ordering {
    let ordering = match (a, b) {
        (Some(a), Some(b)) => a
            .compare(b, term.field.case_insensitive)
            .unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, None) => Ordering::Equal,
    };
    match term.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Executes queries against a borrowed slice of records
pub struct MemoryExecutor<'a, R> {
    rows: &'a [R],
}

impl<'a, R> MemoryExecutor<'a, R> {
    pub fn new(rows: &'a [R]) -> Self {
        Self { rows }
    }
}

impl<'a, R: Record + Clone> MemoryExecutor<'a, R> {
    fn filtered(&self, query: &Query) -> impl Iterator<Item = &'a R> + '_ {
        let predicates = query.predicates().to_vec();
        self.rows
            .iter()
            .filter(move |row| predicates.iter().all(|p| matches(p, *row)))
    }

    /// Synchronous count
    pub fn count_now(&self, query: &Query) -> i64 {
        self.filtered(query).count() as i64
    }

    /// Synchronous fetch
    pub fn fetch_now(&self, query: &Query) -> Vec<R> {
        let mut rows: Vec<&R> = self
            .filtered(query)
            .filter(|row| query.seek().map_or(true, |keys| after_seek(keys, *row)))
            .collect();
        rows.sort_by(|a, b| compare_rows(query.order(), *a, *b));

        let offset = query.offset().unwrap_or(0).max(0) as usize;
        let limit = query.limit().map_or(usize::MAX, |l| l.max(0) as usize);
        rows.into_iter().skip(offset).take(limit).cloned().collect()
    }
}

#[async_trait]
impl<'a, R> QueryExecutor for MemoryExecutor<'a, R>
where
    R: Record + Clone + Send + Sync,
{
    type Row = R;
    type Error = ValidationError;

    async fn count(&mut self, query: &Query) -> Result<i64, ValidationError> {
        Ok(self.count_now(query))
    }

    async fn fetch(&mut self, query: &Query) -> Result<Vec<R>, ValidationError> {
        Ok(self.fetch_now(query))
    }
}
