//! Query Executor
//!
//! Renders composed `Query` values into Postgres SQL with every value bound
//! as a typed parameter, and runs them on a borrowed connection.

use std::marker::PhantomData;

use async_trait::async_trait;
use ck_queries::paginate::{QueryExecutor, Record};
use ck_queries::query::{OrderTerm, Predicate, Query, SeekKey};
use ck_queries::registry::{FieldDef, FieldType, FieldValue};
use ck_queries::sorts::SortDirection;
use sqlx::postgres::{PgRow, Postgres};
use sqlx::{FromRow, PgConnection, QueryBuilder};

use crate::repository::RepositoryError;

type Builder = QueryBuilder<'static, Postgres>;

/// `SELECT <columns> FROM <table> WHERE ... ORDER BY ... LIMIT ... OFFSET ...`
pub fn select_sql(query: &Query) -> Builder {
    let registry = query.registry();
    let mut builder = Builder::new(format!(
        "SELECT {} FROM {}",
        registry.select_list(),
        registry.table
    ));

    push_where(&mut builder, query, true);
    push_order_by(&mut builder, query.order());

    if let Some(limit) = query.limit() {
        builder.push(" LIMIT ").push_bind(limit);
    }
    if let Some(offset) = query.offset() {
        builder.push(" OFFSET ").push_bind(offset);
    }

    builder
}

/// `SELECT COUNT(*)` over the query's predicates only
pub fn count_sql(query: &Query) -> Builder {
    let mut builder = Builder::new(format!("SELECT COUNT(*) FROM {}", query.registry().table));
    push_where(&mut builder, query, false);
    builder
}

fn push_where(builder: &mut Builder, query: &Query, with_seek: bool) {
    let mut first = true;
    let mut next_clause = |builder: &mut Builder| {
        builder.push(if first { " WHERE " } else { " AND " });
        first = false;
    };

    for predicate in query.predicates() {
        next_clause(builder);
        push_predicate(builder, predicate);
    }

    if with_seek {
        if let Some(keys) = query.seek().filter(|keys| !keys.is_empty()) {
            next_clause(builder);
            push_seek(builder, keys);
        }
    }
}

fn push_predicate(builder: &mut Builder, predicate: &Predicate) {
    match predicate {
        Predicate::Never => {
            builder.push("FALSE");
        }
        Predicate::Compare { field, op, value } => {
            push_column(builder, field);
            builder.push(" ").push(op.sql()).push(" ");
            push_value(builder, field, value);
        }
        Predicate::Contains { field, needle } => {
            builder.push(field.column);
            builder.push(if field.case_insensitive { " ILIKE " } else { " LIKE " });
            builder.push_bind(format!("%{}%", escape_like(needle)));
        }
        Predicate::InSet { field, values } => {
            push_column(builder, field);
            builder.push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                push_value(builder, field, value);
            }
            builder.push(")");
        }
    }
}

/// `(k1 > $1) OR (k1 = $2 AND k2 > $3) OR ...`, with `<` for descending keys
fn push_seek(builder: &mut Builder, keys: &[SeekKey]) {
    builder.push("(");
    for i in 0..keys.len() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder.push("(");
        for key in &keys[..i] {
            push_column(builder, &key.term.field);
            builder.push(" = ");
            push_value(builder, &key.term.field, &key.value);
            builder.push(" AND ");
        }
        let key = &keys[i];
        push_column(builder, &key.term.field);
        builder.push(match key.term.direction {
            SortDirection::Asc => " > ",
            SortDirection::Desc => " < ",
        });
        push_value(builder, &key.term.field, &key.value);
        builder.push(")");
    }
    builder.push(")");
}

fn push_order_by(builder: &mut Builder, order: &[OrderTerm]) {
    for (i, term) in order.iter().enumerate() {
        builder.push(if i == 0 { " ORDER BY " } else { ", " });
        push_column(builder, &term.field);
        builder.push(" ").push(term.direction.sql());
    }
}

fn lowered(field: &FieldDef) -> bool {
    field.case_insensitive && field.field_type == FieldType::Text
}

fn push_column(builder: &mut Builder, field: &FieldDef) {
    if lowered(field) {
        builder.push("LOWER(").push(field.column).push(")");
    } else {
        builder.push(field.column);
    }
}

fn push_value(builder: &mut Builder, field: &FieldDef, value: &FieldValue) {
    if lowered(field) {
        builder.push("LOWER(");
        push_bind_value(builder, value);
        builder.push(")");
    } else {
        push_bind_value(builder, value);
    }
}

fn push_bind_value(builder: &mut Builder, value: &FieldValue) {
    match value {
        FieldValue::Integer(v) => builder.push_bind(*v),
        FieldValue::Text(v) => builder.push_bind(v.clone()),
        FieldValue::Boolean(v) => builder.push_bind(*v),
        FieldValue::Timestamp(v) => builder.push_bind(*v),
    };
}

/// Escape LIKE wildcards so the needle matches literally
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Runs queries on one connection, usually inside a transaction
pub struct PgSession<'c, R> {
    conn: &'c mut PgConnection,
    _row: PhantomData<fn() -> R>,
}

impl<'c, R> PgSession<'c, R> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self {
            conn,
            _row: PhantomData,
        }
    }
}

#[async_trait]
impl<'c, R> QueryExecutor for PgSession<'c, R>
where
    R: for<'r> FromRow<'r, PgRow> + Record + Send + Unpin + 'static,
{
    type Row = R;
    type Error = RepositoryError;

    async fn count(&mut self, query: &Query) -> Result<i64, RepositoryError> {
        let mut builder = count_sql(query);
        let (count,): (i64,) = builder
            .build_query_as()
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    async fn fetch(&mut self, query: &Query) -> Result<Vec<R>, RepositoryError> {
        let mut builder = select_sql(query);
        let rows = builder
            .build_query_as::<R>()
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(rows)
    }
}
