//! Field Registry
//!
//! The allow-list of queryable fields for an entity: name, storage column,
//! value type, nullability, and whether text comparisons ignore case.
//! Composers consult the registry instead of any storage mapping.

use chrono::{DateTime, Utc};
use ck_core::ValidationError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Integer,
    Text,
    Boolean,
    Timestamp,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
        }
    }
}

/// A typed value bound into a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Integer(_) => FieldType::Integer,
            Self::Text(_) => FieldType::Text,
            Self::Boolean(_) => FieldType::Boolean,
            Self::Timestamp(_) => FieldType::Timestamp,
        }
    }

    /// Order two values of the same type; `None` when the types differ
    pub fn compare(&self, other: &Self, case_insensitive: bool) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) if case_insensitive => {
                Some(a.to_lowercase().cmp(&b.to_lowercase()))
            }
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Interpret a JSON value as the given field type
    pub fn from_json(field_type: FieldType, value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match (field_type, value) {
            (FieldType::Integer, Value::Number(n)) => n.as_i64().map(Self::Integer),
            (FieldType::Integer, Value::String(s)) => s.trim().parse().ok().map(Self::Integer),
            (FieldType::Text, Value::String(s)) => Some(Self::Text(s.clone())),
            (FieldType::Boolean, Value::Bool(b)) => Some(Self::Boolean(*b)),
            (FieldType::Boolean, Value::String(s)) => match s.as_str() {
                "true" | "1" => Some(Self::Boolean(true)),
                "false" | "0" => Some(Self::Boolean(false)),
                _ => None,
            },
            (FieldType::Timestamp, Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| Self::Timestamp(t.with_timezone(&Utc))),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

/// A single queryable field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Name clients use
    pub name: &'static str,
    /// Storage column
    pub column: &'static str,
    pub field_type: FieldType,
    pub nullable: bool,
    pub case_insensitive: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            column: name,
            field_type,
            nullable: false,
            case_insensitive: false,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub const fn timestamp(name: &'static str) -> Self {
        Self::new(name, FieldType::Timestamp)
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = column;
        self
    }

    /// Nullable columns cannot take part in keyset ordering
    pub fn sortable(&self) -> bool {
        !self.nullable
    }

    /// Fail unless `value` has this field's type
    pub fn check_type(&self, value: &FieldValue) -> Result<(), ValidationError> {
        if value.field_type() == self.field_type {
            Ok(())
        } else {
            Err(ValidationError::new(
                self.name,
                format!(
                    "expects a {} value, got {}",
                    self.field_type.as_str(),
                    value.field_type().as_str()
                ),
            ))
        }
    }
}

/// Allow-list of queryable fields for one entity type
#[derive(Debug)]
pub struct FieldRegistry {
    /// Entity name for messages
    pub entity: &'static str,
    pub table: &'static str,
    /// Identity field, the final tie-break of every ordering
    pub id: FieldDef,
    /// Creation timestamp, the primary key of the default ordering
    pub created_at: FieldDef,
    /// Every queryable field, including `id` and `created_at`
    pub fields: &'static [FieldDef],
}

impl FieldRegistry {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look a field up, failing with a `ValidationError` naming it
    pub fn require(&self, name: &str) -> Result<&FieldDef, ValidationError> {
        self.field(name)
            .ok_or_else(|| ValidationError::unknown_field(name))
    }

    /// Parse a JSON value into the named field's type
    pub fn parse_value(
        &self,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<FieldValue, ValidationError> {
        let field = self.require(name)?;
        FieldValue::from_json(field.field_type, value).ok_or_else(|| {
            ValidationError::new(
                name,
                format!("expects a {} value", field.field_type.as_str()),
            )
        })
    }

    /// Comma separated column list for SELECT statements
    pub fn select_list(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.column)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
