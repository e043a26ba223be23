//! Query Filters
//!
//! A filter is a (field, operator, value) triple. A `FilterSpec` is an
//! ordered collection of filters combined with AND semantics.

use crate::registry::FieldValue;

/// Filter operators that can be applied to values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equals (=)
    Equals,
    /// Not equals (!=)
    NotEquals,
    /// Greater than (>)
    GreaterThan,
    /// Less than (<)
    LessThan,
    /// Greater than or equal (>=)
    GreaterOrEqual,
    /// Less than or equal (<=)
    LessOrEqual,
    /// Substring match on text fields (~)
    Contains,
    /// Member of a set of values (in)
    In,
}

impl FilterOperator {
    /// Parse operator from its symbol or name
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "=" | "eq" => Some(Self::Equals),
            "!=" | "!" | "ne" => Some(Self::NotEquals),
            ">" | "gt" => Some(Self::GreaterThan),
            "<" | "lt" => Some(Self::LessThan),
            ">=" | "ge" | "gte" => Some(Self::GreaterOrEqual),
            "<=" | "le" | "lte" => Some(Self::LessOrEqual),
            "~" | "contains" => Some(Self::Contains),
            "in" => Some(Self::In),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::Contains => "~",
            Self::In => "in",
        }
    }

    /// Operators that rely on a total order of values
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::GreaterThan | Self::LessThan | Self::GreaterOrEqual | Self::LessOrEqual
        )
    }

    /// Check if this operator takes a list of values
    pub fn takes_set(&self) -> bool {
        matches!(self, Self::In)
    }
}

/// Filter value types
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Single(FieldValue),
    /// Values for the in-set operator; may be empty
    Set(Vec<FieldValue>),
}

impl FilterValue {
    /// Get as a list of values
    pub fn values(&self) -> Vec<&FieldValue> {
        match self {
            Self::Single(v) => vec![v],
            Self::Set(vs) => vs.iter().collect(),
        }
    }
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// The field being filtered (e.g., "title", "is_active")
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::Equals, FilterValue::Single(value.into()))
    }

    pub fn not_equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::NotEquals, FilterValue::Single(value.into()))
    }

    pub fn greater_than(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, FilterValue::Single(value.into()))
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, FilterValue::Single(value.into()))
    }

    pub fn greater_or_equal(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(
            field,
            FilterOperator::GreaterOrEqual,
            FilterValue::Single(value.into()),
        )
    }

    pub fn less_or_equal(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(
            field,
            FilterOperator::LessOrEqual,
            FilterValue::Single(value.into()),
        )
    }

    /// Create a contains filter
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            field,
            FilterOperator::Contains,
            FilterValue::Single(FieldValue::Text(value.into())),
        )
    }

    /// Create an in-set filter
    pub fn in_set<V: Into<FieldValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            field,
            FilterOperator::In,
            FilterValue::Set(values.into_iter().map(Into::into).collect()),
        )
    }
}

/// Filter spec - an ordered collection of filters with AND semantics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    filters: Vec<Filter>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self { filters: vec![] }
    }

    /// Add a filter to the spec
    pub fn add(&mut self, filter: Filter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    /// Add a filter and return self (builder pattern)
    pub fn with(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }
}

impl FromIterator<Filter> for FilterSpec {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_operator_parsing() {
        assert_eq!(FilterOperator::from_str("="), Some(FilterOperator::Equals));
        assert_eq!(FilterOperator::from_str("!="), Some(FilterOperator::NotEquals));
        assert_eq!(FilterOperator::from_str("~"), Some(FilterOperator::Contains));
        assert_eq!(FilterOperator::from_str(">="), Some(FilterOperator::GreaterOrEqual));
        assert_eq!(FilterOperator::from_str("in"), Some(FilterOperator::In));
        assert_eq!(FilterOperator::from_str("between"), None);
    }

    #[test]
    fn test_operator_symbols_parse_back() {
        for op in [
            FilterOperator::Equals,
            FilterOperator::NotEquals,
            FilterOperator::GreaterThan,
            FilterOperator::LessThan,
            FilterOperator::GreaterOrEqual,
            FilterOperator::LessOrEqual,
            FilterOperator::Contains,
            FilterOperator::In,
        ] {
            assert_eq!(FilterOperator::from_str(op.as_str()), Some(op));
        }
    }

    #[test]
    fn test_filter_creation() {
        let filter = Filter::equals("is_active", true);
        assert_eq!(filter.field, "is_active");
        assert_eq!(filter.operator, FilterOperator::Equals);
        assert_eq!(filter.value, FilterValue::Single(FieldValue::Boolean(true)));

        let filter = Filter::in_set("id", [1i64, 2, 3]);
        assert_eq!(filter.value.values().len(), 3);
    }

    #[test]
    fn test_filter_spec() {
        let spec = FilterSpec::new()
            .with(Filter::contains("title", "widget"))
            .with(Filter::equals("is_active", true));

        assert_eq!(spec.len(), 2);
        assert_eq!(spec.filters()[0].field, "title");
    }
}
