//! Query Sort Orders
//!
//! Sort specs define how query results should be ordered. The first
//! criterion is the primary key of the ordering.

use ck_core::ValidationError;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order (A-Z, 1-9, oldest first)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1, newest first)
    Desc,
}

impl SortDirection {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// SQL keyword
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A single sort criterion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriterion {
    /// The field to sort by
    pub field: String,
    pub direction: SortDirection,
}

impl SortCriterion {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Ordered collection of sort criteria
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    criteria: Vec<SortCriterion>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self { criteria: vec![] }
    }

    /// Create with a single criterion
    pub fn by(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            criteria: vec![SortCriterion::new(field, direction)],
        }
    }

    pub fn by_asc(field: impl Into<String>) -> Self {
        Self::by(field, SortDirection::Asc)
    }

    pub fn by_desc(field: impl Into<String>) -> Self {
        Self::by(field, SortDirection::Desc)
    }

    /// Add a sort criterion
    pub fn add(&mut self, criterion: SortCriterion) -> &mut Self {
        self.criteria.push(criterion);
        self
    }

    /// Add a sort criterion (builder pattern)
    pub fn then(mut self, criterion: SortCriterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn then_asc(self, field: impl Into<String>) -> Self {
        self.then(SortCriterion::asc(field))
    }

    pub fn then_desc(self, field: impl Into<String>) -> Self {
        self.then(SortCriterion::desc(field))
    }

    pub fn criteria(&self) -> &[SortCriterion] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Parse `field:dir,field:dir`. A missing direction means ascending and a
    /// leading `-` means descending, so `-created_at,title` is also accepted.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let mut spec = Self::new();

        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let criterion = match part.split_once(':') {
                Some((field, dir)) => {
                    let direction = SortDirection::from_str(dir.trim()).ok_or_else(|| {
                        ValidationError::new("sort", format!("has unknown direction '{}'", dir))
                    })?;
                    SortCriterion::new(field.trim(), direction)
                }
                None => match part.strip_prefix('-') {
                    Some(field) => SortCriterion::desc(field),
                    None => SortCriterion::asc(part),
                },
            };
            spec.add(criterion);
        }

        Ok(spec)
    }
}

impl FromIterator<SortCriterion> for SortSpec {
    fn from_iter<I: IntoIterator<Item = SortCriterion>>(iter: I) -> Self {
        Self {
            criteria: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_direction() {
        assert_eq!(SortDirection::from_str("asc"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::from_str("DESC"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::from_str("sideways"), None);
    }

    #[test]
    fn test_sort_spec() {
        let spec = SortSpec::by_desc("updated_at").then_asc("id");

        assert_eq!(spec.len(), 2);
        let fields: Vec<_> = spec.criteria().iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["updated_at", "id"]);
        assert_eq!(spec.criteria()[0].direction, SortDirection::Desc);
    }

    #[test]
    fn test_parse() {
        let spec = SortSpec::parse("title:asc, created_at:DESC").unwrap();
        assert_eq!(
            spec,
            SortSpec::by_asc("title").then_desc("created_at")
        );

        let spec = SortSpec::parse("-created_at,title").unwrap();
        assert_eq!(spec, SortSpec::by_desc("created_at").then_asc("title"));

        assert!(SortSpec::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_bad_direction() {
        let err = SortSpec::parse("title:up").unwrap_err();
        assert_eq!(err.field, "sort");
    }
}
