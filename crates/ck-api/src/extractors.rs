//! Application state and request extractors

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use ck_core::config::AppConfig;
use ck_core::{PageRequest, ValidationError};
use ck_db::{CreateItemDto, ItemRow, ListRequest, Repository, UpdateItemDto};
use ck_files::Storage;
use ck_queries::filters::{Filter, FilterOperator, FilterSpec, FilterValue};
use ck_queries::registry::FieldRegistry;
use ck_queries::sorts::{SortDirection, SortSpec};
use ck_tasks::TaskQueue;
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::chat::ChatHub;

/// Item repository as seen by handlers
pub type ItemStore = Arc<dyn Repository<ItemRow, CreateItemDto, UpdateItemDto>>;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub items: ItemStore,
    pub storage: Arc<dyn Storage>,
    pub tasks: TaskQueue,
    pub chat: ChatHub,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        items: ItemStore,
        storage: Arc<dyn Storage>,
        tasks: TaskQueue,
    ) -> Self {
        Self {
            config: Arc::new(config),
            items,
            storage,
            tasks,
            chat: ChatHub::default(),
        }
    }
}

/// Raw list query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    /// `offset` (default) or `cursor`
    pub mode: Option<String>,
    pub cursor: Option<String>,
    /// Case-insensitive substring match on the title
    pub title: Option<String>,
    pub is_active: Option<bool>,
    /// JSON array of `{"field", "operator", "value"}` objects
    pub filters: Option<String>,
    /// `field:dir,-field,field`
    pub sort: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFilter {
    field: String,
    operator: String,
    value: serde_json::Value,
}

impl ListParams {
    /// Resolve into a repository request. Field names and values are checked
    /// against `registry`; page bounds are left to the repository.
    pub fn into_request(
        self,
        registry: &FieldRegistry,
        default_page_size: i64,
    ) -> Result<ListRequest, ValidationError> {
        let page = self.page_request(default_page_size)?;
        let filters = self.filter_spec(registry)?;
        let sorts = self.sort_spec()?;
        Ok(ListRequest::new(filters, sorts, page))
    }

    fn page_request(&self, default_page_size: i64) -> Result<PageRequest, ValidationError> {
        let cursor_mode = match self.mode.as_deref() {
            None => self.cursor.is_some(),
            Some("offset") => false,
            Some("cursor") => true,
            Some(other) => {
                return Err(ValidationError::new(
                    "mode",
                    format!("must be offset or cursor, got {}", other),
                ))
            }
        };
        let size = self.limit.or(self.page_size).unwrap_or(default_page_size);

        if cursor_mode {
            return Ok(match &self.cursor {
                Some(cursor) => PageRequest::after(cursor.clone(), size),
                None => PageRequest::first(size),
            });
        }

        if self.offset.is_some() || self.limit.is_some() {
            return Ok(PageRequest::offset(self.offset.unwrap_or(0), size));
        }

        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(ValidationError::new("page", "must be at least 1"));
        }
        Ok(PageRequest::page(page, size))
    }

    fn filter_spec(&self, registry: &FieldRegistry) -> Result<FilterSpec, ValidationError> {
        let mut spec = FilterSpec::new();

        if let Some(title) = &self.title {
            spec.add(Filter::contains("title", title.clone()));
        }
        if let Some(is_active) = self.is_active {
            spec.add(Filter::equals("is_active", is_active));
        }

        if let Some(raw) = &self.filters {
            let parsed: Vec<RawFilter> = serde_json::from_str(raw).map_err(|_| {
                ValidationError::new(
                    "filters",
                    "must be a JSON array of {field, operator, value} objects",
                )
            })?;
            for raw in parsed {
                spec.add(parse_filter(registry, raw)?);
            }
        }

        Ok(spec)
    }

    fn sort_spec(&self) -> Result<SortSpec, ValidationError> {
        if let Some(sort) = &self.sort {
            return SortSpec::parse(sort);
        }
        let Some(field) = &self.sort_by else {
            return Ok(SortSpec::new());
        };
        let direction = match self.sort_order.as_deref() {
            None => SortDirection::Desc,
            Some(order) => SortDirection::from_str(order)
                .ok_or_else(|| ValidationError::new("sort_order", "must be asc or desc"))?,
        };
        Ok(SortSpec::by(field.clone(), direction))
    }
}

fn parse_filter(registry: &FieldRegistry, raw: RawFilter) -> Result<Filter, ValidationError> {
    let operator = FilterOperator::from_str(&raw.operator).ok_or_else(|| {
        ValidationError::new(
            raw.field.clone(),
            format!("uses unknown operator {}", raw.operator),
        )
    })?;

    let value = if operator.takes_set() {
        let serde_json::Value::Array(values) = &raw.value else {
            return Err(ValidationError::new(
                raw.field,
                format!("{} expects a list of values", operator.as_str()),
            ));
        };
        FilterValue::Set(
            values
                .iter()
                .map(|v| registry.parse_value(&raw.field, v))
                .collect::<Result<_, _>>()?,
        )
    } else {
        FilterValue::Single(registry.parse_value(&raw.field, &raw.value)?)
    };

    Ok(Filter::new(raw.field, operator, value))
}

/// List parameters extractor
pub struct ListQuery(pub ListParams);

#[async_trait]
impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<ListParams>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(ListQuery(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ck_db::ITEM_FIELDS;
    use ck_queries::registry::FieldValue;

    fn resolve(params: ListParams) -> Result<ListRequest, ValidationError> {
        params.into_request(&ITEM_FIELDS, 20)
    }

    #[test]
    fn test_defaults_to_first_page() {
        let request = resolve(ListParams::default()).unwrap();
        assert_eq!(request.page, PageRequest::offset(0, 20));
        assert!(request.filters.is_empty());
        assert!(request.sorts.is_empty());
    }

    #[test]
    fn test_page_numbers() {
        let request = resolve(ListParams {
            page: Some(3),
            page_size: Some(10),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.page, PageRequest::offset(20, 10));

        let err = resolve(ListParams {
            page: Some(0),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.field, "page");
    }

    #[test]
    fn test_cursor_mode() {
        let request = resolve(ListParams {
            mode: Some("cursor".into()),
            limit: Some(5),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.page, PageRequest::first(5));

        let request = resolve(ListParams {
            cursor: Some("abc".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.page, PageRequest::after("abc", 20));

        assert!(resolve(ListParams {
            mode: Some("sideways".into()),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_convenience_and_json_filters() {
        let request = resolve(ListParams {
            title: Some("ham".into()),
            is_active: Some(true),
            filters: Some(r#"[{"field":"id","operator":"in","value":[1,"2"]}]"#.into()),
            ..Default::default()
        })
        .unwrap();

        let filters = request.filters.filters();
        assert_eq!(filters.len(), 3);
        assert_eq!(filters[0], Filter::contains("title", "ham"));
        assert_eq!(filters[1], Filter::equals("is_active", true));
        assert_eq!(
            filters[2].value,
            FilterValue::Set(vec![FieldValue::Integer(1), FieldValue::Integer(2)])
        );
    }

    #[test]
    fn test_bad_filters() {
        let err = resolve(ListParams {
            filters: Some(r#"[{"field":"nonexistent","operator":"=","value":1}]"#.into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.field, "nonexistent");

        let err = resolve(ListParams {
            filters: Some("not json".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.field, "filters");

        let err = resolve(ListParams {
            filters: Some(r#"[{"field":"id","operator":"in","value":1}]"#.into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.field, "id");
    }

    #[test]
    fn test_sorting() {
        let request = resolve(ListParams {
            sort: Some("title:asc,-id".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.sorts, SortSpec::by_asc("title").then_desc("id"));

        let request = resolve(ListParams {
            sort_by: Some("title".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.sorts, SortSpec::by_desc("title"));

        let err = resolve(ListParams {
            sort_by: Some("title".into()),
            sort_order: Some("up".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.field, "sort_order");
    }
}
