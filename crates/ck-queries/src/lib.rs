//! # ck-queries
//!
//! Query composition for crudkit list endpoints.
//!
//! Three stages are applied in sequence to a base `Query` over one entity:
//!
//! - `compose::apply_filters` - (field, operator, value) triples become ANDed predicates
//! - `compose::apply_sort` - (field, direction) pairs become ordering terms
//! - `paginate::paginate` - offset/limit or cursor slicing plus a total count
//!
//! Field names are checked against the entity's `FieldRegistry`. Executors
//! (`memory::MemoryExecutor` here, the Postgres one in `ck-db`) run the
//! resulting query.
//!
//! ## Example
//!
//! ```
//! use ck_queries::prelude::*;
//!
//! static TAGS: FieldRegistry = FieldRegistry {
//!     entity: "Tag",
//!     table: "tags",
//!     id: FieldDef::integer("id"),
//!     created_at: FieldDef::timestamp("created_at"),
//!     fields: &[
//!         FieldDef::integer("id"),
//!         FieldDef::text("name").case_insensitive(),
//!         FieldDef::timestamp("created_at"),
//!     ],
//! };
//!
//! let filters = FilterSpec::new().with(Filter::contains("name", "rust"));
//! let query = apply_filters(Query::new(&TAGS), &filters).unwrap();
//! let query = apply_sort(query, &SortSpec::by_asc("name")).unwrap();
//!
//! assert_eq!(query.predicates().len(), 1);
//! assert_eq!(query.order().len(), 2); // name ASC, id ASC
//! ```

pub mod compose;
pub mod cursor;
pub mod filters;
pub mod memory;
pub mod paginate;
pub mod query;
pub mod registry;
pub mod sorts;

pub mod prelude {
    pub use crate::compose::{apply_filters, apply_sort};
    pub use crate::cursor::{Cursor, CursorKey};
    pub use crate::filters::{Filter, FilterOperator, FilterSpec, FilterValue};
    pub use crate::memory::MemoryExecutor;
    pub use crate::paginate::{paginate, QueryExecutor, Record};
    pub use crate::query::{Comparison, OrderTerm, Predicate, Query, SeekKey};
    pub use crate::registry::{FieldDef, FieldRegistry, FieldType, FieldValue};
    pub use crate::sorts::{SortCriterion, SortDirection, SortSpec};
}
