//! Domain model for the entity-agnostic search pipeline.

#![forbid(unsafe_code)]

mod export;
mod field;
mod filter;
mod preset;
mod query;

pub use export::{ExportFile, ExportFormat, ExportOptions};
pub use field::{FieldDefinition, FieldOption, FieldType, FilterGroup, SearchOperator};
pub use filter::{CompiledPredicate, FilterCondition, PredicateTest, ScalarValue};
pub use preset::FilterPreset;
pub use query::{QueryInfo, SearchQuery, SearchResult, SortCondition, SortOrder, MAX_PAGE_SIZE};
