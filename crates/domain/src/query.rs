use std::collections::BTreeMap;

use capstan_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::FilterCondition;
use crate::preset::FilterPreset;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl SortOrder {
    /// Returns the stable wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Asc
    }
}

impl std::str::FromStr for SortOrder {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(AppError::Validation(format!(
                "unknown sort order '{value}'"
            ))),
        }
    }
}

/// One sort instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCondition {
    /// Field identifier to sort by.
    pub field: String,
    /// Sort direction, ascending when omitted.
    #[serde(default)]
    pub order: SortOrder,
}

/// A fully-specified search request for one entity.
///
/// The value is immutable from the engine's point of view: the caller builds
/// drafts through the pure [`SearchQuery::with_filter`] /
/// [`SearchQuery::without_filter`] / [`SearchQuery::with_preset`]
/// transformations rather than by mutating state in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Entity to search.
    pub entity: String,
    /// Structured predicates combined with AND semantics.
    #[serde(default)]
    pub filters: Vec<FilterCondition>,
    /// Optional free-text quick-search input.
    #[serde(default)]
    pub search_text: Option<String>,
    /// Fields scanned by quick search; registry defaults apply when empty.
    #[serde(default)]
    pub search_fields: Vec<String>,
    /// Sort instructions, applied in listed order.
    #[serde(default)]
    pub sort: Vec<SortCondition>,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: usize,
    /// Rows per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Whether nested relation objects are kept in result rows.
    #[serde(default = "default_include_relations")]
    pub include_relations: bool,
    /// Requested aggregates: field identifier to aggregate function name.
    #[serde(default)]
    pub aggregate_functions: BTreeMap<String, String>,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

fn default_include_relations() -> bool {
    true
}

impl SearchQuery {
    /// Creates an unfiltered query for an entity with default paging.
    #[must_use]
    pub fn for_entity(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            filters: Vec::new(),
            search_text: None,
            search_fields: Vec::new(),
            sort: Vec::new(),
            page: default_page(),
            page_size: default_page_size(),
            include_relations: default_include_relations(),
            aggregate_functions: BTreeMap::new(),
        }
    }

    /// Checks structural invariants, failing with `MalformedQuery`.
    pub fn validate(&self) -> AppResult<()> {
        if self.entity.trim().is_empty() {
            return Err(AppError::MalformedQuery(
                "query entity must not be empty".to_owned(),
            ));
        }

        if self.page == 0 {
            return Err(AppError::MalformedQuery(
                "query page must be at least 1".to_owned(),
            ));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(AppError::MalformedQuery(format!(
                "query page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        Ok(())
    }

    /// Returns a copy with one predicate appended.
    #[must_use]
    pub fn with_filter(mut self, condition: FilterCondition) -> Self {
        self.filters.push(condition);
        self
    }

    /// Returns a copy with the predicate at `index` removed.
    ///
    /// Out-of-range indexes leave the filter set unchanged.
    #[must_use]
    pub fn without_filter(mut self, index: usize) -> Self {
        if index < self.filters.len() {
            self.filters.remove(index);
        }
        self
    }

    /// Returns a copy with the preset's conditions installed as the entire
    /// active filter set. Replaces, never merges; the preset's default sort
    /// replaces the current sort as well.
    #[must_use]
    pub fn with_preset(mut self, preset: &FilterPreset) -> Self {
        self.filters = preset.filters.clone();
        self.sort = preset.sort.clone();
        self
    }

    /// Returns a copy with the quick-search text replaced.
    #[must_use]
    pub fn with_search_text(mut self, search_text: Option<String>) -> Self {
        self.search_text = search_text;
        self
    }
}

/// Descriptive echo of the executed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInfo {
    /// Entity that was searched.
    pub entity: String,
    /// Number of structured predicates applied.
    pub filters_applied: usize,
    /// Whether quick search was in effect.
    pub full_text_search: bool,
    /// Whether relation objects were kept in rows.
    pub relations_included: bool,
}

/// One page of results plus unpaged totals and aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Rows for the requested page only.
    pub data: Vec<Value>,
    /// Size of the full filtered set, before paging.
    pub total_count: usize,
    /// Echoed 1-based page number.
    pub page: usize,
    /// Echoed page size.
    pub page_size: usize,
    /// Number of pages covering the full filtered set.
    pub total_pages: usize,
    /// Aggregates computed over the full filtered set.
    pub aggregations: BTreeMap<String, Value>,
    /// Wall-clock duration of query execution.
    pub execution_time_ms: f64,
    /// Descriptive echo of the executed query.
    pub query_info: QueryInfo,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{SearchQuery, SortCondition, SortOrder};
    use crate::field::{FieldType, SearchOperator};
    use crate::filter::FilterCondition;
    use crate::preset::FilterPreset;

    fn status_filter(value: &str) -> FilterCondition {
        FilterCondition {
            field: "status".to_owned(),
            operator: SearchOperator::Equals,
            value: json!(value),
            data_type: FieldType::String,
        }
    }

    #[test]
    fn validate_rejects_zero_page() {
        let mut query = SearchQuery::for_entity("students");
        query.page = 0;
        assert!(query.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_page_size() {
        let mut query = SearchQuery::for_entity("students");
        query.page_size = 101;
        assert!(query.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_entity() {
        let query = SearchQuery::for_entity("  ");
        assert!(query.validate().is_err());
    }

    #[test]
    fn applying_a_preset_replaces_the_filter_set() {
        let preset_a = FilterPreset {
            name: "active".to_owned(),
            display_name: "Active".to_owned(),
            description: String::new(),
            entity: "students".to_owned(),
            filters: vec![status_filter("active")],
            sort: vec![SortCondition {
                field: "gpa".to_owned(),
                order: SortOrder::Desc,
            }],
        };
        let preset_b = FilterPreset {
            name: "graduated".to_owned(),
            display_name: "Graduated".to_owned(),
            description: String::new(),
            entity: "students".to_owned(),
            filters: vec![status_filter("graduated")],
            sort: Vec::new(),
        };

        let query = SearchQuery::for_entity("students")
            .with_filter(status_filter("inactive"))
            .with_preset(&preset_a)
            .with_preset(&preset_b);

        assert_eq!(query.filters, preset_b.filters);
        assert!(query.sort.is_empty());
    }

    #[test]
    fn without_filter_ignores_out_of_range_index() {
        let query = SearchQuery::for_entity("students")
            .with_filter(status_filter("active"))
            .without_filter(5);
        assert_eq!(query.filters.len(), 1);
    }

    #[test]
    fn wire_defaults_apply_on_deserialize() {
        let query: SearchQuery = serde_json::from_value(json!({"entity": "students"}))
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 20);
        assert!(query.include_relations);
    }
}
