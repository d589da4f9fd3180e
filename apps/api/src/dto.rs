//! Wire DTOs for the search API, exported to TypeScript via ts-rs.

use std::collections::BTreeMap;
use std::str::FromStr;

use capstan_core::AppResult;
use capstan_domain::{
    ExportFormat, ExportOptions, FieldDefinition, FieldOption, FilterCondition, FilterGroup,
    FilterPreset, QueryInfo, SearchOperator, SearchQuery, SearchResult, SortCondition, SortOrder,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// One filter condition as received on the wire.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/filter-condition-request.ts"
)]
pub struct FilterConditionRequest {
    pub field: String,
    pub operator: String,
    #[ts(type = "unknown")]
    pub value: Option<Value>,
    pub data_type: String,
}

impl FilterConditionRequest {
    fn into_domain(self) -> AppResult<FilterCondition> {
        Ok(FilterCondition {
            field: self.field,
            operator: SearchOperator::from_str(self.operator.as_str())?,
            value: self.value.unwrap_or(Value::Null),
            data_type: self.data_type.parse()?,
        })
    }
}

/// One sort instruction as received on the wire.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/sort-condition-request.ts"
)]
pub struct SortConditionRequest {
    pub field: String,
    #[ts(type = "\"asc\" | \"desc\" | null")]
    pub order: Option<String>,
}

impl SortConditionRequest {
    fn into_domain(self) -> AppResult<SortCondition> {
        Ok(SortCondition {
            field: self.field,
            order: self
                .order
                .as_deref()
                .map(SortOrder::from_str)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// Structured search request body.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/search-query-request.ts"
)]
pub struct SearchQueryRequest {
    pub entity: String,
    pub filters: Option<Vec<FilterConditionRequest>>,
    pub search_text: Option<String>,
    pub search_fields: Option<Vec<String>>,
    pub sort: Option<Vec<SortConditionRequest>>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub include_relations: Option<bool>,
    #[ts(type = "Record<string, string> | null")]
    pub aggregate_functions: Option<BTreeMap<String, String>>,
}

impl SearchQueryRequest {
    /// Converts the wire request into a domain query, applying defaults.
    pub fn into_domain(self) -> AppResult<SearchQuery> {
        let mut query = SearchQuery::for_entity(self.entity);
        query.filters = self
            .filters
            .unwrap_or_default()
            .into_iter()
            .map(FilterConditionRequest::into_domain)
            .collect::<AppResult<Vec<_>>>()?;
        query.search_text = self.search_text;
        query.search_fields = self.search_fields.unwrap_or_default();
        query.sort = self
            .sort
            .unwrap_or_default()
            .into_iter()
            .map(SortConditionRequest::into_domain)
            .collect::<AppResult<Vec<_>>>()?;
        if let Some(page) = self.page {
            query.page = page;
        }
        if let Some(page_size) = self.page_size {
            query.page_size = page_size;
        }
        if let Some(include_relations) = self.include_relations {
            query.include_relations = include_relations;
        }
        query.aggregate_functions = self.aggregate_functions.unwrap_or_default();

        Ok(query)
    }
}

/// Export request body pairing a query with encode options.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/export-request.ts"
)]
pub struct ExportRequest {
    pub query: SearchQueryRequest,
    pub export_options: ExportOptionsRequest,
}

/// Export options as received on the wire.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/export-options-request.ts"
)]
pub struct ExportOptionsRequest {
    pub format: String,
    pub include_headers: Option<bool>,
    pub include_metadata: Option<bool>,
    pub include_relations: Option<bool>,
    pub flatten_json: Option<bool>,
    pub custom_filename: Option<String>,
    pub compression: Option<bool>,
}

impl ExportOptionsRequest {
    /// Converts the wire options into domain options, applying defaults.
    pub fn into_domain(self) -> AppResult<ExportOptions> {
        Ok(ExportOptions {
            format: ExportFormat::from_str(self.format.as_str())?,
            include_headers: self.include_headers.unwrap_or(true),
            include_metadata: self.include_metadata.unwrap_or(true),
            include_relations: self.include_relations.unwrap_or(false),
            flatten_json: self.flatten_json.unwrap_or(true),
            custom_filename: self.custom_filename,
            compression: self.compression.unwrap_or(false),
        })
    }
}

/// Quick-search query parameters.
#[derive(Debug, Deserialize)]
pub struct QuickSearchParams {
    pub entity: String,
    pub q: String,
    pub limit: Option<usize>,
}

/// Distinct field value query parameters.
#[derive(Debug, Deserialize)]
pub struct FieldValuesParams {
    pub search: Option<String>,
    pub limit: Option<usize>,
}

/// Available entities response.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/entity-list-response.ts"
)]
pub struct EntityListResponse {
    pub entities: Vec<String>,
}

/// Field identifiers for one entity.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/entity-fields-response.ts"
)]
pub struct EntityFieldsResponse {
    pub entity: String,
    pub fields: Vec<String>,
    pub success: bool,
}

/// One selectable enum value.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/field-option-response.ts"
)]
pub struct FieldOptionResponse {
    pub value: String,
    pub label: String,
    pub count: Option<u64>,
}

impl From<&FieldOption> for FieldOptionResponse {
    fn from(option: &FieldOption) -> Self {
        Self {
            value: option.value.clone(),
            label: option.label.clone(),
            count: option.count,
        }
    }
}

/// One searchable field definition.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/field-definition-response.ts"
)]
pub struct FieldDefinitionResponse {
    pub field: String,
    pub display_name: String,
    pub field_type: String,
    pub operators: Vec<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub options: Option<Vec<FieldOptionResponse>>,
    pub default_operator: String,
}

impl From<&FieldDefinition> for FieldDefinitionResponse {
    fn from(definition: &FieldDefinition) -> Self {
        Self {
            field: definition.field().as_str().to_owned(),
            display_name: definition.display_name().as_str().to_owned(),
            field_type: definition.field_type().as_str().to_owned(),
            operators: definition
                .operators()
                .iter()
                .map(|operator| operator.as_str().to_owned())
                .collect(),
            min_value: definition.min_value(),
            max_value: definition.max_value(),
            options: definition
                .options()
                .map(|options| options.iter().map(FieldOptionResponse::from).collect()),
            default_operator: definition.default_operator().as_str().to_owned(),
        }
    }
}

/// One filter picker group.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/filter-group-response.ts"
)]
pub struct FilterGroupResponse {
    pub name: String,
    pub display_name: String,
    pub filters: Vec<FieldDefinitionResponse>,
}

impl From<&FilterGroup> for FilterGroupResponse {
    fn from(group: &FilterGroup) -> Self {
        Self {
            name: group.name().as_str().to_owned(),
            display_name: group.display_name().as_str().to_owned(),
            filters: group
                .filters()
                .iter()
                .map(FieldDefinitionResponse::from)
                .collect(),
        }
    }
}

/// Filter definitions for one entity.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/filter-definitions-response.ts"
)]
pub struct FilterDefinitionsResponse {
    pub entity: String,
    pub filter_groups: Vec<FilterGroupResponse>,
    pub total_filters: usize,
}

/// One preset condition echoed to the caller.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/filter-condition-response.ts"
)]
pub struct FilterConditionResponse {
    pub field: String,
    pub operator: String,
    #[ts(type = "unknown")]
    pub value: Value,
    pub data_type: String,
}

impl From<&FilterCondition> for FilterConditionResponse {
    fn from(condition: &FilterCondition) -> Self {
        Self {
            field: condition.field.clone(),
            operator: condition.operator.as_str().to_owned(),
            value: condition.value.clone(),
            data_type: condition.data_type.as_str().to_owned(),
        }
    }
}

/// One preset sort instruction echoed to the caller.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/sort-condition-response.ts"
)]
pub struct SortConditionResponse {
    pub field: String,
    pub order: String,
}

impl From<&SortCondition> for SortConditionResponse {
    fn from(sort: &SortCondition) -> Self {
        Self {
            field: sort.field.clone(),
            order: sort.order.as_str().to_owned(),
        }
    }
}

/// One named predicate bundle.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/filter-preset-response.ts"
)]
pub struct FilterPresetResponse {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub entity: String,
    pub filters: Vec<FilterConditionResponse>,
    pub sort: Vec<SortConditionResponse>,
}

impl From<&FilterPreset> for FilterPresetResponse {
    fn from(preset: &FilterPreset) -> Self {
        Self {
            name: preset.name.clone(),
            display_name: preset.display_name.clone(),
            description: preset.description.clone(),
            entity: preset.entity.clone(),
            filters: preset
                .filters
                .iter()
                .map(FilterConditionResponse::from)
                .collect(),
            sort: preset.sort.iter().map(SortConditionResponse::from).collect(),
        }
    }
}

/// Preset bundles for one entity.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/filter-presets-response.ts"
)]
pub struct FilterPresetsResponse {
    pub entity: String,
    pub presets: Vec<FilterPresetResponse>,
    pub total_presets: usize,
}

/// One distinct stored value.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/field-value-response.ts"
)]
pub struct FieldValueResponse {
    pub value: String,
    pub label: String,
}

/// Distinct values of one field.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/field-values-response.ts"
)]
pub struct FieldValuesResponse {
    pub entity: String,
    pub field: String,
    pub values: Vec<FieldValueResponse>,
    pub total_count: usize,
}

/// Descriptive echo of an executed query.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/query-info-response.ts"
)]
pub struct QueryInfoResponse {
    pub entity: String,
    pub filters_applied: usize,
    pub full_text_search: bool,
    pub relations_included: bool,
}

impl From<QueryInfo> for QueryInfoResponse {
    fn from(info: QueryInfo) -> Self {
        Self {
            entity: info.entity,
            filters_applied: info.filters_applied,
            full_text_search: info.full_text_search,
            relations_included: info.relations_included,
        }
    }
}

/// One page of search results with unpaged totals and aggregates.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/search-result-response.ts"
)]
pub struct SearchResultResponse {
    #[ts(type = "Array<Record<string, unknown>>")]
    pub data: Vec<Value>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    #[ts(type = "Record<string, unknown>")]
    pub aggregations: BTreeMap<String, Value>,
    pub execution_time_ms: f64,
    pub query_info: QueryInfoResponse,
}

impl From<SearchResult> for SearchResultResponse {
    fn from(result: SearchResult) -> Self {
        Self {
            data: result.data,
            total_count: result.total_count,
            page: result.page,
            page_size: result.page_size,
            total_pages: result.total_pages,
            aggregations: result.aggregations,
            execution_time_ms: result.execution_time_ms,
            query_info: result.query_info.into(),
        }
    }
}

/// Quick-search response: the result page plus the echoed search input.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/quick-search-response.ts"
)]
pub struct QuickSearchResponse {
    #[ts(type = "Array<Record<string, unknown>>")]
    pub data: Vec<Value>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub execution_time_ms: f64,
    pub search_query: String,
    pub entity: String,
}

impl QuickSearchResponse {
    /// Builds the response from an executed result and the echoed inputs.
    #[must_use]
    pub fn from_result(result: SearchResult, search_query: String, entity: String) -> Self {
        Self {
            data: result.data,
            total_count: result.total_count,
            page: result.page,
            page_size: result.page_size,
            total_pages: result.total_pages,
            execution_time_ms: result.execution_time_ms,
            search_query,
            entity,
        }
    }
}

/// Completed export payload, base64-encoded for transport.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/export-response.ts"
)]
pub struct ExportResponse {
    pub filename: String,
    pub format: String,
    pub record_count: usize,
    pub size_bytes: usize,
    pub file_data: String,
}
