use axum::Json;
use axum::extract::{Path, Query, State};

use crate::dto::{
    FieldValueResponse, FieldValuesParams, FieldValuesResponse, FilterDefinitionsResponse,
    FilterGroupResponse, FilterPresetResponse, FilterPresetsResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// Lists the filter picker groups of one entity.
///
/// Unknown entities degrade to an empty group list rather than failing.
pub async fn filter_definitions_handler(
    State(state): State<AppState>,
    Path(entity): Path<String>,
) -> Json<FilterDefinitionsResponse> {
    let filter_groups: Vec<FilterGroupResponse> = state
        .registry
        .filter_groups(entity.as_str())
        .iter()
        .map(FilterGroupResponse::from)
        .collect();
    let total_filters = filter_groups.iter().map(|group| group.filters.len()).sum();

    Json(FilterDefinitionsResponse {
        entity,
        filter_groups,
        total_filters,
    })
}

/// Lists the preset predicate bundles of one entity.
pub async fn filter_presets_handler(
    State(state): State<AppState>,
    Path(entity): Path<String>,
) -> Json<FilterPresetsResponse> {
    let presets: Vec<FilterPresetResponse> = state
        .registry
        .presets(entity.as_str())
        .iter()
        .map(FilterPresetResponse::from)
        .collect();
    let total_presets = presets.len();

    Json(FilterPresetsResponse {
        entity,
        presets,
        total_presets,
    })
}

/// Lists the distinct stored values of one field, optionally narrowed by a
/// case-insensitive substring.
pub async fn field_values_handler(
    State(state): State<AppState>,
    Path((entity, field)): Path<(String, String)>,
    Query(params): Query<FieldValuesParams>,
) -> ApiResult<Json<FieldValuesResponse>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let values = state
        .search_service
        .distinct_field_values(
            entity.as_str(),
            field.as_str(),
            params.search.as_deref(),
            limit,
        )
        .await?;

    let values: Vec<FieldValueResponse> = values
        .into_iter()
        .map(|value| {
            let label = value
                .split('_')
                .map(|word| {
                    let mut characters = word.chars();
                    match characters.next() {
                        Some(first) => {
                            first.to_uppercase().collect::<String>() + characters.as_str()
                        }
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            FieldValueResponse { value, label }
        })
        .collect();
    let total_count = values.len();

    Ok(Json(FieldValuesResponse {
        entity,
        field,
        values,
        total_count,
    }))
}
