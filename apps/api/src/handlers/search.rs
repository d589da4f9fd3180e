use axum::Json;
use axum::extract::{Path, Query, State};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use crate::dto::{
    EntityFieldsResponse, EntityListResponse, ExportRequest, ExportResponse, QuickSearchParams,
    QuickSearchResponse, SearchQueryRequest, SearchResultResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// Lists every searchable entity.
pub async fn list_entities_handler(State(state): State<AppState>) -> Json<EntityListResponse> {
    Json(EntityListResponse {
        entities: state
            .registry
            .entities()
            .into_iter()
            .map(str::to_owned)
            .collect(),
    })
}

/// Lists the field identifiers of one entity.
///
/// Unknown entities degrade to an empty field list rather than failing.
pub async fn entity_fields_handler(
    State(state): State<AppState>,
    Path(entity): Path<String>,
) -> Json<EntityFieldsResponse> {
    let fields = state.registry.field_names(entity.as_str());
    Json(EntityFieldsResponse {
        entity,
        fields,
        success: true,
    })
}

/// Executes a structured search query.
pub async fn execute_search_handler(
    State(state): State<AppState>,
    Json(payload): Json<SearchQueryRequest>,
) -> ApiResult<Json<SearchResultResponse>> {
    let query = payload.into_domain()?;
    debug!(
        entity = %query.entity,
        filters = query.filters.len(),
        page = query.page,
        "structured search requested"
    );

    let result = state.search_service.execute(&query).await?;
    Ok(Json(result.into()))
}

/// Free-text quick search bounded by `limit`.
pub async fn quick_search_handler(
    State(state): State<AppState>,
    Query(params): Query<QuickSearchParams>,
) -> ApiResult<Json<QuickSearchResponse>> {
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let result = state
        .search_service
        .quick_search(params.entity.as_str(), params.q.as_str(), Vec::new(), limit)
        .await?;

    Ok(Json(QuickSearchResponse::from_result(
        result,
        params.q,
        params.entity,
    )))
}

/// Exports the query's unpaged match set in the requested format.
pub async fn export_handler(
    State(state): State<AppState>,
    Json(payload): Json<ExportRequest>,
) -> ApiResult<Json<ExportResponse>> {
    let query = payload.query.into_domain()?;
    let options = payload.export_options.into_domain()?;

    let file = state.export_service.export(&query, &options).await?;

    Ok(Json(ExportResponse {
        filename: file.filename,
        format: file.format.as_str().to_owned(),
        record_count: file.record_count,
        size_bytes: file.bytes.len(),
        file_data: STANDARD.encode(&file.bytes),
    }))
}
