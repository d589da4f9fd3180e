//! Capstan API composition root.

#![forbid(unsafe_code)]

mod dto;
mod error;
mod handlers;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use capstan_application::{ExportService, FieldRegistry, SearchService};
use capstan_core::AppError;
use capstan_infrastructure::{SeededCandidateProvider, seeded_entity_schemas};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
    let search_timeout_ms = env::var("SEARCH_TIMEOUT_MS")
        .ok()
        .map(|value| {
            value.parse::<u64>().map_err(|error| {
                AppError::Validation(format!("invalid SEARCH_TIMEOUT_MS: {error}"))
            })
        })
        .transpose()?
        .unwrap_or(5000);

    let registry = Arc::new(FieldRegistry::new(seeded_entity_schemas()?)?);
    let provider = Arc::new(SeededCandidateProvider::new());
    let search_service = SearchService::new(
        registry.clone(),
        provider,
        Duration::from_millis(search_timeout_ms),
    );
    let export_service = ExportService::new(search_service.clone());

    let app_state = AppState {
        registry,
        search_service,
        export_service,
    };

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route(
            "/search/entities",
            get(handlers::search::list_entities_handler),
        )
        .route(
            "/search/fields/{entity}",
            get(handlers::search::entity_fields_handler),
        )
        .route(
            "/filters/definitions/{entity}",
            get(handlers::filters::filter_definitions_handler),
        )
        .route(
            "/filters/presets/{entity}",
            get(handlers::filters::filter_presets_handler),
        )
        .route(
            "/filters/values/{entity}/{field}",
            get(handlers::filters::field_values_handler),
        )
        .route("/search/query", post(handlers::search::execute_search_handler))
        .route(
            "/search/quick-search",
            post(handlers::search::quick_search_handler),
        )
        .route("/search/export", post(handlers::search::export_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "capstan-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
