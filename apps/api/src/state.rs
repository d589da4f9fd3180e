use std::sync::Arc;

use capstan_application::{ExportService, FieldRegistry, SearchService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<FieldRegistry>,
    pub search_service: SearchService,
    pub export_service: ExportService,
}
