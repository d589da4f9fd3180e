//! Application services and ports for the search pipeline.

#![forbid(unsafe_code)]

mod aggregate;
mod export_service;
mod field_registry;
mod search_ports;
mod search_service;

pub use aggregate::aggregate_rows;
pub use export_service::ExportService;
pub use field_registry::{EntitySchema, FieldRegistry};
pub use search_ports::CandidateProvider;
pub use search_service::SearchService;
