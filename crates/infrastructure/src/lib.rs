//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod seeded_candidate_provider;
mod seeded_schemas;

pub use seeded_candidate_provider::SeededCandidateProvider;
pub use seeded_schemas::seeded_entity_schemas;
