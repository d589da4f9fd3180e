use async_trait::async_trait;
use capstan_core::AppResult;
use serde_json::Value;

/// Read-only source of candidate rows for the query executor.
///
/// Implementations must tolerate concurrent readers and return rows in a
/// stable order so that repeated executions of the same query are
/// deterministic. An unknown entity yields an empty set rather than an
/// error; the executor decides per call path whether that is a hard
/// failure.
#[async_trait]
pub trait CandidateProvider: Send + Sync {
    /// Returns every candidate row for an entity.
    async fn candidate_rows(&self, entity: &str) -> AppResult<Vec<Value>>;
}
