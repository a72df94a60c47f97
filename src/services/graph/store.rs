//! Graph store trait.
//!
//! The external store owns persistence, the query engine, and the
//! cosine-similarity primitive. This crate only builds queries and maps
//! rows.

use async_trait::async_trait;
use serde_json::Value;

use crate::utils::error::AppResult;

/// Async seam to the external graph database.
///
/// Object-safe and `Send + Sync`; shared via `Arc<dyn GraphStore>` across
/// concurrent sub-batches. Implementations must support concurrent calls —
/// callers never share a single session across in-flight operations.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create a node with the given labels and properties, returning the
    /// stored node's `id` property.
    async fn create_node(&self, labels: &[&str], properties: Value) -> AppResult<String>;

    /// Run a parameterized query and return the result rows, each as a JSON
    /// object keyed by the query's return columns.
    async fn run_query(&self, query: &str, params: Value) -> AppResult<Vec<Value>>;

    /// Check that the store is reachable with a trivial query.
    async fn health_check(&self) -> AppResult<()> {
        self.run_query("RETURN 1 AS health", Value::Object(serde_json::Map::new()))
            .await
            .map(|_| ())
    }
}
