//! Batch node creation models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::validate_project_id;
use crate::utils::error::{AppError, AppResult};

/// Maximum number of nodes accepted by a single batch-create request.
pub const MAX_BATCH_NODES: usize = 50;

/// Single node input for batch creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchNodeInput {
    /// Node type label (e.g. "GatherItem").
    #[serde(rename = "type")]
    pub node_type: String,
    /// Full text content; the embedding is generated from this.
    pub content: String,
    /// Owning project (24-hex ObjectId format).
    pub project_id: String,
    /// Additional node properties, stored verbatim.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Request for batch node creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCreateRequest {
    pub nodes: Vec<BatchNodeInput>,
}

impl BatchCreateRequest {
    /// Fail fast on empty or oversized batches and malformed project ids,
    /// before any embedding or store call is attempted.
    pub fn validate(&self) -> AppResult<()> {
        if self.nodes.is_empty() {
            return Err(AppError::validation("batch must contain at least 1 node"));
        }
        if self.nodes.len() > MAX_BATCH_NODES {
            return Err(AppError::validation(format!(
                "batch must contain at most {} nodes, got {}",
                MAX_BATCH_NODES,
                self.nodes.len()
            )));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            validate_project_id(&node.project_id)
                .map_err(|e| AppError::validation(format!("node {}: {}", i, e)))?;
            if node.node_type.trim().is_empty() {
                return Err(AppError::validation(format!("node {}: type must not be empty", i)));
            }
        }
        Ok(())
    }
}

/// Embedding metadata echoed back per created node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingMeta {
    pub dimensions: usize,
    pub model: String,
}

/// Single node output from batch creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchNodeOutput {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub properties: Map<String, Value>,
    pub embedding: EmbeddingMeta,
}

/// Wall-clock timing split for a batch operation. Phase timings are sums
/// across chunks, not critical-path durations, since chunks run concurrently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTiming {
    pub embedding_ms: f64,
    pub write_ms: f64,
    pub total_ms: f64,
}

/// Response for batch node creation. Partial failure is reported through
/// `created` vs `failed` counts, never as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateResponse {
    pub created: usize,
    pub failed: usize,
    pub node_ids: Vec<String>,
    pub nodes: Vec<BatchNodeOutput>,
    pub timing: BatchTiming,
}
