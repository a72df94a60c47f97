//! Duplicate search models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::validate_project_id;
use crate::utils::error::{AppError, AppResult};

/// Maximum number of duplicate matches a caller may request.
pub const MAX_DUPLICATE_LIMIT: usize = 50;

fn default_threshold() -> f32 {
    0.90
}

fn default_limit() -> usize {
    10
}

fn default_node_type() -> Option<String> {
    Some("GatherItem".to_string())
}

/// Request for a semantic duplicate search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateSearchRequest {
    /// Text content to check for duplicates.
    pub content: String,
    /// Project for tenant isolation.
    pub project_id: String,
    /// Minimum cosine similarity for a match, in [0, 1].
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Maximum results, in [1, 50].
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Optional node type filter.
    #[serde(rename = "type", default = "default_node_type")]
    pub node_type: Option<String>,
    /// Optional department filter.
    #[serde(default)]
    pub department: Option<String>,
    /// Node ids excluded from the search (e.g. the item being edited).
    #[serde(default)]
    pub exclude_node_ids: Vec<String>,
}

impl DuplicateSearchRequest {
    pub fn new(content: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            project_id: project_id.into(),
            threshold: default_threshold(),
            limit: default_limit(),
            node_type: default_node_type(),
            department: None,
            exclude_node_ids: Vec::new(),
        }
    }

    /// Enforced before any embedding call is made.
    pub fn validate(&self) -> AppResult<()> {
        validate_project_id(&self.project_id)?;
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(AppError::validation(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if self.limit < 1 || self.limit > MAX_DUPLICATE_LIMIT {
            return Err(AppError::validation(format!(
                "limit must be within [1, {}], got {}",
                MAX_DUPLICATE_LIMIT, self.limit
            )));
        }
        Ok(())
    }
}

/// Single duplicate search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMatch {
    pub node_id: String,
    /// Cosine similarity against the query content, in [0, 1].
    pub similarity: f32,
    pub content: String,
    pub properties: Map<String, Value>,
}

/// Response for a duplicate search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateSearchResponse {
    pub duplicates: Vec<DuplicateMatch>,
    pub query_embedding_ms: f64,
    pub search_ms: f64,
    pub total_ms: f64,
}

/// A character matched by the dual-embedding similarity path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterMatch {
    pub id: String,
    pub name: String,
    pub similarity: f32,
}
