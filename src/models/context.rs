//! Department context models.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::validate_project_id;
use crate::utils::error::{AppError, AppResult};

/// Maximum items fetched per source department.
pub const MAX_CONTEXT_LIMIT: usize = 100;

fn default_context_limit() -> usize {
    20
}

/// Request for cross-department context aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentContextRequest {
    pub project_id: String,
    /// Target department the context is assembled for.
    pub department: String,
    /// Earlier departments to pull context from, in pipeline order.
    #[serde(default)]
    pub previous_departments: Vec<String>,
    /// Items fetched per department, in [1, 100].
    #[serde(default = "default_context_limit")]
    pub limit: usize,
}

impl DepartmentContextRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_project_id(&self.project_id)?;
        if self.department.trim().is_empty() {
            return Err(AppError::validation("department must not be empty"));
        }
        if self.limit < 1 || self.limit > MAX_CONTEXT_LIMIT {
            return Err(AppError::validation(format!(
                "limit must be within [1, {}], got {}",
                MAX_CONTEXT_LIMIT, self.limit
            )));
        }
        Ok(())
    }
}

/// One of a department's top items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentItem {
    pub node_id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub relevance: f32,
}

/// Aggregated context for a single source department.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentContextData {
    pub item_count: usize,
    pub quality_score: f64,
    /// Most recent items, at most 5.
    pub top_items: Vec<DepartmentItem>,
    pub key_themes: Vec<String>,
}

/// An item relevant to the target department, across all sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevantItem {
    pub node_id: String,
    pub department: String,
    pub content: String,
    pub relevance_to_target: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextTiming {
    pub query_ms: f64,
    pub aggregation_ms: f64,
    pub total_ms: f64,
}

/// Response for department context aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentContextResponse {
    pub project_id: String,
    pub target_department: String,
    /// Per-department context, keyed by department slug. Departments that
    /// yielded no items are absent.
    pub context: HashMap<String, DepartmentContextData>,
    pub aggregated_summary: String,
    /// Cross-department items, at most 20.
    pub relevant_items: Vec<RelevantItem>,
    pub total_items_aggregated: usize,
    pub timing: ContextTiming,
}
