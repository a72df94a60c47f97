//! Similarity Index
//!
//! Builds the parameterized Cypher queries this crate needs — cosine
//! similarity search with conjunctive optional filters, recency-ordered
//! department fetches, node creation — and maps result rows to typed
//! values. The similarity predicate and ranking are pushed into the store;
//! the limit applies after ranking.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::store::GraphStore;
use crate::models::duplicates::DuplicateMatch;
use crate::utils::error::{AppError, AppResult};

/// Optional conjunctive filters for a similarity search. Unset filters are
/// omitted from the query predicate entirely.
#[derive(Debug, Clone, Default)]
pub struct SimilarityFilter {
    pub node_type: Option<String>,
    pub department: Option<String>,
    pub exclude_ids: Vec<String>,
}

/// A department item fetched for context aggregation, most recent first.
#[derive(Debug, Clone)]
pub struct DepartmentRecord {
    pub node_id: String,
    pub content: String,
    pub summary: Option<String>,
    pub quality_score: Option<f64>,
}

/// A character row with its two embedding fields, for fused similarity.
#[derive(Debug, Clone)]
pub struct CharacterRecord {
    pub id: String,
    pub name: String,
    pub personality: Option<Vec<f32>>,
    pub appearance: Option<Vec<f32>>,
}

/// Query builder and row mapper over the external graph store.
pub struct SimilarityIndex {
    store: Arc<dyn GraphStore>,
}

impl SimilarityIndex {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Create a gather node. Generates the id and `created_at` here; caller
    /// properties are merged in but cannot override the core fields.
    pub async fn create_node(
        &self,
        node_type: &str,
        content: &str,
        project_id: &str,
        embedding: &[f32],
        properties: &Map<String, Value>,
    ) -> AppResult<String> {
        if embedding.is_empty() {
            return Err(AppError::validation(
                "node embedding must not be empty",
            ));
        }

        let node_id = Uuid::new_v4().to_string();
        let mut props = properties.clone();
        props.insert("id".to_string(), json!(node_id));
        props.insert("type".to_string(), json!(node_type));
        props.insert("content".to_string(), json!(content));
        props.insert("projectId".to_string(), json!(project_id));
        props.insert("embedding".to_string(), json!(embedding));
        props.insert("created_at".to_string(), json!(Utc::now().to_rfc3339()));

        self.store
            .create_node(&[node_type, "GatherItem"], Value::Object(props))
            .await
    }

    /// Threshold-filtered cosine similarity search.
    ///
    /// An empty query embedding is a caller bug, not a "no results" case:
    /// it would make every stored vector look equally (dis)similar, so it
    /// fails loudly before any query is issued.
    pub async fn find_similar(
        &self,
        project_id: &str,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
        filter: &SimilarityFilter,
    ) -> AppResult<Vec<DuplicateMatch>> {
        if embedding.is_empty() {
            return Err(AppError::validation(
                "query embedding must not be empty",
            ));
        }

        let mut clauses = String::new();
        let mut params = Map::new();
        params.insert("project_id".to_string(), json!(project_id));
        params.insert("embedding".to_string(), json!(embedding));
        params.insert("threshold".to_string(), json!(threshold));
        params.insert("limit".to_string(), json!(limit));

        if let Some(ref node_type) = filter.node_type {
            clauses.push_str("\n          AND n.type = $node_type");
            params.insert("node_type".to_string(), json!(node_type));
        }
        if let Some(ref department) = filter.department {
            clauses.push_str("\n          AND n.department = $department");
            params.insert("department".to_string(), json!(department));
        }
        if !filter.exclude_ids.is_empty() {
            clauses.push_str("\n          AND NOT n.id IN $exclude_ids");
            params.insert("exclude_ids".to_string(), json!(filter.exclude_ids));
        }

        let query = format!(
            "MATCH (n:GatherItem {{projectId: $project_id}})\n\
             WHERE n.embedding IS NOT NULL{}\n\
             WITH n, gds.similarity.cosine(n.embedding, $embedding) AS similarity\n\
             WHERE similarity >= $threshold\n\
             RETURN n.id AS nodeId, similarity, n.content AS content, properties(n) AS properties\n\
             ORDER BY similarity DESC\n\
             LIMIT $limit",
            clauses
        );

        let rows = self.store.run_query(&query, Value::Object(params)).await?;
        Ok(rows.iter().filter_map(Self::row_to_match).collect())
    }

    /// Most recent items of one department that carry an embedding.
    pub async fn recent_department_items(
        &self,
        project_id: &str,
        department: &str,
        limit: usize,
    ) -> AppResult<Vec<DepartmentRecord>> {
        let query = "MATCH (n:GatherItem {projectId: $project_id, department: $department})\n\
                     WHERE n.embedding IS NOT NULL\n\
                     RETURN n.id AS nodeId, n.content AS content, n.summary AS summary,\n\
                            n.qualityScore AS qualityScore\n\
                     ORDER BY n.created_at DESC\n\
                     LIMIT $limit";

        let params = json!({
            "project_id": project_id,
            "department": department,
            "limit": limit,
        });

        let rows = self.store.run_query(query, params).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(DepartmentRecord {
                    node_id: row.get("nodeId")?.as_str()?.to_string(),
                    content: row.get("content")?.as_str()?.to_string(),
                    summary: row
                        .get("summary")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string()),
                    quality_score: row.get("qualityScore").and_then(|v| v.as_f64()),
                })
            })
            .collect())
    }

    /// All characters of a project with their personality/appearance
    /// embeddings. Fusion happens in-process, so both vectors come back raw.
    pub async fn character_embeddings(&self, project_id: &str) -> AppResult<Vec<CharacterRecord>> {
        let query = "MATCH (c:Character {projectId: $project_id})\n\
                     RETURN c.id AS id, c.name AS name,\n\
                            c.embedding_personality AS personality,\n\
                            c.embedding_appearance AS appearance";

        let params = json!({ "project_id": project_id });
        let rows = self.store.run_query(query, params).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(CharacterRecord {
                    id: row.get("id")?.as_str()?.to_string(),
                    name: row.get("name")?.as_str()?.to_string(),
                    personality: row.get("personality").and_then(value_to_vector),
                    appearance: row.get("appearance").and_then(value_to_vector),
                })
            })
            .collect())
    }

    /// Map one similarity row to a typed match; malformed rows are dropped
    /// with a warning rather than failing the whole result set.
    fn row_to_match(row: &Value) -> Option<DuplicateMatch> {
        let node_id = row.get("nodeId")?.as_str()?.to_string();
        let similarity = row.get("similarity")?.as_f64()? as f32;
        let content = row
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let properties = match row.get("properties") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        // Store-side cosine can overshoot the bounds by float noise; clamp
        // that, but drop anything grossly out of range as a store defect.
        if !(-1e-3..=1.0 + 1e-3).contains(&similarity) {
            tracing::warn!(node_id = %node_id, similarity, "dropping match with out-of-range similarity");
            return None;
        }
        Some(DuplicateMatch {
            node_id,
            similarity: similarity.clamp(0.0, 1.0),
            content,
            properties,
        })
    }
}

/// Convert a JSON array of numbers into an f32 vector.
fn value_to_vector(value: &Value) -> Option<Vec<f32>> {
    let array = value.as_array()?;
    let mut out = Vec::with_capacity(array.len());
    for item in array {
        out.push(item.as_f64()? as f32);
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
