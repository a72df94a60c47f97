//! Shared test doubles for the integration suite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use brain_service::services::embedding::{
    cosine_similarity, EmbeddingClient, EmbeddingError, EmbeddingProvider, RetryPolicy,
};
use brain_service::services::graph::GraphStore;
use brain_service::services::llm::{ChatMessage, LlmProvider, LlmResult};
use brain_service::utils::error::AppResult;
use brain_service::BrainService;

pub const PROJECT_ID: &str = "507f1f77bcf86cd799439011";

/// Texts containing this marker make the embedding provider fail
/// non-retryably, so a whole chunk can be failed on demand.
pub const FAIL_MARKER: &str = "[FAIL]";

// ---------------------------------------------------------------------------
// Embedding provider
// ---------------------------------------------------------------------------

/// Deterministic embedding provider.
///
/// Identical text always produces the identical vector. Tests that need
/// exact cosine values pre-register vectors with [`assign`](Self::assign);
/// everything else gets a hash-derived vector with signed components.
pub struct MockEmbeddingProvider {
    dim: usize,
    assigned: Mutex<HashMap<String, Vec<f32>>>,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            dim: 8,
            assigned: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Pin the vector returned for an exact text.
    pub fn assign(&self, text: &str, vector: Vec<f32>) {
        self.assigned
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.assigned.lock().unwrap().get(text) {
            return vector.clone();
        }
        (0..self.dim)
            .map(|seed| {
                let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ (seed as u64);
                for byte in text.bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(0x100_0000_01b3);
                }
                ((hash % 2000) as f32 / 1000.0) - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if texts.iter().any(|t| t.contains(FAIL_MARKER)) {
            return Err(EmbeddingError::AuthenticationFailed {
                message: "scripted failure".to_string(),
            });
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn model_name(&self) -> &str {
        "mock-embedding-model"
    }

    fn max_batch_size(&self) -> usize {
        128
    }
}

// ---------------------------------------------------------------------------
// Graph store
// ---------------------------------------------------------------------------

struct StoredNode {
    labels: Vec<String>,
    properties: Value,
}

/// In-memory graph store that evaluates the issued queries from their
/// parameters: cosine similarity search, recency-ordered department
/// fetches, and character embedding fetches.
pub struct MemoryGraphStore {
    nodes: Mutex<Vec<StoredNode>>,
    query_count: AtomicUsize,
}

impl MemoryGraphStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            nodes: Mutex::new(Vec::new()),
            query_count: AtomicUsize::new(0),
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    pub fn count_with_label(&self, label: &str) -> usize {
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.labels.iter().any(|l| l == label))
            .count()
    }

    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    /// Insert a character row directly, the way an upstream character
    /// service would have written it.
    pub async fn seed_character(
        &self,
        id: &str,
        name: &str,
        personality: Option<Vec<f32>>,
        appearance: Option<Vec<f32>>,
    ) {
        let mut properties = Map::new();
        properties.insert("id".to_string(), json!(id));
        properties.insert("name".to_string(), json!(name));
        properties.insert("projectId".to_string(), json!(PROJECT_ID));
        if let Some(p) = personality {
            properties.insert("embedding_personality".to_string(), json!(p));
        }
        if let Some(a) = appearance {
            properties.insert("embedding_appearance".to_string(), json!(a));
        }
        self.create_node(&["Character"], Value::Object(properties))
            .await
            .unwrap();
    }

    fn similarity_rows(&self, params: &Value) -> Vec<Value> {
        let query_embedding = vector_from(&params["embedding"]).unwrap_or_default();
        let threshold = params["threshold"].as_f64().unwrap_or(0.0) as f32;
        let limit = params["limit"].as_u64().unwrap_or(10) as usize;
        let project_id = params["project_id"].as_str().unwrap_or_default();
        let node_type = params.get("node_type").and_then(|v| v.as_str());
        let department = params.get("department").and_then(|v| v.as_str());
        let exclude_ids: Vec<&str> = params
            .get("exclude_ids")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();

        let nodes = self.nodes.lock().unwrap();
        let mut scored: Vec<(f32, Value)> = nodes
            .iter()
            .filter(|n| n.labels.iter().any(|l| l == "GatherItem"))
            .filter(|n| n.properties["projectId"].as_str() == Some(project_id))
            .filter(|n| match node_type {
                Some(t) => n.properties["type"].as_str() == Some(t),
                None => true,
            })
            .filter(|n| match department {
                Some(d) => n.properties["department"].as_str() == Some(d),
                None => true,
            })
            .filter(|n| match n.properties["id"].as_str() {
                Some(id) => !exclude_ids.contains(&id),
                None => true,
            })
            .filter_map(|n| {
                let embedding = vector_from(&n.properties["embedding"])?;
                let similarity = cosine_similarity(&query_embedding, &embedding);
                if similarity >= threshold {
                    Some((
                        similarity,
                        json!({
                            "nodeId": n.properties["id"].clone(),
                            "similarity": similarity,
                            "content": n.properties["content"].clone(),
                            "properties": n.properties.clone(),
                        }),
                    ))
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored.into_iter().map(|(_, row)| row).collect()
    }

    fn recency_rows(&self, params: &Value) -> Vec<Value> {
        let project_id = params["project_id"].as_str().unwrap_or_default();
        let department = params["department"].as_str().unwrap_or_default();
        let limit = params["limit"].as_u64().unwrap_or(20) as usize;

        let nodes = self.nodes.lock().unwrap();
        let mut rows: Vec<Value> = nodes
            .iter()
            .filter(|n| n.labels.iter().any(|l| l == "GatherItem"))
            .filter(|n| n.properties["projectId"].as_str() == Some(project_id))
            .filter(|n| n.properties["department"].as_str() == Some(department))
            .filter(|n| n.properties.get("embedding").map(|e| !e.is_null()).unwrap_or(false))
            .map(|n| {
                json!({
                    "nodeId": n.properties["id"].clone(),
                    "content": n.properties["content"].clone(),
                    "summary": n.properties.get("summary").cloned().unwrap_or(Value::Null),
                    "qualityScore": n.properties.get("qualityScore").cloned().unwrap_or(Value::Null),
                })
            })
            .collect();

        // Insertion order stands in for created_at; most recent first.
        rows.reverse();
        rows.truncate(limit);
        rows
    }

    fn character_rows(&self, params: &Value) -> Vec<Value> {
        let project_id = params["project_id"].as_str().unwrap_or_default();
        let nodes = self.nodes.lock().unwrap();
        nodes
            .iter()
            .filter(|n| n.labels.iter().any(|l| l == "Character"))
            .filter(|n| n.properties["projectId"].as_str() == Some(project_id))
            .map(|n| {
                json!({
                    "id": n.properties["id"].clone(),
                    "name": n.properties["name"].clone(),
                    "personality": n.properties.get("embedding_personality").cloned().unwrap_or(Value::Null),
                    "appearance": n.properties.get("embedding_appearance").cloned().unwrap_or(Value::Null),
                })
            })
            .collect()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn create_node(&self, labels: &[&str], properties: Value) -> AppResult<String> {
        let id = properties["id"].as_str().unwrap_or_default().to_string();
        self.nodes.lock().unwrap().push(StoredNode {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            properties,
        });
        Ok(id)
    }

    async fn run_query(&self, query: &str, params: Value) -> AppResult<Vec<Value>> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        if params.get("embedding").is_some() && params.get("threshold").is_some() {
            Ok(self.similarity_rows(&params))
        } else if query.contains(":Character") {
            Ok(self.character_rows(&params))
        } else if params.get("department").is_some() {
            Ok(self.recency_rows(&params))
        } else {
            Ok(Vec::new())
        }
    }
}

fn vector_from(value: &Value) -> Option<Vec<f32>> {
    let array = value.as_array()?;
    array
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

// ---------------------------------------------------------------------------
// LLM
// ---------------------------------------------------------------------------

/// LLM double that dispatches on the prompt kind.
pub struct ScriptedLlm {
    pub themes_response: String,
    pub summary_response: String,
    pub coverage_response: String,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            themes_response: r#"["betrayal", "family loyalty"]"#.to_string(),
            summary_response: "Aggregated summary.".to_string(),
            coverage_response: r#"{"coveredAspects": [], "gaps": [], "recommendations": []}"#
                .to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn with_coverage_response(coverage_response: &str) -> Arc<Self> {
        Arc::new(Self {
            themes_response: r#"["betrayal", "family loyalty"]"#.to_string(),
            summary_response: "Aggregated summary.".to_string(),
            coverage_response: coverage_response.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _temperature: f32,
        _max_tokens: u32,
    ) -> LlmResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        if prompt.contains("Analyze the coverage") {
            Ok(self.coverage_response.clone())
        } else if prompt.contains("themes or topics") {
            Ok(self.themes_response.clone())
        } else if prompt.contains("concise summary") {
            Ok(self.summary_response.clone())
        } else {
            Ok(String::new())
        }
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub service: BrainService,
    pub embeddings: Arc<MockEmbeddingProvider>,
    pub store: Arc<MemoryGraphStore>,
    pub llm: Arc<ScriptedLlm>,
}

pub fn harness() -> Harness {
    harness_with_llm(ScriptedLlm::new())
}

pub fn harness_with_llm(llm: Arc<ScriptedLlm>) -> Harness {
    let embeddings = MockEmbeddingProvider::new();
    let store = MemoryGraphStore::new();
    let client = Arc::new(EmbeddingClient::new(
        Arc::clone(&embeddings) as Arc<dyn EmbeddingProvider>,
        RetryPolicy::immediate(3),
    ));
    let service = BrainService::new(
        client,
        Arc::clone(&store) as Arc<dyn GraphStore>,
        Arc::clone(&llm) as Arc<dyn LlmProvider>,
    );
    Harness {
        service,
        embeddings,
        store,
        llm,
    }
}
