//! Neo4j HTTP Graph Store
//!
//! Implements [`GraphStore`] over Neo4j's HTTP transaction-commit endpoint
//! (`POST {uri}/db/{database}/tx/commit`). Each call is a single
//! auto-committed transaction; statement errors reported by the server are
//! surfaced as `AppError::Store`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::store::GraphStore;
use crate::utils::error::{AppError, AppResult};

const DEFAULT_URI: &str = "http://localhost:7474";
const DEFAULT_DATABASE: &str = "neo4j";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for the Neo4j HTTP endpoint.
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Neo4jConfig {
    /// Read configuration from the environment. `NEO4J_PASSWORD` is
    /// required; the rest default to a local single-instance setup.
    pub fn from_env() -> AppResult<Self> {
        let password = std::env::var("NEO4J_PASSWORD")
            .map_err(|_| AppError::config("NEO4J_PASSWORD environment variable is required"))?;
        Ok(Self {
            uri: std::env::var("NEO4J_URI").unwrap_or_else(|_| DEFAULT_URI.to_string()),
            username: std::env::var("NEO4J_USERNAME").unwrap_or_else(|_| "neo4j".to_string()),
            password,
            database: std::env::var("NEO4J_DATABASE")
                .unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

// ---------------------------------------------------------------------------
// Store implementation
// ---------------------------------------------------------------------------

/// Graph store backed by the Neo4j HTTP API.
pub struct HttpGraphStore {
    client: reqwest::Client,
    config: Neo4jConfig,
    endpoint: String,
}

impl HttpGraphStore {
    pub fn new(config: Neo4jConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::config(format!("failed to build HTTP client: {}", e)))?;
        let endpoint = format!(
            "{}/db/{}/tx/commit",
            config.uri.trim_end_matches('/'),
            config.database
        );
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Node labels are interpolated into the statement text (Cypher has no
    /// label parameters), so restrict them to identifier characters.
    fn validate_label(label: &str) -> AppResult<()> {
        if label.is_empty()
            || !label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::validation(format!(
                "invalid node label: {:?}",
                label
            )));
        }
        Ok(())
    }

    async fn commit(&self, statement: &str, parameters: Value) -> AppResult<TxResponse> {
        let body = json!({
            "statements": [{
                "statement": statement,
                "parameters": parameters,
            }]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::store(format!("Neo4j request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::store(format!(
                "Neo4j HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: TxResponse = response
            .json()
            .await
            .map_err(|e| AppError::store(format!("failed to parse Neo4j response: {}", e)))?;

        if let Some(err) = parsed.errors.first() {
            return Err(AppError::store(format!("{}: {}", err.code, err.message)));
        }
        Ok(parsed)
    }

    /// Zip result columns with each row into JSON objects.
    fn rows_to_objects(result: TxResult) -> Vec<Value> {
        result
            .data
            .into_iter()
            .map(|r| {
                let mut object = Map::new();
                for (column, value) in result.columns.iter().zip(r.row.into_iter()) {
                    object.insert(column.clone(), value);
                }
                Value::Object(object)
            })
            .collect()
    }
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn create_node(&self, labels: &[&str], properties: Value) -> AppResult<String> {
        for label in labels {
            Self::validate_label(label)?;
        }
        let label_fragment: String = labels.iter().map(|l| format!(":{}", l)).collect();
        let statement = format!("CREATE (n{}) SET n = $props RETURN n.id AS id", label_fragment);

        let response = self.commit(&statement, json!({ "props": properties })).await?;
        let rows = response
            .results
            .into_iter()
            .next()
            .map(Self::rows_to_objects)
            .unwrap_or_default();

        rows.first()
            .and_then(|row| row.get("id"))
            .and_then(|id| id.as_str())
            .map(|id| id.to_string())
            .ok_or_else(|| AppError::store("create_node returned no id"))
    }

    async fn run_query(&self, query: &str, params: Value) -> AppResult<Vec<Value>> {
        let response = self.commit(query, params).await?;
        Ok(response
            .results
            .into_iter()
            .next()
            .map(Self::rows_to_objects)
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
