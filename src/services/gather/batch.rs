//! Batch Ingestion Coordinator
//!
//! Splits an ingestion request into chunks, embeds each chunk in one
//! batched provider call, writes the nodes, and runs chunks concurrently
//! under a counting semaphore. The semaphore protects the embedding
//! provider and the store from overload; correctness never depends on it.
//!
//! Chunks share no mutable item-level state. Each task returns its own
//! `ChunkOutcome`; aggregate counters are produced by reducing the
//! outcomes after all tasks have joined, so the design stays correct on a
//! preemptively-scheduled runtime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::models::batch::{
    BatchCreateRequest, BatchCreateResponse, BatchNodeInput, BatchNodeOutput, BatchTiming,
    EmbeddingMeta,
};
use crate::services::embedding::EmbeddingClient;
use crate::services::graph::SimilarityIndex;
use crate::utils::error::{AppError, AppResult};

/// Items per embedding/write chunk.
pub const CHUNK_SIZE: usize = 50;

/// Maximum chunk operations in flight at once, system-wide per coordinator.
pub const MAX_CONCURRENT_CHUNKS: usize = 5;

/// Result of processing one chunk. Failure is all-or-nothing per chunk:
/// a chunk whose write phase fails reports every item failed and keeps no
/// partial ids.
#[derive(Debug)]
struct ChunkOutcome {
    chunk_index: usize,
    node_ids: Vec<String>,
    outputs: Vec<BatchNodeOutput>,
    failed: usize,
    embedding_ms: f64,
    write_ms: f64,
}

impl ChunkOutcome {
    fn failure(chunk_index: usize, size: usize, embedding_ms: f64, write_ms: f64) -> Self {
        Self {
            chunk_index,
            node_ids: Vec::new(),
            outputs: Vec::new(),
            failed: size,
            embedding_ms,
            write_ms,
        }
    }
}

/// Coordinates bounded-concurrency batch ingestion.
pub struct BatchCoordinator {
    embeddings: Arc<EmbeddingClient>,
    index: Arc<SimilarityIndex>,
    semaphore: Arc<Semaphore>,
}

impl BatchCoordinator {
    pub fn new(embeddings: Arc<EmbeddingClient>, index: Arc<SimilarityIndex>) -> Self {
        Self {
            embeddings,
            index,
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_CHUNKS)),
        }
    }

    /// Create a validated batch of 1..=50 nodes.
    ///
    /// Rejects empty and oversized batches before any embedding or store
    /// call. On full success `created == nodes.len()` and `node_ids` is in
    /// request order.
    pub async fn create_batch(&self, request: BatchCreateRequest) -> AppResult<BatchCreateResponse> {
        request.validate()?;
        self.run_chunks(request.nodes).await
    }

    /// Ingest an arbitrarily large document set (bulk import path).
    ///
    /// Same chunked execution as [`create_batch`](Self::create_batch)
    /// without the 50-node request cap; only emptiness is rejected. Used by
    /// offline imports where the transport-layer batch contract does not
    /// apply.
    pub async fn import_documents(
        &self,
        nodes: Vec<BatchNodeInput>,
    ) -> AppResult<BatchCreateResponse> {
        if nodes.is_empty() {
            return Err(AppError::validation("import must contain at least 1 node"));
        }
        for (i, node) in nodes.iter().enumerate() {
            crate::models::validate_project_id(&node.project_id)
                .map_err(|e| AppError::validation(format!("node {}: {}", i, e)))?;
        }
        self.run_chunks(nodes).await
    }

    async fn run_chunks(&self, nodes: Vec<BatchNodeInput>) -> AppResult<BatchCreateResponse> {
        let started = Instant::now();
        let chunks: Vec<Vec<BatchNodeInput>> =
            nodes.chunks(CHUNK_SIZE).map(|c| c.to_vec()).collect();
        let chunk_sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();

        let mut join_set: JoinSet<ChunkOutcome> = JoinSet::new();
        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            let embeddings = Arc::clone(&self.embeddings);
            let index = Arc::clone(&self.index);
            let semaphore = Arc::clone(&self.semaphore);

            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        // The semaphore is never closed while the coordinator
                        // is alive; treat a closed semaphore as chunk failure.
                        return ChunkOutcome::failure(chunk_index, chunk.len(), 0.0, 0.0);
                    }
                };
                process_chunk(chunk_index, chunk, embeddings, index).await
            });
        }

        let mut outcomes: HashMap<usize, ChunkOutcome> = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => {
                    outcomes.insert(outcome.chunk_index, outcome);
                }
                Err(err) => {
                    tracing::error!(error = %err, "batch chunk task aborted");
                }
            }
        }

        // Reduce per-chunk outcomes in request order.
        let mut response = BatchCreateResponse {
            created: 0,
            failed: 0,
            node_ids: Vec::new(),
            nodes: Vec::new(),
            timing: BatchTiming::default(),
        };
        for (chunk_index, size) in chunk_sizes.iter().enumerate() {
            match outcomes.remove(&chunk_index) {
                Some(outcome) => {
                    response.created += outcome.node_ids.len();
                    response.failed += outcome.failed;
                    response.node_ids.extend(outcome.node_ids);
                    response.nodes.extend(outcome.outputs);
                    response.timing.embedding_ms += outcome.embedding_ms;
                    response.timing.write_ms += outcome.write_ms;
                }
                // Task aborted without an outcome: the whole chunk failed.
                None => response.failed += size,
            }
        }
        response.timing.total_ms = started.elapsed().as_secs_f64() * 1000.0;

        tracing::info!(
            created = response.created,
            failed = response.failed,
            "batch ingestion finished"
        );
        Ok(response)
    }
}

/// One chunk: a single batched embedding call, then node writes.
///
/// The embedding phase strictly precedes the writes; a failure in either
/// phase fails the chunk without touching any other chunk's state.
async fn process_chunk(
    chunk_index: usize,
    chunk: Vec<BatchNodeInput>,
    embeddings: Arc<EmbeddingClient>,
    index: Arc<SimilarityIndex>,
) -> ChunkOutcome {
    let embed_started = Instant::now();
    let contents: Vec<&str> = chunk.iter().map(|n| n.content.as_str()).collect();
    let vectors = match embeddings.embed_many(&contents).await {
        Ok(vectors) => vectors,
        Err(err) => {
            tracing::error!(chunk_index, error = %err, "chunk embedding phase failed");
            return ChunkOutcome::failure(
                chunk_index,
                chunk.len(),
                embed_started.elapsed().as_secs_f64() * 1000.0,
                0.0,
            );
        }
    };
    let embedding_ms = embed_started.elapsed().as_secs_f64() * 1000.0;

    let write_started = Instant::now();
    let model = embeddings.model_name().to_string();
    let mut node_ids = Vec::with_capacity(chunk.len());
    let mut outputs = Vec::with_capacity(chunk.len());

    for (node, vector) in chunk.iter().zip(vectors.iter()) {
        match index
            .create_node(
                &node.node_type,
                &node.content,
                &node.project_id,
                vector,
                &node.properties,
            )
            .await
        {
            Ok(node_id) => {
                outputs.push(BatchNodeOutput {
                    id: node_id.clone(),
                    node_type: node.node_type.clone(),
                    properties: node.properties.clone(),
                    embedding: EmbeddingMeta {
                        dimensions: vector.len(),
                        model: model.clone(),
                    },
                });
                node_ids.push(node_id);
            }
            Err(err) => {
                tracing::error!(chunk_index, error = %err, "chunk write phase failed");
                return ChunkOutcome::failure(
                    chunk_index,
                    chunk.len(),
                    embedding_ms,
                    write_started.elapsed().as_secs_f64() * 1000.0,
                );
            }
        }
    }

    ChunkOutcome {
        chunk_index,
        node_ids,
        outputs,
        failed: 0,
        embedding_ms,
        write_ms: write_started.elapsed().as_secs_f64() * 1000.0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
//
// Coordinator behavior over real collaborators is covered by the
// integration tests; the unit tests here pin the chunk accounting.
