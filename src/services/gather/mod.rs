//! Gather Services
//!
//! The four operations exposed to the transport layer: batch ingestion,
//! duplicate detection, department context aggregation, and coverage
//! analysis. [`BrainService`] is the composition root that wires them to
//! the shared collaborators.

pub mod batch;
pub mod context;
pub mod coverage;
pub mod duplicates;

use std::sync::Arc;

pub use batch::BatchCoordinator;
pub use context::ContextAggregator;
pub use coverage::CoverageAnalyzer;
pub use duplicates::{DuplicateDetector, FusionWeights};

use crate::services::embedding::{
    EmbeddingClient, JinaConfig, JinaEmbeddingProvider, RetryPolicy,
};
use crate::services::graph::{GraphStore, HttpGraphStore, Neo4jConfig, SimilarityIndex};
use crate::services::llm::{LlmProvider, OpenRouterConfig, OpenRouterProvider};
use crate::utils::error::AppResult;

/// Composition root for the gather services.
///
/// Constructed once at process start with the shared collaborators; request
/// handlers borrow the services from here. No global state.
pub struct BrainService {
    pub batches: BatchCoordinator,
    pub duplicates: DuplicateDetector,
    pub context: ContextAggregator,
    pub coverage: CoverageAnalyzer,
}

impl BrainService {
    pub fn new(
        embeddings: Arc<EmbeddingClient>,
        store: Arc<dyn GraphStore>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let index = Arc::new(SimilarityIndex::new(store));
        Self {
            batches: BatchCoordinator::new(Arc::clone(&embeddings), Arc::clone(&index)),
            duplicates: DuplicateDetector::new(Arc::clone(&embeddings), Arc::clone(&index)),
            context: ContextAggregator::new(Arc::clone(&llm), Arc::clone(&index)),
            coverage: CoverageAnalyzer::new(embeddings, llm),
        }
    }

    /// Wire the production collaborators from environment configuration:
    /// Jina embeddings, the Neo4j HTTP store, and OpenRouter completions.
    ///
    /// Missing required settings fail here, at process start, not at call
    /// time.
    pub fn from_env() -> AppResult<Self> {
        let provider = JinaEmbeddingProvider::new(JinaConfig::from_env()?)?;
        let embeddings = Arc::new(EmbeddingClient::new(
            Arc::new(provider),
            RetryPolicy::default(),
        ));
        let store = Arc::new(HttpGraphStore::new(Neo4jConfig::from_env()?)?);
        let llm = Arc::new(OpenRouterProvider::new(OpenRouterConfig::from_env()?)?);
        Ok(Self::new(embeddings, store, llm))
    }
}
