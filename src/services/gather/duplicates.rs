//! Duplicate Detector
//!
//! Threshold-filtered semantic duplicate search. The plain path embeds the
//! query content once and pushes the cosine predicate into the store. The
//! character path fuses two embedding fields per record in-process with a
//! fixed weighted sum before ranking.

use std::sync::Arc;
use std::time::Instant;

use crate::models::duplicates::{
    CharacterMatch, DuplicateSearchRequest, DuplicateSearchResponse, MAX_DUPLICATE_LIMIT,
};
use crate::models::validate_project_id;
use crate::services::embedding::{cosine_similarity, EmbeddingClient};
use crate::services::graph::{SimilarityFilter, SimilarityIndex};
use crate::utils::error::{AppError, AppResult};

/// Weights for fusing the two character embedding fields into one
/// similarity score.
///
/// Personality is the stronger identity signal, hence the asymmetry. The
/// values are a tunable constant with no derivation behind them, not
/// learned from data.
#[derive(Debug, Clone, Copy)]
pub struct FusionWeights {
    pub personality: f32,
    pub appearance: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            personality: 0.7,
            appearance: 0.3,
        }
    }
}

impl FusionWeights {
    /// Weighted sum of the per-field similarities.
    pub fn fuse(&self, personality_sim: f32, appearance_sim: f32) -> f32 {
        personality_sim * self.personality + appearance_sim * self.appearance
    }
}

/// Semantic duplicate search over the similarity index.
pub struct DuplicateDetector {
    embeddings: Arc<EmbeddingClient>,
    index: Arc<SimilarityIndex>,
    fusion: FusionWeights,
}

impl DuplicateDetector {
    pub fn new(embeddings: Arc<EmbeddingClient>, index: Arc<SimilarityIndex>) -> Self {
        Self {
            embeddings,
            index,
            fusion: FusionWeights::default(),
        }
    }

    /// Override the character fusion weights.
    pub fn with_fusion_weights(mut self, fusion: FusionWeights) -> Self {
        self.fusion = fusion;
        self
    }

    /// Find stored items semantically similar to `content`.
    ///
    /// Validation happens before the embedding call; with unchanged store
    /// state and identical inputs the result list is identical run to run.
    pub async fn find_duplicates(
        &self,
        request: &DuplicateSearchRequest,
    ) -> AppResult<DuplicateSearchResponse> {
        request.validate()?;
        let started = Instant::now();

        let embed_started = Instant::now();
        let query_embedding = self.embeddings.embed_one(&request.content).await?;
        let query_embedding_ms = embed_started.elapsed().as_secs_f64() * 1000.0;

        let search_started = Instant::now();
        let filter = SimilarityFilter {
            node_type: request.node_type.clone(),
            department: request.department.clone(),
            exclude_ids: request.exclude_node_ids.clone(),
        };
        let duplicates = self
            .index
            .find_similar(
                &request.project_id,
                &query_embedding,
                request.threshold,
                request.limit,
                &filter,
            )
            .await?;
        let search_ms = search_started.elapsed().as_secs_f64() * 1000.0;

        Ok(DuplicateSearchResponse {
            duplicates,
            query_embedding_ms,
            search_ms,
            total_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }

    /// Find characters similar to a free-text query.
    ///
    /// Similarity against the personality and appearance embeddings is
    /// computed independently per record and fused with the configured
    /// weights before ranking. A record missing one field contributes 0 for
    /// that field rather than being skipped.
    pub async fn find_similar_characters(
        &self,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<CharacterMatch>> {
        validate_project_id(project_id)?;
        if limit < 1 || limit > MAX_DUPLICATE_LIMIT {
            return Err(AppError::validation(format!(
                "limit must be within [1, {}], got {}",
                MAX_DUPLICATE_LIMIT, limit
            )));
        }
        if query.trim().is_empty() {
            tracing::warn!("empty query provided for character search");
            return Ok(Vec::new());
        }

        let query_embedding = self.embeddings.embed_one(query).await?;
        let records = self.index.character_embeddings(project_id).await?;

        let mut matches: Vec<CharacterMatch> = records
            .into_iter()
            .map(|record| {
                let personality_sim = record
                    .personality
                    .as_deref()
                    .map(|v| cosine_similarity(&query_embedding, v))
                    .unwrap_or(0.0);
                let appearance_sim = record
                    .appearance
                    .as_deref()
                    .map(|v| cosine_similarity(&query_embedding, v))
                    .unwrap_or(0.0);
                CharacterMatch {
                    id: record.id,
                    name: record.name,
                    similarity: self.fusion.fuse(personality_sim, appearance_sim),
                }
            })
            .collect();

        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(limit);
        Ok(matches)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
