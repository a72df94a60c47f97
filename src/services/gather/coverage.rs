//! Coverage Analyzer
//!
//! Combines deterministic distribution/quality metrics with a
//! schema-validated LLM gap analysis. The deterministic half never touches
//! the LLM; the LLM half degrades to a minimal valid analysis on failure,
//! so this component never fails a request because of upstream model
//! unpredictability.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::models::coverage::{
    CoverageGap, CoverageItem, CoverageReport, CoverageRequest, CoverageTiming, CoveredAspect,
    QualityMetrics,
};
use crate::services::embedding::EmbeddingClient;
use crate::services::llm::{analysis, LlmProvider};
use crate::utils::error::AppResult;

/// Fixed aspect vocabulary for the keyword-bucket distribution.
const ASPECT_KEYWORDS: &[(&str, &[&str])] = &[
    ("plot", &["plot", "story", "narrative", "arc"]),
    ("character", &["character", "protagonist", "personality"]),
    ("theme", &["theme", "message", "meaning"]),
    ("pacing", &["pacing", "tempo", "rhythm", "timing"]),
    ("dialogue", &["dialogue", "conversation", "speech"]),
    ("visual", &["visual", "aesthetic", "style", "look"]),
    ("setting", &["setting", "location", "environment", "world"]),
];

/// Content length (chars) considered fully actionable detail.
const ACTIONABLE_CONTENT_LENGTH: f64 = 500.0;

/// Neutral metric value when there is no signal either way.
const NEUTRAL_SCORE: u32 = 50;

/// Analyzes content coverage for a department.
pub struct CoverageAnalyzer {
    embeddings: Arc<EmbeddingClient>,
    llm: Arc<dyn LlmProvider>,
}

impl CoverageAnalyzer {
    pub fn new(embeddings: Arc<EmbeddingClient>, llm: Arc<dyn LlmProvider>) -> Self {
        Self { embeddings, llm }
    }

    /// Analyze coverage of 1..=100 gather items.
    ///
    /// Item count is validated before any work. Embedding failures
    /// propagate after the retry budget; LLM failures never do.
    pub async fn analyze(&self, request: &CoverageRequest) -> AppResult<CoverageReport> {
        request.validate()?;
        let started = Instant::now();

        // Every item must be embeddable before analysis runs; the vectors
        // themselves are not inputs to the text-based analysis below.
        let embed_started = Instant::now();
        let contents: Vec<&str> = request
            .gather_items
            .iter()
            .map(|item| item.content.as_str())
            .collect();
        self.embeddings.embed_many(&contents).await?;
        let embedding_ms = embed_started.elapsed().as_secs_f64() * 1000.0;

        let analysis_started = Instant::now();
        let description = request
            .department_description
            .clone()
            .unwrap_or_else(|| format!("{} department", request.department));
        let llm_analysis = analysis::analyze_coverage(
            self.llm.as_ref(),
            &request.gather_items,
            &request.department,
            &description,
        )
        .await;

        let coverage_score = mean_coverage(&llm_analysis.covered_aspects);
        let item_distribution = item_distribution(&request.gather_items);
        let quality_metrics = quality_metrics(
            &request.gather_items,
            &llm_analysis.covered_aspects,
            &llm_analysis.gaps,
        );
        let analysis_ms = analysis_started.elapsed().as_secs_f64() * 1000.0;

        Ok(CoverageReport {
            department: request.department.clone(),
            coverage_score,
            analysis: llm_analysis,
            item_distribution,
            quality_metrics,
            timing: CoverageTiming {
                embedding_ms,
                analysis_ms,
                total_ms: started.elapsed().as_secs_f64() * 1000.0,
            },
        })
    }
}

/// Mean coverage across covered aspects, 0 when there are none.
fn mean_coverage(covered: &[CoveredAspect]) -> u32 {
    if covered.is_empty() {
        return 0;
    }
    let sum: u64 = covered.iter().map(|a| a.coverage as u64).sum();
    (sum / covered.len() as u64) as u32
}

/// Keyword-bucket classification of items into the fixed aspect
/// vocabulary. Matches against lowercase content + summary; an item may
/// count toward multiple buckets.
fn item_distribution(items: &[CoverageItem]) -> HashMap<String, u32> {
    let mut distribution: HashMap<String, u32> = HashMap::new();
    for item in items {
        let combined = format!(
            "{} {}",
            item.content.to_lowercase(),
            item.summary.as_deref().unwrap_or("").to_lowercase()
        );
        for (aspect, keywords) in ASPECT_KEYWORDS {
            if keywords.iter().any(|keyword| combined.contains(keyword)) {
                *distribution.entry(aspect.to_string()).or_insert(0) += 1;
            }
        }
    }
    distribution
}

/// Deterministic quality metrics, each clamped to [0, 100].
fn quality_metrics(
    items: &[CoverageItem],
    covered: &[CoveredAspect],
    gaps: &[CoverageGap],
) -> QualityMetrics {
    // Depth: average coverage of covered aspects.
    let depth = mean_coverage(covered);

    // Breadth: covered aspects relative to everything identified.
    let total_aspects = covered.len() + gaps.len();
    let breadth = if total_aspects > 0 {
        ((covered.len() as f64 / total_aspects as f64) * 100.0) as u32
    } else {
        NEUTRAL_SCORE
    };

    // Coherence: quality ratings of covered aspects.
    let coherence = if covered.is_empty() {
        NEUTRAL_SCORE
    } else {
        let sum: u64 = covered.iter().map(|a| a.quality.score() as u64).sum();
        (sum / covered.len() as u64) as u32
    };

    // Actionability: item detail, with ~500 chars counting as full detail.
    // Items are validated non-empty before this runs.
    let avg_content_length = items.iter().map(|i| i.content.chars().count()).sum::<usize>() as f64
        / items.len() as f64;
    let actionability =
        ((avg_content_length / ACTIONABLE_CONTENT_LENGTH) * 100.0).min(100.0) as u32;

    QualityMetrics {
        depth,
        breadth,
        coherence,
        actionability,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
