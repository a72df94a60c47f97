//! Coverage analysis models.
//!
//! The LLM-facing pieces (`CoveredAspect`, `CoverageGap`) use typed enums
//! for the quality/severity vocabularies so unvalidated strings never flow
//! into a report.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::validate_project_id;
use crate::utils::error::{AppError, AppResult};

/// Maximum number of items a single coverage analysis accepts.
pub const MAX_COVERAGE_ITEMS: usize = 100;

/// Quality rating of a covered aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl AspectQuality {
    /// Fixed quality-to-score map used by the coherence metric.
    pub fn score(&self) -> u32 {
        match self {
            Self::Excellent => 100,
            Self::Good => 75,
            Self::Fair => 50,
            Self::Poor => 25,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "excellent" => Some(Self::Excellent),
            "good" => Some(Self::Good),
            "fair" => Some(Self::Fair),
            "poor" => Some(Self::Poor),
            _ => None,
        }
    }
}

/// Severity of a coverage gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapSeverity {
    High,
    Medium,
    Low,
}

impl GapSeverity {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl Default for GapSeverity {
    fn default() -> Self {
        Self::Medium
    }
}

/// One content item submitted for coverage analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageItem {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Request for coverage analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRequest {
    pub project_id: String,
    pub department: String,
    pub gather_items: Vec<CoverageItem>,
    /// Optional description of the department's scope, passed to the LLM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_description: Option<String>,
}

impl CoverageRequest {
    /// Rejects empty and oversized item lists before any work begins.
    pub fn validate(&self) -> AppResult<()> {
        validate_project_id(&self.project_id)?;
        if self.gather_items.is_empty() {
            return Err(AppError::validation(
                "coverage analysis requires at least 1 gather item",
            ));
        }
        if self.gather_items.len() > MAX_COVERAGE_ITEMS {
            return Err(AppError::validation(format!(
                "coverage analysis accepts at most {} gather items, got {}",
                MAX_COVERAGE_ITEMS,
                self.gather_items.len()
            )));
        }
        Ok(())
    }
}

/// An aspect the current items cover adequately.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoveredAspect {
    pub aspect: String,
    /// Coverage percentage in [0, 100].
    pub coverage: u32,
    pub item_count: u32,
    pub quality: AspectQuality,
}

/// An aspect with insufficient representation. Gaps are the actionable
/// output, so malformed entries are repaired with defaults, never dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageGap {
    pub aspect: String,
    pub coverage: u32,
    pub item_count: u32,
    pub severity: GapSeverity,
    pub suggestion: String,
}

/// LLM-derived portion of the coverage report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageAnalysis {
    pub covered_aspects: Vec<CoveredAspect>,
    pub gaps: Vec<CoverageGap>,
    pub recommendations: Vec<String>,
}

/// Deterministic quality metrics, each in [0, 100].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub depth: u32,
    pub breadth: u32,
    pub coherence: u32,
    pub actionability: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageTiming {
    pub embedding_ms: f64,
    pub analysis_ms: f64,
    pub total_ms: f64,
}

/// Full coverage report for a department.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub department: String,
    /// Mean coverage across covered aspects, 0 when none, in [0, 100].
    pub coverage_score: u32,
    pub analysis: CoverageAnalysis,
    /// Keyword-bucket item counts per aspect; one item may count toward
    /// several buckets.
    pub item_distribution: HashMap<String, u32>,
    pub quality_metrics: QualityMetrics,
    pub timing: CoverageTiming,
}
