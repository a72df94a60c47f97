//! Department Context Aggregator
//!
//! Pulls the most recent items from each earlier department, derives key
//! themes and an average quality score per department, then produces a
//! single cross-department summary. Departments are processed
//! sequentially on purpose: theme extraction hits the LLM once per
//! department, and serializing keeps those calls inside provider rate
//! limits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::models::context::{
    ContextTiming, DepartmentContextData, DepartmentContextRequest, DepartmentContextResponse,
    DepartmentItem, RelevantItem,
};
use crate::services::graph::SimilarityIndex;
use crate::services::llm::{analysis, LlmProvider};
use crate::utils::error::AppResult;

/// Recency-ranked items kept per department.
const TOP_ITEMS_PER_DEPARTMENT: usize = 5;

/// Themes requested per department.
const MAX_THEMES: usize = 5;

/// Items fed into the aggregated summary, across all departments.
const SUMMARY_SOURCE_ITEMS: usize = 15;

/// Cap on the cross-department relevant-items list.
const MAX_RELEVANT_ITEMS: usize = 20;

// Placeholder relevance values until a real relevance signal exists;
// recency is the actual ordering signal.
const DEPARTMENT_ITEM_RELEVANCE: f32 = 0.85;
const CROSS_DEPARTMENT_RELEVANCE: f32 = 0.80;

/// Aggregates context from earlier pipeline departments.
pub struct ContextAggregator {
    llm: Arc<dyn LlmProvider>,
    index: Arc<SimilarityIndex>,
}

impl ContextAggregator {
    pub fn new(llm: Arc<dyn LlmProvider>, index: Arc<SimilarityIndex>) -> Self {
        Self { llm, index }
    }

    /// Retrieve and aggregate context from the given previous departments.
    ///
    /// A department that yields zero items is skipped entirely — it gets no
    /// entry in the per-department map. Store failures propagate; LLM
    /// failures degrade to empty themes/summary.
    pub async fn department_context(
        &self,
        request: &DepartmentContextRequest,
    ) -> AppResult<DepartmentContextResponse> {
        request.validate()?;
        let started = Instant::now();
        let query_started = Instant::now();

        let mut context: HashMap<String, DepartmentContextData> = HashMap::new();
        let mut relevant_items: Vec<RelevantItem> = Vec::new();
        let mut total_items = 0usize;

        for department in &request.previous_departments {
            let records = self
                .index
                .recent_department_items(&request.project_id, department, request.limit)
                .await?;
            if records.is_empty() {
                tracing::debug!(department = %department, "department has no items, skipping");
                continue;
            }

            let contents: Vec<String> = records.iter().map(|r| r.content.clone()).collect();
            let themes =
                analysis::extract_themes(self.llm.as_ref(), &contents, department, MAX_THEMES)
                    .await;

            let quality_scores: Vec<f64> =
                records.iter().filter_map(|r| r.quality_score).collect();
            let quality_score = if quality_scores.is_empty() {
                0.0
            } else {
                quality_scores.iter().sum::<f64>() / quality_scores.len() as f64
            };

            let top_items: Vec<DepartmentItem> = records
                .iter()
                .take(TOP_ITEMS_PER_DEPARTMENT)
                .map(|r| DepartmentItem {
                    node_id: r.node_id.clone(),
                    content: r.content.clone(),
                    summary: r.summary.clone(),
                    relevance: DEPARTMENT_ITEM_RELEVANCE,
                })
                .collect();

            context.insert(
                department.clone(),
                DepartmentContextData {
                    item_count: records.len(),
                    quality_score,
                    top_items,
                    key_themes: themes,
                },
            );

            relevant_items.extend(records.iter().map(|r| RelevantItem {
                node_id: r.node_id.clone(),
                department: department.clone(),
                content: r.content.clone(),
                relevance_to_target: CROSS_DEPARTMENT_RELEVANCE,
            }));
            total_items += records.len();
        }

        let query_ms = query_started.elapsed().as_secs_f64() * 1000.0;

        let aggregation_started = Instant::now();
        let summary_contents: Vec<String> = relevant_items
            .iter()
            .take(SUMMARY_SOURCE_ITEMS)
            .map(|item| item.content.clone())
            .collect();
        let aggregated_summary = analysis::summarize(
            self.llm.as_ref(),
            &summary_contents,
            &format!("Context for {} department", request.department),
        )
        .await;
        let aggregation_ms = aggregation_started.elapsed().as_secs_f64() * 1000.0;

        relevant_items.truncate(MAX_RELEVANT_ITEMS);

        Ok(DepartmentContextResponse {
            project_id: request.project_id.clone(),
            target_department: request.department.clone(),
            context,
            aggregated_summary,
            relevant_items,
            total_items_aggregated: total_items,
            timing: ContextTiming {
                query_ms,
                aggregation_ms,
                total_ms: started.elapsed().as_secs_f64() * 1000.0,
            },
        })
    }
}
