//! Coverage analysis flows.

use brain_service::models::coverage::{
    AspectQuality, CoverageItem, CoverageRequest, GapSeverity,
};
use brain_service::utils::error::AppError;

use crate::support::{harness, harness_with_llm, ScriptedLlm, PROJECT_ID};

fn items(contents: &[&str]) -> Vec<CoverageItem> {
    contents
        .iter()
        .map(|c| CoverageItem {
            content: c.to_string(),
            summary: None,
        })
        .collect()
}

fn request(gather_items: Vec<CoverageItem>) -> CoverageRequest {
    CoverageRequest {
        project_id: PROJECT_ID.to_string(),
        department: "story".to_string(),
        gather_items,
        department_description: None,
    }
}

#[tokio::test]
async fn more_than_hundred_items_rejected_before_any_call() {
    let h = harness();
    let contents: Vec<String> = (0..101).map(|i| format!("item {}", i)).collect();
    let refs: Vec<&str> = contents.iter().map(|s| s.as_str()).collect();

    let result = h.service.coverage.analyze(&request(items(&refs))).await;

    assert!(matches!(result.unwrap_err(), AppError::Validation(_)));
    assert_eq!(h.embeddings.call_count(), 0);
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn unparsable_llm_garbage_still_yields_a_valid_report() {
    let llm = ScriptedLlm::with_coverage_response("%% totally not json &&");
    let h = harness_with_llm(llm);

    let report = h
        .service
        .coverage
        .analyze(&request(items(&[
            "the plot thickens in act two",
            "character sketch for the mentor",
        ])))
        .await
        .unwrap();

    assert!(report.analysis.covered_aspects.is_empty());
    assert!(report.analysis.gaps.is_empty());
    assert_eq!(report.analysis.recommendations.len(), 1);
    assert!(!report.analysis.recommendations[0].is_empty());
    assert_eq!(report.coverage_score, 0);

    // Deterministic halves still work.
    assert_eq!(report.item_distribution.get("plot"), Some(&1));
    assert_eq!(report.item_distribution.get("character"), Some(&1));
    let metrics = &report.quality_metrics;
    assert_eq!(metrics.depth, 0);
    assert_eq!(metrics.breadth, 50);
    assert_eq!(metrics.coherence, 50);
    assert!(metrics.actionability <= 100);
}

#[tokio::test]
async fn well_formed_analysis_flows_into_the_report() {
    let llm = ScriptedLlm::with_coverage_response(
        r#"{
            "coveredAspects": [
                {"aspect": "Plot structure", "coverage": 80, "itemCount": 3, "quality": "good"},
                {"aspect": "Setting", "coverage": 60, "itemCount": 2, "quality": "fair"}
            ],
            "gaps": [
                {"aspect": "Dialogue", "coverage": 10, "itemCount": 0, "severity": "high",
                 "suggestion": "Collect dialogue samples"}
            ],
            "recommendations": ["Focus on dialogue next"]
        }"#,
    );
    let h = harness_with_llm(llm);

    let report = h
        .service
        .coverage
        .analyze(&request(items(&["a", "b", "c"])))
        .await
        .unwrap();

    assert_eq!(report.coverage_score, 70); // (80 + 60) / 2
    assert_eq!(report.analysis.covered_aspects.len(), 2);
    assert_eq!(
        report.analysis.covered_aspects[0].quality,
        AspectQuality::Good
    );
    assert_eq!(report.analysis.gaps.len(), 1);
    assert_eq!(report.analysis.gaps[0].severity, GapSeverity::High);
    assert_eq!(report.quality_metrics.depth, 70);
    assert_eq!(report.quality_metrics.breadth, 66); // 2 of 3 aspects covered
    assert_eq!(report.quality_metrics.coherence, 62); // (75 + 50) / 2
}

#[tokio::test]
async fn fenced_response_with_broken_entries_degrades_per_entry() {
    let llm = ScriptedLlm::with_coverage_response(
        "```json\n{\
           \"coveredAspects\": [\
             {\"aspect\": \"Plot\", \"coverage\": 90, \"itemCount\": 4, \"quality\": \"excellent\"},\
             {\"aspect\": \"Broken\", \"coverage\": \"lots\", \"itemCount\": 1, \"quality\": \"good\"}\
           ],\
           \"gaps\": [{\"aspect\": \"Pacing\"}],\
           \"recommendations\": []\
         }\n```",
    );
    let h = harness_with_llm(llm);

    let report = h
        .service
        .coverage
        .analyze(&request(items(&["x"])))
        .await
        .unwrap();

    // Malformed covered aspect dropped; malformed gap repaired.
    assert_eq!(report.analysis.covered_aspects.len(), 1);
    assert_eq!(report.analysis.gaps.len(), 1);
    assert_eq!(report.analysis.gaps[0].severity, GapSeverity::Medium);
    assert_eq!(report.analysis.gaps[0].suggestion, "No suggestion provided");
    assert_eq!(report.coverage_score, 90);
}

#[tokio::test]
async fn report_scores_stay_in_bounds_for_boundary_item_counts() {
    let h = harness();

    for count in [1usize, 100] {
        let contents: Vec<String> = (0..count).map(|i| format!("item {}", i)).collect();
        let refs: Vec<&str> = contents.iter().map(|s| s.as_str()).collect();
        let report = h
            .service
            .coverage
            .analyze(&request(items(&refs)))
            .await
            .unwrap();

        assert!(report.coverage_score <= 100);
        let metrics = &report.quality_metrics;
        for value in [
            metrics.depth,
            metrics.breadth,
            metrics.coherence,
            metrics.actionability,
        ] {
            assert!(value <= 100);
        }
    }
}

#[tokio::test]
async fn items_are_embedded_in_one_batched_call() {
    let h = harness();
    let report = h
        .service
        .coverage
        .analyze(&request(items(&["a", "b", "c", "d"])))
        .await
        .unwrap();

    assert_eq!(h.embeddings.call_count(), 1);
    assert!(report.timing.total_ms >= 0.0);
}
