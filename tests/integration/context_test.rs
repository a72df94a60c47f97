//! Department context aggregation flows.

use brain_service::models::batch::{BatchCreateRequest, BatchNodeInput};
use brain_service::models::context::DepartmentContextRequest;
use brain_service::utils::error::AppError;
use serde_json::{json, Map};

use crate::support::{harness, Harness, PROJECT_ID};

async fn seed_department_items(h: &Harness, department: &str, count: usize, quality: Option<f64>) {
    let nodes: Vec<BatchNodeInput> = (0..count)
        .map(|i| {
            let mut properties = Map::new();
            properties.insert("department".to_string(), json!(department));
            properties.insert("summary".to_string(), json!(format!("summary {}", i)));
            if let Some(q) = quality {
                properties.insert("qualityScore".to_string(), json!(q));
            }
            BatchNodeInput {
                node_type: "GatherItem".to_string(),
                content: format!("{} item {}", department, i),
                project_id: PROJECT_ID.to_string(),
                properties,
            }
        })
        .collect();
    h.service
        .batches
        .create_batch(BatchCreateRequest { nodes })
        .await
        .unwrap();
}

fn request(previous: &[&str]) -> DepartmentContextRequest {
    DepartmentContextRequest {
        project_id: PROJECT_ID.to_string(),
        department: "character".to_string(),
        previous_departments: previous.iter().map(|d| d.to_string()).collect(),
        limit: 20,
    }
}

#[tokio::test]
async fn aggregates_themes_quality_and_top_items_per_department() {
    let h = harness();
    seed_department_items(&h, "story", 8, Some(7.5)).await;

    let response = h
        .service
        .context
        .department_context(&request(&["story"]))
        .await
        .unwrap();

    let story = response.context.get("story").expect("story context");
    assert_eq!(story.item_count, 8);
    assert!((story.quality_score - 7.5).abs() < 1e-9);
    assert_eq!(story.top_items.len(), 5);
    assert_eq!(
        story.key_themes,
        vec!["betrayal".to_string(), "family loyalty".to_string()]
    );
    assert_eq!(response.total_items_aggregated, 8);
    assert_eq!(response.aggregated_summary, "Aggregated summary.");
    assert_eq!(response.target_department, "character");
}

#[tokio::test]
async fn empty_departments_are_skipped_entirely() {
    let h = harness();
    seed_department_items(&h, "story", 3, None).await;
    // "concept" has no items at all.

    let response = h
        .service
        .context
        .department_context(&request(&["story", "concept"]))
        .await
        .unwrap();

    assert!(response.context.contains_key("story"));
    assert!(!response.context.contains_key("concept"));
    assert_eq!(response.total_items_aggregated, 3);
}

#[tokio::test]
async fn relevant_items_are_capped_at_twenty() {
    let h = harness();
    seed_department_items(&h, "story", 30, None).await;

    let mut req = request(&["story"]);
    req.limit = 30;
    let response = h.service.context.department_context(&req).await.unwrap();

    assert_eq!(response.relevant_items.len(), 20);
    assert_eq!(response.total_items_aggregated, 30);
    assert_eq!(response.context["story"].item_count, 30);
}

#[tokio::test]
async fn limit_restricts_items_per_department() {
    let h = harness();
    seed_department_items(&h, "story", 10, None).await;

    let mut req = request(&["story"]);
    req.limit = 4;
    let response = h.service.context.department_context(&req).await.unwrap();

    assert_eq!(response.context["story"].item_count, 4);
    assert_eq!(response.total_items_aggregated, 4);
}

#[tokio::test]
async fn quality_score_averages_only_items_that_carry_one() {
    let h = harness();
    seed_department_items(&h, "story", 2, Some(6.0)).await;
    seed_department_items(&h, "story", 2, None).await;

    let response = h
        .service
        .context
        .department_context(&request(&["story"]))
        .await
        .unwrap();

    assert!((response.context["story"].quality_score - 6.0).abs() < 1e-9);
}

#[tokio::test]
async fn no_previous_departments_yields_empty_context() {
    let h = harness();

    let response = h
        .service
        .context
        .department_context(&request(&[]))
        .await
        .unwrap();

    assert!(response.context.is_empty());
    assert!(response.relevant_items.is_empty());
    assert_eq!(response.total_items_aggregated, 0);
}

#[tokio::test]
async fn out_of_range_limit_rejected() {
    let h = harness();
    let mut req = request(&["story"]);
    req.limit = 0;
    assert!(matches!(
        h.service.context.department_context(&req).await.unwrap_err(),
        AppError::Validation(_)
    ));

    req.limit = 101;
    assert!(h.service.context.department_context(&req).await.is_err());
    assert_eq!(h.store.query_count(), 0);
}
