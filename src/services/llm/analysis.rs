//! LLM Analysis Operations
//!
//! Theme extraction, summary generation, and coverage analysis over the
//! `LlmProvider` collaborator. Model output is untrusted: every parse here
//! strips optional markdown fences, validates field-by-field, and degrades
//! to documented defaults instead of propagating shape errors. Callers of
//! these functions never see an LLM failure.

use serde_json::Value;

use super::provider::{ChatMessage, LlmProvider};
use crate::models::coverage::{
    AspectQuality, CoverageAnalysis, CoverageGap, CoverageItem, CoveredAspect, GapSeverity,
};

/// Only this many items feed a theme extraction prompt.
const THEME_SOURCE_ITEMS: usize = 10;

/// Only this many items feed a summary prompt.
const SUMMARY_SOURCE_ITEMS: usize = 15;

/// Only this many items are shown to the coverage analysis prompt.
const COVERAGE_PROMPT_ITEMS: usize = 20;

/// Item content is truncated to this many characters in coverage prompts.
const COVERAGE_CONTENT_PREVIEW: usize = 500;

/// Default suggestion substituted for malformed gap entries.
const DEFAULT_GAP_SUGGESTION: &str = "No suggestion provided";

/// Recommendation returned when the whole analysis is unusable.
const FALLBACK_RECOMMENDATION: &str = "Unable to analyze coverage due to an error";

// ---------------------------------------------------------------------------
// Response text extraction
// ---------------------------------------------------------------------------

/// Extract a JSON payload from response text, handling markdown fences and
/// surrounding prose. Falls back to the first `{`..last `}` span, then the
/// first `[`..last `]` span, then the trimmed text itself.
pub fn extract_json_from_response(response_text: &str) -> String {
    let trimmed = response_text.trim();

    // Try markdown code fences first
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let content_start = after_fence.find('\n').map(|nl| nl + 1).unwrap_or(0);
        let content = &after_fence[content_start..];
        if let Some(end) = content.find("```") {
            return content[..end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start <= end {
            return trimmed[start..=end].to_string();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('['), trimmed.rfind(']')) {
        if start <= end {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}

// ---------------------------------------------------------------------------
// Theme extraction
// ---------------------------------------------------------------------------

/// Extract up to `max_themes` key themes from department content.
///
/// Returns an empty list on any transport or parse failure.
pub async fn extract_themes(
    llm: &dyn LlmProvider,
    contents: &[String],
    department: &str,
    max_themes: usize,
) -> Vec<String> {
    if contents.is_empty() {
        return Vec::new();
    }

    let combined: Vec<&str> = contents
        .iter()
        .take(THEME_SOURCE_ITEMS)
        .map(|s| s.as_str())
        .collect();
    let combined = combined.join("\n\n---\n\n");

    let messages = [
        ChatMessage::system(format!(
            "You are an expert at analyzing {} content and extracting key themes. \
             Be concise and specific.",
            department
        )),
        ChatMessage::user(format!(
            "Analyze the following {} content and extract the {} most important \
             themes or topics.\n\n\
             Content:\n{}\n\n\
             Return ONLY a JSON array of theme strings, like: [\"theme1\", \"theme2\", \"theme3\"]\n\
             Do not include any other text or explanation.",
            department, max_themes, combined
        )),
    ];

    let response = match llm.complete(&messages, 0.3, 500).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, department, "theme extraction call failed");
            return Vec::new();
        }
    };

    let payload = extract_json_from_response(&response);
    match serde_json::from_str::<Value>(&payload) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .take(max_themes)
            .collect(),
        Ok(other) => {
            tracing::warn!(department, "unexpected theme payload shape: {}", other);
            Vec::new()
        }
        Err(err) => {
            tracing::warn!(error = %err, department, "theme payload was not valid JSON");
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Summary generation
// ---------------------------------------------------------------------------

/// Generate an aggregated summary from multiple content items.
///
/// Returns an empty string on failure; a missing summary is not an error
/// the caller can act on.
pub async fn summarize(llm: &dyn LlmProvider, contents: &[String], context: &str) -> String {
    if contents.is_empty() {
        return String::new();
    }

    let combined: Vec<&str> = contents
        .iter()
        .take(SUMMARY_SOURCE_ITEMS)
        .map(|s| s.as_str())
        .collect();
    let combined = combined.join("\n\n---\n\n");

    let context_line = if context.is_empty() {
        String::new()
    } else {
        format!("Context: {}\n\n", context)
    };

    let messages = [
        ChatMessage::system(
            "You are an expert at synthesizing information and creating concise summaries.",
        ),
        ChatMessage::user(format!(
            "Create a concise summary (max 200 words) that captures the key points \
             from the following content.\n\n\
             {}Content:\n{}\n\n\
             Provide ONLY the summary text, no preamble or explanation.",
            context_line, combined
        )),
    ];

    match llm.complete(&messages, 0.5, 500).await {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            tracing::warn!(error = %err, "summary generation call failed");
            String::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Coverage analysis
// ---------------------------------------------------------------------------

/// The minimal valid analysis used when the LLM call or parse fails
/// entirely.
pub fn fallback_analysis() -> CoverageAnalysis {
    CoverageAnalysis {
        covered_aspects: Vec::new(),
        gaps: Vec::new(),
        recommendations: vec![FALLBACK_RECOMMENDATION.to_string()],
    }
}

/// Ask the LLM for a coverage analysis of the department's items.
///
/// Never fails: transport errors and unusable payloads both resolve to
/// [`fallback_analysis`].
pub async fn analyze_coverage(
    llm: &dyn LlmProvider,
    items: &[CoverageItem],
    department: &str,
    department_description: &str,
) -> CoverageAnalysis {
    let items_text: Vec<String> = items
        .iter()
        .take(COVERAGE_PROMPT_ITEMS)
        .enumerate()
        .map(|(i, item)| {
            let preview: String = item.content.chars().take(COVERAGE_CONTENT_PREVIEW).collect();
            format!(
                "Item {}:\nSummary: {}\nContent: {}...",
                i + 1,
                item.summary.as_deref().unwrap_or("N/A"),
                preview
            )
        })
        .collect();

    let messages = [
        ChatMessage::system(format!(
            "You are an expert at analyzing {} content coverage and identifying gaps.",
            department
        )),
        ChatMessage::user(format!(
            r#"Analyze the coverage of the following {department} gather items against the department scope.

Department: {department}
Scope: {description}

Gather Items ({count} total):
{items}

Provide a JSON response with this EXACT structure (all fields are required):
{{
  "coveredAspects": [
    {{
      "aspect": "Aspect name",
      "coverage": 85,
      "itemCount": 5,
      "quality": "excellent"
    }}
  ],
  "gaps": [
    {{
      "aspect": "Missing aspect",
      "coverage": 20,
      "itemCount": 0,
      "severity": "high",
      "suggestion": "Specific actionable suggestion"
    }}
  ],
  "recommendations": ["Recommendation 1", "Recommendation 2"]
}}

IMPORTANT:
- coverage must be a number 0-100
- itemCount must be a number (0 for gaps)
- quality must be one of: excellent, good, fair, poor
- severity must be one of: high, medium, low
- All fields are REQUIRED

Return ONLY valid JSON, no other text."#,
            department = department,
            description = department_description,
            count = items.len(),
            items = items_text.join("\n\n"),
        )),
    ];

    match llm.complete(&messages, 0.3, 2000).await {
        Ok(text) => parse_coverage_payload(&text),
        Err(err) => {
            tracing::warn!(error = %err, department, "coverage analysis call failed");
            fallback_analysis()
        }
    }
}

/// Parse the LLM coverage payload with per-entry validation.
///
/// Covered aspects are informational, so a malformed entry is dropped.
/// Gaps are the actionable output, so malformed gap fields are repaired
/// with defaults instead. A payload that is not a JSON object at all
/// yields the fallback analysis.
pub fn parse_coverage_payload(response_text: &str) -> CoverageAnalysis {
    let payload = extract_json_from_response(response_text);
    let value: Value = match serde_json::from_str(&payload) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(error = %err, "coverage payload was not valid JSON");
            return fallback_analysis();
        }
    };
    if !value.is_object() {
        tracing::warn!("coverage payload was not a JSON object");
        return fallback_analysis();
    }

    let covered_aspects = value
        .get("coveredAspects")
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| match parse_covered_aspect(entry) {
                    Some(aspect) => Some(aspect),
                    None => {
                        tracing::warn!("dropping malformed covered aspect: {}", entry);
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let gaps = value
        .get("gaps")
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.as_object())
                .map(parse_gap_with_defaults)
                .collect()
        })
        .unwrap_or_default();

    let recommendations = value
        .get("recommendations")
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    CoverageAnalysis {
        covered_aspects,
        gaps,
        recommendations,
    }
}

/// Strict per-field validation; any missing or mistyped field drops the
/// entry.
fn parse_covered_aspect(entry: &Value) -> Option<CoveredAspect> {
    let object = entry.as_object()?;
    let aspect = object.get("aspect")?.as_str()?.to_string();
    let coverage = object.get("coverage")?.as_u64()?;
    if coverage > 100 {
        return None;
    }
    let item_count = object.get("itemCount")?.as_u64()?;
    let quality = AspectQuality::parse(object.get("quality")?.as_str()?)?;
    Some(CoveredAspect {
        aspect,
        coverage: coverage as u32,
        item_count: item_count as u32,
        quality,
    })
}

/// Lenient per-field repair: every missing or mistyped field gets its
/// documented default, out-of-range coverage is clamped.
fn parse_gap_with_defaults(object: &serde_json::Map<String, Value>) -> CoverageGap {
    let aspect = object
        .get("aspect")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown")
        .to_string();
    let coverage = object
        .get("coverage")
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
        .min(100) as u32;
    let item_count = object
        .get("itemCount")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    let severity = object
        .get("severity")
        .and_then(|v| v.as_str())
        .and_then(GapSeverity::parse)
        .unwrap_or_default();
    let suggestion = object
        .get("suggestion")
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_GAP_SUGGESTION)
        .to_string();

    CoverageGap {
        aspect,
        coverage,
        item_count,
        severity,
        suggestion,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
