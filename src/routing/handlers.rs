//! Per-content-type handling: priority, follow-up actions, extra metadata

use crate::config::ContentType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Processing priority attached to routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    TimeSensitive,
    Normal,
}

/// What the content-type handler decided for a page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerOutcome {
    /// Handler that ran (same as the content type)
    pub handler: ContentType,
    pub priority: Priority,
    /// Follow-up actions suggested for downstream consumers
    pub suggested_actions: Vec<String>,
    pub additional_metadata: serde_json::Value,
}

fn actions(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Run the handler for a content type.
///
/// `publish_date` is only consulted for news, to compute freshness.
pub fn handle(
    content_type: ContentType,
    publish_date: Option<&str>,
    now: DateTime<Utc>,
) -> HandlerOutcome {
    let (priority, suggested_actions, additional_metadata) = match content_type {
        ContentType::Research => (
            Priority::High,
            actions(&[
                "extract_citations",
                "identify_key_findings",
                "create_summary",
                "link_to_authors",
            ]),
            json!({ "requires_peer_review": true, "citation_format": "academic" }),
        ),
        ContentType::News => (
            Priority::TimeSensitive,
            actions(&[
                "extract_key_facts",
                "identify_sources",
                "check_credibility",
                "create_timeline",
            ]),
            json!({
                "freshness_score": freshness_score(publish_date, now),
                "requires_fact_check": true,
            }),
        ),
        ContentType::Documentation => (
            Priority::Normal,
            actions(&[
                "extract_code_samples",
                "identify_api_endpoints",
                "create_quick_reference",
                "version_tracking",
            ]),
            json!({ "technical_level": "intermediate", "requires_updates": true }),
        ),
        ContentType::Blog => (
            Priority::Normal,
            actions(&[
                "extract_main_points",
                "identify_author_perspective",
                "find_related_posts",
                "sentiment_analysis",
            ]),
            json!({ "content_style": "opinion", "engagement_metrics": true }),
        ),
        ContentType::Product => (
            Priority::Normal,
            actions(&[
                "extract_features",
                "identify_pricing",
                "competitive_analysis",
                "user_reviews_summary",
            ]),
            json!({ "commercial_intent": true, "requires_comparison": true }),
        ),
        ContentType::General => (
            Priority::Normal,
            actions(&["basic_summary", "keyword_extraction", "entity_recognition"]),
            json!({ "requires_classification": true }),
        ),
    };

    HandlerOutcome {
        handler: content_type,
        priority,
        suggested_actions,
        additional_metadata,
    }
}

/// Freshness of a publish date in `[0.2, 1.0]`; 0.5 when unknown
pub fn freshness_score(publish_date: Option<&str>, now: DateTime<Utc>) -> f64 {
    let Some(published) = publish_date.and_then(parse_date) else {
        return 0.5;
    };

    let days_old = (now - published).num_days();
    if days_old < 1 {
        1.0
    } else if days_old < 7 {
        0.8
    } else if days_old < 30 {
        0.6
    } else if days_old < 365 {
        0.4
    } else {
        0.2
    }
}

/// Parse the loose date formats LLM output and page metadata use
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}
