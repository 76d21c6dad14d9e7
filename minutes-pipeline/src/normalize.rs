//! JSON normalization into the typed minutes shape (spec §4.I steps 3-4).

use chrono::NaiveDate;
use meeting_types::minutes::{ActionItem, ActionItemPriority, ActionItemStatus, FollowUp};
use serde_json::Value as JsonValue;

#[derive(Debug, Default)]
pub struct ParsedMinutes {
    pub summary: String,
    pub agenda: Vec<String>,
    pub discussion_points: Vec<String>,
    pub decisions: Vec<String>,
    pub action_items: Vec<ActionItem>,
    pub highlights: Vec<String>,
    pub questions_raised: Vec<String>,
    pub follow_ups: Vec<FollowUp>,
}

fn string_array(value: &JsonValue, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(JsonValue::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_priority(value: Option<&str>) -> ActionItemPriority {
    match value.map(str::to_lowercase).as_deref() {
        Some("low") => ActionItemPriority::Low,
        Some("high") => ActionItemPriority::High,
        _ => ActionItemPriority::Medium,
    }
}

fn parse_deadline(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

fn parse_action_items(value: &JsonValue) -> Vec<ActionItem> {
    value
        .get("actionItems")
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let description = item.get("description")?.as_str()?.to_string();
                    Some(ActionItem {
                        description,
                        owner: item.get("owner").and_then(JsonValue::as_str).map(String::from),
                        priority: parse_priority(item.get("priority").and_then(JsonValue::as_str)),
                        status: ActionItemStatus::Pending,
                        deadline: parse_deadline(item.get("deadline").and_then(JsonValue::as_str)),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_follow_ups(value: &JsonValue) -> Vec<FollowUp> {
    value
        .get("followUps")
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let description = item.get("description")?.as_str()?.to_string();
                    Some(FollowUp {
                        description,
                        owner: item.get("owner").and_then(JsonValue::as_str).map(String::from),
                        deadline: parse_deadline(item.get("deadline").and_then(JsonValue::as_str)),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Normalize the LLM's raw JSON object into typed minutes fields, defaulting
/// `priority = medium`, `status = pending` on every action item (spec §4.I
/// step 4).
pub fn normalize(value: &JsonValue) -> ParsedMinutes {
    ParsedMinutes {
        summary: value
            .get("summary")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string(),
        agenda: string_array(value, "agenda"),
        discussion_points: string_array(value, "discussionPoints"),
        decisions: string_array(value, "decisions"),
        action_items: parse_action_items(value),
        highlights: string_array(value, "highlights"),
        questions_raised: string_array(value, "questionsRaised"),
        follow_ups: parse_follow_ups(value),
    }
}

/// The record persisted when the LLM response fails to parse as JSON: empty
/// arrays, a placeholder summary, `status = failed` (spec §4.I step 3).
pub fn degraded(error: &str) -> ParsedMinutes {
    ParsedMinutes {
        summary: format!("Minutes could not be generated: {error}"),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_priority_and_status() {
        let value = json!({
            "actionItems": [{"description": "Ship the thing"}],
        });
        let parsed = parse_action_items(&value);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].priority, ActionItemPriority::Medium);
        assert_eq!(parsed[0].status, ActionItemStatus::Pending);
    }

    #[test]
    fn parses_explicit_priority_and_deadline() {
        let value = json!({
            "actionItems": [{
                "description": "Fix bug",
                "priority": "high",
                "deadline": "2026-08-01"
            }],
        });
        let parsed = parse_action_items(&value);
        assert_eq!(parsed[0].priority, ActionItemPriority::High);
        assert_eq!(
            parsed[0].deadline,
            Some(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap())
        );
    }

    #[test]
    fn degraded_record_has_empty_collections() {
        let record = degraded("boom");
        assert!(record.summary.contains("boom"));
        assert!(record.action_items.is_empty());
    }
}
