// roster-service/src/services/suggestions.rs
//
// Contract with the external generative-suggestion service. The core
// shapes the request payload and tolerantly parses the response; any
// backend failure or parse failure degrades to the empty suggestion list.
use crate::models::ServiceError;
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    #[serde(default)]
    pub staff: Value,
    #[serde(default)]
    pub overrides: Value,
    #[serde(default)]
    pub pattern: Value,
    #[serde(default)]
    pub events: Value,
    #[serde(default)]
    pub constraints: Value,
    #[serde(default)]
    pub health_score: Value,
    #[serde(default)]
    pub policy_summary: Value,
}

pub trait SuggestionBackend: Send + Sync {
    // Produce the raw model text for one request
    fn complete(&self, request: &SuggestionRequest) -> Result<String, ServiceError>;
}

pub type SharedSuggestionBackend = Arc<dyn SuggestionBackend>;

// Default backend for deployments without a model attached
pub struct OfflineSuggestionBackend;

impl SuggestionBackend for OfflineSuggestionBackend {
    fn complete(&self, _request: &SuggestionRequest) -> Result<String, ServiceError> {
        Ok(r#"{"suggestions":[]}"#.to_string())
    }
}

// Instructions sent with every request. The backend must return bare JSON
// matching the suggestions schema.
pub const SYSTEM_PROMPT: &str = r#"You are an expert roster optimization assistant.
Return ONLY valid JSON. Do not include markdown, code fences, or commentary.
Schema:
{"suggestions":[{"id":"string","title":"string","description":"string","reason":"string","priority":0-3,"type":0-5,"actionType":0-6,"actionPayload":object,"impactScore":0-1,"confidence":0-1,"affectedStaff":["string"],"metrics":object}]}
Rules:
- Use only names from staff in the input; do not invent people.
- Use shifts exactly as provided in the pattern or overrides (e.g., "D","N","OFF","L").
- If no good suggestions, return {"suggestions":[]}.
- Keep suggestions under 6 items and focused on conflicts, coverage gaps, leave conflicts, fairness, workload, and policy violations in policySummary."#;

// The user-turn prompt wrapping the roster payload
pub fn build_user_prompt(request: &SuggestionRequest) -> String {
    let payload = serde_json::to_string(request).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Analyze this roster data and return optimization suggestions.\nInput JSON:\n{}",
        payload
    )
}

// Parse model output that may be wrapped in prose or fences: try the whole
// text, then the slice from the first '{' to the last '}'.
pub fn safe_json_parse(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

// Pull the suggestions array out of a parsed response, or nothing
pub fn extract_suggestions(parsed: Option<Value>) -> Vec<Value> {
    match parsed {
        Some(Value::Object(mut map)) => match map.remove("suggestions") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

// Full round trip: backend call plus tolerant extraction. Never errors.
pub fn request_suggestions(
    backend: &dyn SuggestionBackend,
    request: &SuggestionRequest,
) -> Vec<Value> {
    match backend.complete(request) {
        Ok(text) => extract_suggestions(safe_json_parse(&text)),
        Err(e) => {
            error!("Suggestion backend failed: {}", e);
            Vec::new()
        }
    }
}
