//! Defensive decoding of model replies.
//!
//! Replies are free text that usually, but not always, contain one JSON object.
//! The object is located greedily (first `{` to last `}`) and decoded leniently:
//! a malformed entry is skipped without discarding its siblings.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::AnalyzerError;

static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// One opportunity exactly as the model described it.
///
/// Every field is optional; defaults are applied when the record is turned
/// into an [`oppdb_core::Opportunity`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOpportunityRecord {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub severity: Option<String>,
    pub keywords: Vec<String>,
}

impl RawOpportunityRecord {
    /// Reads one record out of a JSON value. Returns `None` for non-objects.
    ///
    /// `keywords` may be an array (non-string entries are dropped) or a
    /// comma-separated string.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let keywords = match obj.get("keywords") {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(joined)) => joined
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        Some(Self {
            title: text("title"),
            description: text("description"),
            category: text("category"),
            severity: text("severity"),
            keywords,
        })
    }
}

/// Opportunities the model reported for one item of a batch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemResult {
    pub item_id: String,
    pub records: Vec<RawOpportunityRecord>,
}

/// Returns the greedy `{ ... }` span of `text`, if any.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT.find(text).map(|m| m.as_str())
}

/// Parse a single-item reply. Never fails: anything undecodable is logged and
/// yields an empty list.
#[must_use]
pub fn parse_item_response(text: &str) -> Vec<RawOpportunityRecord> {
    let Some(json) = extract_json_object(text) else {
        tracing::warn!(
            response_len = text.len(),
            "no JSON object found in analysis response"
        );
        return Vec::new();
    };

    let value: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "failed to decode analysis response as JSON");
            return Vec::new();
        }
    };

    match value.get("opportunities") {
        Some(Value::Array(entries)) => records_from_entries(entries),
        Some(_) => {
            tracing::warn!("analysis response has a non-array \"opportunities\" field");
            Vec::new()
        }
        None => {
            tracing::debug!("analysis response has no \"opportunities\" field");
            Vec::new()
        }
    }
}

/// Parse a multi-item reply.
///
/// Unlike [`parse_item_response`] this is strict about the envelope: a reply
/// without a decodable `results` array is an error, which the orchestrator
/// treats as a failed batch call. Entries without an `item_id` are skipped.
///
/// # Errors
///
/// Returns [`AnalyzerError::MalformedBatch`] when no JSON object is present or
/// the `results` array is missing, and [`AnalyzerError::Deserialize`] when the
/// object is not valid JSON.
pub fn parse_batch_response(text: &str) -> Result<Vec<BatchItemResult>, AnalyzerError> {
    let json = extract_json_object(text)
        .ok_or_else(|| AnalyzerError::MalformedBatch("no JSON object in response".to_string()))?;

    let value: Value = serde_json::from_str(json).map_err(|e| AnalyzerError::Deserialize {
        context: "batch analysis response".to_string(),
        source: e,
    })?;

    let entries = value
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| AnalyzerError::MalformedBatch("missing \"results\" array".to_string()))?;

    let results = entries
        .iter()
        .filter_map(|entry| {
            let item_id = match entry.get("item_id") {
                Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
                Some(Value::Number(n)) => n.to_string(),
                _ => {
                    tracing::warn!("skipping batch result without item_id");
                    return None;
                }
            };
            let records = entry
                .get("opportunities")
                .and_then(Value::as_array)
                .map(|entries| records_from_entries(entries))
                .unwrap_or_default();
            Some(BatchItemResult { item_id, records })
        })
        .collect();

    Ok(results)
}

fn records_from_entries(entries: &[Value]) -> Vec<RawOpportunityRecord> {
    entries
        .iter()
        .filter_map(|entry| {
            let record = RawOpportunityRecord::from_value(entry);
            if record.is_none() {
                tracing::debug!("skipping non-object opportunity entry");
            }
            record
        })
        .collect()
}
