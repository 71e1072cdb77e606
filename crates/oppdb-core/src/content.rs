use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Conversation,
    Ticket,
    Suggestion,
}

impl ContentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Conversation => "conversation",
            ContentType::Ticket => "ticket",
            ContentType::Suggestion => "suggestion",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conversation" => Ok(ContentType::Conversation),
            "ticket" => Ok(ContentType::Ticket),
            "suggestion" => Ok(ContentType::Suggestion),
            other => Err(CoreError::InvalidContentType(other.to_string())),
        }
    }
}

/// One unit of customer feedback produced by the upstream document extractor.
///
/// Read-only as far as the pipeline is concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub content_type: ContentType,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub source_file: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub customer_id: Option<String>,
}

impl ContentItem {
    /// Build an item with empty metadata and no timestamp or customer.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        content_type: ContentType,
        content: impl Into<String>,
        source_file: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content_type,
            content: content.into(),
            metadata: serde_json::Map::new(),
            source_file: source_file.into(),
            timestamp: None,
            customer_id: None,
        }
    }

    #[must_use]
    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }
}
