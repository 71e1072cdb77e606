//! Turns parsed model records into canonical opportunities.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use oppdb_core::{Category, ContentItem, Opportunity, OpportunityStatus, Severity};

use crate::parser::RawOpportunityRecord;

pub const UNTITLED_OPPORTUNITY: &str = "Untitled opportunity";
pub const NO_DESCRIPTION: &str = "No description";

/// Derive the opportunity id from the source item and the title.
///
/// Format: `opp_{item_id}_{first 8 hex chars of SHA-256(title)}`. Re-running
/// the same item yields the same id for the same title; different titles from
/// the same item get different ids.
#[must_use]
pub fn opportunity_id(item_id: &str, title: &str) -> String {
    let hash = Sha256::digest(title.as_bytes());
    format!(
        "opp_{item_id}_{:02x}{:02x}{:02x}{:02x}",
        hash[0], hash[1], hash[2], hash[3]
    )
}

/// Build a fresh opportunity from one record found in `item`.
///
/// The result has `frequency = 1`, `sources = [item.id]`, status
/// [`OpportunityStatus::New`], no comments and no merge history.
/// `processing_date` defaults to now.
#[must_use]
pub fn build_opportunity(
    record: RawOpportunityRecord,
    item: &ContentItem,
    processing_date: Option<DateTime<Utc>>,
) -> Opportunity {
    let now = Utc::now();

    let title = record
        .title
        .unwrap_or_else(|| UNTITLED_OPPORTUNITY.to_string());
    let description = record
        .description
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    let category = record
        .category
        .as_deref()
        .map_or_else(Category::default, |raw| {
            raw.parse().unwrap_or_else(|_| {
                tracing::debug!(item_id = %item.id, category = raw, "unknown category, using default");
                Category::default()
            })
        });

    let severity = record
        .severity
        .as_deref()
        .map_or_else(Severity::default, |raw| {
            raw.parse().unwrap_or_else(|_| {
                tracing::debug!(item_id = %item.id, severity = raw, "unknown severity, using default");
                Severity::default()
            })
        });

    let mut keywords: Vec<String> = Vec::with_capacity(record.keywords.len());
    for keyword in record.keywords {
        if !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }

    Opportunity {
        id: opportunity_id(&item.id, &title),
        title,
        description,
        category,
        severity,
        frequency: 1,
        sources: vec![item.id.clone()],
        keywords,
        created_at: now,
        updated_at: now,
        processing_date: processing_date.unwrap_or(now),
        status: OpportunityStatus::New,
        comments: String::new(),
        merged_from: Vec::new(),
    }
}
