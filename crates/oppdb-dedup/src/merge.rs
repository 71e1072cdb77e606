//! Collapsing a cluster into one representative opportunity.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;

use oppdb_core::Opportunity;

/// Separator between distinct member descriptions.
pub const DESCRIPTION_SEPARATOR: &str = " | ";

/// Merge one cluster. The first member is the base record.
///
/// A single-member cluster is returned as is. Otherwise the base keeps its
/// id, title, category, status and comments, and the rest is combined:
///
/// - `frequency`: sum over members
/// - `sources`: union, first-seen order, no duplicates
/// - `keywords`: union, sorted
/// - `severity`: highest
/// - `description`: distinct descriptions (trimmed, case-insensitive) joined
///   with [`DESCRIPTION_SEPARATOR`]
/// - `created_at`, `processing_date`: earliest
/// - `updated_at`: now
/// - `merged_from`: ids of every other member in cluster order, repeats
///   included, never the base id
///
/// Returns `None` for an empty cluster.
#[must_use]
pub fn merge_cluster(cluster: Vec<Opportunity>) -> Option<Opportunity> {
    let mut members = cluster.into_iter();
    let mut merged = members.next()?;
    let others: Vec<Opportunity> = members.collect();
    if others.is_empty() {
        return Some(merged);
    }

    let mut frequency = merged.frequency;
    let mut severity = merged.severity;
    let mut created_at = merged.created_at;
    let mut processing_date = merged.processing_date;

    let mut seen_sources: HashSet<String> = HashSet::new();
    let mut sources = Vec::new();
    let mut keywords: BTreeSet<String> = BTreeSet::new();
    let mut seen_descriptions: HashSet<String> = HashSet::new();
    let mut descriptions: Vec<String> = Vec::new();
    let mut merged_from: Vec<String> = Vec::new();

    let mut absorb = |opp: &Opportunity| {
        for source in &opp.sources {
            if seen_sources.insert(source.clone()) {
                sources.push(source.clone());
            }
        }
        keywords.extend(opp.keywords.iter().cloned());
        let description = opp.description.trim();
        if !description.is_empty() && seen_descriptions.insert(description.to_lowercase()) {
            descriptions.push(description.to_string());
        }
    };

    absorb(&merged);
    for opp in &others {
        absorb(opp);
        frequency = frequency.saturating_add(opp.frequency);
        severity = severity.max(opp.severity);
        created_at = created_at.min(opp.created_at);
        processing_date = processing_date.min(opp.processing_date);
        if opp.id != merged.id {
            merged_from.push(opp.id.clone());
        }
    }

    tracing::debug!(
        base_id = %merged.id,
        members = others.len() + 1,
        frequency,
        "merged opportunity cluster"
    );

    if !descriptions.is_empty() {
        merged.description = descriptions.join(DESCRIPTION_SEPARATOR);
    }
    merged.frequency = frequency;
    merged.sources = sources;
    merged.keywords = keywords.into_iter().collect();
    merged.severity = severity;
    merged.created_at = created_at;
    merged.processing_date = processing_date;
    merged.updated_at = Utc::now();
    merged.merged_from = merged_from;
    Some(merged)
}
