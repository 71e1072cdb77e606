use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    PainPoint,
    #[default]
    ImprovementOpportunity,
    FeatureRequest,
}

impl Category {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::PainPoint => "pain_point",
            Category::ImprovementOpportunity => "improvement_opportunity",
            Category::FeatureRequest => "feature_request",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pain_point" => Ok(Category::PainPoint),
            "improvement_opportunity" => Ok(Category::ImprovementOpportunity),
            "feature_request" => Ok(Category::FeatureRequest),
            _ => Err(CoreError::InvalidCategory(s.to_string())),
        }
    }
}

/// Severity of an opportunity. Variant order is the ranking used when merging:
/// `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(CoreError::InvalidSeverity(s.to_string())),
        }
    }
}

/// Workflow status. Wire names are the ones the review team uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OpportunityStatus {
    #[default]
    #[serde(rename = "nueva")]
    New,
    #[serde(rename = "en_proceso")]
    InProgress,
    #[serde(rename = "solucionada")]
    Resolved,
    #[serde(rename = "descartada")]
    Discarded,
    #[serde(rename = "bloqueada")]
    Blocked,
}

impl OpportunityStatus {
    pub const ALL: [OpportunityStatus; 5] = [
        OpportunityStatus::New,
        OpportunityStatus::InProgress,
        OpportunityStatus::Resolved,
        OpportunityStatus::Discarded,
        OpportunityStatus::Blocked,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OpportunityStatus::New => "nueva",
            OpportunityStatus::InProgress => "en_proceso",
            OpportunityStatus::Resolved => "solucionada",
            OpportunityStatus::Discarded => "descartada",
            OpportunityStatus::Blocked => "bloqueada",
        }
    }
}

impl std::fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpportunityStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpportunityStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::InvalidStatus(s.to_string()))
    }
}

/// A tracked pain point, improvement idea, or feature request.
///
/// Created once per model finding with `frequency = 1`, possibly replaced by a
/// merged record during deduplication, and afterwards only touched through
/// [`Opportunity::set_status`] and [`Opportunity::set_comments`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub severity: Severity,
    /// Number of mentions folded into this record. Always >= 1.
    pub frequency: u32,
    /// Content item ids this opportunity was found in, without duplicates.
    pub sources: Vec<String>,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Logical date of the batch run that produced the record.
    pub processing_date: DateTime<Utc>,
    #[serde(default)]
    pub status: OpportunityStatus,
    #[serde(default)]
    pub comments: String,
    /// Ids of the opportunities merged into this one. Never contains `id`.
    #[serde(default)]
    pub merged_from: Vec<String>,
}

impl Opportunity {
    /// Move the opportunity to `status` and bump `updated_at`.
    pub fn set_status(&mut self, status: OpportunityStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Replace the free-text comments and bump `updated_at`.
    pub fn set_comments(&mut self, comments: impl Into<String>) {
        self.comments = comments.into();
        self.updated_at = Utc::now();
    }

    #[must_use]
    pub fn is_merged(&self) -> bool {
        !self.merged_from.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample() -> Opportunity {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        Opportunity {
            id: "opp_row_1_0a1b2c3d".to_string(),
            title: "Slow checkout".to_string(),
            description: "Checkout takes more than a minute".to_string(),
            category: Category::PainPoint,
            severity: Severity::High,
            frequency: 1,
            sources: vec!["row_1".to_string()],
            keywords: vec!["checkout".to_string()],
            created_at: at,
            updated_at: at,
            processing_date: at,
            status: OpportunityStatus::New,
            comments: String::new(),
            merged_from: Vec::new(),
        }
    }

    #[test]
    fn severity_order_is_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_parse_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(" critical ".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn category_defaults_to_improvement_opportunity() {
        assert_eq!(Category::default(), Category::ImprovementOpportunity);
        assert_eq!(
            "feature_request".parse::<Category>().unwrap(),
            Category::FeatureRequest
        );
    }

    #[test]
    fn status_wire_names() {
        let json = serde_json::to_string(&OpportunityStatus::InProgress).unwrap();
        assert_eq!(json, "\"en_proceso\"");
        let parsed: OpportunityStatus = serde_json::from_str("\"bloqueada\"").unwrap();
        assert_eq!(parsed, OpportunityStatus::Blocked);
    }

    #[test]
    fn status_parse_rejects_unknown() {
        let err = "archived".parse::<OpportunityStatus>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidStatus(ref v) if v == "archived"));
    }

    #[test]
    fn status_default_is_new() {
        assert_eq!(OpportunityStatus::default(), OpportunityStatus::New);
        assert_eq!(OpportunityStatus::New.to_string(), "nueva");
    }

    #[test]
    fn set_status_bumps_updated_at() {
        let mut opp = sample();
        let before = opp.updated_at;
        opp.set_status(OpportunityStatus::Resolved);
        assert_eq!(opp.status, OpportunityStatus::Resolved);
        assert!(opp.updated_at > before);
        assert_eq!(opp.created_at, before);
    }

    #[test]
    fn set_comments_bumps_updated_at() {
        let mut opp = sample();
        let before = opp.updated_at;
        opp.set_comments("owner: payments team");
        assert_eq!(opp.comments, "owner: payments team");
        assert!(opp.updated_at > before);
    }

    #[test]
    fn missing_workflow_fields_deserialize_to_defaults() {
        let mut value = serde_json::to_value(sample()).unwrap();
        let obj = value.as_object_mut().unwrap();
        obj.remove("status");
        obj.remove("comments");
        obj.remove("merged_from");
        let opp: Opportunity = serde_json::from_value(value).unwrap();
        assert_eq!(opp.status, OpportunityStatus::New);
        assert!(opp.comments.is_empty());
        assert!(!opp.is_merged());
    }
}
