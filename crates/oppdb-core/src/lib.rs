//! Shared domain types and configuration for the opportunity pipeline.
//!
//! Content items come in from the upstream extraction step; opportunities
//! leave towards storage. Everything in between lives in `oppdb-analyzer`
//! and `oppdb-dedup`.

pub mod app_config;
pub mod config;
pub mod content;
pub mod opportunity;

use thiserror::Error;

pub use app_config::{AppConfig, ClusterStrategy, PipelineConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use content::{ContentItem, ContentType};
pub use opportunity::{Category, Opportunity, OpportunityStatus, Severity};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("invalid pipeline configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid opportunity status: {0}")]
    InvalidStatus(String),

    #[error("invalid content type: {0}")]
    InvalidContentType(String),

    #[error("invalid category: {0}")]
    InvalidCategory(String),

    #[error("invalid severity: {0}")]
    InvalidSeverity(String),
}
