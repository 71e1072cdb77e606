//! Opportunity extraction from customer content.
//!
//! [`BatchOrchestrator`] drives content items through prompt rendering
//! ([`PromptBuilder`]), an [`AnalysisBackend`] (in production
//! [`AnthropicClient`]), lenient reply parsing ([`parser`]) and record
//! normalisation ([`factory`]).

pub mod anthropic;
pub mod backend;
pub mod error;
pub mod factory;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
mod retry;

pub use anthropic::AnthropicClient;
pub use backend::AnalysisBackend;
pub use error::AnalyzerError;
pub use factory::{build_opportunity, opportunity_id};
pub use orchestrator::{BatchOrchestrator, ExtractionReport, ProgressFn, RunOptions};
pub use parser::{parse_batch_response, parse_item_response, RawOpportunityRecord};
pub use prompt::PromptBuilder;
