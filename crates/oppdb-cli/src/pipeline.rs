//! `extract`, `dedup` and `run` handlers.

use std::path::Path;

use chrono::{DateTime, Utc};
use oppdb_analyzer::{AnthropicClient, BatchOrchestrator, RunOptions};
use oppdb_core::{AppConfig, ContentItem, Opportunity, PipelineConfig};
use oppdb_dedup::{deduplicate_with, SimilarityGrouper, TeiClient};

use crate::files::{read_json, write_json};
use crate::{DedupArgs, ExtractArgs};

pub(crate) async fn run_extract(args: &ExtractArgs) -> anyhow::Result<()> {
    let config = oppdb_core::load_app_config_from_env()?;
    let opportunities = extract(&config, args).await?;
    write_json(args.output.as_deref(), &opportunities)
}

pub(crate) async fn run_dedup(
    input: &Path,
    output: Option<&Path>,
    args: &DedupArgs,
) -> anyhow::Result<()> {
    let opportunities: Vec<Opportunity> = read_json(input)?;
    let grouper = grouper(args, &PipelineConfig::default())?;
    let client = TeiClient::new(&args.tei_url, args.timeout_secs)?;
    let merged = deduplicate_with(&client, &grouper, opportunities).await?;
    write_json(output, &merged)
}

/// Extract then deduplicate. An embedding failure keeps the extracted list
/// as is rather than losing the run.
pub(crate) async fn run_full(extract_args: &ExtractArgs, dedup_args: &DedupArgs) -> anyhow::Result<()> {
    let config = oppdb_core::load_app_config_from_env()?;
    let grouper = grouper(dedup_args, &config.pipeline)?;
    let client = TeiClient::new(&dedup_args.tei_url, dedup_args.timeout_secs)?;

    let opportunities = extract(&config, extract_args).await?;
    let result = match deduplicate_with(&client, &grouper, opportunities.clone()).await {
        Ok(merged) => merged,
        Err(e) => {
            tracing::error!(error = %e, "deduplication failed, writing undeduplicated opportunities");
            opportunities
        }
    };
    write_json(extract_args.output.as_deref(), &result)
}

async fn extract(config: &AppConfig, args: &ExtractArgs) -> anyhow::Result<Vec<Opportunity>> {
    let client = AnthropicClient::from_config(config)?;
    tracing::info!(model = client.model(), "analysis backend ready");
    let orchestrator = BatchOrchestrator::new(client, config.pipeline.clone())?;

    let items: Vec<ContentItem> = read_json(&args.input)?;
    let progress = |batch: usize, total: usize| {
        tracing::info!(batch, total_batches = total, "extraction progress");
    };

    let mut options = RunOptions::default().with_progress(&progress);
    if let Some(batch_size) = args.batch_size {
        options = options.with_batch_size(batch_size);
    }
    if let Some(max_items) = args.max_items {
        options = options.with_max_items(max_items);
    }
    if let Some(max_opportunities) = args.max_opportunities {
        options = options.with_max_opportunities(max_opportunities);
    }
    if let Some(date) = args.processing_date {
        let midnight: DateTime<Utc> = date.and_time(chrono::NaiveTime::MIN).and_utc();
        options = options.with_processing_date(midnight);
    }

    let report = orchestrator.run_with(&items, options).await?;
    if report.truncated {
        tracing::warn!(
            received = report.items_received,
            processed = report.items_processed,
            "input truncated to the per-run item cap"
        );
    }
    tracing::info!(
        items = report.items_processed,
        batches = report.batches,
        failed_batches = report.failed_batches,
        uncovered_items = report.uncovered_items,
        opportunities = report.opportunities.len(),
        "extraction complete"
    );
    Ok(report.opportunities)
}

fn grouper(args: &DedupArgs, defaults: &PipelineConfig) -> anyhow::Result<SimilarityGrouper> {
    let threshold = args.threshold.unwrap_or(defaults.similarity_threshold);
    let strategy = args.strategy.unwrap_or(defaults.cluster_strategy);
    Ok(SimilarityGrouper::new(threshold, strategy)?)
}
