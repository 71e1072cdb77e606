//! Batch orchestration of content analysis.
//!
//! Items are capped, split into consecutive batches, and analyzed batch by
//! batch. A multi-item batch is first sent as one consolidated call; if that
//! call fails for any reason every item of the batch is retried on its own,
//! and any item a successful reply leaves out is analyzed on its own.
//! Per-item failures yield zero opportunities for that item and never abort
//! the run.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use oppdb_core::{ContentItem, Opportunity, PipelineConfig};

use crate::backend::AnalysisBackend;
use crate::error::AnalyzerError;
use crate::factory::build_opportunity;
use crate::parser::{parse_batch_response, parse_item_response, RawOpportunityRecord};
use crate::prompt::PromptBuilder;

/// Called after each batch with `(batch_number, total_batches)`, 1-based.
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Per-invocation overrides. Unset fields fall back to the orchestrator's
/// [`PipelineConfig`].
#[derive(Default, Clone, Copy)]
pub struct RunOptions<'a> {
    pub max_opportunities: Option<usize>,
    pub batch_size: Option<usize>,
    pub max_items: Option<usize>,
    pub processing_date: Option<DateTime<Utc>>,
    pub progress: Option<ProgressFn<'a>>,
}

impl<'a> RunOptions<'a> {
    #[must_use]
    pub fn with_max_opportunities(mut self, max_opportunities: usize) -> Self {
        self.max_opportunities = Some(max_opportunities);
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    #[must_use]
    pub fn with_processing_date(mut self, date: DateTime<Utc>) -> Self {
        self.processing_date = Some(date);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn<'a>) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Outcome of one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// In batch order, then item order within a batch.
    pub opportunities: Vec<Opportunity>,
    pub items_received: usize,
    pub items_processed: usize,
    /// `true` when items beyond the per-run cap were dropped.
    pub truncated: bool,
    pub batches: usize,
    /// Multi-item batches whose consolidated call failed and fell back to
    /// per-item analysis.
    pub failed_batches: usize,
    /// Items a successful consolidated reply left out, analyzed on their own.
    pub uncovered_items: usize,
}

struct BatchOutcome {
    opportunities: Vec<Opportunity>,
    fell_back: bool,
    uncovered: usize,
}

/// Drives content items through prompt → backend → parser → factory.
pub struct BatchOrchestrator<B> {
    backend: B,
    config: PipelineConfig,
    prompts: PromptBuilder,
}

impl<B: AnalysisBackend> BatchOrchestrator<B> {
    /// Wire an orchestrator to an analysis backend.
    ///
    /// Backend construction is where a missing credential surfaces; by the
    /// time a backend exists only the pipeline config can still be invalid.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Config`] if `config` fails validation.
    pub fn new(backend: B, config: PipelineConfig) -> Result<Self, AnalyzerError> {
        config.validate()?;
        let prompts = PromptBuilder::new(config.max_opportunities_per_item);
        Ok(Self {
            backend,
            config,
            prompts,
        })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract opportunities from `items` with the configured batch size and cap.
    pub async fn extract_opportunities(&self, items: &[ContentItem]) -> Vec<Opportunity> {
        self.run_with(items, RunOptions::default())
            .await
            .map(|report| report.opportunities)
            .unwrap_or_default()
    }

    /// Extract opportunities with per-invocation overrides and a full report.
    ///
    /// All analysis failures are recovered internally; the run always
    /// completes with whatever was extracted.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Config`] only when an override is zero.
    pub async fn run_with(
        &self,
        items: &[ContentItem],
        options: RunOptions<'_>,
    ) -> Result<ExtractionReport, AnalyzerError> {
        let batch_size = options.batch_size.unwrap_or(self.config.batch_size);
        let max_items = options.max_items.unwrap_or(self.config.max_items_per_run);
        let max_opportunities = options
            .max_opportunities
            .unwrap_or(self.config.max_opportunities_per_item);
        if batch_size == 0 || max_items == 0 || max_opportunities == 0 {
            return Err(oppdb_core::ConfigError::Validation(
                "batch size, item cap and opportunity cap must be at least 1".to_string(),
            )
            .into());
        }
        let prompts = &PromptBuilder::new(max_opportunities);
        let processing_date = options.processing_date.unwrap_or_else(Utc::now);

        let items_received = items.len();
        let truncated = items_received > max_items;
        let items = if truncated {
            tracing::warn!(
                items_received,
                max_items,
                dropped = items_received - max_items,
                "too many content items, processing only the first {max_items}"
            );
            &items[..max_items]
        } else {
            items
        };

        let total_batches = items.len().div_ceil(batch_size);
        tracing::info!(
            items = items.len(),
            total_batches,
            batch_size,
            max_opportunities,
            "starting opportunity extraction"
        );

        let mut results = stream::iter(items.chunks(batch_size).enumerate())
            .map(|(index, batch)| async move {
                tracing::debug!(
                    batch = index + 1,
                    total_batches,
                    items = batch.len(),
                    "analyzing batch"
                );
                (
                    index,
                    self.analyze_batch(prompts, batch, processing_date).await,
                )
            })
            .buffered(self.config.max_concurrent_batches);

        let mut opportunities = Vec::new();
        let mut failed_batches = 0usize;
        let mut uncovered_items = 0usize;
        while let Some((index, outcome)) = results.next().await {
            let batch_number = index + 1;
            tracing::info!(
                batch = batch_number,
                total_batches,
                found = outcome.opportunities.len(),
                fell_back = outcome.fell_back,
                uncovered = outcome.uncovered,
                "batch complete"
            );
            if outcome.fell_back {
                failed_batches += 1;
            }
            uncovered_items += outcome.uncovered;
            opportunities.extend(outcome.opportunities);
            if let Some(progress) = options.progress {
                progress(batch_number, total_batches);
            }
        }

        Ok(ExtractionReport {
            opportunities,
            items_received,
            items_processed: items.len(),
            truncated,
            batches: total_batches,
            failed_batches,
            uncovered_items,
        })
    }

    /// Analyze one item. Any failure is logged and yields no opportunities.
    pub async fn analyze_item(
        &self,
        item: &ContentItem,
        processing_date: Option<DateTime<Utc>>,
    ) -> Vec<Opportunity> {
        self.analyze_item_with(&self.prompts, item, processing_date)
            .await
    }

    async fn analyze_item_with(
        &self,
        prompts: &PromptBuilder,
        item: &ContentItem,
        processing_date: Option<DateTime<Utc>>,
    ) -> Vec<Opportunity> {
        match self.backend.complete(&prompts.item_prompt(item)).await {
            Ok(response) => parse_item_response(&response)
                .into_iter()
                .map(|record| build_opportunity(record, item, processing_date))
                .collect(),
            Err(e) => {
                tracing::warn!(item_id = %item.id, error = %e, "item analysis failed");
                Vec::new()
            }
        }
    }

    async fn analyze_batch(
        &self,
        prompts: &PromptBuilder,
        batch: &[ContentItem],
        processing_date: DateTime<Utc>,
    ) -> BatchOutcome {
        let date = Some(processing_date);
        if let [item] = batch {
            return BatchOutcome {
                opportunities: self.analyze_item_with(prompts, item, date).await,
                fell_back: false,
                uncovered: 0,
            };
        }

        let per_item = match self.analyze_together(prompts, batch).await {
            Ok(per_item) => per_item,
            Err(e) => {
                tracing::warn!(
                    items = batch.len(),
                    error = %e,
                    "batch analysis failed, falling back to per-item analysis"
                );
                let mut opportunities = Vec::new();
                for item in batch {
                    opportunities.extend(self.analyze_item_with(prompts, item, date).await);
                }
                return BatchOutcome {
                    opportunities,
                    fell_back: true,
                    uncovered: 0,
                };
            }
        };

        let mut opportunities = Vec::new();
        let mut uncovered = 0usize;
        for (item, records) in batch.iter().zip(per_item) {
            if let Some(records) = records {
                opportunities.extend(
                    records
                        .into_iter()
                        .map(|record| build_opportunity(record, item, date)),
                );
            } else {
                uncovered += 1;
                tracing::warn!(
                    item_id = %item.id,
                    "batch response omitted item, analyzing it on its own"
                );
                opportunities.extend(self.analyze_item_with(prompts, item, date).await);
            }
        }
        BatchOutcome {
            opportunities,
            fell_back: false,
            uncovered,
        }
    }

    /// One consolidated call for the whole batch.
    ///
    /// Yields one entry per batch item in batch order, regardless of the order
    /// the model answered in: that item's records, or `None` when the reply
    /// has no result for it.
    async fn analyze_together(
        &self,
        prompts: &PromptBuilder,
        batch: &[ContentItem],
    ) -> Result<Vec<Option<Vec<RawOpportunityRecord>>>, AnalyzerError> {
        let response = self
            .backend
            .complete_batch(&prompts.batch_prompt(batch), batch.len())
            .await?;
        let mut results = parse_batch_response(&response)?;

        for result in &results {
            if !batch.iter().any(|item| item.id == result.item_id) {
                tracing::warn!(
                    item_id = %result.item_id,
                    "batch response references an unknown item, ignoring it"
                );
            }
        }

        Ok(batch
            .iter()
            .map(|item| -> Option<Vec<RawOpportunityRecord>> {
                let mut matched = results
                    .iter_mut()
                    .filter(|r| r.item_id == item.id)
                    .peekable();
                matched.peek()?;
                Some(
                    matched
                        .flat_map(|r| std::mem::take(&mut r.records))
                        .collect(),
                )
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
