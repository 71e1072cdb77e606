//! The text-analysis capability the orchestrator depends on.

use std::future::Future;

use crate::error::AnalyzerError;

/// A generative backend that turns one prompt into one raw text completion.
///
/// Retries and backoff are the implementation's business; the orchestrator
/// treats every `Err` as a failed call and degrades accordingly.
pub trait AnalysisBackend: Send + Sync {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, AnalyzerError>> + Send;

    /// Completion for a prompt covering `items` content items.
    ///
    /// Implementations may size the reply budget by `items` and spend fewer
    /// retries, since a failed batch is re-run item by item anyway.
    fn complete_batch(
        &self,
        prompt: &str,
        items: usize,
    ) -> impl Future<Output = Result<String, AnalyzerError>> + Send {
        let _ = items;
        self.complete(prompt)
    }
}

impl<T: AnalysisBackend> AnalysisBackend for &T {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, AnalyzerError>> + Send {
        (**self).complete(prompt)
    }

    fn complete_batch(
        &self,
        prompt: &str,
        items: usize,
    ) -> impl Future<Output = Result<String, AnalyzerError>> + Send {
        (**self).complete_batch(prompt, items)
    }
}
