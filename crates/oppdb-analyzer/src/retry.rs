//! Retry with exponential back-off and jitter for the analysis backend client.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, 429, 5xx). Everything else is returned
//! immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::AnalyzerError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - Network-level failures: timeout, connection reset.
/// - [`AnalyzerError::RateLimited`]: HTTP 429.
/// - [`AnalyzerError::UnexpectedStatus`] with a 5xx status (includes the
///   529 "overloaded" status).
///
/// **Not retriable:** authentication failures, malformed responses, and any
/// other 4xx status. Retrying won't fix them.
pub(crate) fn is_retriable(err: &AnalyzerError) -> bool {
    match err {
        AnalyzerError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        AnalyzerError::RateLimited => true,
        AnalyzerError::UnexpectedStatus { status, .. } => *status >= 500,
        AnalyzerError::MissingCredential(_)
        | AnalyzerError::Config(_)
        | AnalyzerError::Deserialize { .. }
        | AnalyzerError::EmptyCompletion
        | AnalyzerError::TruncatedCompletion { .. }
        | AnalyzerError::MalformedBatch(_)
        | AnalyzerError::InvalidBaseUrl { .. }
        | AnalyzerError::Backend(_) => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// The n-th retry sleeps `backoff_base_ms * 2^(n-1)` milliseconds, ±25 % jitter,
/// capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, AnalyzerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AnalyzerError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "analysis backend transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
