//! Embedding capability and the TEI (Text Embeddings Inference) client.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use oppdb_core::AppConfig;

use crate::error::DedupError;

/// Maximum number of texts per /embed call.
const BATCH_SIZE: usize = 64;

/// Turns texts into fixed-dimension vectors and scores vector pairs.
pub trait EmbeddingBackend: Send + Sync {
    /// One vector per input text, in input order.
    fn embed(
        &self,
        texts: &[&str],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, DedupError>> + Send;

    /// Similarity on a scale where 1.0 means identical. Defaults to cosine.
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }
}

impl<T: EmbeddingBackend> EmbeddingBackend for &T {
    fn embed(
        &self,
        texts: &[&str],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, DedupError>> + Send {
        (**self).embed(texts)
    }

    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        (**self).similarity(a, b)
    }
}

/// Cosine similarity of two vectors. Zero-norm or length-mismatched inputs score 0.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// TEI HTTP client.
pub struct TeiClient {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [&'a str],
}

impl TeiClient {
    /// Create a new `TeiClient` for the server at `tei_url`.
    ///
    /// # Errors
    ///
    /// Returns [`DedupError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(tei_url: &str, timeout_secs: u64) -> Result<Self, DedupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/embed", tei_url.trim_end_matches('/')),
        })
    }

    /// # Errors
    ///
    /// Same as [`TeiClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, DedupError> {
        Self::new(&config.tei_url, config.request_timeout_secs)
    }
}

impl EmbeddingBackend for TeiClient {
    /// Texts are batched into groups of [`BATCH_SIZE`] (64) per request.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, DedupError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = EmbedRequest { inputs: chunk };
            let response = self
                .client
                .post(&self.url)
                .json(&request)
                .send()
                .await
                .map_err(|e| DedupError::Tei(format!("TEI request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(DedupError::Tei(format!(
                    "TEI returned status {}",
                    response.status()
                )));
            }

            let embeddings: Vec<Vec<f32>> = response
                .json()
                .await
                .map_err(|e| DedupError::Tei(format!("TEI response parse error: {e}")))?;

            if embeddings.len() != chunk.len() {
                return Err(DedupError::CountMismatch {
                    expected: chunk.len(),
                    got: embeddings.len(),
                });
            }

            all_embeddings.extend(embeddings);
        }

        tracing::debug!(texts = texts.len(), "embedded texts via TEI");
        Ok(all_embeddings)
    }
}
