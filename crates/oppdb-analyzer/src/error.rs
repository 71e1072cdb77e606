use thiserror::Error;

/// Errors raised while talking to the analysis backend or decoding its output.
///
/// Only [`AnalyzerError::MissingCredential`] and [`AnalyzerError::Config`] are
/// meant to reach callers of the orchestrator; everything else is caught and
/// logged per item or per batch.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("configuration error: {0}")]
    Config(#[from] oppdb_core::ConfigError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("analysis backend rate limited the request")]
    RateLimited,

    #[error("unexpected HTTP status {status} from analysis backend: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("analysis backend returned no text")]
    EmptyCompletion,

    #[error("analysis reply was cut off at the {max_tokens}-token output limit")]
    TruncatedCompletion { max_tokens: u32 },

    #[error("malformed batch response: {0}")]
    MalformedBatch(String),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("analysis backend error: {0}")]
    Backend(String),
}
