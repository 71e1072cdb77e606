use crate::ConfigError;

/// How near-duplicate opportunities are grouped before merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterStrategy {
    /// Single pass in input order; later items join a cluster only when they
    /// are similar enough to its seed.
    #[default]
    GreedySeed,
    /// Transitive grouping over every above-threshold pair.
    ConnectedComponents,
}

impl std::fmt::Display for ClusterStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterStrategy::GreedySeed => write!(f, "greedy-seed"),
            ClusterStrategy::ConnectedComponents => write!(f, "connected-components"),
        }
    }
}

impl std::str::FromStr for ClusterStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greedy-seed" | "greedy" => Ok(ClusterStrategy::GreedySeed),
            "connected-components" | "components" => Ok(ClusterStrategy::ConnectedComponents),
            other => Err(ConfigError::InvalidEnvVar {
                var: "OPPDB_CLUSTER_STRATEGY".to_string(),
                reason: format!("unknown strategy '{other}'"),
            }),
        }
    }
}

/// Tunables for one pipeline run. Every field can be overridden per invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub max_opportunities_per_item: usize,
    pub batch_size: usize,
    /// Items beyond this count are dropped (and reported) before batching.
    pub max_items_per_run: usize,
    /// Cosine similarity at or above which two opportunities are duplicates.
    pub similarity_threshold: f32,
    /// `1` keeps batches strictly sequential.
    pub max_concurrent_batches: usize,
    pub cluster_strategy: ClusterStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_opportunities_per_item: 3,
            batch_size: 10,
            max_items_per_run: 500,
            similarity_threshold: 0.8,
            max_concurrent_batches: 1,
            cluster_strategy: ClusterStrategy::GreedySeed,
        }
    }
}

impl PipelineConfig {
    /// Check the invariants the orchestrator and grouper rely on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when a size is zero or the
    /// threshold falls outside `[0.0, 1.0]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Validation(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_items_per_run == 0 {
            return Err(ConfigError::Validation(
                "max_items_per_run must be at least 1".to_string(),
            ));
        }
        if self.max_opportunities_per_item == 0 {
            return Err(ConfigError::Validation(
                "max_opportunities_per_item must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_batches == 0 {
            return Err(ConfigError::Validation(
                "max_concurrent_batches must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Validation(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub anthropic_api_key: String,
    pub anthropic_base_url: String,
    pub ai_model: String,
    pub tei_url: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub pipeline: PipelineConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("anthropic_api_key", &"[redacted]")
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("ai_model", &self.ai_model)
            .field("tei_url", &self.tei_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
