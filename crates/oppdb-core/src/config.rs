use crate::app_config::{AppConfig, ClusterStrategy, PipelineConfig};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        match lookup(var) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::MissingEnvVar(var.to_string())),
        }
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let anthropic_api_key = require("ANTHROPIC_API_KEY")?;
    let anthropic_base_url = or_default("ANTHROPIC_BASE_URL", "https://api.anthropic.com");
    let ai_model = or_default("AI_MODEL", "claude-3-haiku-20240307");
    let tei_url = or_default("OPPDB_TEI_URL", "http://localhost:8080");
    let log_level = or_default("OPPDB_LOG_LEVEL", "info");

    let request_timeout_secs = parse_u64("OPPDB_REQUEST_TIMEOUT_SECS", "60")?;
    let max_retries = parse_u32("OPPDB_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("OPPDB_RETRY_BACKOFF_BASE_MS", "1000")?;

    let max_opportunities_per_item = parse_usize("MAX_OPPORTUNITIES_PER_INPUT", "3")?;
    let batch_size = parse_usize("AI_BATCH_SIZE", "10")?;
    let max_items_per_run = parse_usize("MAX_ITEMS_PER_FILE", "500")?;
    let max_concurrent_batches = parse_usize("OPPDB_MAX_CONCURRENT_BATCHES", "1")?;
    let similarity_threshold = parse_threshold(&or_default("SIMILARITY_THRESHOLD", "0.8"))?;
    let cluster_strategy = or_default("OPPDB_CLUSTER_STRATEGY", "greedy-seed")
        .parse::<ClusterStrategy>()?;

    let pipeline = PipelineConfig {
        max_opportunities_per_item,
        batch_size,
        max_items_per_run,
        similarity_threshold,
        max_concurrent_batches,
        cluster_strategy,
    };
    pipeline.validate()?;

    Ok(AppConfig {
        log_level,
        anthropic_api_key,
        anthropic_base_url,
        ai_model,
        tei_url,
        request_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
        pipeline,
    })
}

/// Parse a similarity threshold and check it lies within `[0.0, 1.0]`.
fn parse_threshold(raw: &str) -> Result<f32, ConfigError> {
    let value = raw
        .trim()
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "SIMILARITY_THRESHOLD".to_string(),
            reason: e.to_string(),
        })?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidEnvVar {
            var: "SIMILARITY_THRESHOLD".to_string(),
            reason: format!("{value} is outside [0, 1]"),
        });
    }
    Ok(value)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
