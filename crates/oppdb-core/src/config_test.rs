use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with all required env vars populated with valid defaults.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("ANTHROPIC_API_KEY", "sk-ant-test");
    m
}

#[test]
fn build_app_config_fails_without_api_key() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "ANTHROPIC_API_KEY"),
        "expected MissingEnvVar(ANTHROPIC_API_KEY), got: {result:?}"
    );
}

#[test]
fn build_app_config_treats_blank_api_key_as_missing() {
    let mut map = HashMap::new();
    map.insert("ANTHROPIC_API_KEY", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "ANTHROPIC_API_KEY"),
        "expected MissingEnvVar(ANTHROPIC_API_KEY), got: {result:?}"
    );
}

#[test]
fn build_app_config_succeeds_with_all_required_vars() {
    let map = full_env();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.anthropic_api_key, "sk-ant-test");
    assert_eq!(cfg.anthropic_base_url, "https://api.anthropic.com");
    assert_eq!(cfg.ai_model, "claude-3-haiku-20240307");
    assert_eq!(cfg.tei_url, "http://localhost:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.request_timeout_secs, 60);
    assert_eq!(cfg.max_retries, 3);
    assert_eq!(cfg.retry_backoff_base_ms, 1000);
    assert_eq!(cfg.pipeline, PipelineConfig::default());
}

#[test]
fn batch_size_override() {
    let mut map = full_env();
    map.insert("AI_BATCH_SIZE", "25");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.pipeline.batch_size, 25);
}

#[test]
fn batch_size_invalid() {
    let mut map = full_env();
    map.insert("AI_BATCH_SIZE", "ten");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "AI_BATCH_SIZE"),
        "expected InvalidEnvVar(AI_BATCH_SIZE), got: {result:?}"
    );
}

#[test]
fn batch_size_zero_fails_validation() {
    let mut map = full_env();
    map.insert("AI_BATCH_SIZE", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::Validation(_))),
        "expected Validation error, got: {result:?}"
    );
}

#[test]
fn max_items_per_file_override() {
    let mut map = full_env();
    map.insert("MAX_ITEMS_PER_FILE", "1200");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.pipeline.max_items_per_run, 1200);
}

#[test]
fn max_opportunities_per_input_override() {
    let mut map = full_env();
    map.insert("MAX_OPPORTUNITIES_PER_INPUT", "5");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.pipeline.max_opportunities_per_item, 5);
}

#[test]
fn similarity_threshold_override() {
    let mut map = full_env();
    map.insert("SIMILARITY_THRESHOLD", "0.65");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!((cfg.pipeline.similarity_threshold - 0.65).abs() < f32::EPSILON);
}

#[test]
fn similarity_threshold_out_of_range() {
    let mut map = full_env();
    map.insert("SIMILARITY_THRESHOLD", "1.2");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SIMILARITY_THRESHOLD"),
        "expected InvalidEnvVar(SIMILARITY_THRESHOLD), got: {result:?}"
    );
}

#[test]
fn similarity_threshold_not_a_number() {
    let mut map = full_env();
    map.insert("SIMILARITY_THRESHOLD", "high");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SIMILARITY_THRESHOLD"),
        "expected InvalidEnvVar(SIMILARITY_THRESHOLD), got: {result:?}"
    );
}

#[test]
fn cluster_strategy_override() {
    let mut map = full_env();
    map.insert("OPPDB_CLUSTER_STRATEGY", "connected-components");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.pipeline.cluster_strategy,
        ClusterStrategy::ConnectedComponents
    );
}

#[test]
fn cluster_strategy_invalid() {
    let mut map = full_env();
    map.insert("OPPDB_CLUSTER_STRATEGY", "kmeans");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "OPPDB_CLUSTER_STRATEGY"),
        "expected InvalidEnvVar(OPPDB_CLUSTER_STRATEGY), got: {result:?}"
    );
}

#[test]
fn max_retries_invalid() {
    let mut map = full_env();
    map.insert("OPPDB_MAX_RETRIES", "-1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "OPPDB_MAX_RETRIES"),
        "expected InvalidEnvVar(OPPDB_MAX_RETRIES), got: {result:?}"
    );
}

#[test]
fn max_concurrent_batches_override() {
    let mut map = full_env();
    map.insert("OPPDB_MAX_CONCURRENT_BATCHES", "4");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.pipeline.max_concurrent_batches, 4);
}
