//! Tests for session and sampling configuration.

use genloop::{SamplingConfig, SessionConfig};

#[test]
fn test_default_sampling() {
    let config = SamplingConfig::default();
    assert_eq!(config.temperature, 0.8);
    assert_eq!(config.top_k, 40);
    assert_eq!(config.top_p, 0.95);
    assert_eq!(config.repeat_penalty, 1.30);
    assert_eq!(config.repeat_last_n, 64);
}

#[test]
fn test_default_session_config() {
    let config = SessionConfig::default();
    assert_eq!(config.n_ctx, 4096);
    assert_eq!(config.n_predict, 128);
    assert_eq!(config.n_batch, 8);
    assert_eq!(config.n_threads, 4);
    assert_eq!(config.seed, -1);
}

#[test]
fn test_greedy_sampling() {
    let config = SamplingConfig::greedy();
    assert_eq!(config.temperature, 0.0);
    assert_eq!(config.top_p, 1.0);
    assert_eq!(config.top_k, 0);
    assert_eq!(config.repeat_penalty, 1.0);
}

#[test]
fn test_sampling_from_json() {
    let json = r#"{
        "temperature": 0.5,
        "top_k": 32,
        "top_p": 0.9,
        "repeat_penalty": 1.1,
        "repeat_last_n": 16
    }"#;

    let config: SamplingConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.temperature, 0.5);
    assert_eq!(config.top_k, 32);
    assert_eq!(config.top_p, 0.9);
    assert_eq!(config.repeat_penalty, 1.1);
    assert_eq!(config.repeat_last_n, 16);
}

#[test]
fn test_session_config_from_partial_json() {
    let json = r#"{ "n_ctx": 512, "seed": 7 }"#;
    let config: SessionConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.n_ctx, 512);
    assert_eq!(config.seed, 7);
    // Unspecified fields fall back to defaults.
    assert_eq!(config.n_predict, 128);
    assert_eq!(config.sampling.top_k, 40);
}

#[test]
fn test_nested_sampling_json() {
    let json = r#"{ "n_predict": 3, "sampling": { "temperature": 0.0 } }"#;
    let config: SessionConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.n_predict, 3);
    assert_eq!(config.sampling.temperature, 0.0);
    assert_eq!(config.sampling.top_p, 0.95);
}
