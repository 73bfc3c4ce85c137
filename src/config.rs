//! Session and sampling configuration.
//!
//! One immutable value constructed before the session and never mutated
//! afterwards. Every field carries a serde default so configs deserialize
//! from partial JSON.

use serde::Deserialize;

/// Sampling hyperparameters for the decode loop.
#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    /// Temperature for softmax scaling. 0.0 = greedy (argmax).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top-K: restrict sampling to the K most likely tokens. 0 = disabled.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Top-P (nucleus): restrict to the smallest set whose cumulative
    /// probability reaches P. 1.0 = disabled.
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Repeat penalty (1.0 = none). Values > 1.0 discourage repetition.
    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f32,

    /// How many trailing generated tokens the repeat penalty considers.
    #[serde(default = "default_repeat_last_n")]
    pub repeat_last_n: usize,
}

fn default_temperature() -> f32 {
    0.8
}
fn default_top_k() -> usize {
    40
}
fn default_top_p() -> f32 {
    0.95
}
fn default_repeat_penalty() -> f32 {
    1.30
}
fn default_repeat_last_n() -> usize {
    64
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            repeat_penalty: default_repeat_penalty(),
            repeat_last_n: default_repeat_last_n(),
        }
    }
}

impl SamplingConfig {
    /// Greedy sampling (temperature = 0, no filtering, no penalty).
    pub fn greedy() -> Self {
        SamplingConfig {
            temperature: 0.0,
            top_k: 0,
            top_p: 1.0,
            repeat_penalty: 1.0,
            repeat_last_n: 0,
        }
    }
}

/// Configuration for creating a session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Context window size (token capacity of the engine's cache).
    #[serde(default = "default_n_ctx")]
    pub n_ctx: usize,

    /// Maximum tokens to generate before forced termination.
    #[serde(default = "default_n_predict")]
    pub n_predict: usize,

    /// Maximum tokens fed to the engine per ingestion batch.
    #[serde(default = "default_n_batch")]
    pub n_batch: usize,

    /// Worker threads the engine may use for one blocking call.
    #[serde(default = "default_n_threads")]
    pub n_threads: usize,

    /// RNG seed. Negative = resolve from the wall clock at creation.
    #[serde(default = "default_seed")]
    pub seed: i64,

    /// Sampling hyperparameters.
    #[serde(default)]
    pub sampling: SamplingConfig,
}

fn default_n_ctx() -> usize {
    4096
}
fn default_n_predict() -> usize {
    128
}
fn default_n_batch() -> usize {
    8
}
fn default_n_threads() -> usize {
    4
}
fn default_seed() -> i64 {
    -1
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            n_ctx: default_n_ctx(),
            n_predict: default_n_predict(),
            n_batch: default_n_batch(),
            n_threads: default_n_threads(),
            seed: default_seed(),
            sampling: SamplingConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Resolve the configured seed to a concrete value.
    ///
    /// Non-negative seeds pass through; a negative seed is replaced once,
    /// at session creation, by a wall-clock-derived value. The resolved
    /// seed is fixed for the session's lifetime.
    pub fn resolve_seed(&self) -> u64 {
        if self.seed >= 0 {
            self.seed as u64
        } else {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(1)
        }
    }
}
