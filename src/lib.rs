//! # genloop
//!
//! Stateful session controller for autoregressive text generation.
//!
//! A [`Session`] owns one model-engine context and drives it through a
//! strict lifecycle: prime the context, ingest queued input tokens in
//! batches, sample tokens one at a time under a [`SamplingConfig`], and
//! stop when the budget runs out, the context fills, or a configured
//! antiprompt phrase reappears in the output. The numeric model sits behind
//! the [`ModelEngine`] trait; a deterministic [`ReferenceEngine`] ships for
//! use without model files.

pub mod antiprompt;
pub mod config;
pub mod engine;
pub mod error;
pub mod sampling;
pub mod session;
pub mod stats;
pub mod tokenizer;
pub mod vocab;

pub use antiprompt::AntipromptMatcher;
pub use config::{SamplingConfig, SessionConfig};
pub use engine::{EngineError, ModelEngine, ReferenceEngine};
pub use error::{Result, SessionError, TokenizerError};
pub use session::{FinishReason, Session, SessionState};
pub use stats::{MemoryStats, NoopStats, SessionStats, StatsSink};
pub use vocab::{TokenId, Vocabulary};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
