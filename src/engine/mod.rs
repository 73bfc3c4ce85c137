//! The model engine boundary.
//!
//! Everything numeric — tensor loading, attention compute, quantization —
//! lives behind [`ModelEngine`]. The session drives an engine through this
//! narrow trait and never sees past it; implementations can swap in-process
//! reference math, FFI backends, or test doubles without touching session
//! code.

pub mod reference;

use crate::config::{SamplingConfig, SessionConfig};
use crate::vocab::{TokenId, Vocabulary};

pub use reference::ReferenceEngine;

/// Errors from engine context creation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("cannot allocate context: {0}")]
    Allocation(String),
    #[error("model load failed: {0}")]
    ModelLoad(String),
}

/// A running model context the session drives.
///
/// One context per session, exactly one owner; dropping the value releases
/// the context on every path, including construction failures upstream.
///
/// The `bool`-returning operations report rejection (capacity exhausted,
/// setup refused) rather than failure; the session is responsible for
/// turning rejections into typed errors or recoverable outcomes. A single
/// call may block for a long time while the engine runs its forward pass,
/// possibly parallelized over `n_threads` internally — that parallelism is
/// invisible here.
pub trait ModelEngine {
    /// Allocate a running context sized per `config`, with an
    /// already-resolved seed.
    fn create(config: &SessionConfig, seed: u64) -> Result<Self, EngineError>
    where
        Self: Sized;

    /// One-time setup before ingestion/inference (scratch buffers sized to
    /// the context length). Returns false if setup cannot complete.
    fn prepare(&mut self) -> bool;

    /// Feed one batch of tokens into the context, updating the cache of
    /// past activations. Returns false — leaving the context unchanged —
    /// when the batch does not fit the remaining capacity. `echo` marks
    /// batches whose text the caller is surfacing as they are consumed.
    fn ingest_batch(&mut self, tokens: &[TokenId], echo: bool) -> bool;

    /// Whether the context can accept at least one more token.
    fn has_pending_capacity(&self) -> bool;

    /// Run one forward step and sample the next token id under `sampling`,
    /// penalizing the trailing `recent` window. `None` means the step
    /// failed (context exhausted, backend error).
    fn sample_next(&mut self, sampling: &SamplingConfig, recent: &[TokenId]) -> Option<TokenId>;

    /// The vocabulary this engine's model was built with.
    fn vocab(&self) -> &Vocabulary;
}
