//! Deterministic in-process reference engine.
//!
//! Stands in for a real model backend so the whole session stack runs and
//! is testable without model files: a byte-level vocabulary, xorshift-derived
//! logits, and honest context-capacity bookkeeping. Same seed + same inputs
//! = same token stream.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{SamplingConfig, SessionConfig};
use crate::engine::{EngineError, ModelEngine};
use crate::sampling;
use crate::vocab::{TokenId, Vocabulary};

/// Deterministic engine over a byte-level vocabulary.
pub struct ReferenceEngine {
    vocab: Vocabulary,

    /// Context window capacity.
    n_ctx: usize,

    /// Tokens committed to the context so far (ingested + sampled).
    n_past: usize,

    /// Whether one-time setup has run.
    prepared: bool,

    /// Logit scratch buffer, allocated in `prepare`.
    logits: Vec<f32>,

    /// xorshift64 state driving the logit stream; ingested and sampled
    /// tokens are mixed in so outputs depend on the full history.
    state: u64,

    /// Sampling RNG, seeded from the session's resolved seed.
    rng: StdRng,
}

impl ReferenceEngine {
    fn advance(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    fn mix(&mut self, token: TokenId) {
        self.state ^= (token as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        self.advance();
    }

    fn fill_logits(&mut self) {
        for i in 0..self.logits.len() {
            let raw = self.advance();
            // Map the high bits into roughly [-4, 4].
            self.logits[i] = ((raw >> 40) as f32 / (1u64 << 24) as f32 - 0.5) * 8.0;
        }
    }
}

impl ModelEngine for ReferenceEngine {
    fn create(config: &SessionConfig, seed: u64) -> Result<Self, EngineError> {
        if config.n_ctx == 0 {
            return Err(EngineError::Allocation(
                "context window must be non-zero".into(),
            ));
        }
        Ok(ReferenceEngine {
            vocab: Vocabulary::byte_level(),
            n_ctx: config.n_ctx,
            n_past: 0,
            prepared: false,
            logits: Vec::new(),
            state: seed | 1,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    fn prepare(&mut self) -> bool {
        if self.prepared {
            return false;
        }
        self.logits = vec![0.0; self.vocab.len()];
        self.prepared = true;
        true
    }

    fn ingest_batch(&mut self, tokens: &[TokenId], _echo: bool) -> bool {
        if !self.prepared || self.n_past + tokens.len() > self.n_ctx {
            return false;
        }
        for &token in tokens {
            self.mix(token);
        }
        self.n_past += tokens.len();
        true
    }

    fn has_pending_capacity(&self) -> bool {
        self.n_past < self.n_ctx
    }

    fn sample_next(&mut self, sampling: &SamplingConfig, recent: &[TokenId]) -> Option<TokenId> {
        if !self.prepared || self.n_past >= self.n_ctx {
            return None;
        }
        self.fill_logits();
        let id = sampling::sample(&self.logits, sampling, recent, &mut self.rng)?;
        self.mix(id);
        self.n_past += 1;
        Some(id)
    }

    fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }
}
