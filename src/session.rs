//! The generation session state machine.
//!
//! A [`Session`] owns one engine context and everything needed to drive it:
//! the pending-input queue, the bounded recent-output window, the
//! remaining-token budget, and the antiprompt matcher. Callers may
//! interleave tokenization, ingestion, and inference freely; the state
//! machine enforces what is legal when.
//!
//! Lifecycle: `Created` → (`prepare`) → `Idle` → (stop condition) →
//! `Finished`. Ingestion and inference are transient phases inside their
//! calls, not observable states. Every operation blocks the calling thread
//! until the engine returns; there are no suspension points and no internal
//! retries. One session per context — `&mut self` receivers make concurrent
//! use a compile error.

use std::collections::VecDeque;

use uuid::Uuid;

use crate::antiprompt::AntipromptMatcher;
use crate::config::SessionConfig;
use crate::engine::ModelEngine;
use crate::error::{Result, SessionError};
use crate::stats::{NoopStats, SessionStats, StatsSink};
use crate::tokenizer;
use crate::vocab::{TokenId, Vocabulary};

/// Observable lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed; only `prepare` is legal (besides queueing input).
    Created,
    /// Ready to accept input or run inference.
    Idle,
    /// A stop condition was met. Only `reset_remaining_tokens` or
    /// destruction gets out of here.
    Finished,
}

/// Why the session finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The remaining-token budget reached zero.
    BudgetExhausted,
    /// The engine reported the context cannot accept further tokens.
    ContextFull,
    /// The antiprompt pattern appeared in the trailing window.
    Antiprompt,
}

/// A stateful generation session driving one engine context.
pub struct Session<E: ModelEngine> {
    /// Session id for log correlation.
    id: Uuid,

    /// The engine context. Dropped with the session — exactly one owner.
    engine: E,

    config: SessionConfig,

    /// Seed resolved once at creation; fixed for the session's lifetime.
    seed: u64,

    state: SessionState,

    /// Queued input tokens not yet fed to the engine.
    pending: VecDeque<TokenId>,

    /// Trailing window of generated tokens, bounded by the larger of the
    /// repeat window and the antiprompt pattern length.
    recent: Vec<TokenId>,

    /// Tokens that may still be generated before forced termination.
    remaining: usize,

    matcher: AntipromptMatcher,

    sink: Box<dyn StatsSink>,

    finish_reason: Option<FinishReason>,
    ingested: usize,
    generated: usize,
}

impl<E: ModelEngine> std::fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("seed", &self.seed)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("recent", &self.recent)
            .field("remaining", &self.remaining)
            .field("matcher", &self.matcher)
            .field("finish_reason", &self.finish_reason)
            .field("ingested", &self.ingested)
            .field("generated", &self.generated)
            .finish_non_exhaustive()
    }
}

impl<E: ModelEngine> Session<E> {
    /// Create a session: resolve the seed, then ask the engine to allocate
    /// a running context sized per `config`.
    ///
    /// Engine failure surfaces as [`SessionError::Initialization`] and
    /// leaves nothing allocated.
    pub fn create(config: SessionConfig) -> Result<Self> {
        let seed = config.resolve_seed();
        let engine = E::create(&config, seed)?;
        Ok(Self::assemble(engine, config, seed))
    }

    /// Wrap an already-constructed engine in a session. For callers that
    /// build the engine themselves (custom backends, test doubles); the
    /// engine is still released with the session.
    pub fn from_engine(engine: E, config: SessionConfig) -> Self {
        let seed = config.resolve_seed();
        Self::assemble(engine, config, seed)
    }

    fn assemble(engine: E, config: SessionConfig, seed: u64) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!("session {id} created (seed {seed}, n_ctx {})", config.n_ctx);
        Session {
            id,
            engine,
            remaining: config.n_predict,
            config,
            seed,
            state: SessionState::Created,
            pending: VecDeque::new(),
            recent: Vec::new(),
            matcher: AntipromptMatcher::new(),
            sink: Box::new(NoopStats),
            finish_reason: None,
            ingested: 0,
            generated: 0,
        }
    }

    /// Install a stats sink, replacing the default no-op one.
    pub fn set_stats_sink(&mut self, sink: Box<dyn StatsSink>) {
        self.sink = sink;
    }

    /// One-time setup before any ingestion or inference. Legal exactly once,
    /// from `Created`; fires the sink's start event on success.
    pub fn prepare(&mut self) -> Result<()> {
        if self.state != SessionState::Created {
            return Err(SessionError::InvalidState {
                op: "prepare",
                state: self.state,
            });
        }
        if !self.engine.prepare() {
            return Err(SessionError::Preparation(
                "engine rejected context setup".into(),
            ));
        }
        self.state = SessionState::Idle;
        tracing::debug!("session {} prepared", self.id);
        let stats = self.snapshot();
        self.sink.on_start(&stats);
        Ok(())
    }

    /// Enqueue the reserved begin-of-sequence marker. Pure bookkeeping; a
    /// vocabulary without a begin marker makes this a no-op.
    pub fn add_begin_marker(&mut self) -> Result<()> {
        let Some(begin) = self.engine.vocab().begin_id() else {
            return self.guard_not_finished("add_begin_marker");
        };
        self.update_input_tokens(&[begin])
    }

    /// Tokenize `text` and append it to the pending-input queue. No engine
    /// interaction. Legal in any non-`Finished` state.
    pub fn update_input(&mut self, text: &str) -> Result<()> {
        self.guard_not_finished("update_input")?;
        let ids = tokenizer::tokenize(self.engine.vocab(), text, false);
        self.pending.extend(ids);
        Ok(())
    }

    /// Append pre-tokenized input to the pending queue.
    pub fn update_input_tokens(&mut self, ids: &[TokenId]) -> Result<()> {
        self.guard_not_finished("update_input_tokens")?;
        self.pending.extend(ids.iter().copied());
        Ok(())
    }

    /// Whether the pending-input queue is non-empty.
    pub fn has_unconsumed_input(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain the pending queue through the engine in batches of at most
    /// `n_batch` tokens.
    ///
    /// Returns `Ok(true)` once the queue is empty. Returns `Ok(false)` when
    /// the engine rejects a batch — the rejected tokens stay queued and the
    /// caller decides whether to reset or abandon. When `echo` is set, each
    /// consumed batch's text goes to the sink's token hook.
    pub fn ingest_pending(&mut self, echo: bool) -> Result<bool> {
        match self.state {
            SessionState::Created => {
                return Err(SessionError::InvalidState {
                    op: "ingest_pending",
                    state: self.state,
                })
            }
            // No-op after finishing; reports whether the queue is drained.
            SessionState::Finished => return Ok(self.pending.is_empty()),
            SessionState::Idle => {}
        }

        while !self.pending.is_empty() {
            let take = self.config.n_batch.max(1).min(self.pending.len());
            let batch: Vec<TokenId> = self.pending.iter().take(take).copied().collect();
            if !self.engine.ingest_batch(&batch, echo) {
                tracing::debug!(
                    "session {}: engine rejected batch of {take} ({} still queued)",
                    self.id,
                    self.pending.len()
                );
                return Ok(false);
            }
            if echo {
                let text = tokenizer::detokenize(self.engine.vocab(), &batch)?;
                self.sink.on_token(&text);
            }
            self.pending.drain(..take);
            self.ingested += take;
        }
        Ok(true)
    }

    /// Sample the next token, returning its id and whether the session just
    /// finished. Legal only in `Idle` with an empty pending queue.
    pub fn infer_next_token(&mut self) -> Result<(TokenId, bool)> {
        self.infer_step()
    }

    /// Sample the next token, returning its decoded text fragment and
    /// whether the session just finished. Same state transitions and stop
    /// logic as [`Session::infer_next_token`] — a presentation fork only.
    pub fn infer_next_text(&mut self) -> Result<(String, bool)> {
        let (id, finished) = self.infer_step()?;
        let text = tokenizer::detokenize_one(self.engine.vocab(), id)?.to_string();
        Ok((text, finished))
    }

    fn infer_step(&mut self) -> Result<(TokenId, bool)> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidState {
                op: "infer_next",
                state: self.state,
            });
        }
        if !self.pending.is_empty() {
            return Err(SessionError::InvalidState {
                op: "infer_next with unconsumed input",
                state: self.state,
            });
        }

        let id = self
            .engine
            .sample_next(&self.config.sampling, &self.recent)
            .ok_or_else(|| SessionError::Inference("engine sampling step failed".into()))?;

        self.push_recent(id);
        self.generated += 1;
        self.remaining = self.remaining.saturating_sub(1);

        let reason = if self.remaining == 0 {
            Some(FinishReason::BudgetExhausted)
        } else if !self.engine.has_pending_capacity() {
            Some(FinishReason::ContextFull)
        } else if self.matcher.is_present(&self.recent) {
            Some(FinishReason::Antiprompt)
        } else {
            None
        };

        if let Some(reason) = reason {
            self.state = SessionState::Finished;
            self.finish_reason = Some(reason);
            tracing::debug!("session {} finished: {reason:?}", self.id);
            let stats = self.snapshot();
            self.sink.on_end(&stats);
            return Ok((id, true));
        }
        Ok((id, false))
    }

    /// Restore the remaining-token budget to its configured maximum and
    /// leave `Finished`, without touching the engine context or its cache —
    /// generation continues where it stopped, no re-ingestion needed.
    pub fn reset_remaining_tokens(&mut self) {
        self.remaining = self.config.n_predict;
        if self.state == SessionState::Finished {
            self.state = SessionState::Idle;
            self.finish_reason = None;
            tracing::debug!("session {}: budget reset, back to idle", self.id);
        }
    }

    /// Tokenize `text` (no begin marker) and install it as the antiprompt
    /// pattern. Legal in any state; takes effect on the next inference step.
    pub fn set_antiprompt(&mut self, text: &str) {
        self.matcher.set_pattern(self.engine.vocab(), text);
        self.trim_recent();
    }

    /// The active antiprompt pattern tokens.
    pub fn antiprompt(&self) -> &[TokenId] {
        self.matcher.pattern()
    }

    /// On-demand antiprompt check against the trailing window. No
    /// tokenization work happens when no pattern is set.
    pub fn is_antiprompt_present(&self) -> bool {
        self.matcher.is_present(&self.recent)
    }

    /// Whether a stop condition has been met.
    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    /// Why the session finished, while it is finished.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session id for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Remaining generation budget.
    pub fn remaining_tokens(&self) -> usize {
        self.remaining
    }

    /// The seed this session resolved at creation.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The engine's vocabulary. The borrow is bounded by the session.
    pub fn vocab(&self) -> &Vocabulary {
        self.engine.vocab()
    }

    fn guard_not_finished(&self, op: &'static str) -> Result<()> {
        if self.state == SessionState::Finished {
            return Err(SessionError::InvalidState {
                op,
                state: self.state,
            });
        }
        Ok(())
    }

    fn window_capacity(&self) -> usize {
        self.config
            .sampling
            .repeat_last_n
            .max(self.matcher.pattern().len())
    }

    fn push_recent(&mut self, id: TokenId) {
        self.recent.push(id);
        self.trim_recent();
    }

    fn trim_recent(&mut self) {
        let cap = self.window_capacity();
        if self.recent.len() > cap {
            let excess = self.recent.len() - cap;
            self.recent.drain(..excess);
        }
    }

    fn snapshot(&self) -> SessionStats {
        SessionStats {
            seed: self.seed,
            n_ctx: self.config.n_ctx,
            n_predict: self.config.n_predict,
            ingested_tokens: self.ingested,
            generated_tokens: self.generated,
            remaining_tokens: self.remaining,
        }
    }
}
