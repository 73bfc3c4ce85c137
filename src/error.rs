//! Error types for the genloop crate.

use thiserror::Error;

use crate::engine::EngineError;
use crate::session::SessionState;
use crate::vocab::TokenId;

/// Errors from text ↔ token conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizerError {
    /// Detokenization was asked to resolve an id outside the vocabulary.
    /// Always a caller/data bug: every id in normal flow originates from
    /// the tokenizer or the engine itself.
    #[error("unknown token id: {0}")]
    UnknownToken(TokenId),
}

/// Top-level error type for session operations.
///
/// Variants separate fatal-to-session conditions (`Initialization`,
/// `Preparation`) from fatal-to-step ones (`Inference`) and from caller
/// bugs (`UnknownToken`, `InvalidState`), so callers never have to inspect
/// message strings to pick a recovery policy.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The engine could not allocate or load a usable context. Fatal to the
    /// attempted session; do not retry with the same configuration.
    #[error("engine initialization failed: {0}")]
    Initialization(#[from] EngineError),

    /// One-time context setup failed. Fatal; discard the session.
    #[error("context preparation failed: {0}")]
    Preparation(String),

    /// A single sampling step failed. The current token is lost; the caller
    /// may reset and continue.
    #[error("inference step failed: {0}")]
    Inference(String),

    /// Detokenization hit an id outside the vocabulary.
    #[error(transparent)]
    UnknownToken(#[from] TokenizerError),

    /// An operation was invoked in a lifecycle state that forbids it.
    #[error("operation `{op}` is illegal in state {state:?}")]
    InvalidState {
        op: &'static str,
        state: SessionState,
    },
}

pub type Result<T> = std::result::Result<T, SessionError>;
