//! Token sampling over raw logits.
//!
//! After the engine produces logits for the next position, the sampler
//! selects one token. The pipeline, in order:
//!
//! 1. Repeat penalty over the trailing `repeat_last_n` generated tokens
//! 2. Temperature scaling (temperature ≤ 0 short-circuits to greedy argmax)
//! 3. Top-K filtering
//! 4. Top-P (nucleus) filtering
//! 5. Seeded categorical draw
//!
//! All draws come from a caller-owned [`StdRng`], so a fixed seed plus fixed
//! inputs reproduces the same token stream.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::Rng;

use crate::config::SamplingConfig;
use crate::vocab::TokenId;

/// Sample the next token id from `logits`.
///
/// `recent` is the trailing window of generated tokens; only its last
/// `repeat_last_n` entries are penalized. Returns `None` for empty logits.
pub fn sample(
    logits: &[f32],
    config: &SamplingConfig,
    recent: &[TokenId],
    rng: &mut StdRng,
) -> Option<TokenId> {
    if logits.is_empty() {
        return None;
    }

    let mut scored: Vec<(TokenId, f32)> = logits
        .iter()
        .enumerate()
        .map(|(id, &logit)| (id as TokenId, logit))
        .collect();

    apply_repeat_penalty(
        &mut scored,
        recent,
        config.repeat_penalty,
        config.repeat_last_n,
    );

    if config.temperature <= 0.0 {
        return argmax(&scored);
    }

    for (_, logit) in scored.iter_mut() {
        *logit /= config.temperature;
    }

    // Descending by logit; ties keep index order.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    if config.top_k > 0 && config.top_k < scored.len() {
        scored.truncate(config.top_k);
    }

    let mut probs = softmax(&scored);

    if config.top_p < 1.0 {
        let mut cumulative = 0.0;
        let mut cutoff = probs.len();
        for (i, p) in probs.iter().enumerate() {
            cumulative += p;
            if cumulative >= config.top_p {
                // The token that pushes cumulative probability over the
                // threshold stays in the nucleus.
                cutoff = i + 1;
                break;
            }
        }
        scored.truncate(cutoff);
        probs.truncate(cutoff);
        let total: f32 = probs.iter().sum();
        for p in probs.iter_mut() {
            *p /= total;
        }
    }

    let mut draw: f32 = rng.gen();
    for (i, p) in probs.iter().enumerate() {
        draw -= p;
        if draw <= 0.0 {
            return Some(scored[i].0);
        }
    }
    scored.last().map(|&(id, _)| id)
}

/// Penalize tokens seen in the trailing window.
///
/// Positive logits are divided by the penalty, negative ones multiplied,
/// pushing repeated tokens toward the bottom of the distribution.
fn apply_repeat_penalty(
    scored: &mut [(TokenId, f32)],
    recent: &[TokenId],
    penalty: f32,
    window: usize,
) {
    if penalty == 1.0 || window == 0 || recent.is_empty() {
        return;
    }
    let tail: HashSet<TokenId> = recent[recent.len().saturating_sub(window)..]
        .iter()
        .copied()
        .collect();
    for (id, logit) in scored.iter_mut() {
        if tail.contains(&*id) {
            if *logit > 0.0 {
                *logit /= penalty;
            } else {
                *logit *= penalty;
            }
        }
    }
}

fn argmax(scored: &[(TokenId, f32)]) -> Option<TokenId> {
    scored
        .iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|&(id, _)| id)
}

/// Probabilities for an already-sorted-descending score list.
fn softmax(scored: &[(TokenId, f32)]) -> Vec<f32> {
    let max = scored.first().map(|&(_, l)| l).unwrap_or(0.0);
    let exps: Vec<f32> = scored.iter().map(|&(_, l)| (l - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
