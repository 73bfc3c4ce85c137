//! Stateless text ↔ token-id conversion over a [`Vocabulary`].
//!
//! Tokenization is total: any input text produces a (possibly empty) token
//! sequence. Detokenization is the strict direction — asking for an id the
//! vocabulary does not contain is a caller/data bug and surfaces as a typed
//! [`TokenizerError`].

use crate::error::TokenizerError;
use crate::vocab::{TokenId, Vocabulary};

/// Convert text into a token-id sequence.
///
/// Greedy longest-fragment matching: at each position the longest vocabulary
/// fragment that prefixes the remaining text wins. Anything unmatched
/// decomposes to its UTF-8 bytes, looked up as single-byte fragments; bytes
/// with no vocabulary entry are dropped (the engine's real merge algorithm
/// owns the full decomposition rules).
///
/// When `add_begin_marker` is true and the vocabulary defines a
/// begin-of-sequence id, the sequence is prefixed with it.
pub fn tokenize(vocab: &Vocabulary, text: &str, add_begin_marker: bool) -> Vec<TokenId> {
    let mut out = Vec::new();
    if add_begin_marker {
        if let Some(begin) = vocab.begin_id() {
            out.push(begin);
        }
    }

    let bytes = text.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        let longest = vocab.max_fragment_len().min(bytes.len() - pos);
        let mut matched = None;
        for len in (1..=longest).rev() {
            // Candidate slices must fall on UTF-8 boundaries to index the map.
            let Some(candidate) = text.get(pos..pos + len) else {
                continue;
            };
            if let Some(id) = vocab.id_of(candidate) {
                matched = Some((id, len));
                break;
            }
        }

        match matched {
            Some((id, len)) => {
                out.push(id);
                pos += len;
            }
            None => {
                // Unmatched leading char: decompose to byte fragments.
                let ch_len = text[pos..]
                    .chars()
                    .next()
                    .map(char::len_utf8)
                    .unwrap_or(1);
                for &byte in &bytes[pos..pos + ch_len] {
                    if let Some(id) = vocab.id_of(&char::from(byte).to_string()) {
                        out.push(id);
                    }
                }
                pos += ch_len;
            }
        }
    }
    out
}

/// Convert a token-id sequence back into text by concatenating fragments.
///
/// Fails with [`TokenizerError::UnknownToken`] on the first id outside the
/// vocabulary's domain. The round trip `detokenize(tokenize(t, false)) == t`
/// holds whenever every token's fragment is lossless (always true for
/// byte-level vocabularies; multi-byte merge vocabularies may normalize).
pub fn detokenize(vocab: &Vocabulary, ids: &[TokenId]) -> Result<String, TokenizerError> {
    let mut out = String::new();
    for &id in ids {
        out.push_str(detokenize_one(vocab, id)?);
    }
    Ok(out)
}

/// Convert a single token id into its fragment text.
///
/// Same failure contract as [`detokenize`].
pub fn detokenize_one(vocab: &Vocabulary, id: TokenId) -> Result<&str, TokenizerError> {
    vocab.fragment(id).ok_or(TokenizerError::UnknownToken(id))
}
