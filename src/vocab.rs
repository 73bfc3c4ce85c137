//! Token vocabulary: the id ↔ text-fragment mapping.
//!
//! A [`Vocabulary`] is owned by the model engine and immutable after
//! creation. Everything above the engine holds it by shared reference and
//! only reads it.

use std::collections::HashMap;

/// Token ID type (i32 for FFI compat; logically non-negative).
pub type TokenId = i32;

/// Immutable mapping between token ids and their text fragments.
///
/// Total over the id range `[0, len)`. Also records the reserved
/// begin-of-sequence id when the model defines one.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// Fragment text by id.
    fragments: Vec<String>,

    /// Reverse lookup: fragment text -> id.
    ids: HashMap<String, TokenId>,

    /// Length of the longest fragment, in bytes (used by greedy matching).
    max_fragment_len: usize,

    /// Reserved begin-of-sequence id, if the model defines one.
    begin_id: Option<TokenId>,
}

impl Vocabulary {
    /// Build a vocabulary from an ordered fragment table.
    ///
    /// The index of each fragment is its id. When two fragments collide the
    /// lowest id wins the reverse lookup.
    pub fn new(fragments: Vec<String>, begin_id: Option<TokenId>) -> Self {
        let mut ids = HashMap::with_capacity(fragments.len());
        let mut max_fragment_len = 0;
        for (id, fragment) in fragments.iter().enumerate() {
            max_fragment_len = max_fragment_len.max(fragment.len());
            ids.entry(fragment.clone()).or_insert(id as TokenId);
        }
        Vocabulary {
            fragments,
            ids,
            max_fragment_len,
            begin_id,
        }
    }

    /// Byte-level vocabulary: one fragment per byte value 0..=255, plus a
    /// reserved begin-of-sequence marker at id 256.
    ///
    /// Every byte fragment round-trips losslessly, which makes this the
    /// reference vocabulary for the in-process engine and for tests.
    pub fn byte_level() -> Self {
        let mut fragments: Vec<String> = (0u8..=255).map(|b| char::from(b).to_string()).collect();
        let begin_id = fragments.len() as TokenId;
        fragments.push("<s>".to_string());
        Vocabulary::new(fragments, Some(begin_id))
    }

    /// Number of entries in the vocabulary.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Whether `id` is inside the vocabulary's domain.
    pub fn contains(&self, id: TokenId) -> bool {
        id >= 0 && (id as usize) < self.fragments.len()
    }

    /// Fragment text for `id`, or `None` when the id is out of domain.
    pub fn fragment(&self, id: TokenId) -> Option<&str> {
        if id < 0 {
            return None;
        }
        self.fragments.get(id as usize).map(|s| s.as_str())
    }

    /// Id for an exact fragment, or `None` when the fragment is unknown.
    pub fn id_of(&self, fragment: &str) -> Option<TokenId> {
        self.ids.get(fragment).copied()
    }

    /// Reserved begin-of-sequence id, if defined.
    pub fn begin_id(&self) -> Option<TokenId> {
        self.begin_id
    }

    /// Length of the longest fragment in bytes.
    pub fn max_fragment_len(&self) -> usize {
        self.max_fragment_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Vocabulary {
        Vocabulary::new(vec!["a".into(), "b".into(), "c".into()], None)
    }

    #[test]
    fn fragment_lookup() {
        let vocab = abc();
        assert_eq!(vocab.fragment(0), Some("a"));
        assert_eq!(vocab.fragment(2), Some("c"));
        assert_eq!(vocab.fragment(3), None);
        assert_eq!(vocab.fragment(-1), None);
    }

    #[test]
    fn reverse_lookup() {
        let vocab = abc();
        assert_eq!(vocab.id_of("b"), Some(1));
        assert_eq!(vocab.id_of("z"), None);
    }

    #[test]
    fn duplicate_fragments_keep_lowest_id() {
        let vocab = Vocabulary::new(vec!["x".into(), "x".into()], None);
        assert_eq!(vocab.id_of("x"), Some(0));
        assert_eq!(vocab.fragment(1), Some("x"));
    }

    #[test]
    fn byte_level_covers_all_bytes() {
        let vocab = Vocabulary::byte_level();
        assert_eq!(vocab.len(), 257);
        assert_eq!(vocab.fragment(b'a' as TokenId), Some("a"));
        assert_eq!(vocab.begin_id(), Some(256));
        assert_eq!(vocab.fragment(256), Some("<s>"));
    }
}
