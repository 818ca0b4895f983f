use std::sync::Arc;

use super::sequence::TokenizedSequence;
use super::vocab::{Vocab, CLS_TOKEN, PAD_TOKEN, SEP_TOKEN};

/// Lowercasing, whitespace-splitting tokenizer producing fixed-length
/// id sequences.
///
/// Words are looked up whole; anything missing from the vocabulary becomes
/// the unknown token. With special tokens enabled the sequence is framed as
/// `[CLS] words... [SEP]`.
#[derive(Debug, Clone)]
pub struct WhitespaceTokenizer {
    vocab: Arc<Vocab>,
    add_special_tokens: bool,
    cls_id: u32,
    sep_id: u32,
}

impl WhitespaceTokenizer {
    pub fn new(vocab: Arc<Vocab>, add_special_tokens: bool) -> Self {
        if let Some(pad) = vocab.id(PAD_TOKEN) {
            if pad != 0 {
                log::warn!(
                    "vocabulary maps {} to id {}, but sequences are padded with id 0",
                    PAD_TOKEN,
                    pad
                );
            }
        }
        let cls_id = vocab.lookup(CLS_TOKEN);
        let sep_id = vocab.lookup(SEP_TOKEN);
        WhitespaceTokenizer {
            vocab,
            add_special_tokens,
            cls_id,
            sep_id,
        }
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    pub fn add_special_tokens(&self) -> bool {
        self.add_special_tokens
    }

    /// Tokenize `text` into exactly `max_len` slots.
    ///
    /// Trailing words that do not fit are dropped. When markers are enabled
    /// the word budget is `max_len - 2` so `[SEP]` always closes the
    /// sequence; below two slots the markers themselves are cut.
    pub fn tokenize(&self, text: &str, max_len: usize) -> TokenizedSequence {
        let lowered = text.to_lowercase();
        let words = lowered.split_whitespace().map(|w| self.vocab.lookup(w));

        let mut ids: Vec<u32> = Vec::with_capacity(max_len);
        if self.add_special_tokens {
            ids.push(self.cls_id);
            ids.extend(words.take(max_len.saturating_sub(2)));
            ids.push(self.sep_id);
            ids.truncate(max_len);
        } else {
            ids.extend(words.take(max_len));
        }

        TokenizedSequence::padded(&ids, max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn plain(tokens: &[&str]) -> WhitespaceTokenizer {
        WhitespaceTokenizer::new(Arc::new(Vocab::from_tokens(tokens.iter().copied()).unwrap()), false)
    }

    fn bert() -> WhitespaceTokenizer {
        let vocab = Vocab::from_tokens(["[PAD]", "[UNK]", "[CLS]", "[SEP]", "buy", "milk", "today"]).unwrap();
        WhitespaceTokenizer::new(Arc::new(vocab), true)
    }

    #[test]
    fn test_hello_world() {
        let t = plain(&["[UNK]", "hello", "world"]);
        let seq = t.tokenize("hello world", 5);
        assert_eq!(seq.input_ids, vec![1, 2, 0, 0, 0]);
        assert_eq!(seq.attention_mask, vec![1, 1, 0, 0, 0]);
        assert_eq!(seq.token_type_ids, vec![0; 5]);
    }

    #[test]
    fn test_lowercase_and_whitespace_runs() {
        let t = plain(&["[UNK]", "hello", "world"]);
        let seq = t.tokenize("  HeLLo \t\n  WORLD ", 3);
        assert_eq!(seq.input_ids, vec![1, 2, 0]);
    }

    #[test]
    fn test_unknown_word_uses_unk() {
        let t = plain(&["[PAD]", "x", "[UNK]"]);
        let seq = t.tokenize("quux", 4);
        assert_eq!(seq.input_ids, vec![2, 0, 0, 0]);
    }

    #[test]
    fn test_unknown_without_unk_is_zero() {
        let t = plain(&["hello", "world"]);
        let seq = t.tokenize("quux", 3);
        assert_eq!(seq.input_ids, vec![0, 0, 0]);
        // Still a real token for the mask.
        assert_eq!(seq.attention_mask, vec![1, 0, 0]);
    }

    #[test]
    fn test_truncates_without_error() {
        let t = plain(&["[UNK]", "w0", "w1", "w2", "w3", "w4", "w5", "w6", "w7", "w8", "w9"]);
        let text = (0..10).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let seq = t.tokenize(&text, 5);
        assert_eq!(seq.input_ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(seq.real_len(), 5);
    }

    #[test]
    fn test_markers() {
        let seq = bert().tokenize("Buy milk TODAY please", 8);
        assert_eq!(seq.input_ids, vec![2, 4, 5, 6, 1, 3, 0, 0]);
        assert_eq!(seq.attention_mask, vec![1, 1, 1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_markers_truncation_keeps_sep_last() {
        let seq = bert().tokenize("buy milk today buy milk", 4);
        assert_eq!(seq.input_ids, vec![2, 4, 5, 3]);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(bert().tokenize("", 4).input_ids, vec![2, 3, 0, 0]);
        assert_eq!(bert().tokenize("   ", 4).attention_mask, vec![1, 1, 0, 0]);
        let seq = plain(&["[UNK]"]).tokenize("", 3);
        assert_eq!(seq.input_ids, vec![0, 0, 0]);
        assert_eq!(seq.real_len(), 0);
    }

    #[test]
    fn test_tiny_lengths() {
        assert_eq!(bert().tokenize("buy", 1).input_ids, vec![2]);
        assert!(bert().tokenize("buy", 0).input_ids.is_empty());
        assert_eq!(bert().tokenize("buy", 2).input_ids, vec![2, 3]);
    }

    #[test]
    fn test_fixed_length_and_idempotent() {
        let t = bert();
        let words = ["buy", "milk", "today", "unknown", "MILK"];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let n = rng.gen_range(0..40);
            let text: Vec<&str> = (0..n).map(|_| words[rng.gen_range(0..words.len())]).collect();
            let text = text.join(" ");
            let max_len = rng.gen_range(0..20);

            let a = t.tokenize(&text, max_len);
            assert_eq!(a.len(), max_len);
            assert_eq!(a.attention_mask.len(), max_len);
            assert_eq!(a.token_type_ids.len(), max_len);
            assert_eq!(a, t.tokenize(&text, max_len));
        }
    }
}
