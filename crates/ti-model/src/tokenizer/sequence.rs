/// Fixed-length model input: token ids plus the parallel attention mask
/// and token type ids.
///
/// All three vectors always have the same length. Padding slots hold id 0
/// with mask 0; every slot before them holds a real token with mask 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedSequence {
    pub input_ids: Vec<i32>,
    pub attention_mask: Vec<i32>,
    /// All zero: inputs are single-segment.
    pub token_type_ids: Vec<i32>,
}

impl TokenizedSequence {
    /// Right-pad `ids` with 0 up to `len` slots. `ids` longer than `len`
    /// are kept whole, which lets callers build deliberately oversized
    /// sequences.
    pub fn padded(ids: &[u32], len: usize) -> Self {
        let total = len.max(ids.len());
        let mut input_ids = vec![0i32; total];
        let mut attention_mask = vec![0i32; total];
        for (i, &id) in ids.iter().enumerate() {
            input_ids[i] = id as i32;
            attention_mask[i] = 1;
        }
        TokenizedSequence {
            input_ids,
            attention_mask,
            token_type_ids: vec![0; total],
        }
    }

    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of slots holding real tokens.
    pub fn real_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m != 0).count()
    }
}
