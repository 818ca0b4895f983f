use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{ModelError, Result};

pub const UNK_TOKEN: &str = "[UNK]";
pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";
pub const PAD_TOKEN: &str = "[PAD]";

/// Token vocabulary loaded from a newline-delimited token list.
///
/// Line N (0-indexed) is the token with id N. Lookups of absent tokens
/// resolve to the `[UNK]` id, or to 0 when the list has no `[UNK]` line.
#[derive(Debug, Clone)]
pub struct Vocab {
    /// Token strings, indexed by token ID.
    tokens: Vec<String>,
    /// Reverse mapping from token string to token ID. A token listed twice
    /// maps to its last line.
    token_to_id: HashMap<String, u32>,
    unk_id: u32,
}

impl Vocab {
    /// Read a vocabulary file from disk.
    pub fn load(path: &Path) -> Result<Vocab> {
        let file = File::open(path)
            .map_err(|e| ModelError::VocabLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Read one token per line, trimming trailing whitespace.
    pub fn from_reader(reader: impl BufRead) -> Result<Vocab> {
        let mut tokens = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| ModelError::VocabLoad(e.to_string()))?;
            tokens.push(line.trim_end().to_string());
        }
        Self::from_tokens(tokens)
    }

    /// Build a vocabulary from tokens in id order.
    ///
    /// # Errors
    /// `VocabLoad` if there is no non-empty token.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Vocab>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if tokens.iter().all(|t| t.is_empty()) {
            return Err(ModelError::VocabLoad("vocabulary is empty".to_string()));
        }

        let mut token_to_id = HashMap::with_capacity(tokens.len());
        for (id, tok) in tokens.iter().enumerate() {
            token_to_id.insert(tok.clone(), id as u32);
        }
        let unk_id = token_to_id.get(UNK_TOKEN).copied().unwrap_or(0);

        Ok(Vocab {
            tokens,
            token_to_id,
            unk_id,
        })
    }

    /// Id of `token`, falling back to the unknown-token id.
    pub fn lookup(&self, token: &str) -> u32 {
        self.token_to_id.get(token).copied().unwrap_or(self.unk_id)
    }

    /// Id of `token` without fallback.
    pub fn id(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.token_to_id.contains_key(token)
    }

    /// Id used for out-of-vocabulary words.
    pub fn unk_id(&self) -> u32 {
        self.unk_id
    }

    /// Number of tokens in the vocabulary.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
