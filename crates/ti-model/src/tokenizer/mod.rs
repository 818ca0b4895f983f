pub mod sequence;
pub mod vocab;
pub mod whitespace;

pub use sequence::TokenizedSequence;
pub use vocab::{Vocab, CLS_TOKEN, PAD_TOKEN, SEP_TOKEN, UNK_TOKEN};
pub use whitespace::WhitespaceTokenizer;
