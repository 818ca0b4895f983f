pub mod classifier;
pub mod error;
pub mod gguf;
pub mod runtime;
pub mod tokenizer;

pub use error::{ModelError, Result};
pub use runtime::{open_interpreter, Interpreter, TensorSpec};
pub use tokenizer::{TokenizedSequence, Vocab, WhitespaceTokenizer};
