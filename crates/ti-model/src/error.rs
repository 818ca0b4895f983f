use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid GGUF magic: expected 'GGUF', got {0:?}")]
    InvalidMagic([u8; 4]),
    #[error("unsupported GGUF version: {0}")]
    UnsupportedVersion(u32),
    #[error("unexpected end of data at byte {offset}: {needed} more bytes needed")]
    Truncated { offset: usize, needed: usize },
    #[error("missing metadata key: {0}")]
    MissingKey(String),
    #[error("type mismatch for key '{key}': expected {expected}, got {got}")]
    TypeMismatch {
        key: String,
        expected: String,
        got: String,
    },
    #[error("unsupported GGUF type ID: {0}")]
    UnsupportedGgufType(u32),
    #[error("tensor not found: {0}")]
    TensorNotFound(String),
    #[error("invalid tensor '{name}': {reason}")]
    InvalidTensor { name: String, reason: String },
    #[error("unsupported architecture: {0}")]
    UnsupportedArchitecture(String),
    #[error("vocabulary load failed: {0}")]
    VocabLoad(String),
    #[error("invoke failed: {0}")]
    Invoke(String),
    #[error("tensor error: {0}")]
    TensorError(#[from] ti_tensor::TensorError),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
