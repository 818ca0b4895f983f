use thiserror::Error;

#[derive(Error, Debug)]
pub enum TensorError {
    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: String, got: String },
    #[error("buffer capacity exceeded: {requested} elements requested, capacity is {capacity}")]
    CapacityExceeded { capacity: usize, requested: usize },
    #[error("unsupported dtype: {0}")]
    UnsupportedDType(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TensorError>;
