use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("output tensor is empty")]
    EmptyOutput,
    #[error("output layout not decodable: {0}")]
    Layout(String),
    #[error("tensor error: {0}")]
    TensorError(#[from] ti_tensor::TensorError),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
