//! `ti-tensor` - Tensor primitives for the text-inference pipeline.
//!
//! This crate provides:
//! - Element data types for runtime tensors (integer and float widths)
//! - Shape utilities
//! - Affine quantization parameters (`real = (q - zero_point) * scale`)
//! - `TensorBuffer`, a fixed-capacity byte buffer in native byte order
//! - Numerically stable softmax and argmax helpers

pub mod buffer;
pub mod dtype;
pub mod error;
pub mod ops;
pub mod quant;
pub mod shape;

// Re-export primary types at the crate root for convenience.
pub use buffer::TensorBuffer;
pub use dtype::DType;
pub use error::{Result, TensorError};
pub use quant::QuantParams;
pub use shape::Shape;
