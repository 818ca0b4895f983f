pub mod decoder;
pub mod error;
pub mod label;
pub mod mode;
pub mod output;
pub mod probabilities;

pub use decoder::{decoder_for, OutputDecoder};
pub use error::{DecodeError, Result};
pub use label::BinaryLabelDecoder;
pub use mode::{OutputMode, SoftmaxGrouping};
pub use output::Output;
pub use probabilities::ProbabilityDecoder;
