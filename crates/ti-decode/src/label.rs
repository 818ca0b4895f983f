use ti_tensor::ops;

use crate::decoder::OutputDecoder;
use crate::error::{DecodeError, Result};
use crate::output::Output;

/// Binary decision on the raw output: the positive label wins only when
/// its value (index 1) is strictly greater than the negative one (index 0).
///
/// Values are compared as stored. The engine only accepts positive output
/// scales, and under those the affine mapping preserves order.
pub struct BinaryLabelDecoder {
    positive: String,
    negative: String,
}

impl BinaryLabelDecoder {
    pub fn new(positive: String, negative: String) -> Self {
        Self { positive, negative }
    }
}

impl OutputDecoder for BinaryLabelDecoder {
    fn name(&self) -> &str {
        "binary_label"
    }

    fn wants_dequantized(&self) -> bool {
        false
    }

    fn decode(&self, values: &[f32]) -> Result<Output> {
        match values.len() {
            2 => {
                // ties resolve to the lower index
                let label = if ops::argmax(values) == Some(1) {
                    &self.positive
                } else {
                    &self.negative
                };
                Ok(Output::Label(label.clone()))
            }
            0 => Err(DecodeError::EmptyOutput),
            n => Err(DecodeError::Layout(format!(
                "binary label needs exactly 2 values, got {}",
                n
            ))),
        }
    }
}
