use crate::error::{DecodeError, Result};

/// How softmax groups the dequantized output values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftmaxGrouping {
    /// Normalize each adjacent pair independently, for outputs that carry
    /// two logits per position.
    Pairwise,
    /// Normalize the whole output vector as one distribution.
    Full,
}

/// What the engine returns for a prediction.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMode {
    /// Dequantize, softmax, and summarize the first `top_n` probabilities.
    Probabilities {
        top_n: usize,
        grouping: SoftmaxGrouping,
    },
    /// Compare the two raw output values and name the winner.
    BinaryLabel { positive: String, negative: String },
}

impl OutputMode {
    /// Positive/Negative labels.
    pub fn binary() -> Self {
        OutputMode::BinaryLabel {
            positive: "Positive".to_string(),
            negative: "Negative".to_string(),
        }
    }

    /// Check that an output tensor of `numel` elements can be decoded in
    /// this mode.
    pub fn check_layout(&self, numel: usize) -> Result<()> {
        match self {
            OutputMode::Probabilities { grouping, .. } => {
                if numel == 0 {
                    return Err(DecodeError::EmptyOutput);
                }
                if *grouping == SoftmaxGrouping::Pairwise && numel % 2 != 0 {
                    return Err(DecodeError::Layout(format!(
                        "pairwise softmax needs an even element count, got {}",
                        numel
                    )));
                }
                Ok(())
            }
            OutputMode::BinaryLabel { .. } => {
                if numel != 2 {
                    return Err(DecodeError::Layout(format!(
                        "binary label needs exactly 2 output values, got {}",
                        numel
                    )));
                }
                Ok(())
            }
        }
    }
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Probabilities {
            top_n: 5,
            grouping: SoftmaxGrouping::Pairwise,
        }
    }
}
