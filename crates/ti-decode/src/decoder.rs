use crate::error::Result;
use crate::label::BinaryLabelDecoder;
use crate::mode::OutputMode;
use crate::output::Output;
use crate::probabilities::ProbabilityDecoder;

/// Turns the numeric output of one inference into an `Output`.
pub trait OutputDecoder: Send + Sync {
    /// Returns the name of this decoder.
    fn name(&self) -> &str;

    /// Whether `decode` expects dequantized values rather than the raw
    /// stored numbers.
    fn wants_dequantized(&self) -> bool;

    fn decode(&self, values: &[f32]) -> Result<Output>;
}

/// Build the decoder for a configured output mode.
pub fn decoder_for(mode: &OutputMode) -> Box<dyn OutputDecoder> {
    match mode {
        OutputMode::Probabilities { top_n, grouping } => {
            Box::new(ProbabilityDecoder::new(*top_n, *grouping))
        }
        OutputMode::BinaryLabel { positive, negative } => {
            Box::new(BinaryLabelDecoder::new(positive.clone(), negative.clone()))
        }
    }
}
