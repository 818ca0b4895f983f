use std::os::raw::{c_char, c_void};

use ti_engine::{EngineConfig, EngineError, OutputMode, SoftmaxGrouping};

/// Status codes returned by all FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TiStatus {
    Ok = 0,
    ErrorInvalidArgument = 1,
    ErrorVocabLoad = 2,
    ErrorModelLoad = 3,
    ErrorShapeMismatch = 4,
    ErrorBufferOverflow = 5,
    ErrorInference = 6,
    ErrorEngineClosed = 7,
    ErrorInternal = 8,
}

impl From<&EngineError> for TiStatus {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::VocabLoad(_) => TiStatus::ErrorVocabLoad,
            EngineError::ModelLoad(_) => TiStatus::ErrorModelLoad,
            EngineError::ShapeMismatch(_) => TiStatus::ErrorShapeMismatch,
            EngineError::BufferOverflow { .. } => TiStatus::ErrorBufferOverflow,
            EngineError::Inference(_) => TiStatus::ErrorInference,
            EngineError::EngineClosed => TiStatus::ErrorEngineClosed,
        }
    }
}

/// How predictions are rendered into text.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TiOutputMode {
    /// Softmax over adjacent pairs, first `top_n` values.
    Probabilities = 0,
    /// Softmax over the whole output, first `top_n` values.
    ProbabilitiesFull = 1,
    /// "Positive" or "Negative".
    BinaryLabel = 2,
}

/// Engine construction parameters.
#[repr(C)]
#[derive(Debug, Clone)]
pub struct TiEngineParams {
    pub max_seq_len: u32,
    pub add_special_tokens: bool,
    pub output_mode: TiOutputMode,
    pub top_n: u32,
}

impl Default for TiEngineParams {
    fn default() -> Self {
        Self {
            max_seq_len: 128,
            add_special_tokens: true,
            output_mode: TiOutputMode::Probabilities,
            top_n: 5,
        }
    }
}

impl TiEngineParams {
    pub fn to_config(&self) -> EngineConfig {
        let output_mode = match self.output_mode {
            TiOutputMode::Probabilities => OutputMode::Probabilities {
                top_n: self.top_n as usize,
                grouping: SoftmaxGrouping::Pairwise,
            },
            TiOutputMode::ProbabilitiesFull => OutputMode::Probabilities {
                top_n: self.top_n as usize,
                grouping: SoftmaxGrouping::Full,
            },
            TiOutputMode::BinaryLabel => OutputMode::binary(),
        };
        EngineConfig::default()
            .with_max_seq_len(self.max_seq_len as usize)
            .with_special_tokens(self.add_special_tokens)
            .with_output_mode(output_mode)
    }
}

/// Receives the result of `ti_predict_async` on the inference thread.
/// `text` is only valid for the duration of the call.
pub type TiPredictCallback =
    Option<extern "C" fn(status: TiStatus, text: *const c_char, user_data: *mut c_void)>;
