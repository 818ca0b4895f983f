use ti_decode::OutputMode;

/// Engine settings that are not dictated by the model artifact.
///
/// Tensor shapes and quantization parameters always come from the model;
/// `max_seq_len` is what the tokenizer produces and must agree with the
/// model's input shape.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_seq_len: usize,
    /// Frame sequences with `[CLS]` ... `[SEP]`.
    pub add_special_tokens: bool,
    pub output_mode: OutputMode,
}

impl EngineConfig {
    pub fn with_max_seq_len(mut self, max_seq_len: usize) -> Self {
        self.max_seq_len = max_seq_len;
        self
    }

    pub fn with_special_tokens(mut self, enabled: bool) -> Self {
        self.add_special_tokens = enabled;
        self
    }

    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_seq_len: 128,
            add_special_tokens: true,
            output_mode: OutputMode::default(),
        }
    }
}
