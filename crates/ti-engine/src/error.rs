use thiserror::Error;

use ti_decode::Output;
use ti_model::ModelError;

/// Text shown to users in place of a failed prediction.
pub const PREDICTION_UNAVAILABLE: &str = "prediction unavailable";

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("vocabulary load failed: {0}")]
    VocabLoad(String),
    #[error("model load failed: {0}")]
    ModelLoad(String),
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("buffer overflow on '{tensor}': {requested} elements exceed capacity {capacity}")]
    BufferOverflow {
        tensor: String,
        capacity: usize,
        requested: usize,
    },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("engine is closed")]
    EngineClosed,
}

impl EngineError {
    /// Construction-time errors: the engine could not be built and retrying
    /// with the same artifacts will fail again.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::VocabLoad(_) | EngineError::ModelLoad(_) | EngineError::ShapeMismatch(_)
        )
    }

    /// Classify an error raised while loading the model or vocabulary.
    pub(crate) fn from_load(err: ModelError) -> Self {
        match err {
            ModelError::VocabLoad(msg) => EngineError::VocabLoad(msg),
            other => EngineError::ModelLoad(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// User-facing text for a prediction result.
pub fn display_or_unavailable(result: &Result<Output>) -> String {
    match result {
        Ok(output) => output.to_string(),
        Err(_) => PREDICTION_UNAVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(EngineError::ModelLoad("x".into()).is_fatal());
        assert!(EngineError::ShapeMismatch("x".into()).is_fatal());
        assert!(!EngineError::EngineClosed.is_fatal());
        assert!(!EngineError::Inference("x".into()).is_fatal());
        assert!(!EngineError::BufferOverflow {
            tensor: "input_ids".into(),
            capacity: 1,
            requested: 2
        }
        .is_fatal());
    }

    #[test]
    fn test_from_load() {
        assert!(matches!(
            EngineError::from_load(ModelError::VocabLoad("empty".into())),
            EngineError::VocabLoad(_)
        ));
        assert!(matches!(
            EngineError::from_load(ModelError::InvalidMagic(*b"TFL3")),
            EngineError::ModelLoad(_)
        ));
    }

    #[test]
    fn test_display_or_unavailable() {
        let ok: Result<Output> = Ok(Output::Label("Negative".into()));
        assert_eq!(display_or_unavailable(&ok), "Negative");
        let err: Result<Output> = Err(EngineError::Inference("segfault in kernel".into()));
        assert_eq!(display_or_unavailable(&err), PREDICTION_UNAVAILABLE);
    }
}
