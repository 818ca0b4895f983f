//! `ti-engine` - Text-to-tensor inference for quantized text models.
//!
//! An `Engine` owns a loaded interpreter, the whitespace tokenizer, and the
//! input/output byte buffers sized from the model's tensor contract. Each
//! `predict` call tokenizes, fills the buffers, runs one inference, and
//! decodes the output. `InferenceWorker` moves an engine onto its own
//! thread for callers that must not block.

pub mod config;
pub mod engine;
pub mod error;
pub mod worker;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{display_or_unavailable, EngineError, Result, PREDICTION_UNAVAILABLE};
pub use worker::{InferenceWorker, PendingPrediction};

pub use ti_decode::{Output, OutputMode, SoftmaxGrouping};
