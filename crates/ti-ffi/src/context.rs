use ti_engine::{Engine, EngineError, InferenceWorker, Output, Result};

/// Opaque engine handle. Owns the worker thread, which owns the engine;
/// synchronous and asynchronous predictions share one queue.
pub struct TiEngine {
    worker: Option<InferenceWorker>,
}

impl TiEngine {
    pub fn new(engine: Engine) -> std::io::Result<Self> {
        Ok(Self {
            worker: Some(InferenceWorker::spawn(engine)?),
        })
    }

    pub fn worker(&self) -> Result<&InferenceWorker> {
        self.worker.as_ref().ok_or(EngineError::EngineClosed)
    }

    /// True inside a `ti_predict_async` callback.
    pub fn on_worker_thread(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| w.on_worker_thread())
    }

    pub fn predict(&self, text: &str) -> Result<Output> {
        self.worker()?.submit(text).wait()
    }

    /// Drain pending requests and release the model. Idempotent.
    pub fn close(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
    }
}
