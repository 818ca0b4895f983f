use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ti_decode::Output;

use crate::engine::Engine;
use crate::error::{EngineError, Result};

type Reply = Box<dyn FnOnce(Result<Output>) + Send>;

enum Job {
    Predict { text: String, reply: Reply },
    Shutdown,
}

/// Runs an `Engine` on a dedicated thread.
///
/// Requests are served one at a time in submission order, so the engine's
/// buffers are never shared between calls. Dropping the worker drains the
/// queue, closes the engine, and joins the thread.
pub struct InferenceWorker {
    sender: Sender<Job>,
    handle: Option<JoinHandle<Engine>>,
}

impl InferenceWorker {
    pub fn spawn(engine: Engine) -> io::Result<InferenceWorker> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name("ti-inference".to_string())
            .spawn(move || {
                let mut engine = engine;
                for job in receiver {
                    match job {
                        Job::Predict { text, reply } => reply(engine.predict(&text)),
                        Job::Shutdown => break,
                    }
                }
                engine.close();
                engine
            })?;
        log::debug!("inference worker started");
        Ok(InferenceWorker {
            sender,
            handle: Some(handle),
        })
    }

    /// Queue a prediction and return a handle to its result.
    pub fn submit(&self, text: impl Into<String>) -> PendingPrediction {
        let (tx, rx) = mpsc::channel();
        self.dispatch(
            text.into(),
            Box::new(move |result| {
                // receiver may have been dropped by a caller that gave up
                let _ = tx.send(result);
            }),
        );
        PendingPrediction { rx }
    }

    /// Queue a prediction and deliver its result to `callback` on the
    /// worker thread.
    pub fn submit_with<F>(&self, text: impl Into<String>, callback: F)
    where
        F: FnOnce(Result<Output>) + Send + 'static,
    {
        self.dispatch(text.into(), Box::new(callback));
    }

    fn dispatch(&self, text: String, reply: Reply) {
        if let Err(mpsc::SendError(job)) = self.sender.send(Job::Predict { text, reply }) {
            log::warn!("inference worker is gone, rejecting request");
            if let Job::Predict { reply, .. } = job {
                reply(Err(EngineError::EngineClosed));
            }
        }
    }

    /// Whether the caller is running on this worker's thread, as callbacks
    /// passed to `submit_with` do. Blocking on the worker from there never
    /// returns.
    pub fn on_worker_thread(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|h| h.thread().id() == thread::current().id())
    }

    /// Finish queued requests, stop the thread, and hand back the closed
    /// engine. `None` if the worker thread panicked.
    pub fn shutdown(mut self) -> Option<Engine> {
        self.stop()
    }

    fn stop(&mut self) -> Option<Engine> {
        let handle = self.handle.take()?;
        let _ = self.sender.send(Job::Shutdown);
        match handle.join() {
            Ok(engine) => {
                log::debug!("inference worker stopped");
                Some(engine)
            }
            Err(_) => {
                log::error!("inference worker panicked");
                None
            }
        }
    }
}

impl Drop for InferenceWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Result of a queued prediction.
pub struct PendingPrediction {
    rx: Receiver<Result<Output>>,
}

impl PendingPrediction {
    /// Block until the result is ready.
    pub fn wait(self) -> Result<Output> {
        self.rx.recv().unwrap_or(Err(EngineError::EngineClosed))
    }

    /// Block for at most `timeout`. `None` if the result is not ready yet.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Output>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(EngineError::EngineClosed)),
        }
    }

    /// Non-blocking poll.
    pub fn try_take(&self) -> Option<Result<Output>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(EngineError::EngineClosed)),
        }
    }
}
