mod callback;
mod context;
mod error;
mod types;

pub use context::*;
pub use error::*;
pub use types::*;

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use ti_engine::{display_or_unavailable, Engine, EngineError};

use crate::callback::CallbackTarget;

/// Execute a closure that returns a `TiStatus`, catching any panics
/// and converting them into `TiStatus::ErrorInternal`.
fn catch_panic<F: FnOnce() -> TiStatus>(f: F) -> TiStatus {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(status) => status,
        Err(_) => {
            log::error!("panic across the FFI boundary");
            set_last_error("internal panic".to_string());
            TiStatus::ErrorInternal
        }
    }
}

/// Borrow a C string argument as UTF-8, recording the failure otherwise.
unsafe fn str_arg<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, TiStatus> {
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Ok(s),
        Err(e) => {
            set_last_error(format!("invalid {}: {}", what, e));
            Err(TiStatus::ErrorInvalidArgument)
        }
    }
}

/// Parameters with every field at its default.
#[no_mangle]
pub extern "C" fn ti_engine_params_default() -> TiEngineParams {
    TiEngineParams::default()
}

/// Load a model and vocabulary and start an engine.
///
/// On success, writes a heap-allocated `TiEngine` pointer into `*engine_out`
/// and returns `TiStatus::Ok`. The caller must later call `ti_engine_destroy`.
#[no_mangle]
pub unsafe extern "C" fn ti_engine_open(
    model_path: *const c_char,
    vocab_path: *const c_char,
    params: TiEngineParams,
    engine_out: *mut *mut TiEngine,
) -> TiStatus {
    catch_panic(|| {
        if model_path.is_null() || vocab_path.is_null() || engine_out.is_null() {
            set_last_error("null argument".to_string());
            return TiStatus::ErrorInvalidArgument;
        }
        let model = match unsafe { str_arg(model_path, "model path") } {
            Ok(s) => s,
            Err(status) => return status,
        };
        let vocab = match unsafe { str_arg(vocab_path, "vocab path") } {
            Ok(s) => s,
            Err(status) => return status,
        };

        let engine = match Engine::open(Path::new(model), Path::new(vocab), params.to_config()) {
            Ok(e) => e,
            Err(e) => return report(&e),
        };
        let handle = match TiEngine::new(engine) {
            Ok(h) => h,
            Err(e) => {
                set_last_error(format!("failed to start inference thread: {}", e));
                return TiStatus::ErrorInternal;
            }
        };
        unsafe {
            *engine_out = Box::into_raw(Box::new(handle));
        }
        TiStatus::Ok
    })
}

/// Classify `text` and block until the result is ready.
///
/// Always writes a heap-allocated C string into `*output`, which the caller
/// must free with `ti_free_string`. On failure the string is
/// "prediction unavailable" and `ti_last_error` holds the cause.
///
/// Must not be called from a `ti_predict_async` callback: the inference
/// thread cannot wait on itself, so such calls fail with
/// `ErrorInvalidArgument`.
#[no_mangle]
pub unsafe extern "C" fn ti_predict(
    engine: *const TiEngine,
    text: *const c_char,
    output: *mut *mut c_char,
) -> TiStatus {
    catch_panic(|| {
        if engine.is_null() || text.is_null() || output.is_null() {
            set_last_error("null argument".to_string());
            return TiStatus::ErrorInvalidArgument;
        }
        let engine = unsafe { &*engine };
        let text = match unsafe { str_arg(text, "text") } {
            Ok(s) => s,
            Err(status) => return status,
        };

        let (result, status) = if engine.on_worker_thread() {
            set_last_error("ti_predict called from a prediction callback".to_string());
            (Err(EngineError::EngineClosed), TiStatus::ErrorInvalidArgument)
        } else {
            let result = engine.predict(text);
            let status = match &result {
                Ok(_) => TiStatus::Ok,
                Err(e) => report(e),
            };
            (result, status)
        };
        match CString::new(display_or_unavailable(&result)) {
            Ok(c) => {
                unsafe { *output = c.into_raw() };
                status
            }
            Err(e) => {
                set_last_error(format!("output encoding error: {}", e));
                TiStatus::ErrorInternal
            }
        }
    })
}

/// Queue `text` for classification and return immediately.
///
/// `callback` runs on the inference thread with the status and rendered
/// result; requests complete in submission order. `user_data` is passed
/// through untouched.
#[no_mangle]
pub unsafe extern "C" fn ti_predict_async(
    engine: *const TiEngine,
    text: *const c_char,
    callback: TiPredictCallback,
    user_data: *mut c_void,
) -> TiStatus {
    catch_panic(|| {
        let callback = match callback {
            Some(cb) if !engine.is_null() && !text.is_null() => cb,
            _ => {
                set_last_error("null argument".to_string());
                return TiStatus::ErrorInvalidArgument;
            }
        };
        let engine = unsafe { &*engine };
        let text = match unsafe { str_arg(text, "text") } {
            Ok(s) => s.to_owned(),
            Err(status) => return status,
        };
        let worker = match engine.worker() {
            Ok(w) => w,
            Err(e) => return report(&e),
        };

        let target = CallbackTarget::new(callback, user_data);
        worker.submit_with(text, move |result| target.deliver(result));
        TiStatus::Ok
    })
}

/// Finish queued predictions and release the model. Later predictions
/// fail with `ErrorEngineClosed`. Closing twice is a no-op. Like
/// `ti_predict`, this fails with `ErrorInvalidArgument` inside a callback.
#[no_mangle]
pub unsafe extern "C" fn ti_engine_close(engine: *mut TiEngine) -> TiStatus {
    catch_panic(|| {
        if engine.is_null() {
            set_last_error("null argument".to_string());
            return TiStatus::ErrorInvalidArgument;
        }
        if unsafe { &*engine }.on_worker_thread() {
            set_last_error("ti_engine_close called from a prediction callback".to_string());
            return TiStatus::ErrorInvalidArgument;
        }
        unsafe { &mut *engine }.close();
        TiStatus::Ok
    })
}

/// Destroy an engine previously created by `ti_engine_open`, closing it
/// first if needed.
///
/// Passing a null pointer is a no-op and returns `TiStatus::Ok`.
#[no_mangle]
pub unsafe extern "C" fn ti_engine_destroy(engine: *mut TiEngine) -> TiStatus {
    if engine.is_null() {
        return TiStatus::Ok;
    }
    drop(Box::from_raw(engine));
    TiStatus::Ok
}

/// Retrieve the last error message.
///
/// Returns a pointer to a C string describing the most recent error on this
/// thread, or null if there is none. The caller must free the returned
/// string with `ti_free_string`.
#[no_mangle]
pub extern "C" fn ti_last_error() -> *const c_char {
    match error::take_last_error() {
        Some(e) => e.into_raw(),
        None => std::ptr::null(),
    }
}

/// Free a string previously returned by `ti_predict` or `ti_last_error`.
#[no_mangle]
pub unsafe extern "C" fn ti_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    use ti_model::classifier::ClassifierConfig;
    use ti_model::gguf::WeightFormat;
    use ti_tensor::{DType, QuantParams};

    struct Files {
        _dir: tempfile::TempDir,
        model: CString,
        vocab: CString,
    }

    fn files() -> Files {
        let dir = tempfile::tempdir().unwrap();
        let vocab = dir.path().join("vocab.txt");
        fs::write(&vocab, "[PAD]\n[UNK]\n[CLS]\n[SEP]\ngreat\nawful\n").unwrap();
        let model = dir.path().join("model.gguf");
        let config = ClassifierConfig {
            context_length: 16,
            class_count: 2,
            input_count: 3,
            per_token: false,
            output_dtype: DType::U8,
            output_quant: QuantParams::new(0.05, 128),
            input_quant: Some(QuantParams::new(1.0, 0)),
        };
        let embeddings = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -3.0, 3.0, 3.0, -3.0];
        config
            .artifact(&embeddings, &[0.0, 0.0], WeightFormat::F32)
            .write_to(&model)
            .unwrap();
        Files {
            model: CString::new(model.to_str().unwrap()).unwrap(),
            vocab: CString::new(vocab.to_str().unwrap()).unwrap(),
            _dir: dir,
        }
    }

    fn params(mode: TiOutputMode) -> TiEngineParams {
        TiEngineParams {
            max_seq_len: 16,
            output_mode: mode,
            ..ti_engine_params_default()
        }
    }

    unsafe fn open(f: &Files, mode: TiOutputMode) -> *mut TiEngine {
        let mut engine = std::ptr::null_mut();
        let status = ti_engine_open(f.model.as_ptr(), f.vocab.as_ptr(), params(mode), &mut engine);
        assert_eq!(status, TiStatus::Ok);
        assert!(!engine.is_null());
        engine
    }

    unsafe fn take_string(s: *mut c_char) -> String {
        let owned = CStr::from_ptr(s).to_str().unwrap().to_string();
        ti_free_string(s);
        owned
    }

    #[test]
    fn test_open_predict_close() {
        let f = files();
        unsafe {
            let engine = open(&f, TiOutputMode::BinaryLabel);
            let text = CString::new("a great film").unwrap();
            let mut out = std::ptr::null_mut();
            assert_eq!(ti_predict(engine, text.as_ptr(), &mut out), TiStatus::Ok);
            assert_eq!(take_string(out), "Positive");

            assert_eq!(ti_engine_close(engine), TiStatus::Ok);
            assert_eq!(ti_engine_close(engine), TiStatus::Ok);
            let mut out = std::ptr::null_mut();
            assert_eq!(
                ti_predict(engine, text.as_ptr(), &mut out),
                TiStatus::ErrorEngineClosed
            );
            assert_eq!(take_string(out), "prediction unavailable");
            let err = ti_last_error();
            assert!(!err.is_null());
            assert_eq!(take_string(err as *mut c_char), "engine is closed");

            assert_eq!(ti_engine_destroy(engine), TiStatus::Ok);
        }
    }

    #[test]
    fn test_probabilities_text() {
        let f = files();
        unsafe {
            let engine = open(&f, TiOutputMode::Probabilities);
            let text = CString::new("awful").unwrap();
            let mut out = std::ptr::null_mut();
            assert_eq!(ti_predict(engine, text.as_ptr(), &mut out), TiStatus::Ok);
            let rendered = take_string(out);
            assert!(rendered.starts_with("Probabilities: "));
            assert_eq!(rendered.matches(", ").count(), 1);
            ti_engine_destroy(engine);
        }
    }

    #[test]
    fn test_open_failures() {
        let f = files();
        let missing = CString::new("/nonexistent/model.gguf").unwrap();
        let mut engine = std::ptr::null_mut();
        unsafe {
            let status = ti_engine_open(
                missing.as_ptr(),
                f.vocab.as_ptr(),
                params(TiOutputMode::Probabilities),
                &mut engine,
            );
            assert_eq!(status, TiStatus::ErrorModelLoad);
            assert!(engine.is_null());

            let wrong_len = TiEngineParams {
                max_seq_len: 128,
                ..ti_engine_params_default()
            };
            let status = ti_engine_open(f.model.as_ptr(), f.vocab.as_ptr(), wrong_len, &mut engine);
            assert_eq!(status, TiStatus::ErrorShapeMismatch);

            let status = ti_engine_open(
                std::ptr::null(),
                f.vocab.as_ptr(),
                ti_engine_params_default(),
                &mut engine,
            );
            assert_eq!(status, TiStatus::ErrorInvalidArgument);
            assert_eq!(ti_engine_destroy(std::ptr::null_mut()), TiStatus::Ok);
        }
    }

    static RECEIVED: Mutex<Vec<(TiStatus, String)>> = Mutex::new(Vec::new());

    extern "C" fn record(status: TiStatus, text: *const c_char, user_data: *mut c_void) {
        assert_eq!(user_data as usize, 0x5eed);
        let text = unsafe { CStr::from_ptr(text) }.to_str().unwrap().to_string();
        RECEIVED.lock().unwrap().push((status, text));
    }

    static NESTED: Mutex<Option<TiStatus>> = Mutex::new(None);

    extern "C" fn predict_again(_status: TiStatus, _text: *const c_char, user_data: *mut c_void) {
        let engine = user_data as *const TiEngine;
        let text = CString::new("great").unwrap();
        let mut out = std::ptr::null_mut();
        let status = unsafe { ti_predict(engine, text.as_ptr(), &mut out) };
        assert_eq!(unsafe { take_string(out) }, "prediction unavailable");
        *NESTED.lock().unwrap() = Some(status);
    }

    #[test]
    fn test_predict_from_callback_fails_fast() {
        let f = files();
        unsafe {
            let engine = open(&f, TiOutputMode::BinaryLabel);
            let text = CString::new("great").unwrap();
            let status = ti_predict_async(
                engine,
                text.as_ptr(),
                Some(predict_again),
                engine as *mut c_void,
            );
            assert_eq!(status, TiStatus::Ok);

            let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
            while NESTED.lock().unwrap().is_none() && std::time::Instant::now() < deadline {
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
            assert_eq!(*NESTED.lock().unwrap(), Some(TiStatus::ErrorInvalidArgument));

            // the engine still serves the caller's own thread
            let mut out = std::ptr::null_mut();
            assert_eq!(ti_predict(engine, text.as_ptr(), &mut out), TiStatus::Ok);
            assert_eq!(take_string(out), "Positive");
            ti_engine_destroy(engine);
        }
    }

    #[test]
    fn test_predict_async_in_order() {
        let f = files();
        unsafe {
            let engine = open(&f, TiOutputMode::BinaryLabel);
            for word in ["great", "awful", "great"] {
                let text = CString::new(word).unwrap();
                let status =
                    ti_predict_async(engine, text.as_ptr(), Some(record), 0x5eed as *mut c_void);
                assert_eq!(status, TiStatus::Ok);
            }
            ti_engine_close(engine);
            let text = CString::new("great").unwrap();
            assert_eq!(
                ti_predict_async(engine, text.as_ptr(), Some(record), 0x5eed as *mut c_void),
                TiStatus::ErrorEngineClosed
            );
            ti_engine_destroy(engine);
        }
        let received = RECEIVED.lock().unwrap();
        let labels: Vec<&str> = received.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(labels, vec!["Positive", "Negative", "Positive"]);
        assert!(received.iter().all(|(s, _)| *s == TiStatus::Ok));
    }
}
