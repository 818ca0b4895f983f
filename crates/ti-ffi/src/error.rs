use std::cell::RefCell;
use std::ffi::CString;

use ti_engine::EngineError;

use crate::types::TiStatus;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Store an error message for later retrieval via `ti_last_error`.
pub fn set_last_error(msg: String) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Take the last error message, leaving `None` in its place.
pub fn take_last_error() -> Option<CString> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

/// Record an engine error for `ti_last_error` and return its status code.
pub fn report(err: &EngineError) -> TiStatus {
    set_last_error(err.to_string());
    TiStatus::from(err)
}
