use std::ffi::CString;
use std::os::raw::c_void;

use ti_engine::{display_or_unavailable, Output, Result};

use crate::types::TiStatus;

/// A C callback and its opaque user pointer, moved to the inference thread.
pub struct CallbackTarget {
    callback: extern "C" fn(TiStatus, *const std::os::raw::c_char, *mut c_void),
    user_data: *mut c_void,
}

// The host owns `user_data` and promises it may be used from the inference
// thread until the callback fires.
unsafe impl Send for CallbackTarget {}

impl CallbackTarget {
    pub fn new(
        callback: extern "C" fn(TiStatus, *const std::os::raw::c_char, *mut c_void),
        user_data: *mut c_void,
    ) -> Self {
        Self {
            callback,
            user_data,
        }
    }

    /// Invoke the callback with the rendered result. Failures arrive as
    /// "prediction unavailable" plus a non-OK status.
    pub fn deliver(self, result: Result<Output>) {
        let status = match &result {
            Ok(_) => TiStatus::Ok,
            Err(e) => TiStatus::from(e),
        };
        let text = display_or_unavailable(&result);
        match CString::new(text) {
            Ok(c_str) => (self.callback)(status, c_str.as_ptr(), self.user_data),
            Err(_) => (self.callback)(TiStatus::ErrorInternal, std::ptr::null(), self.user_data),
        }
    }
}
