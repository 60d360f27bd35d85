use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Opaque error type for C callers.
#[repr(C)]
pub struct cprobe_error_t;

struct ErrorHandle {
    message: CString,
}

pub(crate) fn cstring_lossy(value: &str) -> CString {
    let bytes: Vec<u8> = value
        .bytes()
        .map(|byte| if byte == 0 { b' ' } else { byte })
        .collect();
    CString::new(bytes).unwrap_or_else(|_| CString::new("invalid message").unwrap())
}

pub(crate) fn clear_error(out_error: *mut *mut cprobe_error_t) {
    if !out_error.is_null() {
        // Safety: caller provided a valid out_error pointer.
        unsafe {
            *out_error = ptr::null_mut();
        }
    }
}

pub(crate) fn write_error(out_error: *mut *mut cprobe_error_t, message: impl Into<String>) {
    if out_error.is_null() {
        return;
    }
    let handle = Box::new(ErrorHandle {
        message: cstring_lossy(&message.into()),
    });
    // Safety: out_error is non-null and points to writable memory.
    unsafe {
        *out_error = Box::into_raw(handle) as *mut cprobe_error_t;
    }
}

/// Returns the message for an error allocated by cprobe.
///
/// The returned pointer is valid as long as the error handle is alive.
#[unsafe(no_mangle)]
pub extern "C" fn cprobe_error_message(error: *const cprobe_error_t) -> *const c_char {
    if error.is_null() {
        return ptr::null();
    }
    // Safety: error must be a valid handle allocated by cprobe.
    let handle = unsafe { &*(error as *const ErrorHandle) };
    handle.message.as_ptr()
}

/// Frees an error returned by cprobe.
#[unsafe(no_mangle)]
pub extern "C" fn cprobe_error_free(error: *mut cprobe_error_t) {
    if error.is_null() {
        return;
    }
    // Safety: error must be a valid handle allocated by cprobe.
    unsafe {
        drop(Box::from_raw(error as *mut ErrorHandle));
    }
}
