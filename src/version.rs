use std::os::raw::c_char;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

/// Returns the cprobe library version as a static NUL-terminated string.
///
/// The returned pointer is valid for the lifetime of the process and must not
/// be freed.
#[unsafe(no_mangle)]
pub extern "C" fn cprobe_version() -> *const c_char {
    VERSION.as_ptr() as *const c_char
}
