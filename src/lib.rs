//! C ABI conformance probe fixtures for FFI binding layers.

mod error;
mod logging;
mod probe;
mod version;
