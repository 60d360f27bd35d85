//! Logging configuration for cprobe's C API.
//!
//! Probe invocations are logged at TRACE so a binding author can watch values
//! cross the boundary. Logs go to stderr unless a callback is installed.

use std::os::raw::{c_char, c_void};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Once, RwLock};

use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;

use crate::error::{clear_error, cprobe_error_t, cstring_lossy, write_error};

const LOGGER_STATE_UNINIT: u8 = 0;
const LOGGER_STATE_READY: u8 = 1;
const LOGGER_STATE_FAILED: u8 = 2;

static LOGGER_STATE: AtomicU8 = AtomicU8::new(LOGGER_STATE_UNINIT);
static LOGGER_INIT: Once = Once::new();
static CPROBE_LOGGER: Lazy<ProbeLogger> = Lazy::new(ProbeLogger::new);

/// Log level values for cprobe logging.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(C)]
pub enum cprobe_log_level_t {
    CPROBE_LOG_LEVEL_OFF = 0,
    CPROBE_LOG_LEVEL_ERROR = 1,
    CPROBE_LOG_LEVEL_WARN = 2,
    CPROBE_LOG_LEVEL_INFO = 3,
    CPROBE_LOG_LEVEL_DEBUG = 4,
    CPROBE_LOG_LEVEL_TRACE = 5,
}

impl From<cprobe_log_level_t> for LevelFilter {
    fn from(value: cprobe_log_level_t) -> Self {
        match value {
            cprobe_log_level_t::CPROBE_LOG_LEVEL_OFF => LevelFilter::Off,
            cprobe_log_level_t::CPROBE_LOG_LEVEL_ERROR => LevelFilter::Error,
            cprobe_log_level_t::CPROBE_LOG_LEVEL_WARN => LevelFilter::Warn,
            cprobe_log_level_t::CPROBE_LOG_LEVEL_INFO => LevelFilter::Info,
            cprobe_log_level_t::CPROBE_LOG_LEVEL_DEBUG => LevelFilter::Debug,
            cprobe_log_level_t::CPROBE_LOG_LEVEL_TRACE => LevelFilter::Trace,
        }
    }
}

impl From<Level> for cprobe_log_level_t {
    fn from(value: Level) -> Self {
        match value {
            Level::Error => cprobe_log_level_t::CPROBE_LOG_LEVEL_ERROR,
            Level::Warn => cprobe_log_level_t::CPROBE_LOG_LEVEL_WARN,
            Level::Info => cprobe_log_level_t::CPROBE_LOG_LEVEL_INFO,
            Level::Debug => cprobe_log_level_t::CPROBE_LOG_LEVEL_DEBUG,
            Level::Trace => cprobe_log_level_t::CPROBE_LOG_LEVEL_TRACE,
        }
    }
}

/// Log record delivered to a C callback.
///
/// String pointers are only valid for the duration of the callback and must
/// not be retained. `line` is 0 when unknown.
#[repr(C)]
pub struct cprobe_log_record_t {
    pub level: cprobe_log_level_t,
    pub target: *const c_char,
    pub message: *const c_char,
    pub line: u32,
}

/// Callback invoked for each log record emitted by cprobe.
///
/// The callback may be invoked from any thread that emits a log record.
#[allow(non_camel_case_types)]
pub type cprobe_log_callback_t =
    Option<extern "C" fn(record: *const cprobe_log_record_t, user_data: *mut c_void)>;

/// Configuration for initializing cprobe logging.
///
/// If `RUST_LOG` is set in the environment to a level name, it overrides
/// `level`. If `callback` is null, logs are written to stderr; otherwise they
/// are delivered to the callback with `user_data` forwarded unchanged.
#[repr(C)]
pub struct cprobe_log_config_t {
    pub level: cprobe_log_level_t,
    pub callback: cprobe_log_callback_t,
    pub user_data: *mut c_void,
}

struct LoggerConfig {
    level: LevelFilter,
    callback: cprobe_log_callback_t,
    user_data: usize,
}

struct ProbeLogger {
    config: RwLock<LoggerConfig>,
}

impl ProbeLogger {
    fn new() -> Self {
        Self {
            config: RwLock::new(LoggerConfig {
                level: LevelFilter::Info,
                callback: None,
                user_data: 0,
            }),
        }
    }

    fn update(&self, config: LoggerConfig) {
        let mut guard = self.config.write().unwrap_or_else(|err| err.into_inner());
        *guard = config;
    }

    fn with_config<T>(&self, f: impl FnOnce(&LoggerConfig) -> T) -> T {
        let guard = self.config.read().unwrap_or_else(|err| err.into_inner());
        f(&guard)
    }
}

impl Log for ProbeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level().to_level_filter() <= self.with_config(|config| config.level)
    }

    fn log(&self, record: &Record) {
        let (callback, user_data, level) =
            self.with_config(|config| (config.callback, config.user_data, config.level));

        if record.level().to_level_filter() > level {
            return;
        }

        if let Some(callback) = callback {
            let target = cstring_lossy(record.target());
            let message = cstring_lossy(&record.args().to_string());
            let c_record = cprobe_log_record_t {
                level: record.level().into(),
                target: target.as_ptr(),
                message: message.as_ptr(),
                line: record.line().unwrap_or(0),
            };
            callback(&c_record, user_data as *mut c_void);
        } else {
            eprintln!("{} {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

fn resolve_level(config: Option<&cprobe_log_config_t>) -> Result<LevelFilter, String> {
    if let Ok(value) = std::env::var("RUST_LOG") {
        return parse_level(&value).ok_or_else(|| format!("invalid RUST_LOG value `{value}`"));
    }

    let level = config
        .map(|config| config.level)
        .unwrap_or(cprobe_log_level_t::CPROBE_LOG_LEVEL_INFO);
    Ok(level.into())
}

fn ensure_logger(out_error: *mut *mut cprobe_error_t) -> bool {
    LOGGER_INIT.call_once(|| {
        if log::set_logger(&*CPROBE_LOGGER).is_ok() {
            LOGGER_STATE.store(LOGGER_STATE_READY, Ordering::SeqCst);
        } else {
            LOGGER_STATE.store(LOGGER_STATE_FAILED, Ordering::SeqCst);
        }
    });

    match LOGGER_STATE.load(Ordering::SeqCst) {
        LOGGER_STATE_READY => true,
        LOGGER_STATE_FAILED => {
            write_error(out_error, "logging already initialized by another logger");
            false
        }
        _ => {
            write_error(out_error, "logging failed to initialize");
            false
        }
    }
}

/// Initializes default logging configuration values.
///
/// The defaults select INFO logging with no callback.
#[unsafe(no_mangle)]
pub extern "C" fn cprobe_log_config_init(config: *mut cprobe_log_config_t) {
    if config.is_null() {
        return;
    }
    // Safety: caller provided a writable config pointer.
    unsafe {
        *config = cprobe_log_config_t {
            level: cprobe_log_level_t::CPROBE_LOG_LEVEL_INFO,
            callback: None,
            user_data: std::ptr::null_mut(),
        };
    }
}

/// Initializes logging for cprobe.
///
/// If `config` is null, defaults are used. This function may be called
/// multiple times to update the logging configuration after initialization.
#[unsafe(no_mangle)]
pub extern "C" fn cprobe_log_init(
    config: *const cprobe_log_config_t,
    out_error: *mut *mut cprobe_error_t,
) -> bool {
    clear_error(out_error);

    // Safety: caller passes null or a valid config pointer.
    let config = unsafe { config.as_ref() };
    let level = match resolve_level(config) {
        Ok(level) => level,
        Err(message) => {
            write_error(out_error, message);
            return false;
        }
    };

    if !ensure_logger(out_error) {
        return false;
    }

    let callback = config.and_then(|config| config.callback);
    let user_data = config.map(|config| config.user_data as usize).unwrap_or(0);

    CPROBE_LOGGER.update(LoggerConfig {
        level,
        callback,
        user_data,
    });
    log::set_max_level(level);
    true
}
