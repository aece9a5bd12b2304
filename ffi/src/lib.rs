//! C ABI over the fzgate session registry.
//!
//! Hosts create one [`FzGateway`], open sessions from JSON payloads and receive
//! results as JSON strings through a callback. Callbacks run on the session's
//! dispatch thread and may call back into the gateway, including `fzgate_end`
//! for their own session.
//!
//! Strings returned by this library must be released with
//! [`fzgate_string_free`]. Sessions the host never ends keep their threads
//! alive until [`fzgate_gateway_free`].

mod gateway;
mod status;

pub use gateway::FzGateway;
pub use status::FzStatus;

use fzgate_core::{GatewaySettings, SearchResult, SessionId, expose_constants};
use std::ffi::{CStr, CString, c_char, c_void};
use std::ptr;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Receives one result as NUL-terminated JSON plus the `user_data` given at
/// registration. The string is only valid for the duration of the call.
pub type FzResultCallback = unsafe extern "C" fn(result_json: *const c_char, user_data: *mut c_void);

/// Creates a gateway.
///
/// `settings_toml` may be null for defaults.
///
/// # Returns
/// Pointer to the gateway, or null if the settings can't be read or are invalid.
///
/// # Safety
/// `settings_toml` must be null or a valid NUL-terminated string. Free the
/// gateway with `fzgate_gateway_free`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fzgate_gateway_new(settings_toml: *const c_char) -> *mut FzGateway {
    let settings = if settings_toml.is_null() {
        GatewaySettings::default()
    } else {
        let Ok(text) = (unsafe { read_str(settings_toml) }) else {
            return ptr::null_mut();
        };
        match GatewaySettings::from_toml_str(text) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(error = %err, "Gateway settings rejected.");
                return ptr::null_mut();
            }
        }
    };

    let problems = settings.validate();
    if !problems.is_empty() {
        warn!(?problems, "Gateway settings rejected.");
        return ptr::null_mut();
    }

    Box::into_raw(Box::new(FzGateway::new(&settings)))
}

/// Frees a gateway, ending every session still active.
///
/// # Safety
/// `gateway` must be null or a pointer from `fzgate_gateway_new` that has not
/// been freed. No other call may use it concurrently.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fzgate_gateway_free(gateway: *mut FzGateway) {
    if !gateway.is_null() {
        unsafe {
            drop(Box::from_raw(gateway));
        }
    }
}

/// Returns the sort criterion and case mode codes as a JSON object.
///
/// # Safety
/// The returned string must be freed with `fzgate_string_free`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fzgate_expose_constants() -> *mut c_char {
    let Ok(json) = serde_json::to_string(&expose_constants()) else {
        return ptr::null_mut();
    };
    CString::new(json).map_or(ptr::null_mut(), CString::into_raw)
}

/// Creates a session.
///
/// `haystack_json` is a JSON array of strings. `options_json` is a JSON
/// object, or null for defaults. The new handle is written to `out_handle`.
///
/// # Safety
/// `gateway` must be a live gateway pointer. The strings must be null or
/// valid NUL-terminated strings, and `out_handle` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fzgate_session_new(
    gateway: *const FzGateway,
    haystack_json: *const c_char,
    options_json: *const c_char,
    out_handle: *mut u64,
) -> FzStatus {
    let Some(gateway) = (unsafe { gateway.as_ref() }) else {
        return FzStatus::Usage;
    };
    if out_handle.is_null() {
        return FzStatus::Usage;
    }
    let haystack = match unsafe { read_str(haystack_json) } {
        Ok(text) => text,
        Err(status) => return status,
    };
    let options = if options_json.is_null() {
        None
    } else {
        match unsafe { read_str(options_json) } {
            Ok(text) => Some(text),
            Err(status) => return status,
        }
    };

    match gateway.create_session(haystack, options) {
        Ok(id) => {
            unsafe {
                *out_handle = id.get();
            }
            FzStatus::Ok
        }
        Err(status) => status,
    }
}

/// Registers a result callback for a session.
///
/// # Safety
/// `gateway` must be a live gateway pointer. `user_data` is passed back
/// untouched and must stay valid, and usable from another thread, until
/// `fzgate_end` for the session or `fzgate_gateway_free` returns. Both wait
/// for a callback already running, unless called from that callback.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fzgate_add_listener(
    gateway: *const FzGateway,
    handle: u64,
    callback: Option<FzResultCallback>,
    user_data: *mut c_void,
) -> FzStatus {
    let Some(gateway) = (unsafe { gateway.as_ref() }) else {
        return FzStatus::Usage;
    };
    let Some(callback) = callback else {
        return FzStatus::Usage;
    };

    let host = HostListener {
        callback,
        user_data,
    };
    gateway
        .registry()
        .add_listener(SessionId::new(handle), move |result| host.deliver(result))
        .into()
}

/// Submits a needle to a session.
///
/// # Safety
/// `gateway` must be a live gateway pointer and `needle` a valid
/// NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fzgate_search(
    gateway: *const FzGateway,
    handle: u64,
    needle: *const c_char,
) -> FzStatus {
    let Some(gateway) = (unsafe { gateway.as_ref() }) else {
        return FzStatus::Usage;
    };
    let needle = match unsafe { read_str(needle) } {
        Ok(text) => text,
        Err(status) => return status,
    };

    gateway
        .registry()
        .search(SessionId::new(handle), needle)
        .into()
}

/// Ends a session. Ending the same handle twice is an error.
///
/// # Safety
/// `gateway` must be a live gateway pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fzgate_end(gateway: *const FzGateway, handle: u64) -> FzStatus {
    let Some(gateway) = (unsafe { gateway.as_ref() }) else {
        return FzStatus::Usage;
    };

    gateway.registry().end(SessionId::new(handle)).into()
}

/// Sets the reference time, in Unix milliseconds, for latency logging of
/// session creation. Zero disables it.
///
/// # Safety
/// `gateway` must be null or a live gateway pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fzgate_set_start_time(gateway: *const FzGateway, unix_ms: i64) {
    if let Some(gateway) = unsafe { gateway.as_ref() } {
        gateway.set_start_time(unix_ms);
    }
}

/// Installs a stderr subscriber.
///
/// `filter` is an `EnvFilter` directive. When null, `RUST_LOG` is used and
/// `info` is the fallback.
///
/// # Returns
/// `Config` for a bad directive, `Usage` if a subscriber is already installed.
///
/// # Safety
/// `filter` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fzgate_init_logging(filter: *const c_char) -> FzStatus {
    let filter = if filter.is_null() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        let directive = match unsafe { read_str(filter) } {
            Ok(text) => text,
            Err(status) => return status,
        };
        match EnvFilter::try_new(directive) {
            Ok(filter) => filter,
            Err(_) => return FzStatus::Config,
        }
    };

    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        Ok(()) => FzStatus::Ok,
        Err(_) => FzStatus::Usage,
    }
}

/// Frees a string returned by this library.
///
/// # Safety
/// `value` must be null or a pointer returned by this library that has not
/// been freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fzgate_string_free(value: *mut c_char) {
    if !value.is_null() {
        unsafe {
            drop(CString::from_raw(value));
        }
    }
}

/// Borrows a host string.
unsafe fn read_str<'a>(value: *const c_char) -> Result<&'a str, FzStatus> {
    if value.is_null() {
        return Err(FzStatus::Usage);
    }
    unsafe { CStr::from_ptr(value) }
        .to_str()
        .map_err(|_| FzStatus::Usage)
}

struct HostListener {
    callback: FzResultCallback,
    user_data: *mut c_void,
}

// The host guarantees `user_data` may be used from the dispatch thread.
unsafe impl Send for HostListener {}
unsafe impl Sync for HostListener {}

impl HostListener {
    fn deliver(&self, result: &SearchResult) {
        let json = match result.to_json().map(CString::new) {
            Ok(Ok(json)) => json,
            Ok(Err(err)) => {
                warn!(error = %err, "Result JSON contains a NUL byte.");
                return;
            }
            Err(err) => {
                warn!(error = %err, "Failed to serialize result.");
                return;
            }
        };
        unsafe { (self.callback)(json.as_ptr(), self.user_data) };
    }
}
