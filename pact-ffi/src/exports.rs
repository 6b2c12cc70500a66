//! `extern "C"` functions over the global [`PactContext`].
//!
//! # Safety contract
//!
//! * Every string argument is a NUL-terminated UTF-8 C string or null; null
//!   and invalid UTF-8 take the documented failure path.
//! * Strings returned by this module are owned by this library. Release them
//!   with [`pactffi_free_string`] and nothing else.
//! * Panics are caught before they reach the caller.

use crate::context::{PactContext, contain, contain_result, init, version};
use crate::error::{FfiError, FfiResult, StartCode, WriteCode};
use once_cell::sync::Lazy;
use pact_models::{InteractionHandle, InteractionPart, PactHandle};
use pact_mock_server::MockServerConfig;
use pact_verifier::ExitCode;
use std::ffi::{CStr, CString, c_char};
use std::path::Path;
use tracing::warn;

static CONTEXT: Lazy<PactContext> = Lazy::new(|| PactContext::new(MockServerConfig::default()));

/// Borrow a C string argument.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn cstr<'a>(ptr: *const c_char, name: &'static str) -> FfiResult<&'a str> {
    if ptr.is_null() {
        return Err(FfiError::NullArgument(name));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FfiError::InvalidUtf8(name))
}

/// Borrow an optional C string argument; null is `None`.
///
/// # Safety
///
/// As [`cstr`].
unsafe fn opt_cstr<'a>(ptr: *const c_char, name: &'static str) -> FfiResult<Option<&'a str>> {
    if ptr.is_null() {
        Ok(None)
    } else {
        unsafe { cstr(ptr, name) }.map(Some)
    }
}

/// Hand a string to the caller.
fn into_raw(text: &str) -> *mut c_char {
    CString::new(text).map_or(std::ptr::null_mut(), CString::into_raw)
}

/// Hand the result of `f` to the caller; a panic yields an empty string.
fn owned_or_empty(operation: &'static str, f: impl FnOnce() -> String) -> *mut c_char {
    contain(operation, None, || Some(into_raw(&f()))).unwrap_or_else(|| into_raw(""))
}

fn part(raw: i32) -> Option<InteractionPart> {
    match raw {
        0 => Some(InteractionPart::Request),
        1 => Some(InteractionPart::Response),
        _ => None,
    }
}

fn port(raw: i32) -> Option<u16> {
    u16::try_from(raw).ok()
}

/// Run a setter, mapping bad arguments and panics to `false`.
fn setter(operation: &'static str, f: impl FnOnce() -> FfiResult<bool>) -> bool {
    contain_result(operation, f).unwrap_or_else(|err| {
        warn!(operation, error = %err, "setter rejected");
        false
    })
}

/// Initialise logging. `log_env_var` names the environment variable holding
/// the filter; null uses `LOG_LEVEL`. `LOG_FORMAT=json` selects JSON output.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_init(log_env_var: *const c_char) {
    contain("pactffi_init", (), || {
        let name = unsafe { opt_cstr(log_env_var, "log_env_var") }.ok().flatten();
        init(name);
    });
}

/// The library version, or an empty string on failure. Release with
/// [`pactffi_free_string`].
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_version() -> *mut c_char {
    owned_or_empty("pactffi_version", || version().to_string())
}

/// Create a pact. Returns the invalid handle on failure.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_new_pact(consumer: *const c_char, provider: *const c_char) -> PactHandle {
    contain("pactffi_new_pact", PactHandle::INVALID, || {
        match (unsafe { cstr(consumer, "consumer") }, unsafe { cstr(provider, "provider") }) {
            (Ok(consumer), Ok(provider)) => CONTEXT.new_pact(consumer, provider),
            _ => PactHandle::INVALID,
        }
    })
}

/// Append an interaction to a pact. Returns the invalid handle on failure.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_new_interaction(pact: PactHandle, description: *const c_char) -> InteractionHandle {
    contain("pactffi_new_interaction", InteractionHandle::INVALID, || {
        unsafe { cstr(description, "description") }
            .map_or(InteractionHandle::INVALID, |description| CONTEXT.new_interaction(pact, description))
    })
}

/// Add a provider state.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_given(interaction: InteractionHandle, description: *const c_char) -> bool {
    setter("pactffi_given", || {
        Ok(CONTEXT.given(interaction, unsafe { cstr(description, "description") }?))
    })
}

/// Add a provider state parameter; `value` is JSON or plain text.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_given_with_param(
    interaction: InteractionHandle,
    description: *const c_char,
    name: *const c_char,
    value: *const c_char,
) -> bool {
    setter("pactffi_given_with_param", || {
        Ok(CONTEXT.given_with_param(
            interaction,
            unsafe { cstr(description, "description") }?,
            unsafe { cstr(name, "name") }?,
            unsafe { cstr(value, "value") }?,
        ))
    })
}

/// Set the interaction description.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_upon_receiving(interaction: InteractionHandle, description: *const c_char) -> bool {
    setter("pactffi_upon_receiving", || {
        Ok(CONTEXT.upon_receiving(interaction, unsafe { cstr(description, "description") }?))
    })
}

/// Set the expected request method and path.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_with_request(
    interaction: InteractionHandle,
    method: *const c_char,
    path: *const c_char,
) -> bool {
    setter("pactffi_with_request", || {
        Ok(CONTEXT.with_request(interaction, unsafe { cstr(method, "method") }?, unsafe { cstr(path, "path") }?))
    })
}

/// Set the value at `index` of a query parameter. False when `index` is
/// above [`pact_models::MAX_VALUE_INDEX`].
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_with_query_parameter(
    interaction: InteractionHandle,
    name: *const c_char,
    index: usize,
    value: *const c_char,
) -> bool {
    setter("pactffi_with_query_parameter", || {
        Ok(CONTEXT.with_query_parameter(interaction, unsafe { cstr(name, "name") }?, index, unsafe { cstr(value, "value") }?))
    })
}

/// Set the value at `index` of a header. `part_raw` is 0 for the request and 1
/// for the response.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_with_header(
    interaction: InteractionHandle,
    part_raw: i32,
    name: *const c_char,
    index: usize,
    value: *const c_char,
) -> bool {
    setter("pactffi_with_header", || {
        let Some(part) = part(part_raw) else {
            return Ok(false);
        };
        Ok(CONTEXT.with_header(interaction, part, unsafe { cstr(name, "name") }?, index, unsafe { cstr(value, "value") }?))
    })
}

/// Set a request or response body (`part_raw` as for headers). A null
/// content type means none.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_with_body(
    interaction: InteractionHandle,
    part_raw: i32,
    content_type: *const c_char,
    body: *const c_char,
) -> bool {
    setter("pactffi_with_body", || {
        let Some(part) = part(part_raw) else {
            return Ok(false);
        };
        let content_type = unsafe { opt_cstr(content_type, "content_type") }?.unwrap_or_default();
        Ok(CONTEXT.with_body(interaction, part, content_type, unsafe { cstr(body, "body") }?))
    })
}

/// Set the response status.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_response_status(interaction: InteractionHandle, status: u16) -> bool {
    setter("pactffi_response_status", || Ok(CONTEXT.response_status(interaction, status)))
}

fn start_result(operation: &'static str, result: FfiResult<u16>) -> i32 {
    match result {
        Ok(port) => i32::from(port),
        Err(err) => {
            warn!(operation, error = %err, "mock server not started");
            StartCode::from(&err).code()
        }
    }
}

/// Start a mock server from pact JSON on `addr` (port 0 picks a free
/// port). Returns the port, or -1 (null argument), -2 (invalid pact),
/// -3 (bind or start failure), -4 (panic), -5 (invalid address).
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_create_mock_server(pact_json: *const c_char, addr: *const c_char) -> i32 {
    let result = contain_result("pactffi_create_mock_server", || {
        CONTEXT.create_mock_server(unsafe { cstr(pact_json, "pact_json") }?, unsafe { cstr(addr, "addr") }?)
    });
    start_result("pactffi_create_mock_server", result)
}

/// Start a mock server for a pact built through the handle API. Codes as
/// [`pactffi_create_mock_server`], with -2 meaning an invalid handle.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_create_mock_server_for_pact(pact: PactHandle, addr: *const c_char) -> i32 {
    let result = contain_result("pactffi_create_mock_server_for_pact", || {
        CONTEXT.create_mock_server_for_pact(pact, unsafe { cstr(addr, "addr") }?)
    });
    start_result("pactffi_create_mock_server_for_pact", result)
}

/// Stop the mock server on `port`. False when there is none.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_cleanup_mock_server(mock_server_port: i32) -> bool {
    contain("pactffi_cleanup_mock_server", false, || {
        port(mock_server_port).is_some_and(|port| CONTEXT.cleanup_mock_server(port))
    })
}

/// Whether the mock server on `port` received exactly the expected requests.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_mock_server_matched(mock_server_port: i32) -> bool {
    contain("pactffi_mock_server_matched", false, || {
        port(mock_server_port).is_some_and(|port| CONTEXT.mock_server_matched(port))
    })
}

/// The mismatches of the mock server on `port` as a JSON array, or null when
/// there is no such server. Release with [`pactffi_free_string`].
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_mock_server_mismatches(mock_server_port: i32) -> *mut c_char {
    contain("pactffi_mock_server_mismatches", std::ptr::null_mut(), || {
        port(mock_server_port)
            .and_then(|port| CONTEXT.mock_server_mismatches(port))
            .map_or(std::ptr::null_mut(), |json| into_raw(&json))
    })
}

/// Write the pact of the mock server on `port` into `directory` (null for
/// the current directory). Returns 0, or 1 (panic), 2 (write failure),
/// 3 (no such server).
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_write_pact_file(mock_server_port: i32, directory: *const c_char) -> i32 {
    let result = contain_result("pactffi_write_pact_file", || {
        let port = port(mock_server_port)
            .ok_or(FfiError::MockServer(pact_mock_server::MockServerError::NotFound(0)))?;
        let directory = unsafe { opt_cstr(directory, "directory") }?;
        CONTEXT.write_pact_file(port, directory.map(Path::new))
    });
    match result {
        Ok(_) => WriteCode::Success.code(),
        Err(err) => {
            warn!(error = %err, "pact file not written");
            WriteCode::from(&err).code()
        }
    }
}

/// The process CA certificate as PEM, or null on failure. Release with
/// [`pactffi_free_string`].
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_get_tls_ca_certificate() -> *mut c_char {
    contain("pactffi_get_tls_ca_certificate", std::ptr::null_mut(), || {
        CONTEXT
            .tls_ca_certificate()
            .map_or(std::ptr::null_mut(), into_raw)
    })
}

/// Release a string returned by this library. Null is ignored.
///
/// # Safety
///
/// `s` must come from this library and must not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_free_string(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(s) });
}

/// Verify a provider. `args` holds one argument per line. Returns 0 (all
/// verified), 1 (failures), 2 (null or invalid arguments), 3 (panic).
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_verify(args: *const c_char) -> i32 {
    contain("pactffi_verify", ExitCode::InternalFault, || match unsafe { cstr(args, "args") } {
        Ok(blob) => pact_verifier::verify(blob),
        Err(err) => {
            warn!(error = %err, "verification arguments rejected");
            ExitCode::InvalidArguments
        }
    })
    .code()
}

/// Stop every mock server and drop every pact.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_shutdown() {
    contain("pactffi_shutdown", (), || CONTEXT.shutdown());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(text: &str) -> CString {
        CString::new(text).unwrap()
    }

    fn take(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let text = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        unsafe { pactffi_free_string(ptr) };
        text
    }

    #[test]
    fn test_null_arguments() {
        assert!(pactffi_new_pact(std::ptr::null(), std::ptr::null()).is_invalid());
        assert_eq!(pactffi_create_mock_server(std::ptr::null(), std::ptr::null()), -1);
        assert_eq!(pactffi_verify(std::ptr::null()), 2);
        assert!(!pactffi_given(InteractionHandle::INVALID, std::ptr::null()));
        unsafe { pactffi_free_string(std::ptr::null_mut()) };
    }

    #[test]
    fn test_start_codes() {
        let addr = c("127.0.0.1:0");
        assert_eq!(pactffi_create_mock_server(c("{ not json").as_ptr(), addr.as_ptr()), -2);
        assert_eq!(pactffi_create_mock_server_for_pact(PactHandle::INVALID, addr.as_ptr()), -2);

        let pact = c(r#"{"consumer": {"name": "C"}, "provider": {"name": "P"}, "interactions": []}"#);
        assert_eq!(pactffi_create_mock_server(pact.as_ptr(), c("not an address:x").as_ptr()), -5);
    }

    #[test]
    fn test_unknown_port() {
        assert!(!pactffi_mock_server_matched(1));
        assert!(pactffi_mock_server_mismatches(1).is_null());
        assert!(!pactffi_cleanup_mock_server(-7));
        assert_eq!(pactffi_write_pact_file(1, std::ptr::null()), 3);
        assert_eq!(pactffi_write_pact_file(-1, std::ptr::null()), 3);
    }

    #[test]
    fn test_handle_lifecycle() {
        let pact = pactffi_new_pact(c("C").as_ptr(), c("P").as_ptr());
        let interaction = pactffi_new_interaction(pact, c("a request for data").as_ptr());
        assert!(pactffi_with_request(interaction, c("GET").as_ptr(), c("/data").as_ptr()));
        assert!(pactffi_with_header(interaction, 0, c("Accept").as_ptr(), 0, c("application/json").as_ptr()));
        assert!(!pactffi_with_header(interaction, 9, c("Accept").as_ptr(), 0, c("x").as_ptr()));
        assert!(pactffi_with_body(interaction, 1, std::ptr::null(), c(r#"{"value": 1}"#).as_ptr()));
        assert!(pactffi_response_status(interaction, 200));

        let port = pactffi_create_mock_server_for_pact(pact, c("127.0.0.1:0").as_ptr());
        assert!(port > 0);
        let mismatches = take(pactffi_mock_server_mismatches(port));
        assert!(mismatches.contains("missing-request"));

        let dir = tempfile::tempdir().unwrap();
        let dir_arg = c(&dir.path().to_string_lossy());
        assert_eq!(pactffi_write_pact_file(port, dir_arg.as_ptr()), 0);
        assert!(dir.path().join("C-P.json").exists());
        assert!(pactffi_cleanup_mock_server(port));
    }

    #[test]
    fn test_panicking_string_result_is_empty() {
        let ptr = owned_or_empty("test", || panic!("boom"));
        assert_eq!(take(ptr), "");
    }

    #[test]
    fn test_oversized_value_index_is_rejected() {
        let pact = pactffi_new_pact(c("C").as_ptr(), c("P").as_ptr());
        let interaction = pactffi_new_interaction(pact, c("a request with a huge index").as_ptr());
        assert!(!pactffi_with_query_parameter(interaction, c("a").as_ptr(), 1 << 40, c("v").as_ptr()));
        assert!(!pactffi_with_header(interaction, 0, c("X-Id").as_ptr(), usize::MAX, c("v").as_ptr()));
        assert!(pactffi_with_query_parameter(interaction, c("a").as_ptr(), 0, c("v").as_ptr()));
    }

    #[test]
    fn test_owned_strings() {
        assert_eq!(take(pactffi_version()), env!("CARGO_PKG_VERSION"));
        assert!(take(pactffi_get_tls_ca_certificate()).contains("BEGIN CERTIFICATE"));
    }
}
