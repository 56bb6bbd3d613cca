//! FFI bindings for MedSynapse Insight
//!
//! This module provides C-compatible functions for calling the analyzer from other
//! languages. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `medsynapse_free_string`.
//!
//! Analysis failures are not FFI failures: they come back as `{"error": "..."}`
//! report JSON. NULL is only returned when a pointer argument is unusable.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::pipeline::HealthAnalyzer;
use crate::types::AnalysisReport;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Build an analyzer from an optional config pointer.
///
/// NULL means defaults. A bad config becomes the error report to return.
unsafe fn analyzer_from(config_json: *const c_char) -> Result<HealthAnalyzer, AnalysisReport> {
    if config_json.is_null() {
        return Ok(HealthAnalyzer::new());
    }
    let Some(config) = cstr_to_string(config_json) else {
        set_last_error("Invalid config string pointer");
        return Err(AnalysisReport::error("Invalid config string pointer"));
    };
    HealthAnalyzer::from_config_json(&config).map_err(|e| {
        set_last_error(&e.to_string());
        AnalysisReport::error(e.to_string())
    })
}

fn report_to_cstr(report: &AnalysisReport) -> *mut c_char {
    if let Some(message) = report.error_message() {
        set_last_error(message);
    }
    match report.to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

unsafe fn analyze(
    json: *const c_char,
    config_json: *const c_char,
    run: impl FnOnce(&HealthAnalyzer, &str) -> AnalysisReport,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    let report = match analyzer_from(config_json) {
        Ok(analyzer) => run(&analyzer, &json_str),
        Err(report) => report,
    };
    report_to_cstr(&report)
}

// ============================================================================
// Analysis API
// ============================================================================

/// Analyze a JSON array of lab records and return report JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `medsynapse_free_string`.
/// - Returns NULL only for an invalid `json` pointer; see `medsynapse_last_error`.
#[no_mangle]
pub unsafe extern "C" fn medsynapse_analyze_lab_results(
    json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    analyze(json, config_json, |analyzer, input| {
        analyzer.analyze_lab_results_json(input)
    })
}

/// Analyze a JSON array of wearable records and return report JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `medsynapse_free_string`.
/// - Returns NULL only for an invalid `json` pointer; see `medsynapse_last_error`.
#[no_mangle]
pub unsafe extern "C" fn medsynapse_analyze_wearable_data(
    json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    analyze(json, config_json, |analyzer, input| {
        analyzer.analyze_wearable_data_json(input)
    })
}

/// Generate insights for report JSON and return a JSON array of strings.
///
/// # Safety
/// - `report_json` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `medsynapse_free_string`.
/// - Returns NULL on error; call `medsynapse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn medsynapse_generate_insights(
    report_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(report_str) = cstr_to_string(report_json) else {
        set_last_error("Invalid report string pointer");
        return ptr::null_mut();
    };

    // Insight generation never fails, so a bad config falls back to defaults
    let analyzer = analyzer_from(config_json).unwrap_or_default();
    let insights = analyzer.generate_insights_json(&report_str);

    match serde_json::to_string(&insights) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a string returned by MedSynapse functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a MedSynapse function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn medsynapse_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// Analysis calls that return an `{"error"}` report also record its message here.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next MedSynapse function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn medsynapse_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn medsynapse_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
