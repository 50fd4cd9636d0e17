//! FFI bindings for the keyboard host
//!
//! C-compatible functions for driving the engine from a native keyboard
//! extension. Strings are null-terminated; strings returned by this module
//! must be freed by the caller with `kflux_free_string`.
//!
//! Event functions return `0` on success and `-1` when the event was
//! rejected; `kflux_last_error` then describes why.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::input::{EngineContext, InputSession};
use crate::pipeline::replay_to_json;
use crate::schema::KeyboardEvent;
use crate::sink::MemorySink;
use crate::types::UserIdentity;

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

// ============================================================================
// Stateless API
// ============================================================================

/// Replay a recorded event stream (NDJSON or JSON array) and return the
/// replay report as JSON.
///
/// # Safety
/// - `events` and `user_id` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `kflux_free_string`.
/// - Returns NULL on error; call `kflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kflux_replay(events: *const c_char, user_id: *const c_char) -> *mut c_char {
    clear_last_error();

    let events_str = match cstr_to_string(events) {
        Some(s) => s,
        None => {
            set_last_error("Invalid events string pointer");
            return ptr::null_mut();
        }
    };

    let uid = match cstr_to_string(user_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid user_id string pointer");
            return ptr::null_mut();
        }
    };

    match replay_to_json(events_str, uid) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Live Engine API
// ============================================================================

/// Opaque handle to one input session (keyboard open to keyboard close)
pub struct KfluxEngineHandle {
    input: InputSession,
    sink: MemorySink,
}

/// Create an engine for one input session.
///
/// # Safety
/// - `user_id` must be a valid null-terminated C string.
/// - `config_json` may be NULL (defaults) or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `kflux_engine_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn kflux_engine_new(
    user_id: *const c_char,
    config_json: *const c_char,
) -> *mut KfluxEngineHandle {
    clear_last_error();

    let uid = match cstr_to_string(user_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid user_id string pointer");
            return ptr::null_mut();
        }
    };

    let config = if config_json.is_null() {
        EngineConfig::default()
    } else {
        let parsed = match cstr_to_string(config_json) {
            Some(s) => EngineConfig::from_json(&s),
            None => Err(EngineError::Config("config is not valid UTF-8".to_string())),
        };
        match parsed {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let sink = MemorySink::new();
    let context = EngineContext::new(UserIdentity::new(uid), Arc::new(sink.clone()))
        .with_config(config);
    let handle = Box::new(KfluxEngineHandle {
        input: InputSession::new(context),
        sink,
    });
    Box::into_raw(handle)
}

/// Free an engine.
///
/// A typing session still active is ended first; its record, if any, is
/// dropped with the handle. Call `kflux_focus_out` and `kflux_take_records`
/// beforehand to keep it.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn kflux_engine_free(engine: *mut KfluxEngineHandle) {
    if !engine.is_null() {
        let handle = Box::from_raw(engine);
        handle.input.close();
    }
}

unsafe fn dispatch(engine: *mut KfluxEngineHandle, event: KeyboardEvent) -> i32 {
    clear_last_error();

    let handle = match engine.as_mut() {
        Some(h) => h,
        None => {
            set_last_error("Invalid engine pointer");
            return -1;
        }
    };

    match handle.input.dispatch(&event) {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// A text field gained focus.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn kflux_focus_in(engine: *mut KfluxEngineHandle) -> i32 {
    dispatch(engine, KeyboardEvent::FocusIn)
}

/// The text field lost focus; the typing session ends and, if usable, its
/// record is buffered for `kflux_take_records`.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn kflux_focus_out(engine: *mut KfluxEngineHandle) -> i32 {
    dispatch(engine, KeyboardEvent::FocusOut)
}

/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn kflux_word_boundary(engine: *mut KfluxEngineHandle) -> i32 {
    dispatch(engine, KeyboardEvent::WordBoundary)
}

/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn kflux_character_typed(engine: *mut KfluxEngineHandle) -> i32 {
    dispatch(engine, KeyboardEvent::CharacterTyped)
}

/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn kflux_key_down(engine: *mut KfluxEngineHandle) -> i32 {
    dispatch(engine, KeyboardEvent::KeyDown)
}

/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn kflux_key_up(engine: *mut KfluxEngineHandle) -> i32 {
    dispatch(engine, KeyboardEvent::KeyUp)
}

/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn kflux_backspace(engine: *mut KfluxEngineHandle) -> i32 {
    dispatch(engine, KeyboardEvent::Backspace)
}

/// A run of `length` consecutive backspaces ended.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn kflux_burst_detected(engine: *mut KfluxEngineHandle, length: u32) -> i32 {
    dispatch(engine, KeyboardEvent::BurstDetected { length })
}

/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn kflux_pressure_sample(engine: *mut KfluxEngineHandle, value: i64) -> i32 {
    dispatch(engine, KeyboardEvent::PressureSample { value })
}

/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn kflux_pressure_removed(engine: *mut KfluxEngineHandle, value: i64) -> i32 {
    dispatch(engine, KeyboardEvent::PressureRemoved { value })
}

/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn kflux_word_or_sentence_deleted(engine: *mut KfluxEngineHandle) -> i32 {
    dispatch(engine, KeyboardEvent::WordOrSentenceDeleted)
}

/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn kflux_character_deleted(engine: *mut KfluxEngineHandle) -> i32 {
    dispatch(engine, KeyboardEvent::CharacterDeleted)
}

/// Take every record buffered since the last call, as a JSON array.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
/// - Returns a newly allocated string that must be freed with `kflux_free_string`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn kflux_take_records(engine: *mut KfluxEngineHandle) -> *mut c_char {
    clear_last_error();

    let handle = match engine.as_mut() {
        Some(h) => h,
        None => {
            set_last_error("Invalid engine pointer");
            return ptr::null_mut();
        }
    };

    let records = handle.sink.drain();
    match serde_json::to_string(&records) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Take the outcome of every typing session ended since the last call, as a
/// JSON array. Hosts that keep one engine for the keyboard's lifetime should
/// call this periodically.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `kflux_engine_new`.
/// - Returns a newly allocated string that must be freed with `kflux_free_string`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn kflux_take_outcomes(engine: *mut KfluxEngineHandle) -> *mut c_char {
    clear_last_error();

    let handle = match engine.as_mut() {
        Some(h) => h,
        None => {
            set_last_error("Invalid engine pointer");
            return ptr::null_mut();
        }
    };

    let outcomes = handle.input.take_outcomes();
    match serde_json::to_string(&outcomes) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by kflux functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a kflux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn kflux_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next kflux function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn kflux_last_error() -> *const c_char {
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
pub unsafe extern "C" fn kflux_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::EmittedRecord;
    use crate::types::SessionOutcome;

    unsafe fn type_words(engine: *mut KfluxEngineHandle, words: usize, letters: usize) {
        for _ in 0..words {
            for _ in 0..letters {
                assert_eq!(kflux_key_down(engine), 0);
                assert_eq!(kflux_character_typed(engine), 0);
                assert_eq!(kflux_key_up(engine), 0);
            }
            assert_eq!(kflux_word_boundary(engine), 0);
        }
    }

    #[test]
    fn test_ffi_engine_lifecycle() {
        let uid = CString::new("user-ffi").unwrap();
        unsafe {
            let engine = kflux_engine_new(uid.as_ptr(), ptr::null());
            assert!(!engine.is_null());

            assert_eq!(kflux_focus_in(engine), 0);
            type_words(engine, 5, 5);
            assert_eq!(kflux_pressure_sample(engine, 3), 0);
            assert_eq!(kflux_focus_out(engine), 0);

            // Typed in well under a second of wall time, so the gate discards it
            let records = kflux_take_records(engine);
            assert!(!records.is_null());
            let parsed: Vec<EmittedRecord> =
                serde_json::from_str(CStr::from_ptr(records).to_str().unwrap()).unwrap();
            assert!(parsed.is_empty());
            kflux_free_string(records);

            let outcomes = kflux_take_outcomes(engine);
            assert!(!outcomes.is_null());
            let parsed: Vec<SessionOutcome> =
                serde_json::from_str(CStr::from_ptr(outcomes).to_str().unwrap()).unwrap();
            assert_eq!(parsed.len(), 1);
            assert!(!parsed[0].is_emitted());
            kflux_free_string(outcomes);

            // drained
            let outcomes = kflux_take_outcomes(engine);
            assert_eq!(CStr::from_ptr(outcomes).to_str().unwrap(), "[]");
            kflux_free_string(outcomes);

            kflux_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_config_json_lowers_gate() {
        let uid = CString::new("user-ffi").unwrap();
        let config = CString::new(
            r#"{"gate":{"min_words":1,"min_characters":1,"min_duration_secs":0.0}}"#,
        )
        .unwrap();
        unsafe {
            let engine = kflux_engine_new(uid.as_ptr(), config.as_ptr());
            assert!(!engine.is_null());

            assert_eq!(kflux_focus_in(engine), 0);
            type_words(engine, 1, 3);
            assert_eq!(kflux_focus_out(engine), 0);

            let records = kflux_take_records(engine);
            let parsed: Vec<EmittedRecord> =
                serde_json::from_str(CStr::from_ptr(records).to_str().unwrap()).unwrap();
            assert_eq!(parsed.len(), 1);
            assert_eq!(parsed[0].user.uid, "user-ffi");
            assert_eq!(parsed[0].record.characters_typed, 3);
            kflux_free_string(records);

            kflux_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let uid = CString::new("user-ffi").unwrap();
        unsafe {
            let engine = kflux_engine_new(uid.as_ptr(), ptr::null());

            // No typing session yet
            assert_eq!(kflux_key_down(engine), -1);
            let error = kflux_last_error();
            assert!(!error.is_null());
            let message = CStr::from_ptr(error).to_str().unwrap();
            assert!(message.contains("no active typing session"));

            assert_eq!(kflux_focus_in(engine), 0);
            assert!(kflux_last_error().is_null());
            assert_eq!(kflux_burst_detected(engine, 1), -1);

            kflux_engine_free(engine);
            assert_eq!(kflux_key_down(ptr::null_mut()), -1);
        }
    }

    #[test]
    fn test_ffi_pressure_misuse_is_rejected() {
        let uid = CString::new("user-ffi").unwrap();
        unsafe {
            let engine = kflux_engine_new(uid.as_ptr(), ptr::null());
            assert_eq!(kflux_focus_in(engine), 0);

            assert_eq!(kflux_pressure_removed(engine, i64::MIN), -1);
            let message = CStr::from_ptr(kflux_last_error()).to_str().unwrap();
            assert!(message.contains("invalid pressure value"));

            assert_eq!(kflux_pressure_sample(engine, i64::MAX), 0);
            assert_eq!(kflux_pressure_sample(engine, 1), -1);
            let message = CStr::from_ptr(kflux_last_error()).to_str().unwrap();
            assert!(message.contains("overflow"));

            // the input path keeps working
            assert_eq!(kflux_character_typed(engine), 0);
            assert_eq!((*engine).input.active_session().unwrap().counters().pressure, i64::MAX);

            kflux_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_rejects_bad_config() {
        let uid = CString::new("user-ffi").unwrap();
        let config = CString::new("{not json").unwrap();
        unsafe {
            let engine = kflux_engine_new(uid.as_ptr(), config.as_ptr());
            assert!(engine.is_null());
            assert!(!kflux_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_replay() {
        let events = CString::new(
            "{\"at\":\"2024-01-15T14:00:00Z\",\"type\":\"focus_in\"}\n{\"at\":\"2024-01-15T14:00:03Z\",\"type\":\"focus_out\"}\n",
        )
        .unwrap();
        let uid = CString::new("user-ffi").unwrap();
        unsafe {
            let report = kflux_replay(events.as_ptr(), uid.as_ptr());
            assert!(!report.is_null());
            let report_str = CStr::from_ptr(report).to_str().unwrap();
            assert!(report_str.contains("discarded"));
            kflux_free_string(report);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = kflux_version();
            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
