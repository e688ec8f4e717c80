// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared entry point: which native engine to drive, plus the error and
// version queries that are not tied to any handle.

use std::ffi::{CStr, c_char, c_int};
use std::fmt;
use std::sync::Arc;

use extractous_bridge::NativeEngine;
use extractous_core::error::ERR_OK;
use extractous_core::{EngineKind, ExtractousError, Result, messages};

/// Handle-independent access to a native engine.
///
/// Cheap to clone and safe to share between threads. Every resource created
/// through it keeps a clone, so the engine outlives all of its handles.
#[derive(Clone)]
pub struct Engine {
    native: Arc<dyn NativeEngine>,
}

impl Engine {
    /// Engine selected by configuration.
    pub fn new(kind: EngineKind) -> Result<Self> {
        let native = extractous_bridge::native_engine(kind)?;
        tracing::debug!(engine = native.engine_name(), "extraction engine ready");
        Ok(Self { native })
    }

    /// Wrap an engine constructed elsewhere (a tuned `EmulatedEngine`, say).
    pub fn from_native(native: Arc<dyn NativeEngine>) -> Self {
        Self { native }
    }

    pub fn name(&self) -> &str {
        self.native.engine_name()
    }

    /// Version of the FFI layer.
    pub fn ffi_version(&self) -> String {
        static_str(self.native.ffi_version())
    }

    /// Version of the extraction core behind the FFI layer.
    pub fn core_version(&self) -> String {
        static_str(self.native.core_version())
    }

    /// Category identifier the engine reports for a code (`"io_error"`, ...).
    pub fn error_category(&self, code: c_int) -> String {
        static_str(self.native.error_category(code))
    }

    /// Message for a code, falling back to the built-in text when the engine
    /// returns none.
    pub fn error_message(&self, code: c_int) -> String {
        let raw = self.native.error_message(code);
        // SAFETY: `raw` comes straight from `error_message` and is released once.
        unsafe { self.take_string(raw) }.unwrap_or_else(|| messages::describe_code(code).to_string())
    }

    /// Take this thread's detailed report of the last failure: message,
    /// cause chain and debug representation.
    ///
    /// Expensive, and destructive: the stored detail is cleared, so a second
    /// call returns `None`. Any later failure on this thread replaces it, so
    /// fetch it right after the call that failed.
    pub fn take_debug_report(&self) -> Option<String> {
        let raw = self.native.error_get_last_debug();
        // SAFETY: `raw` comes straight from `error_get_last_debug`.
        unsafe { self.take_string(raw) }
    }

    /// Whether a debug report is stored for this thread.
    pub fn has_debug_report(&self) -> bool {
        self.native.error_has_debug() != 0
    }

    /// Drop this thread's stored debug report without formatting it.
    pub fn clear_debug_report(&self) {
        self.native.error_clear_last();
    }

    pub(crate) fn native(&self) -> &dyn NativeEngine {
        &*self.native
    }

    /// Turn a native return code into a `Result`.
    pub(crate) fn check(&self, operation: &'static str, code: c_int) -> Result<()> {
        if code == ERR_OK {
            return Ok(());
        }
        let message = self.error_message(code);
        tracing::debug!(operation, code, %message, "native call failed");
        Err(ExtractousError::native(operation, code, message))
    }

    /// Copy a natively allocated string and release it.
    ///
    /// # Safety
    /// `raw` must be null or a string this engine allocated and the caller owns.
    pub(crate) unsafe fn take_string(&self, raw: *mut c_char) -> Option<String> {
        if raw.is_null() {
            return None;
        }
        // SAFETY: non-null and NUL-terminated per the ABI.
        let text = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        unsafe { self.native.string_free(raw) };
        Some(text)
    }
}

impl Default for Engine {
    /// The linked engine when compiled in, the emulated one otherwise.
    fn default() -> Self {
        Self {
            native: extractous_bridge::default_engine(),
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").field("name", &self.name()).finish()
    }
}

fn static_str(raw: *const c_char) -> String {
    if raw.is_null() {
        return String::new();
    }
    // SAFETY: the ABI returns static NUL-terminated strings here.
    unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use extractous_core::error::{ERR_IO_ERROR, ERR_OUT_OF_MEMORY};

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn versions_are_reported() {
        let engine = Engine::new(EngineKind::Emulated).unwrap();
        assert!(!engine.ffi_version().is_empty());
        assert!(engine.core_version().ends_with("-emulated"));
    }

    #[test]
    fn codes_are_described_and_categorised() {
        let engine = Engine::new(EngineKind::Emulated).unwrap();
        assert_eq!(engine.error_message(ERR_IO_ERROR), "File system or network I/O error");
        assert_eq!(engine.error_category(ERR_OUT_OF_MEMORY), "resource_error");
        assert!(engine.check("noop", ERR_OK).is_ok());

        let err = engine.check("extract_file", ERR_IO_ERROR).unwrap_err();
        assert!(err.is_io());
        assert_eq!(err.code(), ERR_IO_ERROR);
    }

    #[test]
    fn no_report_without_failure() {
        let engine = Engine::new(EngineKind::Emulated).unwrap();
        assert!(!engine.has_debug_report());
        assert!(engine.take_debug_report().is_none());
    }
}
