// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Failures raised inside the emulated engine and the per-thread slot that
// keeps the most recent one for the debug report.

use std::cell::RefCell;
use std::error::Error as _;
use std::ffi::c_int;
use std::fmt::Write as _;
use std::io;

use extractous_core::error::{
    ERR_EXTRACTION_FAILED, ERR_INVALID_CONFIG, ERR_INVALID_ENUM, ERR_INVALID_STRING,
    ERR_INVALID_UTF8, ERR_IO_ERROR, ERR_NULL_POINTER, ERR_OCR_FAILED, ERR_UNSUPPORTED_FORMAT,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum Fault {
    #[error("{operation}: null or released handle")]
    Handle { operation: &'static str },

    #[error("{operation}: argument is not valid UTF-8")]
    Utf8 {
        operation: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("{operation}: {detail}")]
    Config { operation: &'static str, detail: String },

    #[error("{operation}: {value} is not a valid enumeration value")]
    Enum { operation: &'static str, value: c_int },

    #[error("cannot read {path}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("no parser for {mime}")]
    Unsupported { mime: &'static str },

    #[error("OCR of {mime} with language {language} failed")]
    Ocr {
        mime: &'static str,
        language: String,
        #[source]
        source: io::Error,
    },

    #[error("extracted content contains a NUL byte")]
    Nul,

    #[error("stream read failed at byte {offset}")]
    Stream {
        offset: usize,
        #[source]
        source: io::Error,
    },

    #[error("cannot open {mime} container")]
    Container { mime: &'static str },
}

impl Fault {
    pub(crate) fn code(&self) -> c_int {
        match self {
            Self::Handle { .. } => ERR_NULL_POINTER,
            Self::Utf8 { .. } => ERR_INVALID_UTF8,
            Self::Config { .. } => ERR_INVALID_CONFIG,
            Self::Enum { .. } => ERR_INVALID_ENUM,
            Self::Open { .. } | Self::Fetch { .. } | Self::Stream { .. } => ERR_IO_ERROR,
            Self::Unsupported { .. } => ERR_UNSUPPORTED_FORMAT,
            Self::Ocr { .. } => ERR_OCR_FAILED,
            Self::Nul => ERR_INVALID_STRING,
            Self::Container { .. } => ERR_EXTRACTION_FAILED,
        }
    }
}

thread_local! {
    static LAST_FAULT: RefCell<Option<Fault>> = const { RefCell::new(None) };
}

/// Store `fault` as this thread's last error and return its code.
pub(crate) fn record(fault: Fault) -> c_int {
    let code = fault.code();
    tracing::debug!(code, error = %fault, "emulated engine failure");
    LAST_FAULT.with(|slot| *slot.borrow_mut() = Some(fault));
    code
}

pub(crate) fn is_stored() -> bool {
    LAST_FAULT.with(|slot| slot.borrow().is_some())
}

pub(crate) fn clear() {
    LAST_FAULT.with(|slot| *slot.borrow_mut() = None);
}

/// Take the stored fault and render the full report: message, cause chain,
/// then the debug representation.
pub(crate) fn take_report() -> Option<String> {
    let fault = LAST_FAULT.with(|slot| slot.borrow_mut().take())?;

    let mut report = format!("Error: {fault}\n");
    let mut source = fault.source();
    let mut level = 0;
    while let Some(cause) = source {
        let _ = write!(report, "\nCaused by:\n  {level}: {cause}");
        source = cause.source();
        level += 1;
    }
    let _ = write!(report, "\n\nDebug representation:\n{fault:?}");
    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_taken_once() {
        record(Fault::Open {
            path: "/missing.txt".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        });
        assert!(is_stored());

        let report = take_report().unwrap();
        assert!(report.starts_with("Error: cannot read /missing.txt\n"));
        assert!(report.contains("Caused by:\n  0: No such file or directory"));
        assert!(report.contains("Debug representation:"));

        assert!(!is_stored());
        assert!(take_report().is_none());
    }

    #[test]
    fn later_failures_overwrite_earlier_ones() {
        record(Fault::Container { mime: "application/zip" });
        record(Fault::Unsupported { mime: "application/pdf" });
        let report = take_report().unwrap();
        assert!(report.contains("application/pdf"));
        clear();
    }
}
