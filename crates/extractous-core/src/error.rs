// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error codes of the native ABI and the unified error type of the binding.

use std::ffi::c_int;
use std::fmt;

use thiserror::Error;

// -- Native error codes --

/// Success. The only code that never produces an error value.
pub const ERR_OK: c_int = 0;
/// A required pointer argument was NULL.
pub const ERR_NULL_POINTER: c_int = -1;
/// A string argument was not valid UTF-8.
pub const ERR_INVALID_UTF8: c_int = -2;
/// String conversion or allocation failed.
pub const ERR_INVALID_STRING: c_int = -3;
/// The engine could not extract the document.
pub const ERR_EXTRACTION_FAILED: c_int = -4;
/// File system or network I/O failed.
pub const ERR_IO_ERROR: c_int = -5;
/// A configuration value was rejected.
pub const ERR_INVALID_CONFIG: c_int = -6;
/// An enumeration constant was out of range.
pub const ERR_INVALID_ENUM: c_int = -7;
/// No parser is available for the document format.
pub const ERR_UNSUPPORTED_FORMAT: c_int = -8;
/// The engine ran out of memory.
pub const ERR_OUT_OF_MEMORY: c_int = -9;
/// OCR processing failed.
pub const ERR_OCR_FAILED: c_int = -10;

/// Classification of a non-zero native error code.
///
/// Every code of the fixed enumeration maps to exactly one kind; codes the
/// binding does not know yet land in [`ErrorKind::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NullArgument,
    InvalidEncoding,
    StringConversion,
    ExtractionFailed,
    Io,
    InvalidConfiguration,
    InvalidEnumValue,
    UnsupportedFormat,
    OutOfMemory,
    OcrFailed,
    /// A code newer than this binding.
    Unknown(c_int),
}

impl ErrorKind {
    /// Classify a native return code. `ERR_OK` yields `None`.
    pub fn from_code(code: c_int) -> Option<Self> {
        let kind = match code {
            ERR_OK => return None,
            ERR_NULL_POINTER => Self::NullArgument,
            ERR_INVALID_UTF8 => Self::InvalidEncoding,
            ERR_INVALID_STRING => Self::StringConversion,
            ERR_EXTRACTION_FAILED => Self::ExtractionFailed,
            ERR_IO_ERROR => Self::Io,
            ERR_INVALID_CONFIG => Self::InvalidConfiguration,
            ERR_INVALID_ENUM => Self::InvalidEnumValue,
            ERR_UNSUPPORTED_FORMAT => Self::UnsupportedFormat,
            ERR_OUT_OF_MEMORY => Self::OutOfMemory,
            ERR_OCR_FAILED => Self::OcrFailed,
            other => Self::Unknown(other),
        };
        Some(kind)
    }

    /// The native code this kind corresponds to.
    pub fn code(self) -> c_int {
        match self {
            Self::NullArgument => ERR_NULL_POINTER,
            Self::InvalidEncoding => ERR_INVALID_UTF8,
            Self::StringConversion => ERR_INVALID_STRING,
            Self::ExtractionFailed => ERR_EXTRACTION_FAILED,
            Self::Io => ERR_IO_ERROR,
            Self::InvalidConfiguration => ERR_INVALID_CONFIG,
            Self::InvalidEnumValue => ERR_INVALID_ENUM,
            Self::UnsupportedFormat => ERR_UNSUPPORTED_FORMAT,
            Self::OutOfMemory => ERR_OUT_OF_MEMORY,
            Self::OcrFailed => ERR_OCR_FAILED,
            Self::Unknown(code) => code,
        }
    }

    /// Coarse grouping for programmatic branching.
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::NullArgument
            | Self::InvalidEncoding
            | Self::StringConversion
            | Self::InvalidConfiguration
            | Self::InvalidEnumValue => ErrorCategory::InvalidArgument,
            Self::Io => ErrorCategory::Io,
            Self::ExtractionFailed | Self::UnsupportedFormat | Self::OcrFailed => {
                ErrorCategory::Extraction
            }
            Self::OutOfMemory => ErrorCategory::Resource,
            Self::Unknown(_) => ErrorCategory::Unknown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullArgument => f.write_str("null argument"),
            Self::InvalidEncoding => f.write_str("invalid encoding"),
            Self::StringConversion => f.write_str("string conversion failed"),
            Self::ExtractionFailed => f.write_str("extraction failed"),
            Self::Io => f.write_str("I/O failure"),
            Self::InvalidConfiguration => f.write_str("invalid configuration"),
            Self::InvalidEnumValue => f.write_str("invalid enum value"),
            Self::UnsupportedFormat => f.write_str("unsupported format"),
            Self::OutOfMemory => f.write_str("out of memory"),
            Self::OcrFailed => f.write_str("OCR failed"),
            Self::Unknown(code) => write!(f, "unknown error code {code}"),
        }
    }
}

/// High-level error grouping, matching the native `extractous_error_category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The caller passed something unusable (null, bad string, bad config).
    InvalidArgument,
    /// File system or network trouble.
    Io,
    /// The document itself could not be processed.
    Extraction,
    /// The engine ran out of a resource.
    Resource,
    Unknown,
}

impl ErrorCategory {
    /// The identifier the native layer uses for this category.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::Io => "io_error",
            Self::Extraction => "extraction_error",
            Self::Resource => "resource_error",
            Self::Unknown => "unknown",
        }
    }
}

/// Top-level error type for all binding operations.
#[derive(Debug, Error)]
pub enum ExtractousError {
    // -- Native engine --
    #[error("{operation} failed: {message} (code {code})")]
    Native {
        operation: &'static str,
        code: c_int,
        kind: ErrorKind,
        message: String,
    },

    #[error("{operation} was rejected by the native engine")]
    HandleRejected { operation: &'static str },

    #[error("{operation} called on a released handle")]
    Released { operation: &'static str },

    #[error("{operation}: string argument contains an interior NUL byte")]
    InteriorNul { operation: &'static str },

    #[error("native engine unavailable: {0}")]
    EngineUnavailable(String),

    // -- Host side --
    #[error("invalid binding configuration: {0}")]
    InvalidConfig(String),

    #[error("pinned extraction thread has stopped")]
    WorkerStopped,

    #[error("pinned extraction job panicked: {0}")]
    JobPanicked(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExtractousError {
    /// Build the error for a non-zero native return code.
    pub fn native(operation: &'static str, code: c_int, message: impl Into<String>) -> Self {
        Self::Native {
            operation,
            code,
            kind: ErrorKind::from_code(code).unwrap_or(ErrorKind::Unknown(code)),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Native { kind, .. } => *kind,
            Self::HandleRejected { .. } | Self::InvalidConfig(_) | Self::Serialization(_) => {
                ErrorKind::InvalidConfiguration
            }
            // An extractor whose thread is gone is as absent as a released one.
            Self::Released { .. } | Self::WorkerStopped => ErrorKind::NullArgument,
            Self::InteriorNul { .. } => ErrorKind::StringConversion,
            Self::EngineUnavailable(_) | Self::Io(_) => ErrorKind::Io,
            Self::JobPanicked(_) => ErrorKind::ExtractionFailed,
        }
    }

    /// The numeric code, as the native layer would report it.
    pub fn code(&self) -> c_int {
        match self {
            Self::Native { code, .. } => *code,
            other => other.kind().code(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind().category()
    }

    /// True for file system and network failures.
    pub fn is_io(&self) -> bool {
        self.category() == ErrorCategory::Io
    }

    /// True when the document content, not the environment, was the problem.
    pub fn is_content(&self) -> bool {
        self.category() == ErrorCategory::Extraction
    }
}

/// Alias used throughout the binding.
pub type Result<T> = std::result::Result<T, ExtractousError>;

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CODES: [c_int; 10] = [
        ERR_NULL_POINTER,
        ERR_INVALID_UTF8,
        ERR_INVALID_STRING,
        ERR_EXTRACTION_FAILED,
        ERR_IO_ERROR,
        ERR_INVALID_CONFIG,
        ERR_INVALID_ENUM,
        ERR_UNSUPPORTED_FORMAT,
        ERR_OUT_OF_MEMORY,
        ERR_OCR_FAILED,
    ];

    #[test]
    fn ok_code_has_no_kind() {
        assert_eq!(ErrorKind::from_code(ERR_OK), None);
    }

    #[test]
    fn every_known_code_round_trips_to_a_distinct_kind() {
        let mut seen = Vec::new();
        for code in ALL_CODES {
            let kind = ErrorKind::from_code(code).expect("non-zero code must classify");
            assert!(!matches!(kind, ErrorKind::Unknown(_)), "code {code} should be known");
            assert_eq!(kind.code(), code);
            assert!(!seen.contains(&kind), "code {code} shares a kind");
            seen.push(kind);
        }
    }

    #[test]
    fn unknown_codes_are_preserved() {
        assert_eq!(ErrorKind::from_code(-42), Some(ErrorKind::Unknown(-42)));
        assert_eq!(ErrorKind::Unknown(-42).code(), -42);
        assert_eq!(ErrorKind::Unknown(-42).category(), ErrorCategory::Unknown);
    }

    #[test]
    fn categories_match_native_grouping() {
        assert_eq!(ErrorKind::Io.category().as_str(), "io_error");
        assert_eq!(ErrorKind::OcrFailed.category().as_str(), "extraction_error");
        assert_eq!(ErrorKind::OutOfMemory.category().as_str(), "resource_error");
        assert_eq!(ErrorKind::InvalidEnumValue.category().as_str(), "invalid_argument");
    }

    #[test]
    fn native_error_exposes_code_and_classification() {
        let err = ExtractousError::native("extract_file", ERR_IO_ERROR, "File system or network I/O error");
        assert_eq!(err.code(), ERR_IO_ERROR);
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.is_io());
        assert!(!err.is_content());
        assert!(err.to_string().contains("code -5"));
    }

    #[test]
    fn host_side_errors_still_classify() {
        let released = ExtractousError::Released { operation: "extract_bytes" };
        assert_eq!(released.code(), ERR_NULL_POINTER);

        let rejected = ExtractousError::HandleRejected { operation: "set_density" };
        assert_eq!(rejected.kind(), ErrorKind::InvalidConfiguration);

        let nul = ExtractousError::InteriorNul { operation: "set_language" };
        assert_eq!(nul.code(), ERR_INVALID_STRING);

        let panicked = ExtractousError::JobPanicked("boom".into());
        assert_eq!(panicked.code(), ERR_EXTRACTION_FAILED);
        assert!(panicked.is_content());
    }
}
