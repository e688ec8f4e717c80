// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in error descriptions and caller-facing guidance.
//
// The native layer normally supplies the message text. These descriptions
// are the fallback when it returns nothing, and the guidance table turns an
// error into something an application can show to a person.

use std::ffi::c_int;

use crate::error::{ErrorKind, ExtractousError};

/// Description of a native error kind, identical to the engine's own text.
pub fn describe(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NullArgument => "Null pointer provided as argument",
        ErrorKind::InvalidEncoding => "Invalid UTF-8 string encoding",
        ErrorKind::StringConversion => "String conversion or allocation failed",
        ErrorKind::ExtractionFailed => "Document extraction failed",
        ErrorKind::Io => "File system or network I/O error",
        ErrorKind::InvalidConfiguration => "Invalid configuration value",
        ErrorKind::InvalidEnumValue => "Invalid enumeration value",
        ErrorKind::UnsupportedFormat => "Unsupported file format",
        ErrorKind::OutOfMemory => "Memory allocation failed",
        ErrorKind::OcrFailed => "OCR operation failed",
        ErrorKind::Unknown(_) => "Unknown error code",
    }
}

/// Description of a raw return code, including success.
pub fn describe_code(code: c_int) -> &'static str {
    match ErrorKind::from_code(code) {
        None => "Operation completed successfully",
        Some(kind) => describe(kind),
    }
}

/// What a caller can do about an error.
#[derive(Debug, Clone)]
pub struct Guidance {
    /// One-line summary.
    pub message: String,
    /// Suggested next step.
    pub suggestion: String,
    /// Whether repeating the same call may succeed.
    pub retriable: bool,
}

/// Map an error to guidance a person can act on.
pub fn guidance(err: &ExtractousError) -> Guidance {
    match err {
        ExtractousError::Released { operation } => Guidance {
            message: format!("{operation} was called after the resource was released."),
            suggestion: "Create a new extractor or reader; released handles cannot be reused.".into(),
            retriable: false,
        },
        ExtractousError::HandleRejected { operation } => Guidance {
            message: format!("The engine rejected the value passed to {operation}."),
            suggestion: "Check the value is within range (density and depth must be positive).".into(),
            retriable: false,
        },
        ExtractousError::InteriorNul { .. } => Guidance {
            message: "A text argument contains a NUL character.".into(),
            suggestion: "Strip NUL bytes from paths, URLs and language codes.".into(),
            retriable: false,
        },
        ExtractousError::EngineUnavailable(detail) => Guidance {
            message: "The extraction engine is not available.".into(),
            suggestion: format!("Build with the `linked` feature and make libextractous_ffi loadable. ({detail})"),
            retriable: false,
        },
        ExtractousError::InvalidConfig(detail) => Guidance {
            message: "The binding configuration is invalid.".into(),
            suggestion: format!("Fix the configuration file and try again. ({detail})"),
            retriable: false,
        },
        ExtractousError::WorkerStopped => Guidance {
            message: "The extraction thread has stopped.".into(),
            suggestion: "Spawn a new pinned extractor.".into(),
            retriable: false,
        },
        ExtractousError::JobPanicked(detail) => Guidance {
            message: "An extraction job panicked on the pinned thread.".into(),
            suggestion: format!("The extractor is still usable; fix the job that panicked. ({detail})"),
            retriable: false,
        },
        ExtractousError::Serialization(e) => Guidance {
            message: "The configuration could not be parsed.".into(),
            suggestion: format!("Check the JSON syntax. ({e})"),
            retriable: false,
        },
        ExtractousError::Io(e) => Guidance {
            message: "A file could not be read.".into(),
            suggestion: format!("Check the path exists and is readable. ({e})"),
            retriable: true,
        },
        ExtractousError::Native { kind, message, .. } => native_guidance(*kind, message),
    }
}

fn native_guidance(kind: ErrorKind, message: &str) -> Guidance {
    let (suggestion, retriable) = match kind {
        ErrorKind::NullArgument => ("This is a binding bug; report it with the debug report.", false),
        ErrorKind::InvalidEncoding | ErrorKind::StringConversion => {
            ("Pass valid UTF-8 text without NUL characters.", false)
        }
        ErrorKind::ExtractionFailed => ("The document may be corrupt or password protected.", false),
        ErrorKind::Io => ("Check the file exists, is readable, and the network is reachable.", true),
        ErrorKind::InvalidConfiguration | ErrorKind::InvalidEnumValue => {
            ("Check the configuration values are within range.", false)
        }
        ErrorKind::UnsupportedFormat => ("Convert the document to a supported format first.", false),
        ErrorKind::OutOfMemory => ("Lower the maximum string length or use streaming extraction.", true),
        ErrorKind::OcrFailed => {
            ("Make sure Tesseract and the requested language pack are installed, or raise the OCR timeout.", true)
        }
        ErrorKind::Unknown(_) => ("Upgrade the binding to match the native library version.", false),
    };

    let message = if message.is_empty() { describe(kind) } else { message };
    Guidance {
        message: message.to_string(),
        suggestion: suggestion.into(),
        retriable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ERR_OCR_FAILED, ERR_OK};

    #[test]
    fn success_and_unknown_codes_have_descriptions() {
        assert_eq!(describe_code(ERR_OK), "Operation completed successfully");
        assert_eq!(describe_code(-99), "Unknown error code");
        assert_eq!(describe_code(ERR_OCR_FAILED), "OCR operation failed");
    }

    #[test]
    fn io_errors_are_retriable() {
        let err = ExtractousError::native("extract_url", -5, "");
        let g = guidance(&err);
        assert!(g.retriable);
        assert_eq!(g.message, "File system or network I/O error");
    }

    #[test]
    fn released_handle_is_permanent() {
        let g = guidance(&ExtractousError::Released { operation: "extract_file" });
        assert!(!g.retriable);
        assert!(g.message.contains("extract_file"));
    }
}
