// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Enumerations and size constants shared with the native ABI.

use std::ffi::c_int;
use std::fmt;

use serde::{Deserialize, Serialize};

// -- Size limits --

/// Buffer size the binding uses for stream reads unless configured otherwise.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;
/// Largest read buffer the configuration accepts (1 MiB).
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;
/// Default cap on extracted string length (100 MiB).
pub const DEFAULT_STRING_MAX_LENGTH: c_int = 100 * 1024 * 1024;

// -- OCR defaults --

pub const DEFAULT_OCR_LANGUAGE: &str = "eng";
pub const DEFAULT_OCR_DENSITY: c_int = 300;
pub const DEFAULT_OCR_DEPTH: c_int = 4;
pub const DEFAULT_OCR_TIMEOUT_SECONDS: c_int = 300;

// -- Raw enum values --

pub const CHARSET_UTF_8: c_int = 0;
pub const CHARSET_US_ASCII: c_int = 1;
pub const CHARSET_UTF_16BE: c_int = 2;

pub const PDF_OCR_NO_OCR: c_int = 0;
pub const PDF_OCR_OCR_ONLY: c_int = 1;
pub const PDF_OCR_OCR_AND_TEXT_EXTRACTION: c_int = 2;
pub const PDF_OCR_AUTO: c_int = 3;

/// Output character set for extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharSet {
    #[default]
    Utf8,
    UsAscii,
    Utf16Be,
}

impl CharSet {
    pub fn as_raw(self) -> c_int {
        match self {
            Self::Utf8 => CHARSET_UTF_8,
            Self::UsAscii => CHARSET_US_ASCII,
            Self::Utf16Be => CHARSET_UTF_16BE,
        }
    }

    pub fn from_raw(raw: c_int) -> Option<Self> {
        match raw {
            CHARSET_UTF_8 => Some(Self::Utf8),
            CHARSET_US_ASCII => Some(Self::UsAscii),
            CHARSET_UTF_16BE => Some(Self::Utf16Be),
            _ => None,
        }
    }

    /// IANA name, as reported in `Content-Encoding` metadata.
    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::UsAscii => "US-ASCII",
            Self::Utf16Be => "UTF-16BE",
        }
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the PDF parser combines OCR with embedded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfOcrStrategy {
    /// Embedded text only.
    #[default]
    NoOcr,
    /// Rasterise every page and OCR it; ignore embedded text.
    OcrOnly,
    /// Embedded text plus OCR of each page.
    OcrAndTextExtraction,
    /// OCR only pages without usable embedded text.
    Auto,
}

impl PdfOcrStrategy {
    pub fn as_raw(self) -> c_int {
        match self {
            Self::NoOcr => PDF_OCR_NO_OCR,
            Self::OcrOnly => PDF_OCR_OCR_ONLY,
            Self::OcrAndTextExtraction => PDF_OCR_OCR_AND_TEXT_EXTRACTION,
            Self::Auto => PDF_OCR_AUTO,
        }
    }

    pub fn from_raw(raw: c_int) -> Option<Self> {
        match raw {
            PDF_OCR_NO_OCR => Some(Self::NoOcr),
            PDF_OCR_OCR_ONLY => Some(Self::OcrOnly),
            PDF_OCR_OCR_AND_TEXT_EXTRACTION => Some(Self::OcrAndTextExtraction),
            PDF_OCR_AUTO => Some(Self::Auto),
            _ => None,
        }
    }
}

impl fmt::Display for PdfOcrStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOcr => write!(f, "No OCR"),
            Self::OcrOnly => write!(f, "OCR only"),
            Self::OcrAndTextExtraction => write!(f, "OCR and text extraction"),
            Self::Auto => write!(f, "Auto"),
        }
    }
}

/// Kinds of native allocation the binding owns at some point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Extractor,
    PdfConfig,
    OfficeConfig,
    OcrConfig,
    StreamReader,
    Metadata,
    /// A natively allocated C string (extracted content).
    String,
    /// A natively allocated byte buffer from a read-all.
    Buffer,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extractor => "extractor",
            Self::PdfConfig => "pdf config",
            Self::OfficeConfig => "office config",
            Self::OcrConfig => "ocr config",
            Self::StreamReader => "stream reader",
            Self::Metadata => "metadata",
            Self::String => "string",
            Self::Buffer => "buffer",
        };
        f.write_str(name)
    }
}
