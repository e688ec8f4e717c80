// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw types of the native ABI.
//
// The handle types are opaque: zero-sized, unconstructible outside this
// module, and only ever seen behind a raw pointer. One marker per resource
// kind keeps an extractor pointer from being passed where a config is
// expected.

use std::ffi::c_char;
use std::marker::{PhantomData, PhantomPinned};

/// Marker for an opaque native object. Not `Send`, not `Sync`, not `Unpin`.
type Opaque = PhantomData<(*mut u8, PhantomPinned)>;

/// Native extraction engine.
#[repr(C)]
pub struct CExtractor {
    _private: [u8; 0],
    _marker: Opaque,
}

/// PDF parser configuration.
#[repr(C)]
pub struct CPdfParserConfig {
    _private: [u8; 0],
    _marker: Opaque,
}

/// Office (DOCX, XLSX, PPTX, ...) parser configuration.
#[repr(C)]
pub struct COfficeParserConfig {
    _private: [u8; 0],
    _marker: Opaque,
}

/// Tesseract OCR configuration.
#[repr(C)]
pub struct CTesseractOcrConfig {
    _private: [u8; 0],
    _marker: Opaque,
}

/// Pull-based reader over extracted content.
#[repr(C)]
pub struct CStreamReader {
    _private: [u8; 0],
    _marker: Opaque,
}

/// Metadata block returned by every extraction.
///
/// `keys` and `values` are parallel arrays of `len` NUL-terminated strings.
/// Multi-valued fields are joined with `,` on the native side. Both arrays
/// are null when `len` is zero. The whole block, strings included, is owned
/// by the native side and released as a unit.
#[repr(C)]
#[derive(Debug)]
pub struct CMetadata {
    pub keys: *mut *mut c_char,
    pub values: *mut *mut c_char,
    pub len: usize,
}
