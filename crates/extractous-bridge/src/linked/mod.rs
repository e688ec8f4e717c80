// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine backed by the prebuilt `libextractous_ffi` shared library.
//
// Requires the `linked` feature and the library on the linker search path
// (and, at run time, the bundled JDK/GraalVM runtime it loads). Every method
// forwards to the symbol of the same name; no state is kept on this side.

#![cfg(feature = "linked")]

use std::ffi::{c_char, c_int};

use crate::abi::*;
use crate::traits::*;

// ---------------------------------------------------------------------------
// libextractous_ffi symbols
// ---------------------------------------------------------------------------

#[link(name = "extractous_ffi")]
unsafe extern "C" {
    fn extractous_ffi_version() -> *const c_char;
    fn extractous_core_version() -> *const c_char;

    fn extractous_pdf_config_new() -> *mut CPdfParserConfig;
    fn extractous_pdf_config_set_ocr_strategy(h: *mut CPdfParserConfig, strategy: c_int) -> *mut CPdfParserConfig;
    fn extractous_pdf_config_set_extract_inline_images(h: *mut CPdfParserConfig, value: bool) -> *mut CPdfParserConfig;
    fn extractous_pdf_config_set_extract_unique_inline_images_only(
        h: *mut CPdfParserConfig,
        value: bool,
    ) -> *mut CPdfParserConfig;
    fn extractous_pdf_config_set_extract_marked_content(h: *mut CPdfParserConfig, value: bool) -> *mut CPdfParserConfig;
    fn extractous_pdf_config_set_extract_annotation_text(h: *mut CPdfParserConfig, value: bool) -> *mut CPdfParserConfig;
    fn extractous_pdf_config_free(h: *mut CPdfParserConfig);

    fn extractous_office_config_new() -> *mut COfficeParserConfig;
    fn extractous_office_config_set_extract_macros(h: *mut COfficeParserConfig, value: bool) -> *mut COfficeParserConfig;
    fn extractous_office_config_set_include_deleted_content(
        h: *mut COfficeParserConfig,
        value: bool,
    ) -> *mut COfficeParserConfig;
    fn extractous_office_config_set_include_move_from_content(
        h: *mut COfficeParserConfig,
        value: bool,
    ) -> *mut COfficeParserConfig;
    fn extractous_office_config_set_include_shape_based_content(
        h: *mut COfficeParserConfig,
        value: bool,
    ) -> *mut COfficeParserConfig;
    fn extractous_office_config_free(h: *mut COfficeParserConfig);

    fn extractous_ocr_config_new() -> *mut CTesseractOcrConfig;
    fn extractous_ocr_config_set_language(h: *mut CTesseractOcrConfig, language: *const c_char) -> *mut CTesseractOcrConfig;
    fn extractous_ocr_config_set_density(h: *mut CTesseractOcrConfig, density: c_int) -> *mut CTesseractOcrConfig;
    fn extractous_ocr_config_set_depth(h: *mut CTesseractOcrConfig, depth: c_int) -> *mut CTesseractOcrConfig;
    fn extractous_ocr_config_set_enable_image_preprocessing(
        h: *mut CTesseractOcrConfig,
        value: bool,
    ) -> *mut CTesseractOcrConfig;
    fn extractous_ocr_config_set_timeout_seconds(h: *mut CTesseractOcrConfig, seconds: c_int) -> *mut CTesseractOcrConfig;
    fn extractous_ocr_config_free(h: *mut CTesseractOcrConfig);

    fn extractous_extractor_new() -> *mut CExtractor;
    fn extractous_extractor_free(h: *mut CExtractor);
    fn extractous_extractor_set_extract_string_max_length(h: *mut CExtractor, max_length: c_int) -> *mut CExtractor;
    fn extractous_extractor_set_encoding(h: *mut CExtractor, encoding: c_int) -> *mut CExtractor;
    fn extractous_extractor_set_pdf_config(h: *mut CExtractor, config: *mut CPdfParserConfig) -> *mut CExtractor;
    fn extractous_extractor_set_office_config(h: *mut CExtractor, config: *mut COfficeParserConfig) -> *mut CExtractor;
    fn extractous_extractor_set_ocr_config(h: *mut CExtractor, config: *mut CTesseractOcrConfig) -> *mut CExtractor;
    fn extractous_extractor_set_xml_output(h: *mut CExtractor, xml_output: bool) -> *mut CExtractor;

    fn extractous_extractor_extract_file_to_string(
        h: *mut CExtractor,
        path: *const c_char,
        out_content: *mut *mut c_char,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int;
    fn extractous_extractor_extract_file(
        h: *mut CExtractor,
        path: *const c_char,
        out_reader: *mut *mut CStreamReader,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int;
    fn extractous_extractor_extract_bytes_to_string(
        h: *mut CExtractor,
        data: *const u8,
        data_len: usize,
        out_content: *mut *mut c_char,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int;
    fn extractous_extractor_extract_bytes(
        h: *mut CExtractor,
        data: *const u8,
        data_len: usize,
        out_reader: *mut *mut CStreamReader,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int;
    fn extractous_extractor_extract_url_to_string(
        h: *mut CExtractor,
        url: *const c_char,
        out_content: *mut *mut c_char,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int;
    fn extractous_extractor_extract_url(
        h: *mut CExtractor,
        url: *const c_char,
        out_reader: *mut *mut CStreamReader,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int;

    fn extractous_string_free(s: *mut c_char);
    fn extractous_metadata_free(metadata: *mut CMetadata);
    fn extractous_buffer_free(buffer: *mut u8, size: usize);

    fn extractous_stream_read(h: *mut CStreamReader, buffer: *mut u8, buffer_size: usize, bytes_read: *mut usize) -> c_int;
    fn extractous_stream_read_exact(
        h: *mut CStreamReader,
        buffer: *mut u8,
        buffer_size: usize,
        bytes_read: *mut usize,
    ) -> c_int;
    fn extractous_stream_read_all(h: *mut CStreamReader, out_buffer: *mut *mut u8, out_size: *mut usize) -> c_int;
    fn extractous_stream_free(h: *mut CStreamReader);

    fn extractous_error_message(code: c_int) -> *mut c_char;
    fn extractous_error_category(code: c_int) -> *const c_char;
    fn extractous_error_get_last_debug() -> *mut c_char;
    fn extractous_error_has_debug() -> c_int;
    fn extractous_error_clear_last();
}

/// The real engine. Stateless; every instance drives the same library.
pub struct LinkedEngine;

impl LinkedEngine {
    pub fn new() -> Self {
        tracing::debug!("using linked libextractous_ffi");
        Self
    }
}

impl Default for LinkedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeEngine for LinkedEngine {
    fn engine_name(&self) -> &str {
        "linked"
    }

    fn ffi_version(&self) -> *const c_char {
        unsafe { extractous_ffi_version() }
    }

    fn core_version(&self) -> *const c_char {
        unsafe { extractous_core_version() }
    }
}

// SAFETY (all impls below): each method forwards its arguments unchanged to
// the symbol of the same name, so the caller's obligations are exactly those
// of the C function.

impl PdfConfigAbi for LinkedEngine {
    fn pdf_config_new(&self) -> *mut CPdfParserConfig {
        unsafe { extractous_pdf_config_new() }
    }

    unsafe fn pdf_config_set_ocr_strategy(&self, h: *mut CPdfParserConfig, strategy: c_int) -> *mut CPdfParserConfig {
        unsafe { extractous_pdf_config_set_ocr_strategy(h, strategy) }
    }

    unsafe fn pdf_config_set_extract_inline_images(&self, h: *mut CPdfParserConfig, value: bool) -> *mut CPdfParserConfig {
        unsafe { extractous_pdf_config_set_extract_inline_images(h, value) }
    }

    unsafe fn pdf_config_set_extract_unique_inline_images_only(
        &self,
        h: *mut CPdfParserConfig,
        value: bool,
    ) -> *mut CPdfParserConfig {
        unsafe { extractous_pdf_config_set_extract_unique_inline_images_only(h, value) }
    }

    unsafe fn pdf_config_set_extract_marked_content(&self, h: *mut CPdfParserConfig, value: bool) -> *mut CPdfParserConfig {
        unsafe { extractous_pdf_config_set_extract_marked_content(h, value) }
    }

    unsafe fn pdf_config_set_extract_annotation_text(&self, h: *mut CPdfParserConfig, value: bool) -> *mut CPdfParserConfig {
        unsafe { extractous_pdf_config_set_extract_annotation_text(h, value) }
    }

    unsafe fn pdf_config_free(&self, h: *mut CPdfParserConfig) {
        unsafe { extractous_pdf_config_free(h) }
    }
}

impl OfficeConfigAbi for LinkedEngine {
    fn office_config_new(&self) -> *mut COfficeParserConfig {
        unsafe { extractous_office_config_new() }
    }

    unsafe fn office_config_set_extract_macros(&self, h: *mut COfficeParserConfig, value: bool) -> *mut COfficeParserConfig {
        unsafe { extractous_office_config_set_extract_macros(h, value) }
    }

    unsafe fn office_config_set_include_deleted_content(
        &self,
        h: *mut COfficeParserConfig,
        value: bool,
    ) -> *mut COfficeParserConfig {
        unsafe { extractous_office_config_set_include_deleted_content(h, value) }
    }

    unsafe fn office_config_set_include_move_from_content(
        &self,
        h: *mut COfficeParserConfig,
        value: bool,
    ) -> *mut COfficeParserConfig {
        unsafe { extractous_office_config_set_include_move_from_content(h, value) }
    }

    unsafe fn office_config_set_include_shape_based_content(
        &self,
        h: *mut COfficeParserConfig,
        value: bool,
    ) -> *mut COfficeParserConfig {
        unsafe { extractous_office_config_set_include_shape_based_content(h, value) }
    }

    unsafe fn office_config_free(&self, h: *mut COfficeParserConfig) {
        unsafe { extractous_office_config_free(h) }
    }
}

impl OcrConfigAbi for LinkedEngine {
    fn ocr_config_new(&self) -> *mut CTesseractOcrConfig {
        unsafe { extractous_ocr_config_new() }
    }

    unsafe fn ocr_config_set_language(&self, h: *mut CTesseractOcrConfig, language: *const c_char) -> *mut CTesseractOcrConfig {
        unsafe { extractous_ocr_config_set_language(h, language) }
    }

    unsafe fn ocr_config_set_density(&self, h: *mut CTesseractOcrConfig, density: c_int) -> *mut CTesseractOcrConfig {
        unsafe { extractous_ocr_config_set_density(h, density) }
    }

    unsafe fn ocr_config_set_depth(&self, h: *mut CTesseractOcrConfig, depth: c_int) -> *mut CTesseractOcrConfig {
        unsafe { extractous_ocr_config_set_depth(h, depth) }
    }

    unsafe fn ocr_config_set_enable_image_preprocessing(
        &self,
        h: *mut CTesseractOcrConfig,
        value: bool,
    ) -> *mut CTesseractOcrConfig {
        unsafe { extractous_ocr_config_set_enable_image_preprocessing(h, value) }
    }

    unsafe fn ocr_config_set_timeout_seconds(&self, h: *mut CTesseractOcrConfig, seconds: c_int) -> *mut CTesseractOcrConfig {
        unsafe { extractous_ocr_config_set_timeout_seconds(h, seconds) }
    }

    unsafe fn ocr_config_free(&self, h: *mut CTesseractOcrConfig) {
        unsafe { extractous_ocr_config_free(h) }
    }
}

impl ExtractorAbi for LinkedEngine {
    fn extractor_new(&self) -> *mut CExtractor {
        unsafe { extractous_extractor_new() }
    }

    unsafe fn extractor_free(&self, h: *mut CExtractor) {
        unsafe { extractous_extractor_free(h) }
    }

    unsafe fn extractor_set_extract_string_max_length(&self, h: *mut CExtractor, max_length: c_int) -> *mut CExtractor {
        unsafe { extractous_extractor_set_extract_string_max_length(h, max_length) }
    }

    unsafe fn extractor_set_encoding(&self, h: *mut CExtractor, encoding: c_int) -> *mut CExtractor {
        unsafe { extractous_extractor_set_encoding(h, encoding) }
    }

    unsafe fn extractor_set_pdf_config(&self, h: *mut CExtractor, config: *mut CPdfParserConfig) -> *mut CExtractor {
        unsafe { extractous_extractor_set_pdf_config(h, config) }
    }

    unsafe fn extractor_set_office_config(&self, h: *mut CExtractor, config: *mut COfficeParserConfig) -> *mut CExtractor {
        unsafe { extractous_extractor_set_office_config(h, config) }
    }

    unsafe fn extractor_set_ocr_config(&self, h: *mut CExtractor, config: *mut CTesseractOcrConfig) -> *mut CExtractor {
        unsafe { extractous_extractor_set_ocr_config(h, config) }
    }

    unsafe fn extractor_set_xml_output(&self, h: *mut CExtractor, xml_output: bool) -> *mut CExtractor {
        unsafe { extractous_extractor_set_xml_output(h, xml_output) }
    }

    unsafe fn extract_file_to_string(
        &self,
        h: *mut CExtractor,
        path: *const c_char,
        out_content: *mut *mut c_char,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int {
        unsafe { extractous_extractor_extract_file_to_string(h, path, out_content, out_metadata) }
    }

    unsafe fn extract_file(
        &self,
        h: *mut CExtractor,
        path: *const c_char,
        out_reader: *mut *mut CStreamReader,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int {
        unsafe { extractous_extractor_extract_file(h, path, out_reader, out_metadata) }
    }

    unsafe fn extract_bytes_to_string(
        &self,
        h: *mut CExtractor,
        data: *const u8,
        data_len: usize,
        out_content: *mut *mut c_char,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int {
        unsafe { extractous_extractor_extract_bytes_to_string(h, data, data_len, out_content, out_metadata) }
    }

    unsafe fn extract_bytes(
        &self,
        h: *mut CExtractor,
        data: *const u8,
        data_len: usize,
        out_reader: *mut *mut CStreamReader,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int {
        unsafe { extractous_extractor_extract_bytes(h, data, data_len, out_reader, out_metadata) }
    }

    unsafe fn extract_url_to_string(
        &self,
        h: *mut CExtractor,
        url: *const c_char,
        out_content: *mut *mut c_char,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int {
        unsafe { extractous_extractor_extract_url_to_string(h, url, out_content, out_metadata) }
    }

    unsafe fn extract_url(
        &self,
        h: *mut CExtractor,
        url: *const c_char,
        out_reader: *mut *mut CStreamReader,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int {
        unsafe { extractous_extractor_extract_url(h, url, out_reader, out_metadata) }
    }
}

impl StreamAbi for LinkedEngine {
    unsafe fn stream_read(&self, h: *mut CStreamReader, buffer: *mut u8, buffer_size: usize, bytes_read: *mut usize) -> c_int {
        unsafe { extractous_stream_read(h, buffer, buffer_size, bytes_read) }
    }

    unsafe fn stream_read_exact(
        &self,
        h: *mut CStreamReader,
        buffer: *mut u8,
        buffer_size: usize,
        bytes_read: *mut usize,
    ) -> c_int {
        unsafe { extractous_stream_read_exact(h, buffer, buffer_size, bytes_read) }
    }

    unsafe fn stream_read_all(&self, h: *mut CStreamReader, out_buffer: *mut *mut u8, out_size: *mut usize) -> c_int {
        unsafe { extractous_stream_read_all(h, out_buffer, out_size) }
    }

    unsafe fn stream_free(&self, h: *mut CStreamReader) {
        unsafe { extractous_stream_free(h) }
    }
}

impl MemoryAbi for LinkedEngine {
    unsafe fn string_free(&self, s: *mut c_char) {
        unsafe { extractous_string_free(s) }
    }

    unsafe fn metadata_free(&self, metadata: *mut CMetadata) {
        unsafe { extractous_metadata_free(metadata) }
    }

    unsafe fn buffer_free(&self, buffer: *mut u8, size: usize) {
        unsafe { extractous_buffer_free(buffer, size) }
    }
}

impl ErrorAbi for LinkedEngine {
    fn error_message(&self, code: c_int) -> *mut c_char {
        unsafe { extractous_error_message(code) }
    }

    fn error_category(&self, code: c_int) -> *const c_char {
        unsafe { extractous_error_category(code) }
    }

    fn error_get_last_debug(&self) -> *mut c_char {
        unsafe { extractous_error_get_last_debug() }
    }

    fn error_has_debug(&self) -> c_int {
        unsafe { extractous_error_has_debug() }
    }

    fn error_clear_last(&self) {
        unsafe { extractous_error_clear_last() }
    }
}
