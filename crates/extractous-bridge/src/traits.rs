// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trait family mirroring the native C ABI, one trait per resource area.
//
// Every method corresponds to exactly one `extractous_*` symbol. Methods that
// take handles or raw buffers are `unsafe`: the caller promises the pointer
// came from the same engine and has not been consumed.
//
// Ownership rules shared by all implementations:
//
// * A setter consumes its input handle whether it succeeds or not. It returns
//   the new handle, or null on failure.
// * `*_free` on null is a no-op.
// * Out-pointers of an extraction are written only on `ERR_OK`.

use std::ffi::{c_char, c_int};

use crate::abi::{
    CExtractor, CMetadata, COfficeParserConfig, CPdfParserConfig, CStreamReader,
    CTesseractOcrConfig,
};

/// A complete implementation of the native ABI.
///
/// Shared across threads behind an `Arc`. The handles it hands out are not.
pub trait NativeEngine:
    PdfConfigAbi + OfficeConfigAbi + OcrConfigAbi + ExtractorAbi + StreamAbi + MemoryAbi + ErrorAbi + Send + Sync
{
    /// Short implementation name for logs ("linked", "emulated").
    fn engine_name(&self) -> &str;

    /// `extractous_ffi_version`: static NUL-terminated string.
    fn ffi_version(&self) -> *const c_char;

    /// `extractous_core_version`: static NUL-terminated string.
    fn core_version(&self) -> *const c_char;
}

pub trait PdfConfigAbi {
    fn pdf_config_new(&self) -> *mut CPdfParserConfig;

    /// # Safety
    /// `handle` must be null or a live handle of this engine; it is consumed.
    unsafe fn pdf_config_set_ocr_strategy(
        &self,
        handle: *mut CPdfParserConfig,
        strategy: c_int,
    ) -> *mut CPdfParserConfig;

    /// # Safety
    /// As [`PdfConfigAbi::pdf_config_set_ocr_strategy`].
    unsafe fn pdf_config_set_extract_inline_images(
        &self,
        handle: *mut CPdfParserConfig,
        value: bool,
    ) -> *mut CPdfParserConfig;

    /// # Safety
    /// As [`PdfConfigAbi::pdf_config_set_ocr_strategy`].
    unsafe fn pdf_config_set_extract_unique_inline_images_only(
        &self,
        handle: *mut CPdfParserConfig,
        value: bool,
    ) -> *mut CPdfParserConfig;

    /// # Safety
    /// As [`PdfConfigAbi::pdf_config_set_ocr_strategy`].
    unsafe fn pdf_config_set_extract_marked_content(
        &self,
        handle: *mut CPdfParserConfig,
        value: bool,
    ) -> *mut CPdfParserConfig;

    /// # Safety
    /// As [`PdfConfigAbi::pdf_config_set_ocr_strategy`].
    unsafe fn pdf_config_set_extract_annotation_text(
        &self,
        handle: *mut CPdfParserConfig,
        value: bool,
    ) -> *mut CPdfParserConfig;

    /// # Safety
    /// `handle` must be null or a live handle of this engine.
    unsafe fn pdf_config_free(&self, handle: *mut CPdfParserConfig);
}

pub trait OfficeConfigAbi {
    fn office_config_new(&self) -> *mut COfficeParserConfig;

    /// # Safety
    /// `handle` must be null or a live handle of this engine; it is consumed.
    unsafe fn office_config_set_extract_macros(
        &self,
        handle: *mut COfficeParserConfig,
        value: bool,
    ) -> *mut COfficeParserConfig;

    /// # Safety
    /// As [`OfficeConfigAbi::office_config_set_extract_macros`].
    unsafe fn office_config_set_include_deleted_content(
        &self,
        handle: *mut COfficeParserConfig,
        value: bool,
    ) -> *mut COfficeParserConfig;

    /// # Safety
    /// As [`OfficeConfigAbi::office_config_set_extract_macros`].
    unsafe fn office_config_set_include_move_from_content(
        &self,
        handle: *mut COfficeParserConfig,
        value: bool,
    ) -> *mut COfficeParserConfig;

    /// # Safety
    /// As [`OfficeConfigAbi::office_config_set_extract_macros`].
    unsafe fn office_config_set_include_shape_based_content(
        &self,
        handle: *mut COfficeParserConfig,
        value: bool,
    ) -> *mut COfficeParserConfig;

    /// # Safety
    /// `handle` must be null or a live handle of this engine.
    unsafe fn office_config_free(&self, handle: *mut COfficeParserConfig);
}

pub trait OcrConfigAbi {
    fn ocr_config_new(&self) -> *mut CTesseractOcrConfig;

    /// # Safety
    /// `handle` must be null or a live handle of this engine; it is consumed.
    /// `language` must be null or a valid NUL-terminated string.
    unsafe fn ocr_config_set_language(
        &self,
        handle: *mut CTesseractOcrConfig,
        language: *const c_char,
    ) -> *mut CTesseractOcrConfig;

    /// # Safety
    /// `handle` must be null or a live handle of this engine; it is consumed.
    unsafe fn ocr_config_set_density(
        &self,
        handle: *mut CTesseractOcrConfig,
        density: c_int,
    ) -> *mut CTesseractOcrConfig;

    /// # Safety
    /// As [`OcrConfigAbi::ocr_config_set_density`].
    unsafe fn ocr_config_set_depth(
        &self,
        handle: *mut CTesseractOcrConfig,
        depth: c_int,
    ) -> *mut CTesseractOcrConfig;

    /// # Safety
    /// As [`OcrConfigAbi::ocr_config_set_density`].
    unsafe fn ocr_config_set_enable_image_preprocessing(
        &self,
        handle: *mut CTesseractOcrConfig,
        value: bool,
    ) -> *mut CTesseractOcrConfig;

    /// # Safety
    /// As [`OcrConfigAbi::ocr_config_set_density`].
    unsafe fn ocr_config_set_timeout_seconds(
        &self,
        handle: *mut CTesseractOcrConfig,
        seconds: c_int,
    ) -> *mut CTesseractOcrConfig;

    /// # Safety
    /// `handle` must be null or a live handle of this engine.
    unsafe fn ocr_config_free(&self, handle: *mut CTesseractOcrConfig);
}

pub trait ExtractorAbi {
    fn extractor_new(&self) -> *mut CExtractor;

    /// # Safety
    /// `handle` must be null or a live handle of this engine.
    unsafe fn extractor_free(&self, handle: *mut CExtractor);

    /// # Safety
    /// `handle` must be null or a live handle of this engine; it is consumed.
    unsafe fn extractor_set_extract_string_max_length(
        &self,
        handle: *mut CExtractor,
        max_length: c_int,
    ) -> *mut CExtractor;

    /// # Safety
    /// As [`ExtractorAbi::extractor_set_extract_string_max_length`].
    unsafe fn extractor_set_encoding(&self, handle: *mut CExtractor, encoding: c_int) -> *mut CExtractor;

    /// # Safety
    /// Both handles must be null or live handles of this engine. Both are consumed.
    unsafe fn extractor_set_pdf_config(
        &self,
        handle: *mut CExtractor,
        config: *mut CPdfParserConfig,
    ) -> *mut CExtractor;

    /// # Safety
    /// As [`ExtractorAbi::extractor_set_pdf_config`].
    unsafe fn extractor_set_office_config(
        &self,
        handle: *mut CExtractor,
        config: *mut COfficeParserConfig,
    ) -> *mut CExtractor;

    /// # Safety
    /// As [`ExtractorAbi::extractor_set_pdf_config`].
    unsafe fn extractor_set_ocr_config(
        &self,
        handle: *mut CExtractor,
        config: *mut CTesseractOcrConfig,
    ) -> *mut CExtractor;

    /// # Safety
    /// As [`ExtractorAbi::extractor_set_extract_string_max_length`].
    unsafe fn extractor_set_xml_output(&self, handle: *mut CExtractor, xml_output: bool) -> *mut CExtractor;

    /// # Safety
    /// `handle` must be a live extractor (not consumed). `path` must be a
    /// NUL-terminated string. Out-pointers must be writable.
    unsafe fn extract_file_to_string(
        &self,
        handle: *mut CExtractor,
        path: *const c_char,
        out_content: *mut *mut c_char,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int;

    /// # Safety
    /// As [`ExtractorAbi::extract_file_to_string`].
    unsafe fn extract_file(
        &self,
        handle: *mut CExtractor,
        path: *const c_char,
        out_reader: *mut *mut CStreamReader,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int;

    /// # Safety
    /// `data` must be valid for `data_len` bytes for the duration of the call.
    /// Other requirements as [`ExtractorAbi::extract_file_to_string`].
    unsafe fn extract_bytes_to_string(
        &self,
        handle: *mut CExtractor,
        data: *const u8,
        data_len: usize,
        out_content: *mut *mut c_char,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int;

    /// # Safety
    /// As [`ExtractorAbi::extract_bytes_to_string`].
    unsafe fn extract_bytes(
        &self,
        handle: *mut CExtractor,
        data: *const u8,
        data_len: usize,
        out_reader: *mut *mut CStreamReader,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int;

    /// # Safety
    /// As [`ExtractorAbi::extract_file_to_string`], with `url` in place of `path`.
    unsafe fn extract_url_to_string(
        &self,
        handle: *mut CExtractor,
        url: *const c_char,
        out_content: *mut *mut c_char,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int;

    /// # Safety
    /// As [`ExtractorAbi::extract_url_to_string`].
    unsafe fn extract_url(
        &self,
        handle: *mut CExtractor,
        url: *const c_char,
        out_reader: *mut *mut CStreamReader,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int;
}

pub trait StreamAbi {
    /// Read at most `buffer_size` bytes. `*bytes_read == 0` with `ERR_OK`
    /// means end of stream.
    ///
    /// # Safety
    /// `handle` must be a live reader; `buffer` valid for `buffer_size` bytes.
    unsafe fn stream_read(
        &self,
        handle: *mut CStreamReader,
        buffer: *mut u8,
        buffer_size: usize,
        bytes_read: *mut usize,
    ) -> c_int;

    /// Fill the buffer completely unless the stream ends first.
    ///
    /// # Safety
    /// As [`StreamAbi::stream_read`].
    unsafe fn stream_read_exact(
        &self,
        handle: *mut CStreamReader,
        buffer: *mut u8,
        buffer_size: usize,
        bytes_read: *mut usize,
    ) -> c_int;

    /// Drain the stream into a native buffer, released with
    /// [`MemoryAbi::buffer_free`].
    ///
    /// # Safety
    /// `handle` must be a live reader; out-pointers must be writable.
    unsafe fn stream_read_all(
        &self,
        handle: *mut CStreamReader,
        out_buffer: *mut *mut u8,
        out_size: *mut usize,
    ) -> c_int;

    /// # Safety
    /// `handle` must be null or a live reader of this engine.
    unsafe fn stream_free(&self, handle: *mut CStreamReader);
}

/// Release of memory the engine hands back to the caller.
pub trait MemoryAbi {
    /// # Safety
    /// `s` must be null or a string allocated by this engine.
    unsafe fn string_free(&self, s: *mut c_char);

    /// # Safety
    /// `metadata` must be null or a block allocated by this engine.
    unsafe fn metadata_free(&self, metadata: *mut CMetadata);

    /// # Safety
    /// `buffer`/`size` must be null/0 or exactly what `stream_read_all` returned.
    unsafe fn buffer_free(&self, buffer: *mut u8, size: usize);
}

pub trait ErrorAbi {
    /// Message for a code; release with [`MemoryAbi::string_free`]. May be null.
    fn error_message(&self, code: c_int) -> *mut c_char;

    /// Static category identifier ("io_error", ...).
    fn error_category(&self, code: c_int) -> *const c_char;

    /// Take this thread's debug report; release with [`MemoryAbi::string_free`].
    /// Null when nothing is stored. Clears the stored detail.
    fn error_get_last_debug(&self) -> *mut c_char;

    /// 1 when a debug report is stored for this thread, else 0.
    fn error_has_debug(&self) -> c_int;

    fn error_clear_last(&self);
}
