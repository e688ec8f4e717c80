// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process implementation of the native ABI.
//
// Used on CI, in tests, and whenever the `linked` feature is off. Handles are
// real heap allocations with the same ownership rules as the native library:
// setters consume their input and return a fresh allocation, extraction
// results are owned by the caller until released through the matching free
// call. Unlike the native library it never trusts a pointer it did not hand
// out; see `ledger`.

mod document;
mod fault;
mod ledger;

use std::ffi::{CStr, CString, c_char, c_int};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use extractous_core::error::ERR_OK;
use extractous_core::{
    CharSet, ExtractorSettings, OcrSettings, OfficeSettings, PdfOcrStrategy, PdfSettings, ResourceKind,
};

use crate::abi::*;
use crate::traits::*;

use self::document::{Document, Source};
use self::fault::Fault;
use self::ledger::Ledger;

const FFI_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
const CORE_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-emulated\0");

/// Extractor state behind a `CExtractor` handle.
#[derive(Debug, Clone, Default)]
struct ExtractorState {
    settings: ExtractorSettings,
}

/// Reader state behind a `CStreamReader` handle.
#[derive(Debug)]
struct StreamState {
    data: Vec<u8>,
    pos: usize,
    max_chunk: Option<usize>,
    fail_after: Option<usize>,
}

impl StreamState {
    /// One read of at most `buf.len()` bytes, honouring the chunk limit and
    /// the injected fault.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, Fault> {
        let remaining = self.data.len() - self.pos;
        let mut n = buf.len().min(remaining);
        if let Some(max) = self.max_chunk {
            n = n.min(max);
        }
        if let Some(limit) = self.fail_after {
            if remaining > 0 && self.pos >= limit {
                return Err(Fault::Stream {
                    offset: self.pos,
                    source: std::io::Error::other("injected read fault"),
                });
            }
            n = n.min(limit.saturating_sub(self.pos));
        }
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// The emulated engine.
///
/// All bookkeeping is shared behind a mutex, so one engine can serve several
/// threads. Each handle still belongs to the thread that uses it.
#[derive(Debug, Default)]
pub struct EmulatedEngine {
    ledger: Mutex<Ledger>,
    calls: AtomicUsize,
    max_read_chunk: Option<usize>,
    fail_reads_after: Option<usize>,
}

impl EmulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap every native read at `bytes`, forcing short reads.
    pub fn with_max_read_chunk(mut self, bytes: usize) -> Self {
        self.max_read_chunk = Some(bytes.max(1));
        self
    }

    /// Make stream reads fail with an I/O error once `bytes` have been
    /// delivered (and more remain).
    pub fn with_read_fault_after(mut self, bytes: usize) -> Self {
        self.fail_reads_after = Some(bytes);
        self
    }

    /// Live allocations of one kind.
    pub fn live(&self, kind: ResourceKind) -> usize {
        self.ledger().live(kind)
    }

    /// Live allocations of every kind.
    pub fn live_total(&self) -> usize {
        self.ledger().live_total()
    }

    /// Frees of pointers that were not live (double free, wrong kind, foreign).
    pub fn invalid_releases(&self) -> usize {
        self.ledger().invalid_releases()
    }

    /// Non-free calls that were handed a pointer that was not live.
    pub fn stale_uses(&self) -> usize {
        self.ledger().stale_uses()
    }

    /// Number of ABI calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    // -- bookkeeping --

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    fn alloc<T>(&self, kind: ResourceKind, value: T) -> *mut T {
        let ptr = Box::into_raw(Box::new(value));
        self.ledger().record(ptr as usize, kind, 0);
        tracing::trace!(%kind, addr = ptr as usize, "emulated allocation");
        ptr
    }

    /// Take back ownership of a live allocation. `None` for null and for
    /// pointers not in the ledger.
    ///
    /// # Safety
    /// A live entry of `kind` at this address must have been created by
    /// `alloc::<T>`.
    unsafe fn reclaim<T>(&self, kind: ResourceKind, ptr: *mut T) -> Option<Box<T>> {
        if ptr.is_null() {
            return None;
        }
        self.ledger().remove(ptr as usize, kind)?;
        // SAFETY: the entry was recorded by `alloc::<T>` and is now removed,
        // so this is the only owner.
        Some(unsafe { Box::from_raw(ptr) })
    }

    /// Shared body of every `*_free` call.
    unsafe fn release<T>(&self, kind: ResourceKind, ptr: *mut T) {
        self.tick();
        if ptr.is_null() {
            return;
        }
        match unsafe { self.reclaim(kind, ptr) } {
            Some(boxed) => {
                tracing::trace!(%kind, addr = ptr as usize, "emulated release");
                drop(boxed);
            }
            None => {
                tracing::warn!(%kind, addr = ptr as usize, "release of a pointer that is not live");
                self.ledger().note_invalid_release();
            }
        }
    }

    /// Borrow a live allocation for the duration of one call.
    unsafe fn live_mut<'a, T>(&self, kind: ResourceKind, ptr: *mut T) -> Option<&'a mut T> {
        if ptr.is_null() {
            return None;
        }
        if !self.ledger().contains(ptr as usize, kind) {
            self.ledger().note_stale_use();
            tracing::warn!(%kind, addr = ptr as usize, "use of a pointer that is not live");
            return None;
        }
        // SAFETY: live entries point at a `T` allocated by `alloc`, and the
        // handle's owner is the only one calling into it.
        Some(unsafe { &mut *ptr })
    }

    /// The consuming-builder step shared by every setter.
    ///
    /// The input allocation is always consumed. On success a new allocation
    /// holding the updated state is returned; it is created before the old one
    /// is dropped, so the handle identity always changes.
    unsafe fn rebuild<H, T: Clone>(
        &self,
        kind: ResourceKind,
        handle: *mut H,
        operation: &'static str,
        update: impl FnOnce(&mut T) -> Result<(), Fault>,
    ) -> *mut H {
        self.tick();
        let Some(old) = (unsafe { self.reclaim::<T>(kind, handle.cast()) }) else {
            if !handle.is_null() {
                self.ledger().note_stale_use();
            }
            fault::record(Fault::Handle { operation });
            return ptr::null_mut();
        };

        let mut next = (*old).clone();
        match update(&mut next) {
            Ok(()) => {
                let new = self.alloc(kind, next);
                drop(old);
                new.cast()
            }
            Err(fault) => {
                tracing::warn!(operation, error = %fault, "emulated setter rejected value; input consumed");
                fault::record(fault);
                ptr::null_mut()
            }
        }
    }

    /// Attach a configuration to an extractor. Both inputs are consumed.
    unsafe fn attach<C, T>(
        &self,
        handle: *mut CExtractor,
        config: *mut C,
        kind: ResourceKind,
        operation: &'static str,
        apply: impl FnOnce(&mut ExtractorSettings, T),
    ) -> *mut CExtractor {
        let config_ptr = config;
        let config = unsafe { self.reclaim::<T>(kind, config.cast()) };
        if config.is_none() && !config_ptr.is_null() {
            self.ledger().note_stale_use();
        }
        unsafe {
            self.rebuild::<CExtractor, ExtractorState>(ResourceKind::Extractor, handle, operation, |state| {
                let config = config.ok_or(Fault::Handle { operation })?;
                apply(&mut state.settings, *config);
                Ok(())
            })
        }
    }

    fn alloc_string(&self, text: String) -> Result<*mut c_char, Fault> {
        let raw = CString::new(text).map_err(|_| Fault::Nul)?.into_raw();
        self.ledger().record(raw as usize, ResourceKind::String, 0);
        Ok(raw)
    }

    fn alloc_metadata(&self, entries: Vec<(String, Vec<String>)>) -> Result<*mut CMetadata, Fault> {
        let block = if entries.is_empty() {
            CMetadata {
                keys: ptr::null_mut(),
                values: ptr::null_mut(),
                len: 0,
            }
        } else {
            let mut keys = Vec::with_capacity(entries.len());
            let mut values = Vec::with_capacity(entries.len());
            for (key, vals) in entries {
                let key = CString::new(key).map_err(|_| Fault::Nul);
                let value = CString::new(vals.join(",")).map_err(|_| Fault::Nul);
                match (key, value) {
                    (Ok(k), Ok(v)) => {
                        keys.push(k.into_raw());
                        values.push(v.into_raw());
                    }
                    (Err(fault), _) | (_, Err(fault)) => {
                        free_strings(keys);
                        free_strings(values);
                        return Err(fault);
                    }
                }
            }
            let len = keys.len();
            CMetadata {
                keys: Box::into_raw(keys.into_boxed_slice()).cast(),
                values: Box::into_raw(values.into_boxed_slice()).cast(),
                len,
            }
        };
        Ok(self.alloc(ResourceKind::Metadata, block))
    }

    fn alloc_stream(&self, bytes: Vec<u8>) -> *mut CStreamReader {
        let state = StreamState {
            data: bytes,
            pos: 0,
            max_chunk: self.max_read_chunk,
            fail_after: self.fail_reads_after,
        };
        self.alloc(ResourceKind::StreamReader, state).cast()
    }

    /// Shared body of the six extraction calls.
    unsafe fn run_extraction<'s, O>(
        &self,
        operation: &'static str,
        handle: *mut CExtractor,
        out_primary: *mut *mut O,
        out_metadata: *mut *mut CMetadata,
        source: impl FnOnce() -> Result<Source<'s>, Fault>,
        deliver: impl FnOnce(&Self, Document) -> Result<*mut O, Fault>,
    ) -> c_int {
        self.tick();
        if out_primary.is_null() || out_metadata.is_null() {
            return fault::record(Fault::Handle { operation });
        }
        let Some(state) = (unsafe { self.live_mut::<ExtractorState>(ResourceKind::Extractor, handle.cast()) })
        else {
            return fault::record(Fault::Handle { operation });
        };
        let settings = state.settings.clone();

        let outcome = source()
            .and_then(|src| document::extract(&settings, src))
            .and_then(|mut doc| {
                let entries = std::mem::take(&mut doc.metadata);
                let primary = deliver(self, doc)?;
                match self.alloc_metadata(entries) {
                    Ok(metadata) => Ok((primary, metadata)),
                    Err(fault) => {
                        unsafe { self.discard(primary) };
                        Err(fault)
                    }
                }
            });

        match outcome {
            Ok((primary, metadata)) => {
                // SAFETY: both out-pointers were checked non-null above and
                // the caller guarantees they are writable.
                unsafe {
                    *out_primary = primary;
                    *out_metadata = metadata;
                }
                tracing::debug!(operation, "emulated extraction succeeded");
                ERR_OK
            }
            Err(fault) => fault::record(fault),
        }
    }

    /// Free a primary result that could not be delivered.
    unsafe fn discard<O>(&self, primary: *mut O) {
        let addr = primary as usize;
        let mut ledger = self.ledger();
        if ledger.remove(addr, ResourceKind::String).is_some() {
            drop(ledger);
            // SAFETY: recorded by `alloc_string` from `CString::into_raw`.
            drop(unsafe { CString::from_raw(primary.cast()) });
        } else if ledger.remove(addr, ResourceKind::StreamReader).is_some() {
            drop(ledger);
            // SAFETY: recorded by `alloc::<StreamState>`.
            drop(unsafe { Box::from_raw(primary.cast::<StreamState>()) });
        }
    }
}

fn free_strings(strings: Vec<*mut c_char>) {
    for s in strings {
        // SAFETY: produced by `CString::into_raw` in `alloc_metadata`.
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Read a NUL-terminated argument.
unsafe fn arg_str<'a>(operation: &'static str, s: *const c_char) -> Result<&'a str, Fault> {
    if s.is_null() {
        return Err(Fault::Handle { operation });
    }
    // SAFETY: the caller guarantees a NUL-terminated string.
    unsafe { CStr::from_ptr(s) }
        .to_str()
        .map_err(|source| Fault::Utf8 { operation, source })
}

impl NativeEngine for EmulatedEngine {
    fn engine_name(&self) -> &str {
        "emulated"
    }

    fn ffi_version(&self) -> *const c_char {
        self.tick();
        FFI_VERSION.as_ptr().cast()
    }

    fn core_version(&self) -> *const c_char {
        self.tick();
        CORE_VERSION.as_ptr().cast()
    }
}

// ---------------------------------------------------------------------------
// Configuration objects
// ---------------------------------------------------------------------------

impl PdfConfigAbi for EmulatedEngine {
    fn pdf_config_new(&self) -> *mut CPdfParserConfig {
        self.tick();
        self.alloc(ResourceKind::PdfConfig, PdfSettings::default()).cast()
    }

    unsafe fn pdf_config_set_ocr_strategy(&self, h: *mut CPdfParserConfig, strategy: c_int) -> *mut CPdfParserConfig {
        let operation = "pdf_config_set_ocr_strategy";
        unsafe {
            self.rebuild(ResourceKind::PdfConfig, h, operation, |s: &mut PdfSettings| {
                s.ocr_strategy = PdfOcrStrategy::from_raw(strategy).ok_or(Fault::Enum {
                    operation,
                    value: strategy,
                })?;
                Ok(())
            })
        }
    }

    unsafe fn pdf_config_set_extract_inline_images(&self, h: *mut CPdfParserConfig, value: bool) -> *mut CPdfParserConfig {
        unsafe {
            self.rebuild(ResourceKind::PdfConfig, h, "pdf_config_set_extract_inline_images", |s: &mut PdfSettings| {
                s.extract_inline_images = value;
                Ok(())
            })
        }
    }

    unsafe fn pdf_config_set_extract_unique_inline_images_only(
        &self,
        h: *mut CPdfParserConfig,
        value: bool,
    ) -> *mut CPdfParserConfig {
        unsafe {
            self.rebuild(
                ResourceKind::PdfConfig,
                h,
                "pdf_config_set_extract_unique_inline_images_only",
                |s: &mut PdfSettings| {
                    s.extract_unique_inline_images_only = value;
                    Ok(())
                },
            )
        }
    }

    unsafe fn pdf_config_set_extract_marked_content(&self, h: *mut CPdfParserConfig, value: bool) -> *mut CPdfParserConfig {
        unsafe {
            self.rebuild(ResourceKind::PdfConfig, h, "pdf_config_set_extract_marked_content", |s: &mut PdfSettings| {
                s.extract_marked_content = value;
                Ok(())
            })
        }
    }

    unsafe fn pdf_config_set_extract_annotation_text(&self, h: *mut CPdfParserConfig, value: bool) -> *mut CPdfParserConfig {
        unsafe {
            self.rebuild(ResourceKind::PdfConfig, h, "pdf_config_set_extract_annotation_text", |s: &mut PdfSettings| {
                s.extract_annotation_text = value;
                Ok(())
            })
        }
    }

    unsafe fn pdf_config_free(&self, h: *mut CPdfParserConfig) {
        unsafe { self.release(ResourceKind::PdfConfig, h.cast::<PdfSettings>()) }
    }
}

impl OfficeConfigAbi for EmulatedEngine {
    fn office_config_new(&self) -> *mut COfficeParserConfig {
        self.tick();
        self.alloc(ResourceKind::OfficeConfig, OfficeSettings::default()).cast()
    }

    unsafe fn office_config_set_extract_macros(&self, h: *mut COfficeParserConfig, value: bool) -> *mut COfficeParserConfig {
        unsafe {
            self.rebuild(ResourceKind::OfficeConfig, h, "office_config_set_extract_macros", |s: &mut OfficeSettings| {
                s.extract_macros = value;
                Ok(())
            })
        }
    }

    unsafe fn office_config_set_include_deleted_content(
        &self,
        h: *mut COfficeParserConfig,
        value: bool,
    ) -> *mut COfficeParserConfig {
        unsafe {
            self.rebuild(
                ResourceKind::OfficeConfig,
                h,
                "office_config_set_include_deleted_content",
                |s: &mut OfficeSettings| {
                    s.include_deleted_content = value;
                    Ok(())
                },
            )
        }
    }

    unsafe fn office_config_set_include_move_from_content(
        &self,
        h: *mut COfficeParserConfig,
        value: bool,
    ) -> *mut COfficeParserConfig {
        unsafe {
            self.rebuild(
                ResourceKind::OfficeConfig,
                h,
                "office_config_set_include_move_from_content",
                |s: &mut OfficeSettings| {
                    s.include_move_from_content = value;
                    Ok(())
                },
            )
        }
    }

    unsafe fn office_config_set_include_shape_based_content(
        &self,
        h: *mut COfficeParserConfig,
        value: bool,
    ) -> *mut COfficeParserConfig {
        unsafe {
            self.rebuild(
                ResourceKind::OfficeConfig,
                h,
                "office_config_set_include_shape_based_content",
                |s: &mut OfficeSettings| {
                    s.include_shape_based_content = value;
                    Ok(())
                },
            )
        }
    }

    unsafe fn office_config_free(&self, h: *mut COfficeParserConfig) {
        unsafe { self.release(ResourceKind::OfficeConfig, h.cast::<OfficeSettings>()) }
    }
}

impl OcrConfigAbi for EmulatedEngine {
    fn ocr_config_new(&self) -> *mut CTesseractOcrConfig {
        self.tick();
        self.alloc(ResourceKind::OcrConfig, OcrSettings::default()).cast()
    }

    unsafe fn ocr_config_set_language(&self, h: *mut CTesseractOcrConfig, language: *const c_char) -> *mut CTesseractOcrConfig {
        let operation = "ocr_config_set_language";
        let language = unsafe { arg_str(operation, language) }.map(str::to_owned);
        unsafe {
            self.rebuild(ResourceKind::OcrConfig, h, operation, |s: &mut OcrSettings| {
                let language = language?;
                if language.is_empty() {
                    return Err(Fault::Config {
                        operation,
                        detail: "language must not be empty".into(),
                    });
                }
                s.language = language;
                Ok(())
            })
        }
    }

    unsafe fn ocr_config_set_density(&self, h: *mut CTesseractOcrConfig, density: c_int) -> *mut CTesseractOcrConfig {
        let operation = "ocr_config_set_density";
        unsafe {
            self.rebuild(ResourceKind::OcrConfig, h, operation, |s: &mut OcrSettings| {
                if density <= 0 {
                    return Err(Fault::Config {
                        operation,
                        detail: format!("density must be positive, got {density}"),
                    });
                }
                s.density = density;
                Ok(())
            })
        }
    }

    unsafe fn ocr_config_set_depth(&self, h: *mut CTesseractOcrConfig, depth: c_int) -> *mut CTesseractOcrConfig {
        let operation = "ocr_config_set_depth";
        unsafe {
            self.rebuild(ResourceKind::OcrConfig, h, operation, |s: &mut OcrSettings| {
                if depth <= 0 {
                    return Err(Fault::Config {
                        operation,
                        detail: format!("depth must be positive, got {depth}"),
                    });
                }
                s.depth = depth;
                Ok(())
            })
        }
    }

    unsafe fn ocr_config_set_enable_image_preprocessing(
        &self,
        h: *mut CTesseractOcrConfig,
        value: bool,
    ) -> *mut CTesseractOcrConfig {
        unsafe {
            self.rebuild(
                ResourceKind::OcrConfig,
                h,
                "ocr_config_set_enable_image_preprocessing",
                |s: &mut OcrSettings| {
                    s.enable_image_preprocessing = value;
                    Ok(())
                },
            )
        }
    }

    unsafe fn ocr_config_set_timeout_seconds(&self, h: *mut CTesseractOcrConfig, seconds: c_int) -> *mut CTesseractOcrConfig {
        let operation = "ocr_config_set_timeout_seconds";
        unsafe {
            self.rebuild(ResourceKind::OcrConfig, h, operation, |s: &mut OcrSettings| {
                if seconds < 0 {
                    return Err(Fault::Config {
                        operation,
                        detail: format!("timeout must not be negative, got {seconds}"),
                    });
                }
                s.timeout_seconds = seconds;
                Ok(())
            })
        }
    }

    unsafe fn ocr_config_free(&self, h: *mut CTesseractOcrConfig) {
        unsafe { self.release(ResourceKind::OcrConfig, h.cast::<OcrSettings>()) }
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

impl ExtractorAbi for EmulatedEngine {
    fn extractor_new(&self) -> *mut CExtractor {
        self.tick();
        self.alloc(ResourceKind::Extractor, ExtractorState::default()).cast()
    }

    unsafe fn extractor_free(&self, h: *mut CExtractor) {
        unsafe { self.release(ResourceKind::Extractor, h.cast::<ExtractorState>()) }
    }

    unsafe fn extractor_set_extract_string_max_length(&self, h: *mut CExtractor, max_length: c_int) -> *mut CExtractor {
        let operation = "extractor_set_extract_string_max_length";
        unsafe {
            self.rebuild(ResourceKind::Extractor, h, operation, |s: &mut ExtractorState| {
                if max_length <= 0 {
                    return Err(Fault::Config {
                        operation,
                        detail: format!("max length must be positive, got {max_length}"),
                    });
                }
                s.settings.max_string_length = max_length;
                Ok(())
            })
        }
    }

    unsafe fn extractor_set_encoding(&self, h: *mut CExtractor, encoding: c_int) -> *mut CExtractor {
        let operation = "extractor_set_encoding";
        unsafe {
            self.rebuild(ResourceKind::Extractor, h, operation, |s: &mut ExtractorState| {
                s.settings.encoding = CharSet::from_raw(encoding).ok_or(Fault::Enum {
                    operation,
                    value: encoding,
                })?;
                Ok(())
            })
        }
    }

    unsafe fn extractor_set_pdf_config(&self, h: *mut CExtractor, config: *mut CPdfParserConfig) -> *mut CExtractor {
        unsafe {
            self.attach(h, config, ResourceKind::PdfConfig, "extractor_set_pdf_config", |s, c: PdfSettings| {
                s.pdf = Some(c);
            })
        }
    }

    unsafe fn extractor_set_office_config(&self, h: *mut CExtractor, config: *mut COfficeParserConfig) -> *mut CExtractor {
        unsafe {
            self.attach(h, config, ResourceKind::OfficeConfig, "extractor_set_office_config", |s, c: OfficeSettings| {
                s.office = Some(c);
            })
        }
    }

    unsafe fn extractor_set_ocr_config(&self, h: *mut CExtractor, config: *mut CTesseractOcrConfig) -> *mut CExtractor {
        unsafe {
            self.attach(h, config, ResourceKind::OcrConfig, "extractor_set_ocr_config", |s, c: OcrSettings| {
                s.ocr = Some(c);
            })
        }
    }

    unsafe fn extractor_set_xml_output(&self, h: *mut CExtractor, xml_output: bool) -> *mut CExtractor {
        unsafe {
            self.rebuild(ResourceKind::Extractor, h, "extractor_set_xml_output", |s: &mut ExtractorState| {
                s.settings.xml_output = xml_output;
                Ok(())
            })
        }
    }

    unsafe fn extract_file_to_string(
        &self,
        h: *mut CExtractor,
        path: *const c_char,
        out_content: *mut *mut c_char,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int {
        let operation = "extract_file_to_string";
        unsafe {
            self.run_extraction(
                operation,
                h,
                out_content,
                out_metadata,
                || arg_str(operation, path).map(|p| Source::File(p)),
                |engine, doc| engine.alloc_string(doc.text),
            )
        }
    }

    unsafe fn extract_file(
        &self,
        h: *mut CExtractor,
        path: *const c_char,
        out_reader: *mut *mut CStreamReader,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int {
        let operation = "extract_file";
        unsafe {
            self.run_extraction(
                operation,
                h,
                out_reader,
                out_metadata,
                || arg_str(operation, path).map(|p| Source::File(p)),
                |engine, doc| Ok(engine.alloc_stream(doc.into_stream_bytes())),
            )
        }
    }

    unsafe fn extract_bytes_to_string(
        &self,
        h: *mut CExtractor,
        data: *const u8,
        data_len: usize,
        out_content: *mut *mut c_char,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int {
        let operation = "extract_bytes_to_string";
        unsafe {
            self.run_extraction(
                operation,
                h,
                out_content,
                out_metadata,
                || bytes_arg(operation, data, data_len),
                |engine, doc| engine.alloc_string(doc.text),
            )
        }
    }

    unsafe fn extract_bytes(
        &self,
        h: *mut CExtractor,
        data: *const u8,
        data_len: usize,
        out_reader: *mut *mut CStreamReader,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int {
        let operation = "extract_bytes";
        unsafe {
            self.run_extraction(
                operation,
                h,
                out_reader,
                out_metadata,
                || bytes_arg(operation, data, data_len),
                |engine, doc| Ok(engine.alloc_stream(doc.into_stream_bytes())),
            )
        }
    }

    unsafe fn extract_url_to_string(
        &self,
        h: *mut CExtractor,
        url: *const c_char,
        out_content: *mut *mut c_char,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int {
        let operation = "extract_url_to_string";
        unsafe {
            self.run_extraction(
                operation,
                h,
                out_content,
                out_metadata,
                || arg_str(operation, url).map(|u| Source::Url(u)),
                |engine, doc| engine.alloc_string(doc.text),
            )
        }
    }

    unsafe fn extract_url(
        &self,
        h: *mut CExtractor,
        url: *const c_char,
        out_reader: *mut *mut CStreamReader,
        out_metadata: *mut *mut CMetadata,
    ) -> c_int {
        let operation = "extract_url";
        unsafe {
            self.run_extraction(
                operation,
                h,
                out_reader,
                out_metadata,
                || arg_str(operation, url).map(|u| Source::Url(u)),
                |engine, doc| Ok(engine.alloc_stream(doc.into_stream_bytes())),
            )
        }
    }
}

unsafe fn bytes_arg<'a>(operation: &'static str, data: *const u8, len: usize) -> Result<Source<'a>, Fault> {
    if data.is_null() {
        return Err(Fault::Handle { operation });
    }
    // SAFETY: the caller guarantees `data` is valid for `len` bytes for the
    // whole call; the slice does not escape it.
    Ok(Source::Bytes(unsafe { std::slice::from_raw_parts(data, len) }))
}

// ---------------------------------------------------------------------------
// Stream reader
// ---------------------------------------------------------------------------

impl EmulatedEngine {
    unsafe fn stream_state<'a>(&self, h: *mut CStreamReader, operation: &'static str) -> Result<&'a mut StreamState, c_int> {
        unsafe { self.live_mut::<StreamState>(ResourceKind::StreamReader, h.cast()) }
            .ok_or_else(|| fault::record(Fault::Handle { operation }))
    }
}

impl StreamAbi for EmulatedEngine {
    unsafe fn stream_read(&self, h: *mut CStreamReader, buffer: *mut u8, buffer_size: usize, bytes_read: *mut usize) -> c_int {
        self.tick();
        let operation = "stream_read";
        let state = match unsafe { self.stream_state(h, operation) } {
            Ok(state) => state,
            Err(code) => return code,
        };
        if buffer.is_null() {
            return fault::record(Fault::Handle { operation });
        }
        let mut n = 0;
        if buffer_size > 0 {
            // SAFETY: the caller guarantees `buffer` is valid for `buffer_size` bytes.
            let buf = unsafe { std::slice::from_raw_parts_mut(buffer, buffer_size) };
            match state.read_chunk(buf) {
                Ok(read) => n = read,
                Err(fault) => return fault::record(fault),
            }
        }
        if !bytes_read.is_null() {
            unsafe { *bytes_read = n };
        }
        ERR_OK
    }

    unsafe fn stream_read_exact(
        &self,
        h: *mut CStreamReader,
        buffer: *mut u8,
        buffer_size: usize,
        bytes_read: *mut usize,
    ) -> c_int {
        self.tick();
        let operation = "stream_read_exact";
        let state = match unsafe { self.stream_state(h, operation) } {
            Ok(state) => state,
            Err(code) => return code,
        };
        if buffer.is_null() {
            return fault::record(Fault::Handle { operation });
        }
        let mut total = 0;
        if buffer_size > 0 {
            let buf = unsafe { std::slice::from_raw_parts_mut(buffer, buffer_size) };
            while total < buffer_size {
                match state.read_chunk(&mut buf[total..]) {
                    Ok(0) => break,
                    Ok(n) => total += n,
                    Err(fault) => return fault::record(fault),
                }
            }
        }
        if !bytes_read.is_null() {
            unsafe { *bytes_read = total };
        }
        ERR_OK
    }

    unsafe fn stream_read_all(&self, h: *mut CStreamReader, out_buffer: *mut *mut u8, out_size: *mut usize) -> c_int {
        self.tick();
        let operation = "stream_read_all";
        if out_buffer.is_null() || out_size.is_null() {
            return fault::record(Fault::Handle { operation });
        }
        let state = match unsafe { self.stream_state(h, operation) } {
            Ok(state) => state,
            Err(code) => return code,
        };

        let mut data = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match state.read_chunk(&mut chunk) {
                Ok(0) => break,
                Ok(n) => data.extend_from_slice(&chunk[..n]),
                Err(fault) => return fault::record(fault),
            }
        }

        let (ptr, len) = if data.is_empty() {
            (ptr::null_mut(), 0)
        } else {
            let len = data.len();
            let ptr = Box::into_raw(data.into_boxed_slice()).cast::<u8>();
            self.ledger().record(ptr as usize, ResourceKind::Buffer, len);
            (ptr, len)
        };
        unsafe {
            *out_buffer = ptr;
            *out_size = len;
        }
        ERR_OK
    }

    unsafe fn stream_free(&self, h: *mut CStreamReader) {
        unsafe { self.release(ResourceKind::StreamReader, h.cast::<StreamState>()) }
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

impl MemoryAbi for EmulatedEngine {
    unsafe fn string_free(&self, s: *mut c_char) {
        self.tick();
        if s.is_null() {
            return;
        }
        if self.ledger().remove(s as usize, ResourceKind::String).is_some() {
            // SAFETY: recorded by `alloc_string` from `CString::into_raw`.
            drop(unsafe { CString::from_raw(s) });
        } else {
            tracing::warn!(addr = s as usize, "string_free of a pointer that is not live");
            self.ledger().note_invalid_release();
        }
    }

    unsafe fn metadata_free(&self, metadata: *mut CMetadata) {
        self.tick();
        if metadata.is_null() {
            return;
        }
        let Some(block) = (unsafe { self.reclaim(ResourceKind::Metadata, metadata) }) else {
            tracing::warn!(addr = metadata as usize, "metadata_free of a pointer that is not live");
            self.ledger().note_invalid_release();
            return;
        };
        if block.len > 0 {
            // SAFETY: both arrays were built by `alloc_metadata` from boxed
            // slices of exactly `len` `CString::into_raw` pointers.
            unsafe {
                let keys = Box::from_raw(ptr::slice_from_raw_parts_mut(block.keys, block.len));
                let values = Box::from_raw(ptr::slice_from_raw_parts_mut(block.values, block.len));
                free_strings(keys.into_vec());
                free_strings(values.into_vec());
            }
        }
    }

    unsafe fn buffer_free(&self, buffer: *mut u8, size: usize) {
        self.tick();
        if buffer.is_null() {
            return;
        }
        let removed = self.ledger().remove(buffer as usize, ResourceKind::Buffer);
        let Some(len) = removed else {
            tracing::warn!(addr = buffer as usize, "buffer_free of a pointer that is not live");
            self.ledger().note_invalid_release();
            return;
        };
        if len != size {
            tracing::warn!(len, size, "buffer_free with a size that does not match the allocation");
            self.ledger().note_invalid_release();
        }
        // SAFETY: recorded by `stream_read_all` from a boxed slice of `len` bytes.
        drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(buffer, len)) });
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

impl ErrorAbi for EmulatedEngine {
    fn error_message(&self, code: c_int) -> *mut c_char {
        self.tick();
        let text = extractous_core::messages::describe_code(code).to_string();
        self.alloc_string(text).unwrap_or(ptr::null_mut())
    }

    fn error_category(&self, code: c_int) -> *const c_char {
        self.tick();
        let category: &'static CStr = match extractous_core::ErrorKind::from_code(code) {
            None => c"success",
            Some(kind) => match kind.category() {
                extractous_core::ErrorCategory::InvalidArgument => c"invalid_argument",
                extractous_core::ErrorCategory::Io => c"io_error",
                extractous_core::ErrorCategory::Extraction => c"extraction_error",
                extractous_core::ErrorCategory::Resource => c"resource_error",
                extractous_core::ErrorCategory::Unknown => c"unknown",
            },
        };
        category.as_ptr()
    }

    fn error_get_last_debug(&self) -> *mut c_char {
        self.tick();
        fault::take_report()
            .and_then(|report| self.alloc_string(report).ok())
            .unwrap_or(ptr::null_mut())
    }

    fn error_has_debug(&self) -> c_int {
        self.tick();
        c_int::from(fault::is_stored())
    }

    fn error_clear_last(&self) {
        self.tick();
        fault::clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extractous_core::error::{ERR_INVALID_CONFIG, ERR_IO_ERROR, ERR_NULL_POINTER, ERR_UNSUPPORTED_FORMAT};

    fn cstr(p: *const c_char) -> String {
        unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned()
    }

    #[test]
    fn setter_chain_leaves_one_live_handle() {
        let engine = EmulatedEngine::new();
        let mut h = engine.ocr_config_new();
        for density in [150, 200, 300, 600] {
            let next = unsafe { engine.ocr_config_set_density(h, density) };
            assert!(!next.is_null());
            assert_ne!(next, h);
            h = next;
        }
        assert_eq!(engine.live(ResourceKind::OcrConfig), 1);
        unsafe { engine.ocr_config_free(h) };
        assert_eq!(engine.live_total(), 0);
        assert_eq!(engine.invalid_releases(), 0);
    }

    #[test]
    fn rejected_setter_consumes_input() {
        let engine = EmulatedEngine::new();
        let h = engine.ocr_config_new();
        let next = unsafe { engine.ocr_config_set_depth(h, 0) };
        assert!(next.is_null());
        assert_eq!(engine.live_total(), 0);
        assert_eq!(engine.error_has_debug(), 1);
        engine.error_clear_last();
        assert_eq!(engine.error_has_debug(), 0);
    }

    #[test]
    fn double_free_is_counted_not_performed() {
        let engine = EmulatedEngine::new();
        let h = engine.extractor_new();
        unsafe {
            engine.extractor_free(h);
            engine.extractor_free(h);
            engine.extractor_free(ptr::null_mut());
        }
        assert_eq!(engine.invalid_releases(), 1);
    }

    #[test]
    fn attach_consumes_config_even_when_extractor_is_gone() {
        let engine = EmulatedEngine::new();
        let config = engine.pdf_config_new();
        let out = unsafe { engine.extractor_set_pdf_config(ptr::null_mut(), config) };
        assert!(out.is_null());
        assert_eq!(engine.live(ResourceKind::PdfConfig), 0);
    }

    #[test]
    fn bytes_to_string_round_trip() {
        let engine = EmulatedEngine::new();
        let h = engine.extractor_new();
        let data = b"Hello, World!";
        let mut content = ptr::null_mut();
        let mut metadata = ptr::null_mut();
        let code = unsafe { engine.extract_bytes_to_string(h, data.as_ptr(), data.len(), &mut content, &mut metadata) };
        assert_eq!(code, ERR_OK);
        assert_eq!(cstr(content), "Hello, World!");
        let block = unsafe { &*metadata };
        assert!(block.len >= 3);
        assert_eq!(engine.live(ResourceKind::String), 1);
        assert_eq!(engine.live(ResourceKind::Metadata), 1);

        unsafe {
            engine.string_free(content);
            engine.metadata_free(metadata);
            engine.extractor_free(h);
        }
        assert_eq!(engine.live_total(), 0);
    }

    #[test]
    fn failed_extraction_leaves_outputs_untouched() {
        let engine = EmulatedEngine::new();
        let h = engine.extractor_new();
        let data = b"%PDF-1.4\n";
        let mut content = ptr::null_mut();
        let mut metadata = ptr::null_mut();
        let code = unsafe { engine.extract_bytes_to_string(h, data.as_ptr(), data.len(), &mut content, &mut metadata) };
        assert_eq!(code, ERR_UNSUPPORTED_FORMAT);
        assert!(content.is_null());
        assert!(metadata.is_null());
        unsafe { engine.extractor_free(h) };
        assert_eq!(engine.live_total(), 0);
    }

    #[test]
    fn missing_file_is_io_error_with_cause() {
        let engine = EmulatedEngine::new();
        let h = engine.extractor_new();
        let mut reader = ptr::null_mut();
        let mut metadata = ptr::null_mut();
        let code = unsafe {
            engine.extract_file(h, c"/nonexistent/extractous.txt".as_ptr(), &mut reader, &mut metadata)
        };
        assert_eq!(code, ERR_IO_ERROR);

        let report = engine.error_get_last_debug();
        assert!(!report.is_null());
        assert!(cstr(report).contains("Caused by:"));
        unsafe {
            engine.string_free(report);
            engine.extractor_free(h);
        }
        assert!(engine.error_get_last_debug().is_null());
    }

    #[test]
    fn short_reads_and_injected_fault() {
        let engine = EmulatedEngine::new().with_max_read_chunk(4).with_read_fault_after(6);
        let h = engine.extractor_new();
        let data = b"0123456789";
        let mut reader = ptr::null_mut();
        let mut metadata = ptr::null_mut();
        let code = unsafe { engine.extract_bytes(h, data.as_ptr(), data.len(), &mut reader, &mut metadata) };
        assert_eq!(code, ERR_OK);

        let mut buf = [0u8; 16];
        let mut n = 0;
        unsafe {
            assert_eq!(engine.stream_read(reader, buf.as_mut_ptr(), buf.len(), &mut n), ERR_OK);
            assert_eq!(n, 4);
            assert_eq!(engine.stream_read(reader, buf.as_mut_ptr(), buf.len(), &mut n), ERR_OK);
            assert_eq!(n, 2);
            assert_eq!(engine.stream_read(reader, buf.as_mut_ptr(), buf.len(), &mut n), ERR_IO_ERROR);
            engine.stream_free(reader);
            engine.metadata_free(metadata);
            engine.extractor_free(h);
        }
        assert_eq!(engine.live_total(), 0);
    }

    #[test]
    fn read_all_buffer_is_tracked() {
        let engine = EmulatedEngine::new();
        let h = engine.extractor_new();
        let data = b"stream me";
        let mut reader = ptr::null_mut();
        let mut metadata = ptr::null_mut();
        unsafe {
            engine.extract_bytes(h, data.as_ptr(), data.len(), &mut reader, &mut metadata);
            let mut buf = ptr::null_mut();
            let mut size = 0;
            assert_eq!(engine.stream_read_all(reader, &mut buf, &mut size), ERR_OK);
            assert_eq!(std::slice::from_raw_parts(buf, size), b"stream me");
            assert_eq!(engine.live(ResourceKind::Buffer), 1);
            engine.buffer_free(buf, size);
            engine.stream_free(reader);
            engine.metadata_free(metadata);
            engine.extractor_free(h);
        }
        assert_eq!(engine.live_total(), 0);
        assert_eq!(engine.invalid_releases(), 0);
    }

    #[test]
    fn error_strings_match_native_text() {
        let engine = EmulatedEngine::new();
        let msg = engine.error_message(ERR_INVALID_CONFIG);
        assert_eq!(cstr(msg), "Invalid configuration value");
        unsafe { engine.string_free(msg) };
        assert_eq!(cstr(engine.error_category(ERR_NULL_POINTER)), "invalid_argument");
        assert_eq!(cstr(engine.error_category(ERR_OK)), "success");
        assert_eq!(cstr(engine.error_category(-77)), "unknown");
    }
}
