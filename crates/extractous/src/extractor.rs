// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The extractor: consuming-builder configuration plus the six extraction
// calls (file, bytes, URL; each as a string or as a stream).

use std::ffi::{CString, c_char, c_int};
use std::path::Path;
use std::ptr;

use extractous_bridge::NativeEngine;
use extractous_bridge::abi::{CExtractor, CMetadata, CStreamReader};
use extractous_core::error::ERR_INVALID_UTF8;
use extractous_core::{CharSet, ExtractorSettings, ExtractousError, Result, messages};

use crate::config::{OcrConfig, OfficeParserConfig, PdfParserConfig};
use crate::engine::Engine;
use crate::handle::NativeHandle;
use crate::metadata::{Metadata, NativeMetadata};
use crate::stream::StreamReader;

/// Document text extractor.
///
/// Setters consume the extractor and return its replacement; a failed setter
/// leaves nothing behind. Attaching a parser configuration transfers that
/// configuration's ownership to the extractor.
#[derive(Debug)]
pub struct Extractor {
    handle: NativeHandle<CExtractor>,
}

impl Extractor {
    pub fn new(engine: &Engine) -> Result<Self> {
        let ptr = engine.native().extractor_new();
        let handle = NativeHandle::adopt(engine, ptr)
            .ok_or(ExtractousError::HandleRejected { operation: "extractor_new" })?;
        tracing::debug!("extractor created");
        Ok(Self { handle })
    }

    /// Build an extractor from serialised settings, attaching whichever
    /// parser sections are present.
    pub fn from_settings(engine: &Engine, settings: &ExtractorSettings) -> Result<Self> {
        settings.validate()?;

        let mut extractor = Self::new(engine)?
            .set_extract_string_max_length(settings.max_string_length)?
            .set_encoding(settings.encoding)?
            .set_xml_output(settings.xml_output)?;

        if let Some(pdf) = &settings.pdf {
            extractor = extractor.set_pdf_config(PdfParserConfig::from_settings(engine, pdf)?)?;
        }
        if let Some(office) = &settings.office {
            extractor = extractor.set_office_config(OfficeParserConfig::from_settings(engine, office)?)?;
        }
        if let Some(ocr) = &settings.ocr {
            extractor = extractor.set_ocr_config(OcrConfig::from_settings(engine, ocr)?)?;
        }
        Ok(extractor)
    }

    /// Maximum length of a string result, in characters. Must be positive.
    pub fn set_extract_string_max_length(self, max_length: c_int) -> Result<Self> {
        self.step("extractor_set_extract_string_max_length", |native, h| unsafe {
            native.extractor_set_extract_string_max_length(h, max_length)
        })
    }

    /// Encoding of the extracted text, in strings and streams alike.
    pub fn set_encoding(self, encoding: CharSet) -> Result<Self> {
        self.step("extractor_set_encoding", |native, h| unsafe {
            native.extractor_set_encoding(h, encoding.as_raw())
        })
    }

    /// Produce XHTML instead of plain text.
    pub fn set_xml_output(self, xml_output: bool) -> Result<Self> {
        self.step("extractor_set_xml_output", |native, h| unsafe {
            native.extractor_set_xml_output(h, xml_output)
        })
    }

    /// Attach `config`, which the extractor takes over. A released config
    /// fails with a null-argument error and clears the debug report; the
    /// other two config setters behave the same.
    pub fn set_pdf_config(self, config: PdfParserConfig) -> Result<Self> {
        let operation = "extractor_set_pdf_config";
        let mut config = config.into_handle();
        if config.is_released() {
            return Err(config.released(operation));
        }
        self.step(operation, move |native, h| {
            let config = config.take().unwrap_or(ptr::null_mut());
            unsafe { native.extractor_set_pdf_config(h, config) }
        })
    }

    pub fn set_office_config(self, config: OfficeParserConfig) -> Result<Self> {
        let operation = "extractor_set_office_config";
        let mut config = config.into_handle();
        if config.is_released() {
            return Err(config.released(operation));
        }
        self.step(operation, move |native, h| {
            let config = config.take().unwrap_or(ptr::null_mut());
            unsafe { native.extractor_set_office_config(h, config) }
        })
    }

    pub fn set_ocr_config(self, config: OcrConfig) -> Result<Self> {
        let operation = "extractor_set_ocr_config";
        let mut config = config.into_handle();
        if config.is_released() {
            return Err(config.released(operation));
        }
        self.step(operation, move |native, h| {
            let config = config.take().unwrap_or(ptr::null_mut());
            unsafe { native.extractor_set_ocr_config(h, config) }
        })
    }

    // -----------------------------------------------------------------------
    // Extraction
    // -----------------------------------------------------------------------

    /// Extract a file into a string.
    pub fn extract_file_to_string(&self, path: impl AsRef<Path>) -> Result<(String, Metadata)> {
        let operation = "extract_file_to_string";
        let path = path_arg(operation, path.as_ref())?;
        self.run_to_string(operation, |native, h, out, md| unsafe {
            native.extract_file_to_string(h, path.as_ptr(), out, md)
        })
    }

    /// Extract a file as a stream.
    pub fn extract_file(&self, path: impl AsRef<Path>) -> Result<(StreamReader, Metadata)> {
        let operation = "extract_file";
        let path = path_arg(operation, path.as_ref())?;
        self.run_to_stream(operation, |native, h, out, md| unsafe {
            native.extract_file(h, path.as_ptr(), out, md)
        })
    }

    /// Extract an in-memory document into a string.
    ///
    /// Empty input yields empty content and metadata without a native call.
    pub fn extract_bytes_to_string(&self, data: &[u8]) -> Result<(String, Metadata)> {
        let operation = "extract_bytes_to_string";
        self.handle.live(operation)?;
        if data.is_empty() {
            return Ok((String::new(), Metadata::default()));
        }
        self.run_to_string(operation, |native, h, out, md| unsafe {
            native.extract_bytes_to_string(h, data.as_ptr(), data.len(), out, md)
        })
    }

    /// Extract an in-memory document as a stream.
    ///
    /// Empty input yields a reader already at end of stream.
    pub fn extract_bytes(&self, data: &[u8]) -> Result<(StreamReader, Metadata)> {
        let operation = "extract_bytes";
        self.handle.live(operation)?;
        if data.is_empty() {
            return Ok((StreamReader::finished(self.engine()), Metadata::default()));
        }
        self.run_to_stream(operation, |native, h, out, md| unsafe {
            native.extract_bytes(h, data.as_ptr(), data.len(), out, md)
        })
    }

    /// Fetch and extract a URL into a string.
    pub fn extract_url_to_string(&self, url: &str) -> Result<(String, Metadata)> {
        let operation = "extract_url_to_string";
        let url = CString::new(url).map_err(|_| ExtractousError::InteriorNul { operation })?;
        self.run_to_string(operation, |native, h, out, md| unsafe {
            native.extract_url_to_string(h, url.as_ptr(), out, md)
        })
    }

    /// Fetch and extract a URL as a stream.
    pub fn extract_url(&self, url: &str) -> Result<(StreamReader, Metadata)> {
        let operation = "extract_url";
        let url = CString::new(url).map_err(|_| ExtractousError::InteriorNul { operation })?;
        self.run_to_stream(operation, |native, h, out, md| unsafe {
            native.extract_url(h, url.as_ptr(), out, md)
        })
    }

    /// Release the extractor. Idempotent; later extractions fail with a
    /// null-argument error and leave no debug report behind.
    pub fn release(&mut self) {
        self.handle.release();
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }

    pub fn engine(&self) -> &Engine {
        self.handle.engine()
    }

    // -----------------------------------------------------------------------

    fn step(
        self,
        operation: &'static str,
        call: impl FnOnce(&dyn NativeEngine, *mut CExtractor) -> *mut CExtractor,
    ) -> Result<Self> {
        Ok(Self {
            handle: self.handle.transform(operation, call)?,
        })
    }

    fn run_to_string(
        &self,
        operation: &'static str,
        call: impl FnOnce(&dyn NativeEngine, *mut CExtractor, *mut *mut c_char, *mut *mut CMetadata) -> c_int,
    ) -> Result<(String, Metadata)> {
        let handle = self.handle.live(operation)?;
        let engine = self.engine();
        let mut content = ptr::null_mut();
        let mut metadata = ptr::null_mut();
        let code = call(engine.native(), handle, &mut content, &mut metadata);

        // Adopt outputs before checking the code so they are freed either way.
        let metadata = NativeMetadata::adopt(engine, metadata);
        // SAFETY: `content` was produced by this call and is owned by us.
        let content = unsafe { engine.take_string(content) };
        engine.check(operation, code)?;

        let content = content.unwrap_or_else(|| {
            tracing::warn!(operation, "native call succeeded without content");
            String::new()
        });
        Ok((content, metadata.map(NativeMetadata::into_metadata).unwrap_or_default()))
    }

    fn run_to_stream(
        &self,
        operation: &'static str,
        call: impl FnOnce(&dyn NativeEngine, *mut CExtractor, *mut *mut CStreamReader, *mut *mut CMetadata) -> c_int,
    ) -> Result<(StreamReader, Metadata)> {
        let handle = self.handle.live(operation)?;
        let engine = self.engine();
        let mut reader = ptr::null_mut();
        let mut metadata = ptr::null_mut();
        let code = call(engine.native(), handle, &mut reader, &mut metadata);

        let metadata = NativeMetadata::adopt(engine, metadata);
        let reader = NativeHandle::adopt(engine, reader);
        engine.check(operation, code)?;

        let reader = match reader {
            Some(handle) => StreamReader::new(handle),
            None => {
                tracing::warn!(operation, "native call succeeded without a reader");
                StreamReader::finished(engine)
            }
        };
        Ok((reader, metadata.map(NativeMetadata::into_metadata).unwrap_or_default()))
    }
}

fn path_arg(operation: &'static str, path: &Path) -> Result<CString> {
    let Some(path) = path.to_str() else {
        return Err(ExtractousError::native(
            operation,
            ERR_INVALID_UTF8,
            messages::describe_code(ERR_INVALID_UTF8),
        ));
    };
    CString::new(path).map_err(|_| ExtractousError::InteriorNul { operation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::Arc;

    use extractous_bridge::EmulatedEngine;
    use extractous_core::{ErrorKind, PdfOcrStrategy, ResourceKind};

    fn engine() -> (Arc<EmulatedEngine>, Engine) {
        let emulated = Arc::new(EmulatedEngine::new());
        (emulated.clone(), Engine::from_native(emulated))
    }

    #[test]
    fn attaching_a_config_transfers_it() {
        let (emulated, engine) = engine();
        let pdf = PdfParserConfig::new(&engine)
            .and_then(|c| c.set_ocr_strategy(PdfOcrStrategy::Auto))
            .unwrap();
        let extractor = Extractor::new(&engine).unwrap().set_pdf_config(pdf).unwrap();

        assert_eq!(emulated.live(ResourceKind::PdfConfig), 0);
        assert_eq!(emulated.live(ResourceKind::Extractor), 1);
        drop(extractor);
        assert_eq!(emulated.live_total(), 0);
        assert_eq!(emulated.invalid_releases(), 0);
    }

    #[test]
    fn released_config_is_refused() {
        let (emulated, engine) = engine();
        let mut office = OfficeParserConfig::new(&engine).unwrap();
        office.release();
        let err = Extractor::new(&engine).unwrap().set_office_config(office).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NullArgument);
        assert_eq!(emulated.live_total(), 0);
    }

    #[test]
    fn rejected_max_length_consumes_extractor() {
        let (emulated, engine) = engine();
        let err = Extractor::new(&engine).unwrap().set_extract_string_max_length(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert_eq!(emulated.live_total(), 0);
        assert!(engine.has_debug_report());
        engine.clear_debug_report();
        assert!(!engine.has_debug_report());
    }

    #[test]
    fn string_extraction_frees_every_output() {
        let (emulated, engine) = engine();
        let extractor = Extractor::new(&engine).unwrap();
        let (content, metadata) = extractor.extract_bytes_to_string(b"Hello, World!").unwrap();

        assert!(content.contains("Hello, World!"));
        assert!(!metadata.is_empty());
        assert_eq!(emulated.live(ResourceKind::String), 0);
        assert_eq!(emulated.live(ResourceKind::Metadata), 0);
    }

    #[test]
    fn stream_extraction_reads_back() {
        let (emulated, engine) = engine();
        let extractor = Extractor::new(&engine).unwrap();
        let (mut reader, _) = extractor.extract_bytes(b"streamed text").unwrap();
        assert_eq!(emulated.live(ResourceKind::StreamReader), 1);

        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        assert!(text.contains("streamed text"));
        drop(reader);
        assert_eq!(emulated.live(ResourceKind::StreamReader), 0);
    }

    #[test]
    fn empty_input_skips_the_engine() {
        let (emulated, engine) = engine();
        let extractor = Extractor::new(&engine).unwrap();
        let calls = emulated.calls();

        let (content, metadata) = extractor.extract_bytes_to_string(&[]).unwrap();
        assert!(content.is_empty());
        assert!(metadata.is_empty());

        let (reader, _) = extractor.extract_bytes(&[]).unwrap();
        assert!(reader.is_finished());
        assert_eq!(emulated.calls(), calls);
    }

    #[test]
    fn released_extractor_is_a_null_argument() {
        let (_, engine) = engine();
        let mut extractor = Extractor::new(&engine).unwrap();
        extractor.release();
        extractor.release();

        let err = extractor.extract_bytes_to_string(b"text").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NullArgument);
        assert!(extractor.extract_bytes(&[]).is_err());
        assert!(extractor.extract_url("file:///nowhere").is_err());
    }

    #[test]
    fn released_paths_clear_an_earlier_report() {
        let (emulated, engine) = engine();
        let mut extractor = Extractor::new(&engine).unwrap();

        extractor.extract_bytes_to_string(b"%PDF-1.4").unwrap_err();
        assert!(engine.has_debug_report());
        let mut pdf = PdfParserConfig::new(&engine).unwrap();
        pdf.release();
        let err = Extractor::new(&engine).unwrap().set_pdf_config(pdf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NullArgument);
        assert!(!engine.has_debug_report());

        extractor.extract_bytes_to_string(b"%PDF-1.4").unwrap_err();
        assert!(engine.has_debug_report());
        extractor.release();
        let err = extractor.extract_bytes_to_string(b"text").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NullArgument);
        assert!(engine.take_debug_report().is_none());

        drop(extractor);
        assert_eq!(emulated.live_total(), 0);
        assert_eq!(emulated.invalid_releases(), 0);
    }

    #[test]
    fn nul_in_url_is_refused_locally() {
        let (emulated, engine) = engine();
        let extractor = Extractor::new(&engine).unwrap();
        let calls = emulated.calls();
        let err = extractor.extract_url_to_string("http://a\0b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StringConversion);
        assert_eq!(emulated.calls(), calls);
    }

    #[test]
    fn failed_extraction_leaves_nothing_live() {
        let (emulated, engine) = engine();
        let extractor = Extractor::new(&engine).unwrap();
        let err = extractor.extract_bytes_to_string(b"%PDF-1.7\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(emulated.live(ResourceKind::String), 0);
        assert_eq!(emulated.live(ResourceKind::Metadata), 0);
    }
}
