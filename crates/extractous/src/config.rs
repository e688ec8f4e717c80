// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Parser configuration objects (PDF, Office, OCR) as consuming builders.
//
// Every setter takes the object by value and hands back its replacement, so
// the compiler rejects reuse of a consumed configuration. A rejected value
// still consumes the object.

use std::ffi::{CString, c_int};

use extractous_bridge::abi::{COfficeParserConfig, CPdfParserConfig, CTesseractOcrConfig};
use extractous_core::{ExtractousError, OcrSettings, OfficeSettings, PdfOcrStrategy, PdfSettings, Result};

use crate::engine::Engine;
use crate::handle::NativeHandle;

// ---------------------------------------------------------------------------
// PDF
// ---------------------------------------------------------------------------

/// PDF parser settings.
#[derive(Debug)]
pub struct PdfParserConfig {
    handle: NativeHandle<CPdfParserConfig>,
}

impl PdfParserConfig {
    pub fn new(engine: &Engine) -> Result<Self> {
        let ptr = engine.native().pdf_config_new();
        let handle = NativeHandle::adopt(engine, ptr)
            .ok_or(ExtractousError::HandleRejected { operation: "pdf_config_new" })?;
        Ok(Self { handle })
    }

    /// Build a configuration from serialised settings.
    pub fn from_settings(engine: &Engine, settings: &PdfSettings) -> Result<Self> {
        Self::new(engine)?
            .set_ocr_strategy(settings.ocr_strategy)?
            .set_extract_inline_images(settings.extract_inline_images)?
            .set_extract_unique_inline_images_only(settings.extract_unique_inline_images_only)?
            .set_extract_marked_content(settings.extract_marked_content)?
            .set_extract_annotation_text(settings.extract_annotation_text)
    }

    pub fn set_ocr_strategy(self, strategy: PdfOcrStrategy) -> Result<Self> {
        self.step("pdf_config_set_ocr_strategy", |native, h| unsafe {
            native.pdf_config_set_ocr_strategy(h, strategy.as_raw())
        })
    }

    /// Extract images embedded in pages (and OCR them, with an OCR strategy).
    pub fn set_extract_inline_images(self, value: bool) -> Result<Self> {
        self.step("pdf_config_set_extract_inline_images", |native, h| unsafe {
            native.pdf_config_set_extract_inline_images(h, value)
        })
    }

    /// Process an image that appears on several pages only once.
    pub fn set_extract_unique_inline_images_only(self, value: bool) -> Result<Self> {
        self.step("pdf_config_set_extract_unique_inline_images_only", |native, h| unsafe {
            native.pdf_config_set_extract_unique_inline_images_only(h, value)
        })
    }

    /// Keep the logical structure tags of tagged PDFs.
    pub fn set_extract_marked_content(self, value: bool) -> Result<Self> {
        self.step("pdf_config_set_extract_marked_content", |native, h| unsafe {
            native.pdf_config_set_extract_marked_content(h, value)
        })
    }

    /// Include comment and annotation text.
    pub fn set_extract_annotation_text(self, value: bool) -> Result<Self> {
        self.step("pdf_config_set_extract_annotation_text", |native, h| unsafe {
            native.pdf_config_set_extract_annotation_text(h, value)
        })
    }

    /// Free the configuration without attaching it. Idempotent.
    pub fn release(&mut self) {
        self.handle.release();
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }

    pub(crate) fn into_handle(self) -> NativeHandle<CPdfParserConfig> {
        self.handle
    }

    fn step(
        self,
        operation: &'static str,
        call: impl FnOnce(&dyn extractous_bridge::NativeEngine, *mut CPdfParserConfig) -> *mut CPdfParserConfig,
    ) -> Result<Self> {
        Ok(Self {
            handle: self.handle.transform(operation, call)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Office
// ---------------------------------------------------------------------------

/// Office document (DOCX, XLSX, PPTX, legacy OLE) parser settings.
#[derive(Debug)]
pub struct OfficeParserConfig {
    handle: NativeHandle<COfficeParserConfig>,
}

impl OfficeParserConfig {
    pub fn new(engine: &Engine) -> Result<Self> {
        let ptr = engine.native().office_config_new();
        let handle = NativeHandle::adopt(engine, ptr)
            .ok_or(ExtractousError::HandleRejected { operation: "office_config_new" })?;
        Ok(Self { handle })
    }

    pub fn from_settings(engine: &Engine, settings: &OfficeSettings) -> Result<Self> {
        Self::new(engine)?
            .set_extract_macros(settings.extract_macros)?
            .set_include_deleted_content(settings.include_deleted_content)?
            .set_include_move_from_content(settings.include_move_from_content)?
            .set_include_shape_based_content(settings.include_shape_based_content)
    }

    pub fn set_extract_macros(self, value: bool) -> Result<Self> {
        self.step("office_config_set_extract_macros", |native, h| unsafe {
            native.office_config_set_extract_macros(h, value)
        })
    }

    /// Include tracked-changes deletions.
    pub fn set_include_deleted_content(self, value: bool) -> Result<Self> {
        self.step("office_config_set_include_deleted_content", |native, h| unsafe {
            native.office_config_set_include_deleted_content(h, value)
        })
    }

    /// Include tracked-changes "move from" text.
    pub fn set_include_move_from_content(self, value: bool) -> Result<Self> {
        self.step("office_config_set_include_move_from_content", |native, h| unsafe {
            native.office_config_set_include_move_from_content(h, value)
        })
    }

    /// Include text inside shapes and text boxes.
    pub fn set_include_shape_based_content(self, value: bool) -> Result<Self> {
        self.step("office_config_set_include_shape_based_content", |native, h| unsafe {
            native.office_config_set_include_shape_based_content(h, value)
        })
    }

    pub fn release(&mut self) {
        self.handle.release();
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }

    pub(crate) fn into_handle(self) -> NativeHandle<COfficeParserConfig> {
        self.handle
    }

    fn step(
        self,
        operation: &'static str,
        call: impl FnOnce(&dyn extractous_bridge::NativeEngine, *mut COfficeParserConfig) -> *mut COfficeParserConfig,
    ) -> Result<Self> {
        Ok(Self {
            handle: self.handle.transform(operation, call)?,
        })
    }
}

// ---------------------------------------------------------------------------
// OCR
// ---------------------------------------------------------------------------

/// Tesseract OCR settings.
#[derive(Debug)]
pub struct OcrConfig {
    handle: NativeHandle<CTesseractOcrConfig>,
}

impl OcrConfig {
    pub fn new(engine: &Engine) -> Result<Self> {
        let ptr = engine.native().ocr_config_new();
        let handle = NativeHandle::adopt(engine, ptr)
            .ok_or(ExtractousError::HandleRejected { operation: "ocr_config_new" })?;
        Ok(Self { handle })
    }

    pub fn from_settings(engine: &Engine, settings: &OcrSettings) -> Result<Self> {
        Self::new(engine)?
            .set_language(&settings.language)?
            .set_density(settings.density)?
            .set_depth(settings.depth)?
            .set_enable_image_preprocessing(settings.enable_image_preprocessing)?
            .set_timeout_seconds(settings.timeout_seconds)
    }

    /// Tesseract language code; join several with `+` (`"eng+fra"`).
    ///
    /// A NUL byte fails with `InteriorNul` before any native call. Like every
    /// setter, this consumes `self` even then.
    pub fn set_language(self, language: &str) -> Result<Self> {
        let operation = "ocr_config_set_language";
        let Ok(language) = CString::new(language) else {
            // Dropping `self` releases the handle.
            return Err(ExtractousError::InteriorNul { operation });
        };
        self.step(operation, |native, h| unsafe { native.ocr_config_set_language(h, language.as_ptr()) })
    }

    /// Rasterisation density in DPI. Must be positive.
    pub fn set_density(self, dpi: c_int) -> Result<Self> {
        self.step("ocr_config_set_density", |native, h| unsafe { native.ocr_config_set_density(h, dpi) })
    }

    /// Colour depth in bits. Must be positive.
    pub fn set_depth(self, depth: c_int) -> Result<Self> {
        self.step("ocr_config_set_depth", |native, h| unsafe { native.ocr_config_set_depth(h, depth) })
    }

    pub fn set_enable_image_preprocessing(self, value: bool) -> Result<Self> {
        self.step("ocr_config_set_enable_image_preprocessing", |native, h| unsafe {
            native.ocr_config_set_enable_image_preprocessing(h, value)
        })
    }

    /// Per-document OCR time limit; 0 disables it. The only bound on a long
    /// OCR run, since extraction cannot be cancelled.
    pub fn set_timeout_seconds(self, seconds: c_int) -> Result<Self> {
        self.step("ocr_config_set_timeout_seconds", |native, h| unsafe {
            native.ocr_config_set_timeout_seconds(h, seconds)
        })
    }

    pub fn release(&mut self) {
        self.handle.release();
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }

    pub(crate) fn into_handle(self) -> NativeHandle<CTesseractOcrConfig> {
        self.handle
    }

    fn step(
        self,
        operation: &'static str,
        call: impl FnOnce(&dyn extractous_bridge::NativeEngine, *mut CTesseractOcrConfig) -> *mut CTesseractOcrConfig,
    ) -> Result<Self> {
        Ok(Self {
            handle: self.handle.transform(operation, call)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use extractous_bridge::EmulatedEngine;
    use extractous_core::{ErrorKind, ResourceKind};

    fn engine() -> (Arc<EmulatedEngine>, Engine) {
        let emulated = Arc::new(EmulatedEngine::new());
        (emulated.clone(), Engine::from_native(emulated))
    }

    #[test]
    fn long_builder_chain_keeps_one_handle() {
        let (emulated, engine) = engine();
        let config = PdfParserConfig::new(&engine)
            .and_then(|c| c.set_ocr_strategy(PdfOcrStrategy::Auto))
            .and_then(|c| c.set_extract_inline_images(true))
            .and_then(|c| c.set_extract_unique_inline_images_only(false))
            .and_then(|c| c.set_extract_marked_content(true))
            .and_then(|c| c.set_extract_annotation_text(true))
            .unwrap();

        assert_eq!(emulated.live(ResourceKind::PdfConfig), 1);
        drop(config);
        assert_eq!(emulated.live_total(), 0);
        assert_eq!(emulated.invalid_releases(), 0);
        assert_eq!(emulated.stale_uses(), 0);
    }

    #[test]
    fn rejected_value_consumes_the_config() {
        let (emulated, engine) = engine();
        let err = OcrConfig::new(&engine).unwrap().set_density(0).unwrap_err();

        assert!(matches!(err, ExtractousError::HandleRejected { operation: "ocr_config_set_density" }));
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert_eq!(emulated.live_total(), 0);
        assert_eq!(emulated.invalid_releases(), 0);
        assert!(engine.take_debug_report().unwrap().contains("density must be positive"));
    }

    #[test]
    fn nul_in_language_is_refused_locally() {
        let (emulated, engine) = engine();
        let err = OcrConfig::new(&engine).unwrap().set_language("eng\0fra").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StringConversion);
        assert_eq!(emulated.live_total(), 0);
    }

    #[test]
    fn settings_apply_through_builders() {
        let (emulated, engine) = engine();
        let office = OfficeParserConfig::from_settings(&engine, &OfficeSettings::default()).unwrap();
        let ocr = OcrConfig::from_settings(
            &engine,
            &OcrSettings {
                language: "eng+fra".into(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(emulated.live(ResourceKind::OfficeConfig), 1);
        assert_eq!(emulated.live(ResourceKind::OcrConfig), 1);
        drop((office, ocr));
        assert_eq!(emulated.live_total(), 0);
    }

    #[test]
    fn explicit_release_then_drop() {
        let (emulated, engine) = engine();

        let mut pdf = PdfParserConfig::new(&engine).unwrap();
        let mut office = OfficeParserConfig::new(&engine).unwrap();
        let mut ocr = OcrConfig::new(&engine).unwrap().set_language("deu").unwrap();
        assert_eq!(emulated.live_total(), 3);

        pdf.release();
        pdf.release();
        office.release();
        office.release();
        ocr.release();
        ocr.release();
        assert!(pdf.is_released() && office.is_released() && ocr.is_released());
        assert_eq!(emulated.live_total(), 0);

        let calls = emulated.calls();
        drop((pdf, office, ocr));
        assert_eq!(emulated.calls(), calls);
        assert_eq!(emulated.live_total(), 0);
        assert_eq!(emulated.invalid_releases(), 0);
    }
}
