// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binding configuration.

use std::ffi::c_int;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractousError, Result};
use crate::types::{
    CharSet, DEFAULT_BUFFER_SIZE, DEFAULT_OCR_DENSITY, DEFAULT_OCR_DEPTH, DEFAULT_OCR_LANGUAGE,
    DEFAULT_OCR_TIMEOUT_SECONDS, DEFAULT_STRING_MAX_LENGTH, MAX_BUFFER_SIZE, PdfOcrStrategy,
};

/// Which implementation of the native ABI to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// The real `libextractous_ffi`, available with the `linked` feature.
    Linked,
    /// The in-process implementation of the same ABI.
    #[default]
    Emulated,
}

/// Top-level settings, usually loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    pub engine: EngineKind,
    /// Buffer size for stream reads (1 byte to 1 MiB).
    pub read_buffer_size: usize,
    pub extractor: ExtractorSettings,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            read_buffer_size: DEFAULT_BUFFER_SIZE,
            extractor: ExtractorSettings::default(),
        }
    }
}

impl BindingConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 || self.read_buffer_size > MAX_BUFFER_SIZE {
            return Err(ExtractousError::InvalidConfig(format!(
                "read_buffer_size must be between 1 and {MAX_BUFFER_SIZE}, got {}",
                self.read_buffer_size
            )));
        }
        self.extractor.validate()
    }
}

/// Extractor settings. Absent parser sections leave the engine defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    pub max_string_length: c_int,
    pub encoding: CharSet,
    pub xml_output: bool,
    pub pdf: Option<PdfSettings>,
    pub office: Option<OfficeSettings>,
    pub ocr: Option<OcrSettings>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            max_string_length: DEFAULT_STRING_MAX_LENGTH,
            encoding: CharSet::Utf8,
            xml_output: false,
            pdf: None,
            office: None,
            ocr: None,
        }
    }
}

impl ExtractorSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_string_length <= 0 {
            return Err(ExtractousError::InvalidConfig(format!(
                "max_string_length must be positive, got {}",
                self.max_string_length
            )));
        }
        if let Some(ocr) = &self.ocr {
            ocr.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfSettings {
    pub ocr_strategy: PdfOcrStrategy,
    pub extract_inline_images: bool,
    pub extract_unique_inline_images_only: bool,
    pub extract_marked_content: bool,
    pub extract_annotation_text: bool,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            ocr_strategy: PdfOcrStrategy::NoOcr,
            extract_inline_images: false,
            extract_unique_inline_images_only: true,
            extract_marked_content: false,
            extract_annotation_text: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficeSettings {
    pub extract_macros: bool,
    pub include_deleted_content: bool,
    pub include_move_from_content: bool,
    pub include_shape_based_content: bool,
}

impl Default for OfficeSettings {
    fn default() -> Self {
        Self {
            extract_macros: false,
            include_deleted_content: false,
            include_move_from_content: false,
            include_shape_based_content: true,
        }
    }
}

/// Tesseract settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Tesseract language code, `+`-joined for several (`"eng+fra"`).
    pub language: String,
    /// Rasterisation density in DPI.
    pub density: c_int,
    /// Colour depth in bits.
    pub depth: c_int,
    pub enable_image_preprocessing: bool,
    /// Per-document OCR timeout; 0 disables it.
    pub timeout_seconds: c_int,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: DEFAULT_OCR_LANGUAGE.into(),
            density: DEFAULT_OCR_DENSITY,
            depth: DEFAULT_OCR_DEPTH,
            enable_image_preprocessing: false,
            timeout_seconds: DEFAULT_OCR_TIMEOUT_SECONDS,
        }
    }
}

impl OcrSettings {
    pub fn validate(&self) -> Result<()> {
        if self.language.is_empty() || self.language.contains('\0') {
            return Err(ExtractousError::InvalidConfig(
                "ocr.language must be a non-empty language code".into(),
            ));
        }
        if self.density <= 0 {
            return Err(ExtractousError::InvalidConfig(format!(
                "ocr.density must be positive, got {}",
                self.density
            )));
        }
        if self.depth <= 0 {
            return Err(ExtractousError::InvalidConfig(format!(
                "ocr.depth must be positive, got {}",
                self.depth
            )));
        }
        if self.timeout_seconds < 0 {
            return Err(ExtractousError::InvalidConfig(format!(
                "ocr.timeout_seconds must not be negative, got {}",
                self.timeout_seconds
            )));
        }
        Ok(())
    }
}
