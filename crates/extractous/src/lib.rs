// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extractous: ownership-checked document extraction over the native engine.
//
// Every native resource is owned by exactly one wrapper and released exactly
// once. Configuration setters consume their receiver, extraction outputs are
// copied into owned values or wrapped in single-owner readers, and no handle
// wrapper can leave the thread that created it.

pub mod config;
pub mod engine;
pub mod extractor;
pub mod handle;
pub mod metadata;
pub mod pinned;
pub mod stream;

pub use config::{OcrConfig, OfficeParserConfig, PdfParserConfig};
pub use engine::Engine;
pub use extractor::Extractor;
pub use handle::{NativeHandle, Release};
pub use metadata::{Metadata, split_values};
pub use pinned::PinnedExtractor;
pub use stream::{NativeBuffer, StreamReader};

pub use extractous_core::{
    BindingConfig, CharSet, EngineKind, ErrorCategory, ErrorKind, ExtractorSettings, ExtractousError,
    OcrSettings, OfficeSettings, PdfOcrStrategy, PdfSettings, Result, messages,
};
