// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extractous binding: error taxonomy, ABI constants and configuration shared
// by the bridge and the safe API.

pub mod config;
pub mod error;
pub mod messages;
pub mod types;

pub use config::{BindingConfig, EngineKind, ExtractorSettings, OcrSettings, OfficeSettings, PdfSettings};
pub use error::{ErrorCategory, ErrorKind, ExtractousError, Result};
pub use types::*;
