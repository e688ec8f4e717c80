// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-owner wrapper around an opaque native pointer.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use extractous_bridge::NativeEngine;
use extractous_bridge::abi::{
    CExtractor, CMetadata, COfficeParserConfig, CPdfParserConfig, CStreamReader,
    CTesseractOcrConfig,
};
use extractous_core::{ExtractousError, ResourceKind, Result};

use crate::engine::Engine;

/// A native resource kind with exactly one release call.
pub trait Release {
    const KIND: ResourceKind;

    /// # Safety
    /// `ptr` must be a live, non-consumed handle created by `engine`.
    unsafe fn release(engine: &dyn NativeEngine, ptr: *mut Self);
}

impl Release for CExtractor {
    const KIND: ResourceKind = ResourceKind::Extractor;

    unsafe fn release(engine: &dyn NativeEngine, ptr: *mut Self) {
        unsafe { engine.extractor_free(ptr) }
    }
}

impl Release for CPdfParserConfig {
    const KIND: ResourceKind = ResourceKind::PdfConfig;

    unsafe fn release(engine: &dyn NativeEngine, ptr: *mut Self) {
        unsafe { engine.pdf_config_free(ptr) }
    }
}

impl Release for COfficeParserConfig {
    const KIND: ResourceKind = ResourceKind::OfficeConfig;

    unsafe fn release(engine: &dyn NativeEngine, ptr: *mut Self) {
        unsafe { engine.office_config_free(ptr) }
    }
}

impl Release for CTesseractOcrConfig {
    const KIND: ResourceKind = ResourceKind::OcrConfig;

    unsafe fn release(engine: &dyn NativeEngine, ptr: *mut Self) {
        unsafe { engine.ocr_config_free(ptr) }
    }
}

impl Release for CStreamReader {
    const KIND: ResourceKind = ResourceKind::StreamReader;

    unsafe fn release(engine: &dyn NativeEngine, ptr: *mut Self) {
        unsafe { engine.stream_free(ptr) }
    }
}

impl Release for CMetadata {
    const KIND: ResourceKind = ResourceKind::Metadata;

    unsafe fn release(engine: &dyn NativeEngine, ptr: *mut Self) {
        unsafe { engine.metadata_free(ptr) }
    }
}

/// Exclusive owner of one native handle.
///
/// The pointer is released exactly once: by [`NativeHandle::release`] or, if
/// the owner forgets, on drop. A handle handed to a consuming native call is
/// taken out first, so neither path can touch it again. Neither `Send` nor
/// `Sync`: a handle stays on the thread that created it.
pub struct NativeHandle<T: Release> {
    ptr: Option<NonNull<T>>,
    engine: Engine,
    _thread_bound: PhantomData<*const ()>,
}

impl<T: Release> NativeHandle<T> {
    /// Take ownership of a pointer just returned by the engine. Null yields `None`.
    pub(crate) fn adopt(engine: &Engine, ptr: *mut T) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        tracing::trace!(kind = %T::KIND, addr = ptr.as_ptr() as usize, "adopted native handle");
        Some(Self {
            ptr: Some(ptr),
            engine: engine.clone(),
            _thread_bound: PhantomData,
        })
    }

    /// A wrapper that owns nothing, as if already released.
    pub(crate) fn empty(engine: &Engine) -> Self {
        Self {
            ptr: None,
            engine: engine.clone(),
            _thread_bound: PhantomData,
        }
    }

    pub(crate) fn as_ptr(&self) -> Option<*mut T> {
        self.ptr.map(NonNull::as_ptr)
    }

    /// Like [`NativeHandle::as_ptr`], failing with `Released` for `operation`.
    pub(crate) fn live(&self, operation: &'static str) -> Result<*mut T> {
        self.as_ptr().ok_or_else(|| self.released(operation))
    }

    /// The `Released` error for `operation`. Clears this thread's debug
    /// report, which belongs to an earlier failure.
    pub(crate) fn released(&self, operation: &'static str) -> ExtractousError {
        self.engine.clear_debug_report();
        ExtractousError::Released { operation }
    }

    /// Give up ownership because a native call is about to consume the pointer.
    pub(crate) fn take(&mut self) -> Option<*mut T> {
        self.ptr.take().map(NonNull::as_ptr)
    }

    /// One consuming-builder step: hand the pointer to `call`, adopt what it
    /// returns. The old pointer is never touched again, whatever the outcome.
    pub(crate) fn transform(
        mut self,
        operation: &'static str,
        call: impl FnOnce(&dyn NativeEngine, *mut T) -> *mut T,
    ) -> Result<Self> {
        let engine = self.engine.clone();
        let Some(old) = self.take() else {
            return Err(self.released(operation));
        };
        let new = call(engine.native(), old);
        match Self::adopt(&engine, new) {
            Some(handle) => Ok(handle),
            None => {
                tracing::warn!(operation, kind = %T::KIND, "native setter returned null; input handle consumed");
                Err(ExtractousError::HandleRejected { operation })
            }
        }
    }

    /// Release the native object. Idempotent.
    pub fn release(&mut self) {
        if let Some(ptr) = self.take() {
            tracing::trace!(kind = %T::KIND, addr = ptr as usize, "releasing native handle");
            // SAFETY: we owned `ptr` exclusively and have just given that up.
            unsafe { T::release(self.engine.native(), ptr) };
        }
    }

    pub fn is_released(&self) -> bool {
        self.ptr.is_none()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl<T: Release> Drop for NativeHandle<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: Release> fmt::Debug for NativeHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("kind", &T::KIND)
            .field("ptr", &self.ptr)
            .finish()
    }
}
