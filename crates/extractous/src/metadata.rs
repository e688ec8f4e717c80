// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document metadata: the native block and its owned host-side copy.

use std::collections::HashMap;
use std::collections::hash_map;
use std::ffi::{CStr, c_char};

use extractous_bridge::abi::CMetadata;

use crate::engine::Engine;
use crate::handle::NativeHandle;

/// Split a native multi-value field (`"a, b,c"`) into trimmed parts.
pub fn split_values(raw: &str) -> Vec<String> {
    raw.split(',').map(|part| part.trim().to_string()).collect()
}

/// Metadata of one extracted document: key to one or more values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    fields: HashMap<String, Vec<String>>,
}

impl Metadata {
    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|values| values.first()).map(String::as_str)
    }

    /// Every value of `key`; empty when absent.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.fields.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Keys in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, Vec<String>> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Metadata {
    type Item = (String, Vec<String>);
    type IntoIter = hash_map::IntoIter<String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Metadata {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = hash_map::Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Owner of a native metadata block until it has been copied out.
#[derive(Debug)]
pub(crate) struct NativeMetadata {
    handle: NativeHandle<CMetadata>,
}

impl NativeMetadata {
    pub(crate) fn adopt(engine: &Engine, ptr: *mut CMetadata) -> Option<Self> {
        NativeHandle::adopt(engine, ptr).map(|handle| Self { handle })
    }

    /// Copy the block into an owned [`Metadata`], splitting multi-valued
    /// fields. A released block yields empty metadata.
    pub fn to_metadata(&self) -> Metadata {
        let Some(ptr) = self.handle.as_ptr() else {
            return Metadata::default();
        };
        // SAFETY: a live block from the engine; the arrays hold `len` entries.
        let block = unsafe { &*ptr };
        if block.len == 0 || block.keys.is_null() || block.values.is_null() {
            return Metadata::default();
        }
        // SAFETY: see above.
        let (keys, values) = unsafe {
            (
                std::slice::from_raw_parts(block.keys, block.len),
                std::slice::from_raw_parts(block.values, block.len),
            )
        };
        keys.iter()
            .zip(values)
            .filter_map(|(&key, &value)| {
                let key = read_c_str(key)?;
                let value = read_c_str(value).unwrap_or_default();
                Some((key, split_values(&value)))
            })
            .collect()
    }

    /// Copy out and release in one step.
    pub fn into_metadata(mut self) -> Metadata {
        let metadata = self.to_metadata();
        self.release();
        metadata
    }

    /// Idempotent.
    pub fn release(&mut self) {
        self.handle.release();
    }
}

fn read_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null entries of a metadata block are NUL-terminated strings.
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;
    use std::sync::Arc;

    use extractous_bridge::EmulatedEngine;
    use extractous_core::ResourceKind;

    /// Run a native string extraction and return its metadata block, with
    /// the content already freed.
    fn native_metadata(engine: &Engine, data: &[u8]) -> NativeMetadata {
        let native = engine.native();
        let extractor = native.extractor_new();
        let mut content = ptr::null_mut();
        let mut metadata = ptr::null_mut();
        // SAFETY: a fresh extractor and out pointers to locals.
        let code = unsafe {
            native.extract_bytes_to_string(extractor, data.as_ptr(), data.len(), &mut content, &mut metadata)
        };
        assert_eq!(code, 0);
        // SAFETY: both outputs and the extractor are ours.
        unsafe {
            engine.take_string(content).unwrap();
            native.extractor_free(extractor);
        }
        NativeMetadata::adopt(engine, metadata).unwrap()
    }

    #[test]
    fn block_is_copied_then_released_once() {
        let emulated = Arc::new(EmulatedEngine::new());
        let engine = Engine::from_native(emulated.clone());
        let mut block = native_metadata(&engine, b"Hello");
        assert_eq!(emulated.live(ResourceKind::Metadata), 1);

        let metadata = block.to_metadata();
        assert!(metadata.has("Content-Type"));

        block.release();
        block.release();
        assert!(block.to_metadata().is_empty());
        drop(block);

        assert_eq!(emulated.live_total(), 0);
        assert_eq!(emulated.invalid_releases(), 0);
    }

    #[test]
    fn into_metadata_releases_the_block() {
        let emulated = Arc::new(EmulatedEngine::new());
        let engine = Engine::from_native(emulated.clone());
        let metadata = native_metadata(&engine, b"Hello").into_metadata();

        assert!(!metadata.is_empty());
        assert_eq!(emulated.live_total(), 0);
        assert_eq!(emulated.invalid_releases(), 0);
    }

    #[test]
    fn split_trims_every_part() {
        assert_eq!(split_values("a, b,c"), vec!["a", "b", "c"]);
        assert_eq!(split_values("single"), vec!["single"]);
    }

    #[test]
    fn lookups() {
        let metadata: Metadata = [
            ("author".to_string(), split_values("Ada, Grace")),
            ("title".to_string(), split_values("Notes")),
        ]
        .into_iter()
        .collect();

        assert_eq!(metadata.get("author"), Some("Ada"));
        assert_eq!(metadata.get_all("author"), ["Ada", "Grace"]);
        assert!(metadata.get_all("missing").is_empty());
        assert!(metadata.has("title"));
        assert_eq!(metadata.get("missing"), None);

        let mut keys: Vec<_> = metadata.keys().collect();
        keys.sort_unstable();
        assert_eq!(keys, ["author", "title"]);
    }
}
