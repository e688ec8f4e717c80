// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pull-based reader over extracted content, and the buffer a read-all returns.

use std::fmt;
use std::io::{self, Read, Write};
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::{self, NonNull};

use extractous_bridge::abi::CStreamReader;
use extractous_core::{DEFAULT_BUFFER_SIZE, Result};

use crate::engine::Engine;
use crate::handle::NativeHandle;

/// Reader over extracted content, in the extractor's output encoding.
///
/// Implements [`Read`]: `Ok(0)` is end of stream, and stays so. Short reads
/// are normal. A native I/O failure surfaces as an `io::Error` of kind
/// `Other` wrapping the [`extractous_core::ExtractousError`]; it does not end
/// the stream. Reading after [`StreamReader::release`] returns `Ok(0)`.
pub struct StreamReader {
    handle: NativeHandle<CStreamReader>,
    finished: bool,
}

impl StreamReader {
    pub(crate) fn new(handle: NativeHandle<CStreamReader>) -> Self {
        Self {
            handle,
            finished: false,
        }
    }

    /// A reader that is already at end of stream and owns nothing.
    pub(crate) fn finished(engine: &Engine) -> Self {
        Self {
            handle: NativeHandle::empty(engine),
            finished: true,
        }
    }

    /// Whether end of stream has been observed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fill `buf` completely in one native call, unless the stream ends
    /// first. Returns the number of bytes written; fewer than `buf.len()`
    /// means end of stream.
    pub fn read_exact_native(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || self.finished {
            return Ok(0);
        }
        let Some(ptr) = self.handle.as_ptr() else {
            return Ok(0);
        };
        let engine = self.handle.engine();
        let mut n = 0;
        // SAFETY: live reader; `buf` is valid for `buf.len()` bytes.
        let code = unsafe { engine.native().stream_read_exact(ptr, buf.as_mut_ptr(), buf.len(), &mut n) };
        engine.check("stream_read_exact", code)?;
        let n = n.min(buf.len());
        if n < buf.len() {
            self.mark_finished();
        }
        Ok(n)
    }

    /// Drain the rest of the stream into one native buffer.
    ///
    /// The buffer is a separate resource with its own release. Afterwards
    /// this reader is at end of stream.
    pub fn read_all(&mut self) -> Result<NativeBuffer> {
        let engine = self.handle.engine().clone();
        if self.finished {
            return Ok(NativeBuffer::empty(&engine));
        }
        let Some(ptr) = self.handle.as_ptr() else {
            return Ok(NativeBuffer::empty(&engine));
        };
        let mut data = ptr::null_mut();
        let mut size = 0;
        // SAFETY: live reader; both out-pointers are valid locals.
        let code = unsafe { engine.native().stream_read_all(ptr, &mut data, &mut size) };
        let buffer = NativeBuffer::adopt(&engine, data, size);
        engine.check("stream_read_all", code)?;
        self.mark_finished();
        Ok(buffer)
    }

    /// Copy the rest of the stream into `out` using a `buffer_size` scratch
    /// buffer. Returns the number of bytes copied.
    pub fn copy_to(&mut self, out: &mut impl Write, buffer_size: usize) -> io::Result<u64> {
        let mut scratch = vec![0u8; buffer_size.max(1)];
        let mut total = 0u64;
        loop {
            let n = self.read(&mut scratch)?;
            if n == 0 {
                return Ok(total);
            }
            out.write_all(&scratch[..n])?;
            total += n as u64;
        }
    }

    /// Read the rest of the stream into an owned vector.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut scratch = vec![0u8; DEFAULT_BUFFER_SIZE];
        loop {
            let n = self.read_native(&mut scratch)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&scratch[..n]);
        }
    }

    /// Release the native reader. Idempotent; later reads return `Ok(0)`.
    pub fn release(&mut self) {
        self.handle.release();
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }

    fn read_native(&mut self, buf: &mut [u8]) -> Result<usize> {
        // Zero capacity: nothing to do, and no evidence of end of stream.
        if buf.is_empty() || self.finished {
            return Ok(0);
        }
        let Some(ptr) = self.handle.as_ptr() else {
            return Ok(0);
        };
        let engine = self.handle.engine();
        let mut n = 0;
        // SAFETY: live reader; `buf` is valid for `buf.len()` bytes.
        let code = unsafe { engine.native().stream_read(ptr, buf.as_mut_ptr(), buf.len(), &mut n) };
        engine.check("stream_read", code)?;
        if n == 0 {
            self.mark_finished();
        }
        Ok(n.min(buf.len()))
    }

    fn mark_finished(&mut self) {
        if !self.finished {
            tracing::trace!("end of stream");
            self.finished = true;
        }
    }
}

impl Read for StreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_native(buf).map_err(io::Error::other)
    }
}

impl fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReader")
            .field("handle", &self.handle)
            .field("finished", &self.finished)
            .finish()
    }
}

/// Bytes returned by [`StreamReader::read_all`], still owned by the engine.
///
/// Dereferences to `[u8]`. Released exactly once, explicitly or on drop.
pub struct NativeBuffer {
    ptr: Option<NonNull<u8>>,
    len: usize,
    engine: Engine,
    _thread_bound: PhantomData<*const ()>,
}

impl NativeBuffer {
    fn adopt(engine: &Engine, ptr: *mut u8, len: usize) -> Self {
        Self {
            ptr: NonNull::new(ptr),
            len,
            engine: engine.clone(),
            _thread_bound: PhantomData,
        }
    }

    fn empty(engine: &Engine) -> Self {
        Self::adopt(engine, ptr::null_mut(), 0)
    }

    /// Release the native allocation. Idempotent; the buffer reads as empty
    /// afterwards.
    pub fn release(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: pointer and size exactly as `stream_read_all` returned them.
            unsafe { self.engine.native().buffer_free(ptr.as_ptr(), self.len) };
            self.len = 0;
        }
    }

    pub fn is_released(&self) -> bool {
        self.ptr.is_none()
    }
}

impl Deref for NativeBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self.ptr {
            // SAFETY: live allocation of `len` bytes owned by this buffer.
            Some(ptr) => unsafe { std::slice::from_raw_parts(ptr.as_ptr(), self.len) },
            None => &[],
        }
    }
}

impl AsRef<[u8]> for NativeBuffer {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl Drop for NativeBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for NativeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBuffer").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use extractous_bridge::EmulatedEngine;
    use extractous_core::{CharSet, ErrorKind, ExtractousError, ResourceKind};

    use crate::extractor::Extractor;

    fn reader(emulated: EmulatedEngine, text: &[u8]) -> (Arc<EmulatedEngine>, StreamReader) {
        let emulated = Arc::new(emulated);
        let engine = Engine::from_native(emulated.clone());
        let extractor = Extractor::new(&engine).unwrap();
        let (reader, _) = extractor.extract_bytes(text).unwrap();
        (emulated, reader)
    }

    #[test]
    fn zero_capacity_read_does_not_touch_the_engine() {
        let (emulated, mut reader) = reader(EmulatedEngine::new(), b"abc");
        let calls = emulated.calls();
        assert_eq!(reader.read(&mut []).unwrap(), 0);
        assert_eq!(emulated.calls(), calls);
        assert!(!reader.is_finished());
    }

    #[test]
    fn end_of_stream_is_latched() {
        let (emulated, mut reader) = reader(EmulatedEngine::new(), b"abc");
        let mut buf = [0u8; 64];
        assert!(reader.read(&mut buf).unwrap() > 0);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert!(reader.is_finished());

        let calls = emulated.calls();
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(emulated.calls(), calls);
    }

    #[test]
    fn short_reads_are_looped_over() {
        let (_, mut reader) = reader(EmulatedEngine::new().with_max_read_chunk(3), b"a longer document");
        let mut first = [0u8; 64];
        assert_eq!(reader.read(&mut first).unwrap(), 3);

        let rest = reader.read_to_vec().unwrap();
        let text = [&first[..3], &rest].concat();
        assert!(String::from_utf8(text).unwrap().contains("a longer document"));
    }

    #[test]
    fn io_fault_does_not_end_the_stream() {
        let (_, mut reader) = reader(EmulatedEngine::new().with_read_fault_after(4), b"faulty stream");
        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);

        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        let inner = err.get_ref().and_then(|e| e.downcast_ref::<ExtractousError>()).unwrap();
        assert_eq!(inner.kind(), ErrorKind::Io);
        assert!(!reader.is_finished());
    }

    #[test]
    fn read_after_release_is_end_of_stream() {
        let (emulated, mut reader) = reader(EmulatedEngine::new(), b"abc");
        reader.release();
        reader.release();
        assert!(reader.is_released());
        assert_eq!(reader.read(&mut [0u8; 8]).unwrap(), 0);
        assert_eq!(emulated.live(ResourceKind::StreamReader), 0);
        assert_eq!(emulated.invalid_releases(), 0);
    }

    #[test]
    fn exact_read_is_short_only_at_the_end() {
        let (_, mut reader) = reader(EmulatedEngine::new().with_max_read_chunk(2), b"0123456789");
        let mut buf = [0u8; 4];
        assert_eq!(reader.read_exact_native(&mut buf).unwrap(), 4);
        assert!(!reader.is_finished());

        let mut big = [0u8; 256];
        let n = reader.read_exact_native(&mut big).unwrap();
        assert!(n < big.len());
        assert!(reader.is_finished());
    }

    #[test]
    fn read_all_buffer_is_released_separately() {
        let (emulated, mut reader) = reader(EmulatedEngine::new(), b"everything at once");
        let mut buffer = reader.read_all().unwrap();
        assert!(reader.is_finished());
        assert!(String::from_utf8_lossy(&buffer).contains("everything at once"));
        assert_eq!(emulated.live(ResourceKind::Buffer), 1);

        drop(reader);
        assert_eq!(emulated.live(ResourceKind::Buffer), 1);
        buffer.release();
        buffer.release();
        assert!(buffer.is_empty());
        drop(buffer);
        assert_eq!(emulated.live_total(), 0);
        assert_eq!(emulated.invalid_releases(), 0);
    }

    #[test]
    fn read_all_at_end_of_stream_owns_nothing() {
        let (emulated, mut reader) = reader(EmulatedEngine::new(), b"drained");
        reader.read_to_vec().unwrap();
        assert!(reader.is_finished());

        let calls = emulated.calls();
        let mut buffer = reader.read_all().unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.is_released());
        buffer.release();
        buffer.release();
        drop(buffer);
        assert_eq!(emulated.calls(), calls);

        reader.release();
        let mut buffer = reader.read_all().unwrap();
        assert!(buffer.is_empty());
        buffer.release();
        drop((reader, buffer));
        assert_eq!(emulated.live_total(), 0);
        assert_eq!(emulated.invalid_releases(), 0);
    }

    #[test]
    fn utf16_stream_decodes() {
        let emulated = Arc::new(EmulatedEngine::new());
        let engine = Engine::from_native(emulated.clone());
        let extractor = Extractor::new(&engine).unwrap().set_encoding(CharSet::Utf16Be).unwrap();
        let (mut reader, _) = extractor.extract_bytes(b"wide").unwrap();

        let bytes = reader.read_to_vec().unwrap();
        let units: Vec<u16> = bytes.chunks_exact(2).map(|p| u16::from_be_bytes([p[0], p[1]])).collect();
        assert!(String::from_utf16(&units).unwrap().contains("wide"));
    }

    #[test]
    fn copy_to_writes_everything() {
        let (_, mut reader) = reader(EmulatedEngine::new().with_max_read_chunk(5), b"copied through");
        let mut out = Vec::new();
        let copied = reader.copy_to(&mut out, 7).unwrap();
        assert_eq!(copied as usize, out.len());
        assert!(String::from_utf8(out).unwrap().contains("copied through"));
    }
}
