// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// An extractor pinned to one dedicated OS thread.
//
// Native handles must stay on the thread that created them. When a caller
// needs to drive one extractor from several threads, this type owns a worker
// thread that builds the extractor, runs every job on it, and releases it
// there when the worker stops. Only owned results cross back.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use extractous_core::{ExtractousError, Result};

use crate::engine::Engine;
use crate::extractor::Extractor;
use crate::metadata::Metadata;

type Job = Box<dyn FnOnce(&Extractor) + Send>;

/// An [`Extractor`] living on its own thread. `Send + Sync`.
pub struct PinnedExtractor {
    jobs: Option<mpsc::Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    engine: Engine,
}

impl PinnedExtractor {
    /// Start the worker and build the extractor on it with `build`.
    ///
    /// Returns once the extractor exists, or with the error `build` produced.
    pub fn spawn<F>(engine: &Engine, build: F) -> Result<Self>
    where
        F: FnOnce(&Engine) -> Result<Extractor> + Send + 'static,
    {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let worker_engine = engine.clone();

        let worker = thread::Builder::new()
            .name("extractous-pinned".into())
            .spawn(move || {
                let extractor = match build(&worker_engine) {
                    Ok(extractor) => extractor,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                tracing::debug!("pinned extractor ready");

                for job in job_rx {
                    job(&extractor);
                }
                drop(extractor);
                tracing::debug!("pinned extractor stopped");
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                jobs: Some(job_tx),
                worker: Some(worker),
                engine: engine.clone(),
            }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(ExtractousError::WorkerStopped)
            }
        }
    }

    /// Run `job` against the pinned extractor and wait for its result.
    ///
    /// Debug reports are thread-scoped, so a failure's report is only
    /// available from inside the job, through `extractor.engine()`.
    ///
    /// A job that panics yields [`ExtractousError::JobPanicked`]; the worker
    /// and its extractor stay up for the next job.
    pub fn run<R, F>(&self, job: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&Extractor) -> Result<R> + Send + 'static,
    {
        let jobs = self.jobs.as_ref().ok_or(ExtractousError::WorkerStopped)?;
        let (reply_tx, reply_rx) = mpsc::channel();
        jobs.send(Box::new(move |extractor: &Extractor| {
            let reply = panic::catch_unwind(AssertUnwindSafe(|| job(extractor)))
                .unwrap_or_else(|payload| {
                    let detail = panic_detail(payload.as_ref());
                    tracing::warn!(%detail, "pinned extraction job panicked");
                    Err(ExtractousError::JobPanicked(detail))
                });
            let _ = reply_tx.send(reply);
        }))
        .map_err(|_| ExtractousError::WorkerStopped)?;
        reply_rx.recv().map_err(|_| ExtractousError::WorkerStopped)?
    }

    pub fn extract_bytes_to_string(&self, data: Vec<u8>) -> Result<(String, Metadata)> {
        self.run(move |extractor| extractor.extract_bytes_to_string(&data))
    }

    /// Stream the document on the worker and collect it.
    pub fn extract_bytes_to_vec(&self, data: Vec<u8>) -> Result<(Vec<u8>, Metadata)> {
        self.run(move |extractor| {
            let (mut reader, metadata) = extractor.extract_bytes(&data)?;
            Ok((reader.read_to_vec()?, metadata))
        })
    }

    pub fn extract_file_to_string(&self, path: impl Into<PathBuf>) -> Result<(String, Metadata)> {
        let path = path.into();
        self.run(move |extractor| extractor.extract_file_to_string(&path))
    }

    pub fn extract_url_to_string(&self, url: impl Into<String>) -> Result<(String, Metadata)> {
        let url = url.into();
        self.run(move |extractor| extractor.extract_url_to_string(&url))
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Stop the worker, releasing the extractor on its own thread. Idempotent.
    pub fn shutdown(&mut self) {
        drop(self.jobs.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("pinned extractor worker panicked");
            }
        }
    }

    /// True while the worker thread is alive and accepting jobs.
    pub fn is_running(&self) -> bool {
        self.jobs.is_some() && self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Drop for PinnedExtractor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for PinnedExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedExtractor")
            .field("engine", &self.engine)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use extractous_bridge::EmulatedEngine;
    use extractous_core::{ErrorKind, PdfOcrStrategy};

    use crate::config::PdfParserConfig;

    #[test]
    fn pinned_extractor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PinnedExtractor>();
    }

    #[test]
    fn jobs_from_many_threads_share_one_extractor() {
        let emulated = Arc::new(EmulatedEngine::new());
        let engine = Engine::from_native(emulated.clone());
        let pinned = Arc::new(
            PinnedExtractor::spawn(&engine, |engine| {
                let pdf = PdfParserConfig::new(engine)?.set_ocr_strategy(PdfOcrStrategy::Auto)?;
                Extractor::new(engine)?.set_pdf_config(pdf)
            })
            .unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let pinned = Arc::clone(&pinned);
                thread::spawn(move || pinned.extract_bytes_to_string(format!("job {i}").into_bytes()))
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            let (content, _) = handle.join().unwrap().unwrap();
            assert!(content.contains(&format!("job {i}")));
        }

        let (bytes, _) = pinned.extract_bytes_to_vec(b"streamed".to_vec()).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("streamed"));

        drop(pinned);
        assert_eq!(emulated.live_total(), 0);
        assert_eq!(emulated.invalid_releases(), 0);
    }

    #[test]
    fn build_failure_is_reported() {
        let emulated = Arc::new(EmulatedEngine::new());
        let engine = Engine::from_native(emulated.clone());
        let err = PinnedExtractor::spawn(&engine, |engine| Extractor::new(engine)?.set_extract_string_max_length(-1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert_eq!(emulated.live_total(), 0);
    }

    #[test]
    fn panicking_job_leaves_the_worker_running() {
        let emulated = Arc::new(EmulatedEngine::new());
        let engine = Engine::from_native(emulated.clone());
        let pinned = PinnedExtractor::spawn(&engine, |engine| Extractor::new(engine)).unwrap();

        let err = pinned.run::<(), _>(|_| panic!("job failed")).unwrap_err();
        assert!(matches!(&err, ExtractousError::JobPanicked(detail) if detail == "job failed"));
        assert_eq!(err.kind(), ErrorKind::ExtractionFailed);
        assert!(pinned.is_running());

        let (content, _) = pinned.extract_bytes_to_string(b"after the panic".to_vec()).unwrap();
        assert!(content.contains("after the panic"));

        drop(pinned);
        assert_eq!(emulated.live_total(), 0);
        assert_eq!(emulated.invalid_releases(), 0);
    }

    #[test]
    fn jobs_after_shutdown_fail() {
        let engine = Engine::from_native(Arc::new(EmulatedEngine::new()));
        let mut pinned = PinnedExtractor::spawn(&engine, |engine| Extractor::new(engine)).unwrap();
        pinned.shutdown();
        pinned.shutdown();
        assert!(!pinned.is_running());
        assert!(matches!(
            pinned.extract_bytes_to_string(b"late".to_vec()),
            Err(ExtractousError::WorkerStopped)
        ));
    }
}
