// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extractous smoke run: versions, a string extraction, a streamed extraction
// and the error path, against whichever engine the configuration selects.
//
// Environment:
//   EXTRACTOUS_CONFIG      JSON binding configuration (defaults otherwise)
//   EXTRACTOUS_SMOKE_FILE  document to extract instead of the built-in text
//   RUST_LOG               log filter (default "info")

use std::io::Read;
use std::process::ExitCode;

use extractous::{BindingConfig, Engine, Extractor, Metadata, Result, messages};

const SAMPLE: &[u8] = b"Hello, World!";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Extractous smoke run starting");

    match run() {
        Ok(()) => {
            tracing::info!("smoke run passed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let help = messages::guidance(&e);
            tracing::error!(
                error = %e,
                code = e.code(),
                category = e.category().as_str(),
                suggestion = %help.suggestion,
                "smoke run failed"
            );
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let config = match std::env::var_os("EXTRACTOUS_CONFIG") {
        Some(path) => BindingConfig::load(path)?,
        None => BindingConfig::default(),
    };
    config.validate()?;

    let engine = Engine::new(config.engine)?;
    tracing::info!(
        engine = engine.name(),
        ffi = %engine.ffi_version(),
        core = %engine.core_version(),
        "engine loaded"
    );

    let extractor = Extractor::from_settings(&engine, &config.extractor)?;
    let file = std::env::var_os("EXTRACTOUS_SMOKE_FILE");

    // -- string path --
    let (content, metadata) = match &file {
        Some(path) => extractor.extract_file_to_string(path)?,
        None => extractor.extract_bytes_to_string(SAMPLE)?,
    };
    tracing::info!(chars = content.chars().count(), "string extraction");
    tracing::debug!(%content);
    log_metadata(&metadata);

    // -- stream path --
    let (mut reader, _) = match &file {
        Some(path) => extractor.extract_file(path)?,
        None => extractor.extract_bytes(SAMPLE)?,
    };
    let mut chunk = vec![0u8; config.read_buffer_size];
    let mut total = 0usize;
    let mut reads = 0usize;
    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        total += n;
        reads += 1;
    }
    reader.release();
    tracing::info!(bytes = total, reads, "stream extraction");

    // -- error path --
    match extractor.extract_bytes_to_string(b"%PDF-1.7\n") {
        Ok(_) => tracing::info!("PDF accepted by this engine"),
        Err(e) => {
            let report = engine.take_debug_report();
            tracing::info!(
                error = %e,
                category = e.category().as_str(),
                report_available = report.is_some(),
                "expected failure observed"
            );
            if engine.take_debug_report().is_some() {
                tracing::warn!("debug report still stored after being taken");
            }
        }
    }

    Ok(())
}

fn log_metadata(metadata: &Metadata) {
    let mut keys: Vec<_> = metadata.keys().collect();
    keys.sort_unstable();
    for key in keys {
        tracing::info!(key, values = ?metadata.get_all(key), "metadata");
    }
}
