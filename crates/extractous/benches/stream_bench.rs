// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for pulling extracted content through the stream
// reader and through the string path, against the emulated engine.

use std::io::Read;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use extractous::{EngineKind, Engine, Extractor};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A plain-text document of roughly `size` bytes.
fn document(size: usize) -> Vec<u8> {
    let line = b"The quick brown fox jumps over the lazy dog.\n";
    line.iter().copied().cycle().take(size).collect()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Read a 1 MiB document through `StreamReader` with different read sizes.
///
/// Small buffers mean many native calls; this is the cost callers trade
/// against memory when choosing `read_buffer_size`.
fn bench_stream_read(c: &mut Criterion) {
    let engine = Engine::new(EngineKind::Emulated).expect("emulated engine");
    let extractor = Extractor::new(&engine).expect("extractor");
    let data = document(1024 * 1024);

    let mut group = c.benchmark_group("stream_read (1 MiB)");
    for buffer_size in [512usize, 4096, 64 * 1024] {
        group.bench_function(format!("buffer {buffer_size}"), |b| {
            let mut buf = vec![0u8; buffer_size];
            b.iter(|| {
                let (mut reader, _) = extractor.extract_bytes(black_box(&data)).expect("extract");
                let mut total = 0;
                loop {
                    let n = reader.read(&mut buf).expect("read");
                    if n == 0 {
                        break;
                    }
                    total += n;
                }
                black_box(total);
            });
        });
    }
    group.finish();
}

/// Compare draining with `read_all` against the string path.
fn bench_read_all_vs_string(c: &mut Criterion) {
    let engine = Engine::new(EngineKind::Emulated).expect("emulated engine");
    let extractor = Extractor::new(&engine).expect("extractor");
    let data = document(256 * 1024);

    c.bench_function("read_all (256 KiB)", |b| {
        b.iter(|| {
            let (mut reader, _) = extractor.extract_bytes(black_box(&data)).expect("extract");
            let buffer = reader.read_all().expect("read_all");
            black_box(buffer.len());
        });
    });

    c.bench_function("to_string (256 KiB)", |b| {
        b.iter(|| {
            let (content, metadata) = extractor.extract_bytes_to_string(black_box(&data)).expect("extract");
            black_box((content.len(), metadata.len()));
        });
    });
}

criterion_group!(benches, bench_stream_read, bench_read_all_vs_string);
criterion_main!(benches);
