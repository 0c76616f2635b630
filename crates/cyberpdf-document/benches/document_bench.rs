// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for page assembly, watermarking and Word conversion
// in the cyberpdf-document crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use cyberpdf_core::types::{ConversionMethod, SplitMode, WatermarkOptions};
use cyberpdf_document::PdfReader;
use cyberpdf_document::convert::pdf_to_docx;
use cyberpdf_document::pdf::apply_watermark;
use cyberpdf_document::sample::{sample_pages, save};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Plan a split of a 50-page document into chunks of 5 and build every part.
fn bench_split_parts(c: &mut Criterion) {
    let reader = PdfReader::from_bytes(&save(&mut sample_pages(50))).unwrap();

    c.bench_function("split by count (50 pages, 5 per part)", |b| {
        b.iter(|| {
            let parts = reader.split_plan(black_box(&SplitMode::ByCount(5))).unwrap();
            for part in &parts {
                black_box(reader.extract_pages(&part.pages).unwrap());
            }
        });
    });
}

/// Stamp a watermark on 20 pages.
fn bench_watermark(c: &mut Criterion) {
    let document = sample_pages(20);
    let options = WatermarkOptions::new("CONFIDENTIAL");

    c.bench_function("watermark (20 pages)", |b| {
        b.iter(|| {
            let mut doc = document.clone();
            black_box(apply_watermark(&mut doc, black_box(&options)).unwrap());
        });
    });
}

/// Text extraction plus DOCX packaging for a 10-page document.
fn bench_pdf_to_docx(c: &mut Criterion) {
    let reader = PdfReader::from_bytes(&save(&mut sample_pages(10))).unwrap();

    c.bench_function("pdf to docx (10 pages)", |b| {
        b.iter(|| black_box(pdf_to_docx(&reader, ConversionMethod::Text).unwrap()));
    });
}

criterion_group!(benches, bench_split_parts, bench_watermark, bench_pdf_to_docx);
criterion_main!(benches);
