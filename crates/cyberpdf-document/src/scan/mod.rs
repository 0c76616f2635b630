// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanned pages: collecting the page images text recognition works on, and
// optical character recognition (OCR) behind the `ocr` feature.

#[cfg(feature = "ocr")]
pub mod ocr;

use image::DynamicImage;
use lopdf::Document;
use tracing::debug;

use crate::image::extract::extract_images;

#[cfg(feature = "ocr")]
pub use ocr::{OcrEngine, OcrModels, models_available};

/// Decodable images on one 1-based page, in resource order. Images that
/// cannot be decoded to pixels are left out.
pub fn page_scans(document: &Document, page: u32) -> Vec<DynamicImage> {
    let scans: Vec<DynamicImage> = extract_images(document, &[page])
        .iter()
        .filter_map(|image| image.decode())
        .collect();
    debug!(page, count = scans.len(), "page scans collected");
    scans
}
