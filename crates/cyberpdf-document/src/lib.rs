// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// cyberpdf-document — Document processing for CyberPDF.
//
// Provides PDF operations (split, merge, rotate, arrange, extract text and
// images, metadata, watermark), an undoable page arranger, conversion
// between PDF and Word documents, and OCR of scanned pages behind the `ocr`
// feature.

pub mod arranger;
pub mod convert;
pub mod image;
pub mod operations;
pub mod pdf;
pub mod sample;
pub mod scan;

// Re-export the primary structs so callers can use `cyberpdf_document::PdfReader` etc.
pub use arranger::PageArranger;
pub use crate::image::extract::{ExtractedImage, ImageKind};
pub use pdf::reader::{Bookmark, PdfReader, SplitPart};
pub use pdf::writer::PdfWriter;

#[cfg(feature = "ocr")]
pub use scan::ocr::{OcrEngine, OcrModels};
