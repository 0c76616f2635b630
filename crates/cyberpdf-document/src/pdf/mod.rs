// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading, page assembly, watermarking and creating PDFs.

pub mod assemble;
pub mod objects;
pub mod reader;
pub mod watermark;
pub mod writer;

pub use assemble::assemble;
pub use reader::{Bookmark, PdfReader, SplitPart};
pub use watermark::apply_watermark;
pub use writer::PdfWriter;
