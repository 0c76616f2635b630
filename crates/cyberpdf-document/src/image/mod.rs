// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — extraction of embedded page images.

pub mod extract;

pub use extract::{ExtractedImage, ImageKind, extract_images};
