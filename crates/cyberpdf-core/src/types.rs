// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for CyberPDF operations.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CyberPdfError, Result};

/// Unique identifier for a running or cached operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -- Page selection -----------------------------------------------------------

/// Upper bound on the pages one selection may expand to.
pub const MAX_SELECTED_PAGES: usize = 100_000;

/// Parse a page selection such as `"1-5,7,9-12"` into 1-based page numbers.
///
/// Ranges are inclusive and expanded in the order given. Whitespace is
/// ignored. Page counts are not known here; callers validate the upper bound.
pub fn parse_page_selection(input: &str) -> Result<Vec<u32>> {
    let invalid = |reason: &str| CyberPdfError::InvalidPageSelection {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let mut pages = Vec::new();
    for part in input.split(',') {
        let part: String = part.chars().filter(|c| !c.is_whitespace()).collect();
        if part.is_empty() {
            continue;
        }

        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_page_number(start).ok_or_else(|| invalid("bad range start"))?;
                let end = parse_page_number(end).ok_or_else(|| invalid("bad range end"))?;
                if start > end {
                    return Err(invalid("range start is after range end"));
                }
                let span = (end - start) as usize + 1;
                if pages.len() + span > MAX_SELECTED_PAGES {
                    return Err(invalid("selection covers too many pages"));
                }
                pages.extend(start..=end);
            }
            None => {
                let page = parse_page_number(&part).ok_or_else(|| invalid("bad page number"))?;
                if pages.len() >= MAX_SELECTED_PAGES {
                    return Err(invalid("selection covers too many pages"));
                }
                pages.push(page);
            }
        }
    }

    if pages.is_empty() {
        return Err(invalid("no pages given"));
    }
    Ok(pages)
}

fn parse_page_number(text: &str) -> Option<u32> {
    text.parse::<u32>().ok().filter(|page| *page > 0)
}

/// A page taken from one of several input files (both 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub file: usize,
    pub page: u32,
}

/// Parse a custom merge order such as `"1:1,2:1,1:2"` (`file:page`, 1-based).
pub fn parse_page_refs(input: &str) -> Result<Vec<PageRef>> {
    let invalid = |reason: &str| CyberPdfError::InvalidPageSelection {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let mut refs = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (file, page) = part
            .split_once(':')
            .ok_or_else(|| invalid("expected file:page"))?;
        let file = file
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|f| *f > 0)
            .ok_or_else(|| invalid("bad file number"))?;
        let page = parse_page_number(page.trim()).ok_or_else(|| invalid("bad page number"))?;
        refs.push(PageRef { file, page });
    }

    if refs.is_empty() {
        return Err(invalid("no pages given"));
    }
    Ok(refs)
}

// -- Split --------------------------------------------------------------------

/// How a document is divided by the split operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitMode {
    /// Start a new part at each of these 1-based page numbers.
    ByPages(Vec<u32>),
    /// Chunks of this many pages.
    ByCount(u32),
    /// One part per top-level bookmark.
    ByBookmarks,
    /// Break after nearly blank pages.
    Smart,
}

impl SplitMode {
    /// Split points normalised against a document of `total` pages: sorted,
    /// deduplicated, and limited to `2..=total`.
    pub fn normalized_points(points: &[u32], total: u32) -> Vec<u32> {
        points
            .iter()
            .copied()
            .filter(|p| *p > 1 && *p <= total)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// -- Watermark ----------------------------------------------------------------

/// Where the watermark text is anchored on each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatermarkPosition {
    Center,
    Top,
    Bottom,
    Diagonal,
}

impl FromStr for WatermarkPosition {
    type Err = CyberPdfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "center" | "centre" => Ok(Self::Center),
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "diagonal" => Ok(Self::Diagonal),
            other => Err(CyberPdfError::InvalidArgument(format!(
                "unknown watermark position '{other}'"
            ))),
        }
    }
}

/// Text watermark settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkOptions {
    pub text: String,
    pub position: WatermarkPosition,
    /// 0.0 (invisible) to 1.0 (opaque).
    pub opacity: f32,
    pub font_size: f32,
    /// RGB, each channel 0.0 to 1.0.
    pub color: [f32; 3],
    /// 0, 90, 180 or 270. Ignored for [`WatermarkPosition::Diagonal`].
    pub rotation: i32,
}

impl WatermarkOptions {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: WatermarkPosition::Center,
            opacity: 0.3,
            font_size: 48.0,
            color: [0.5, 0.5, 0.5],
            rotation: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(CyberPdfError::InvalidArgument(
                "watermark text is empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(CyberPdfError::InvalidArgument(format!(
                "opacity must be between 0.0 and 1.0, got {}",
                self.opacity
            )));
        }
        if self.font_size <= 0.0 {
            return Err(CyberPdfError::InvalidArgument(
                "font size must be positive".into(),
            ));
        }
        if self.color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(CyberPdfError::InvalidArgument(
                "colour channels must be between 0.0 and 1.0".into(),
            ));
        }
        if ![0, 90, 180, 270].contains(&self.rotation) {
            return Err(CyberPdfError::InvalidArgument(format!(
                "rotation must be 0, 90, 180 or 270, got {}",
                self.rotation
            )));
        }
        Ok(())
    }
}

// -- Security -----------------------------------------------------------------

/// User access permissions stored in the `/P` entry of the encryption
/// dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub print: bool,
    pub modify: bool,
    pub copy: bool,
    pub annotate: bool,
    pub fill_forms: bool,
    pub extract_accessibility: bool,
    pub assemble: bool,
    pub print_high_quality: bool,
}

impl Permissions {
    const PRINT: u32 = 1 << 2;
    const MODIFY: u32 = 1 << 3;
    const COPY: u32 = 1 << 4;
    const ANNOTATE: u32 = 1 << 5;
    const FILL_FORMS: u32 = 1 << 8;
    const EXTRACT_ACCESSIBILITY: u32 = 1 << 9;
    const ASSEMBLE: u32 = 1 << 10;
    const PRINT_HIGH_QUALITY: u32 = 1 << 11;
    /// Bits 7-8 and 13-32 must be set, bits 1-2 clear.
    const RESERVED: u32 = 0xFFFF_F0C0;

    pub fn all() -> Self {
        Self {
            print: true,
            modify: true,
            copy: true,
            annotate: true,
            fill_forms: true,
            extract_accessibility: true,
            assemble: true,
            print_high_quality: true,
        }
    }

    pub fn none() -> Self {
        Self::from_p_value(Self::RESERVED as i32)
    }

    /// The signed 32-bit `/P` value.
    pub fn to_p_value(self) -> i32 {
        let mut bits = Self::RESERVED;
        for (flag, bit) in [
            (self.print, Self::PRINT),
            (self.modify, Self::MODIFY),
            (self.copy, Self::COPY),
            (self.annotate, Self::ANNOTATE),
            (self.fill_forms, Self::FILL_FORMS),
            (self.extract_accessibility, Self::EXTRACT_ACCESSIBILITY),
            (self.assemble, Self::ASSEMBLE),
            (self.print_high_quality, Self::PRINT_HIGH_QUALITY),
        ] {
            if flag {
                bits |= bit;
            }
        }
        bits as i32
    }

    pub fn from_p_value(p: i32) -> Self {
        let bits = p as u32;
        Self {
            print: bits & Self::PRINT != 0,
            modify: bits & Self::MODIFY != 0,
            copy: bits & Self::COPY != 0,
            annotate: bits & Self::ANNOTATE != 0,
            fill_forms: bits & Self::FILL_FORMS != 0,
            extract_accessibility: bits & Self::EXTRACT_ACCESSIBILITY != 0,
            assemble: bits & Self::ASSEMBLE != 0,
            print_high_quality: bits & Self::PRINT_HIGH_QUALITY != 0,
        }
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::all()
    }
}

/// Result of inspecting a document's security settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityReport {
    pub is_encrypted: bool,
    /// Security handler description, e.g. "Standard V5 R6 (AES-256)".
    pub encryption: Option<String>,
    pub permissions: Option<Permissions>,
    pub has_metadata: bool,
    pub metadata_fields: Vec<String>,
    pub has_javascript: bool,
}

// -- Metadata -----------------------------------------------------------------

/// Document information plus a few content statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub page_count: u32,
    pub file_size: u64,
    pub pdf_version: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<DateTime<FixedOffset>>,
    pub modification_date: Option<DateTime<FixedOffset>>,
    pub encrypted: bool,
    /// Distinct base font names, sorted.
    pub fonts: Vec<String>,
    pub image_count: u32,
}

/// Per-page details used by the page arranger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-based page number in the source document.
    pub original_page: u32,
    /// 0-based position in the current arrangement.
    pub current_index: usize,
    pub width: f32,
    pub height: f32,
    pub rotation: i32,
    pub has_images: bool,
    pub has_text: bool,
}

// -- Conversion ---------------------------------------------------------------

/// How PDF to Word conversion is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionMethod {
    /// Best available in-process method.
    Auto,
    /// Text extraction into paragraphs.
    Text,
    /// External office suite. Not available in this build.
    LibreOffice,
}

impl FromStr for ConversionMethod {
    type Err = CyberPdfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "text" => Ok(Self::Text),
            "libreoffice" => Ok(Self::LibreOffice),
            other => Err(CyberPdfError::InvalidArgument(format!(
                "unknown conversion method '{other}'"
            ))),
        }
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

// -- Progress -----------------------------------------------------------------

/// Snapshot of an operation's progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub done: u64,
    /// Zero while the total is still unknown.
    pub total: u64,
    pub message: String,
}

impl Progress {
    /// Completion in `0.0..=1.0`, or `None` while the total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        (self.total > 0).then(|| (self.done.min(self.total)) as f64 / self.total as f64)
    }
}
