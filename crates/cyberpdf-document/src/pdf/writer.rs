// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — create new PDF documents from text using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use cyberpdf_core::PaperSize;
use cyberpdf_core::error::Result;
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, TextItem,
};
use tracing::{debug, info, instrument};

/// Creates new PDF documents from text content.
pub struct PdfWriter {
    /// Paper size for page creation.
    paper_size: PaperSize,
    /// Title metadata embedded in the PDF /Info dictionary.
    title: Option<String>,
    font_size_pt: f32,
    line_height_pt: f32,
}

impl PdfWriter {
    /// Create a new writer targeting the given paper size.
    pub fn new(paper_size: PaperSize) -> Self {
        Self {
            paper_size,
            title: None,
            font_size_pt: 11.0,
            line_height_pt: 14.0,
        }
    }

    /// Create a new writer defaulting to A4.
    pub fn a4() -> Self {
        Self::new(PaperSize::A4)
    }

    /// Set a title for the PDF metadata.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Paper dimensions in printpdf's Mm units.
    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    /// Lay out `text` in Helvetica, top to bottom.
    ///
    /// Long lines are wrapped at an estimated character width and pages break
    /// automatically. Empty input yields a single blank page.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub fn create_from_text(&self, text: &str) -> Result<Vec<u8>> {
        let (page_w, page_h) = self.page_dimensions();
        let title = self.title.as_deref().unwrap_or("CyberPDF Document");

        info!(paper = ?self.paper_size, title, "creating text PDF");

        let margin_mm: f32 = 20.0;
        let margin_pt: f32 = Mm(margin_mm).into_pt().0;
        let usable_width_mm = page_w.0 - 2.0 * margin_mm;

        // Average Helvetica glyph width is roughly half the font size
        // (1pt = 0.3528mm).
        let avg_char_width_mm: f32 = 0.50 * self.font_size_pt * 0.3528;
        let max_chars_per_line = ((usable_width_mm / avg_char_width_mm) as usize).max(1);

        let wrapped_lines = wrap_text(text, max_chars_per_line);
        let page_h_pt = page_h.into_pt().0;
        let usable_height_pt = page_h_pt - 2.0 * margin_pt;
        let lines_per_page = ((usable_height_pt / self.line_height_pt) as usize).max(1);

        let mut doc = PdfDocument::new(title);
        let mut pages: Vec<PdfPage> = wrapped_lines
            .chunks(lines_per_page)
            .map(|chunk| {
                let ops = chunk
                    .iter()
                    .enumerate()
                    .filter(|(_, line)| !line.is_empty())
                    .flat_map(|(line_idx, line)| {
                        let y_pt = page_h_pt - margin_pt - (line_idx as f32 * self.line_height_pt);
                        self.line_ops(line, margin_pt, y_pt)
                    })
                    .collect();
                PdfPage::new(page_w, page_h, ops)
            })
            .collect();

        if pages.is_empty() {
            pages.push(PdfPage::new(page_w, page_h, Vec::new()));
        }

        doc.with_pages(pages);

        debug!(
            total_lines = wrapped_lines.len(),
            pages = doc.pages.len(),
            "text layout complete"
        );

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        Ok(doc.save(&PdfSaveOptions::default(), &mut warnings))
    }

    /// Lay out paragraphs separated by an empty line.
    pub fn create_from_paragraphs<S: AsRef<str>>(&self, paragraphs: &[S]) -> Result<Vec<u8>> {
        let text = paragraphs
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n\n");
        self.create_from_text(&text)
    }

    fn line_ops(&self, line: &str, x_pt: f32, y_pt: f32) -> [Op; 5] {
        [
            Op::StartTextSection,
            Op::SetTextCursor {
                pos: Point {
                    x: Pt(x_pt),
                    y: Pt(y_pt),
                },
            },
            Op::SetFontSizeBuiltinFont {
                size: Pt(self.font_size_pt),
                font: BuiltinFont::Helvetica,
            },
            Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(line.to_string())],
                font: BuiltinFont::Helvetica,
            },
            Op::EndTextSection,
        ]
    }
}

// -- Text wrapping helper -----------------------------------------------------

/// Wrap a multi-line string so that no line exceeds `max_width` characters.
///
/// Splits on existing newlines first, then performs simple word-wrap within each
/// paragraph. Words longer than `max_width` are force-broken.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for paragraph in text.lines() {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        let mut current_len = 0;

        for word in words {
            let word_len = word.chars().count();
            if word_len > max_width {
                if !current_line.is_empty() {
                    result.push(std::mem::take(&mut current_line));
                }
                let chars: Vec<char> = word.chars().collect();
                let mut chunks = chars.chunks(max_width).peekable();
                while let Some(chunk) = chunks.next() {
                    let piece: String = chunk.iter().collect();
                    if chunks.peek().is_some() {
                        result.push(piece);
                    } else {
                        current_len = chunk.len();
                        current_line = piece;
                    }
                }
            } else if current_line.is_empty() {
                current_line.push_str(word);
                current_len = word_len;
            } else if current_len + 1 + word_len <= max_width {
                current_line.push(' ');
                current_line.push_str(word);
                current_len += 1 + word_len;
            } else {
                result.push(std::mem::replace(&mut current_line, word.to_string()));
                current_len = word_len;
            }
        }

        if !current_line.is_empty() {
            result.push(current_line);
        }
    }

    result
}
