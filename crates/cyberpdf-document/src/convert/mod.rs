// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion between PDF and Word documents.
//
// PDF to Word keeps text only: one paragraph per non-empty line, with page
// breaks between pages. Word to PDF lays the paragraph text out with
// `PdfWriter`.

pub mod docx;

use cyberpdf_core::error::{CyberPdfError, Result};
use cyberpdf_core::types::ConversionMethod;
use tracing::{debug, instrument, warn};

use crate::pdf::reader::PdfReader;
use crate::pdf::writer::PdfWriter;

pub use docx::{DocxBuilder, read_paragraphs, read_title};

/// Build a `.docx` package from the text of `reader`.
///
/// Pages whose text cannot be extracted are treated as empty.
#[instrument(skip(reader), fields(pages = reader.page_count()))]
pub fn pdf_to_docx(reader: &PdfReader, method: ConversionMethod) -> Result<Vec<u8>> {
    if method == ConversionMethod::LibreOffice {
        return Err(CyberPdfError::UnsupportedConversion(
            "LibreOffice conversion is not available in this build; use 'auto' or 'text'".into(),
        ));
    }

    let mut builder = DocxBuilder::new();
    if let Some(title) = reader.title() {
        builder.title(&title);
    }

    let mut wrote_page = false;
    for page in 1..=reader.page_count() {
        let text = reader.page_text(page).unwrap_or_else(|err| {
            warn!(page, %err, "no text extracted from page");
            String::new()
        });
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.is_empty() {
            continue;
        }
        if wrote_page {
            builder.page_break();
        }
        for line in lines {
            builder.paragraph(line);
        }
        wrote_page = true;
    }

    debug!(paragraphs = builder.paragraph_count(), "document body built");
    builder.to_bytes()
}

/// Lay out the paragraphs of a `.docx` package as an A4 PDF.
#[instrument(skip_all, fields(len = package.len()))]
pub fn docx_to_pdf(package: &[u8]) -> Result<Vec<u8>> {
    let paragraphs = read_paragraphs(package)?;
    let mut writer = PdfWriter::a4();
    if let Some(title) = read_title(package)? {
        writer.set_title(title);
    }
    let paragraphs: Vec<&str> = paragraphs
        .iter()
        .map(String::as_str)
        .filter(|p| !p.trim().is_empty())
        .collect();
    debug!(paragraphs = paragraphs.len(), "laying out Word paragraphs");
    writer.create_from_paragraphs(&paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{document_with_texts, sample_document, save};

    fn reader(mut doc: lopdf::Document) -> PdfReader {
        PdfReader::from_bytes(&save(&mut doc)).unwrap()
    }

    #[test]
    fn pdf_becomes_titled_paragraphs() {
        let bytes = pdf_to_docx(&reader(sample_document()), ConversionMethod::Auto).unwrap();
        let paragraphs = read_paragraphs(&bytes).unwrap();

        assert_eq!(paragraphs[0], "Quarterly report");
        assert!(paragraphs.iter().any(|p| p.contains("Page 1")));
        assert!(paragraphs.iter().any(|p| p.contains("Page 3")));
        // Three pages give two page-break paragraphs.
        assert_eq!(paragraphs.iter().filter(|p| p.is_empty()).count(), 2);
        assert_eq!(read_title(&bytes).unwrap().as_deref(), Some("Quarterly report"));
    }

    #[test]
    fn empty_pages_get_no_break() {
        let doc = document_with_texts(&["First", "", "Last"]);
        let bytes = pdf_to_docx(&reader(doc), ConversionMethod::Text).unwrap();
        let paragraphs = read_paragraphs(&bytes).unwrap();
        assert_eq!(paragraphs, vec!["First", "", "Last"]);
    }

    #[test]
    fn libreoffice_is_rejected() {
        let result = pdf_to_docx(&reader(sample_document()), ConversionMethod::LibreOffice);
        assert!(matches!(result, Err(CyberPdfError::UnsupportedConversion(_))));
    }

    #[test]
    fn word_document_becomes_pdf() {
        let mut builder = DocxBuilder::new();
        builder.title("Notes").paragraph("alpha beta").paragraph("gamma");
        let pdf = docx_to_pdf(&builder.to_bytes().unwrap()).unwrap();

        let reader = PdfReader::from_bytes(&pdf).unwrap();
        assert_eq!(reader.page_count(), 1);
    }
}
