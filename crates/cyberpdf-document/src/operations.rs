// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File-level document operations.
//
// Each operation reads its input, reports progress, checks for cancellation
// between units of work and writes its result atomically, so a failed or
// cancelled run leaves no output behind.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use cyberpdf_core::error::{CyberPdfError, Result};
use cyberpdf_core::output::{OutputBatch, write_atomic, write_bytes_atomic};
use cyberpdf_core::runner::ProgressReporter;
use cyberpdf_core::types::{ConversionMethod, PageRef, PdfMetadata, SplitMode, WatermarkOptions};
use lopdf::Document;
use tracing::{info, instrument};

use crate::convert::{docx_to_pdf, pdf_to_docx};
use crate::image::extract::extract_images as collect_images;
use crate::pdf::assemble::{PageSource, assemble};
use crate::pdf::objects::pdf_error;
use crate::pdf::reader::{PdfReader, rotate_pages};
use crate::pdf::watermark::apply_watermark;

fn save_document(document: &mut Document, output: impl AsRef<Path>) -> Result<PathBuf> {
    write_atomic(output, |mut w| {
        document
            .save_to(&mut w)
            .map_err(|e| pdf_error("failed to write PDF", e))?;
        Ok(())
    })
}

/// Split `input` into several files inside `output_dir`.
#[instrument(skip_all, fields(input = %input.as_ref().display(), mode = ?mode))]
pub fn split(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    mode: &SplitMode,
    reporter: &ProgressReporter,
) -> Result<Vec<PathBuf>> {
    let reader = PdfReader::open(input)?;
    let parts = reader.split_plan(mode)?;
    reporter.set_total(parts.len() as u64);

    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;

    let mut batch = OutputBatch::new();
    for part in &parts {
        reporter.checkpoint()?;
        let mut document = reader.extract_pages(&part.pages)?;
        batch.write(output_dir.join(&part.file_name), |mut w| {
            document
                .save_to(&mut w)
                .map_err(|e| pdf_error("failed to write PDF", e))?;
            Ok(())
        })?;
        reporter.advance(format!("wrote {}", part.file_name));
    }

    let written = batch.finish();
    info!(parts = written.len(), "PDF split");
    Ok(written)
}

/// Merge `inputs` into `output`.
///
/// Without `order` every page of every input is appended in turn. With
/// `order`, exactly the listed `(file, page)` pairs are copied, both 1-based.
#[instrument(skip_all, fields(inputs = inputs.len(), output = %output.as_ref().display()))]
pub fn merge<P: AsRef<Path>>(
    inputs: &[P],
    output: impl AsRef<Path>,
    order: Option<&[PageRef]>,
    reporter: &ProgressReporter,
) -> Result<PathBuf> {
    if inputs.is_empty() {
        return Err(CyberPdfError::InvalidArgument(
            "at least one input file is required".into(),
        ));
    }
    reporter.set_total(inputs.len() as u64 + 1);

    let mut readers = Vec::with_capacity(inputs.len());
    for input in inputs {
        reporter.checkpoint()?;
        readers.push(PdfReader::open(input)?);
        reporter.advance(format!("loaded {}", input.as_ref().display()));
    }

    let pages: Vec<PageSource> = match order {
        None => readers
            .iter()
            .enumerate()
            .flat_map(|(i, reader)| {
                reader
                    .document()
                    .get_pages()
                    .into_values()
                    .map(move |id| (i, id))
            })
            .collect(),
        Some(order) => order
            .iter()
            .map(|page_ref| -> Result<PageSource> {
                let reader = page_ref
                    .file
                    .checked_sub(1)
                    .and_then(|i| readers.get(i))
                    .ok_or_else(|| {
                        CyberPdfError::InvalidArgument(format!(
                            "file {} out of range ({} inputs)",
                            page_ref.file,
                            readers.len()
                        ))
                    })?;
                Ok((page_ref.file - 1, reader.page_id(page_ref.page)?))
            })
            .collect::<Result<_>>()?,
    };
    if pages.is_empty() {
        return Err(CyberPdfError::InvalidArgument(
            "inputs contain no pages".into(),
        ));
    }

    reporter.checkpoint()?;
    let sources: Vec<&Document> = readers.iter().map(PdfReader::document).collect();
    let mut document = assemble(&sources, &pages)?;
    let path = save_document(&mut document, output)?;
    reporter.advance("saved");
    info!(pages = pages.len(), output = %path.display(), "PDFs merged");
    Ok(path)
}

/// Rotate pages by the given degrees, added to their current rotation.
#[instrument(skip_all, fields(input = %input.as_ref().display(), pages = rotations.len()))]
pub fn rotate(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    rotations: &BTreeMap<u32, i32>,
    reporter: &ProgressReporter,
) -> Result<PathBuf> {
    if rotations.is_empty() {
        return Err(CyberPdfError::InvalidArgument("no pages to rotate".into()));
    }
    reporter.set_total(2);
    let mut document = PdfReader::open(input)?.into_document();
    rotate_pages(&mut document, rotations)?;
    reporter.advance("rotated");
    reporter.checkpoint()?;

    let path = save_document(&mut document, output)?;
    reporter.advance("saved");
    info!(output = %path.display(), "pages rotated");
    Ok(path)
}

/// Write the 1-based pages of `order` as a new document. Pages may repeat or
/// be left out.
#[instrument(skip_all, fields(input = %input.as_ref().display(), pages = order.len()))]
pub fn arrange(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    order: &[u32],
    reporter: &ProgressReporter,
) -> Result<PathBuf> {
    if order.is_empty() {
        return Err(CyberPdfError::InvalidArgument(
            "page order must list at least one page".into(),
        ));
    }
    reporter.set_total(2);
    let reader = PdfReader::open(input)?;
    let mut document = reader.extract_pages(order)?;
    reporter.advance("arranged");
    reporter.checkpoint()?;

    let path = save_document(&mut document, output)?;
    reporter.advance("saved");
    info!(output = %path.display(), "pages arranged");
    Ok(path)
}

/// Text of `input`, optionally limited to an inclusive 1-based page range.
#[instrument(skip_all, fields(input = %input.as_ref().display(), range = ?range))]
pub fn extract_text(input: impl AsRef<Path>, range: Option<(u32, u32)>) -> Result<String> {
    PdfReader::open(input)?.extract_text(range)
}

/// Save every image in `input` to `output_dir` as `image_<n>.<ext>`.
#[instrument(skip_all, fields(input = %input.as_ref().display()))]
pub fn extract_images(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    reporter: &ProgressReporter,
) -> Result<Vec<PathBuf>> {
    let reader = PdfReader::open(input)?;
    let pages: Vec<u32> = (1..=reader.page_count()).collect();
    let images = collect_images(reader.document(), &pages);
    reporter.set_total(images.len() as u64);

    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;

    let mut batch = OutputBatch::new();
    for (i, image) in images.iter().enumerate() {
        reporter.checkpoint()?;
        let name = image.file_name(i + 1);
        batch.write(output_dir.join(&name), |w| Ok(w.write_all(&image.data)?))?;
        reporter.advance(format!("wrote {name}"));
    }

    let written = batch.finish();
    info!(images = written.len(), "images extracted");
    Ok(written)
}

/// Metadata of `input`, including its size on disk.
#[instrument(skip_all, fields(input = %input.as_ref().display()))]
pub fn pdf_info(input: impl AsRef<Path>) -> Result<PdfMetadata> {
    Ok(PdfReader::open(input)?.metadata())
}

/// Stamp a text watermark on every page.
#[instrument(skip_all, fields(input = %input.as_ref().display(), text = %options.text))]
pub fn watermark(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &WatermarkOptions,
    reporter: &ProgressReporter,
) -> Result<PathBuf> {
    options.validate()?;
    reporter.set_total(2);
    let mut document = PdfReader::open(input)?.into_document();
    let pages = apply_watermark(&mut document, options)?;
    reporter.advance("stamped");
    reporter.checkpoint()?;

    let path = save_document(&mut document, output)?;
    reporter.advance("saved");
    info!(pages, output = %path.display(), "watermark added");
    Ok(path)
}

/// Convert a PDF to a Word document.
#[instrument(skip_all, fields(input = %input.as_ref().display(), method = ?method))]
pub fn pdf_to_word(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    method: ConversionMethod,
    reporter: &ProgressReporter,
) -> Result<PathBuf> {
    reporter.set_total(2);
    let reader = PdfReader::open(input)?;
    let package = pdf_to_docx(&reader, method)?;
    reporter.advance("converted");
    reporter.checkpoint()?;

    let path = write_bytes_atomic(output, &package)?;
    reporter.advance("saved");
    info!(output = %path.display(), "PDF converted to Word");
    Ok(path)
}

/// Convert a Word document to PDF.
#[instrument(skip_all, fields(input = %input.as_ref().display()))]
pub fn word_to_pdf(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    reporter: &ProgressReporter,
) -> Result<PathBuf> {
    reporter.set_total(2);
    let package = std::fs::read(input.as_ref())?;
    let pdf = docx_to_pdf(&package)?;
    reporter.advance("converted");
    reporter.checkpoint()?;

    let path = write_bytes_atomic(output, &pdf)?;
    reporter.advance("saved");
    info!(output = %path.display(), "Word document converted to PDF");
    Ok(path)
}

/// Recognise the text of a scanned PDF or an image file.
///
/// For a PDF, the images on each page are recognised and pages are joined
/// by a blank line.
#[cfg(feature = "ocr")]
#[instrument(skip_all, fields(input = %input.as_ref().display()))]
pub fn ocr(
    input: impl AsRef<Path>,
    engine: &crate::scan::OcrEngine,
    reporter: &ProgressReporter,
) -> Result<String> {
    let path = input.as_ref();
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if !is_pdf {
        reporter.set_total(1);
        let image = ::image::open(path)
            .map_err(|e| CyberPdfError::Image(format!("cannot open {}: {e}", path.display())))?;
        let text = engine.recognize_text(&image)?;
        reporter.advance("recognised");
        return Ok(text);
    }

    let reader = PdfReader::open(path)?;
    reporter.set_total(u64::from(reader.page_count()));
    let mut pages = Vec::new();
    for page in 1..=reader.page_count() {
        reporter.checkpoint()?;
        let scans = crate::scan::page_scans(reader.document(), page);
        pages.push(engine.recognize_all(&scans)?);
        reporter.advance(format!("page {page}"));
    }
    info!(pages = pages.len(), "OCR finished");
    Ok(pages.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::read_paragraphs;
    use crate::pdf::objects::page_rotation;
    use crate::sample::{
        add_image, add_outline, jpeg_image, rgb_image, sample_document, sample_pages, write,
    };
    use cyberpdf_core::runner::CancelToken;

    fn fixture(dir: &Path, name: &str, mut doc: Document) -> PathBuf {
        let path = dir.join(name);
        write(&mut doc, &path).unwrap();
        path
    }

    fn page_texts(path: &Path) -> Vec<String> {
        let reader = PdfReader::open(path).unwrap();
        (1..=reader.page_count())
            .map(|p| reader.page_text(p).unwrap())
            .collect()
    }

    #[test]
    fn split_by_pages_writes_parts() {
        let dir = tempfile::tempdir().unwrap();
        let input = fixture(dir.path(), "in.pdf", sample_pages(5));
        let out = dir.path().join("parts");
        let reporter = ProgressReporter::silent();

        let files = split(&input, &out, &SplitMode::ByPages(vec![3, 5]), &reporter).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["part_1.pdf", "part_2.pdf", "part_3.pdf"]);
        assert_eq!(page_texts(&files[0]).len(), 2);
        assert!(page_texts(&files[1])[0].contains("Page 3"));
        assert_eq!(reporter.snapshot().done, 3);
    }

    #[test]
    fn split_by_bookmarks_uses_titles() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = sample_pages(4);
        add_outline(&mut doc, &[("Intro", 1), ("Results: 2024", 3)]);
        let input = fixture(dir.path(), "in.pdf", doc);

        let files = split(
            &input,
            dir.path().join("out"),
            &SplitMode::ByBookmarks,
            &ProgressReporter::silent(),
        )
        .unwrap();
        assert!(files[0].ends_with("Intro.pdf"));
        assert!(files[1].ends_with("Results 2024.pdf"));
        assert_eq!(page_texts(&files[1]).len(), 2);
    }

    #[test]
    fn failing_later_part_removes_earlier_parts() {
        let dir = tempfile::tempdir().unwrap();
        let input = fixture(dir.path(), "in.pdf", sample_pages(3));
        let out = dir.path().join("parts");
        // A directory in the way of the last part makes its rename fail.
        std::fs::create_dir_all(out.join("part_3.pdf")).unwrap();

        let result = split(&input, &out, &SplitMode::ByCount(1), &ProgressReporter::silent());
        assert!(result.is_err());
        let left: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(left, ["part_3.pdf"]);
        assert!(out.join("part_3.pdf").is_dir());
    }

    #[test]
    fn cancelled_split_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = fixture(dir.path(), "in.pdf", sample_pages(3));
        let out = dir.path().join("parts");
        let cancel = CancelToken::new();
        let (reporter, _rx) = ProgressReporter::new(cancel.clone());
        cancel.cancel();

        let result = split(&input, &out, &SplitMode::ByCount(1), &reporter);
        assert!(matches!(result, Err(CyberPdfError::Cancelled)));
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn merge_sequential_and_custom_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = fixture(dir.path(), "a.pdf", sample_pages(2));
        let b = fixture(dir.path(), "b.pdf", sample_document());
        let reporter = ProgressReporter::silent();

        let all = merge(&[&a, &b], dir.path().join("all.pdf"), None, &reporter).unwrap();
        assert_eq!(page_texts(&all).len(), 5);

        let order = [PageRef { file: 2, page: 3 }, PageRef { file: 1, page: 1 }];
        let picked = merge(&[&a, &b], dir.path().join("picked.pdf"), Some(&order), &reporter)
            .unwrap();
        let texts = page_texts(&picked);
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("Page 3"));
        assert!(texts[1].contains("Page 1"));
    }

    #[test]
    fn merge_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let a = fixture(dir.path(), "a.pdf", sample_pages(2));
        let out = dir.path().join("out.pdf");
        let reporter = ProgressReporter::silent();

        let none: [&Path; 0] = [];
        assert!(merge(&none, &out, None, &reporter).is_err());
        let bad_file = [PageRef { file: 2, page: 1 }];
        assert!(merge(&[&a], &out, Some(&bad_file), &reporter).is_err());
        let bad_page = [PageRef { file: 1, page: 9 }];
        assert!(matches!(
            merge(&[&a], &out, Some(&bad_page), &reporter),
            Err(CyberPdfError::PageOutOfRange { page: 9, total: 2 })
        ));
        assert!(!out.exists());
    }

    #[test]
    fn rotate_and_arrange() {
        let dir = tempfile::tempdir().unwrap();
        let input = fixture(dir.path(), "in.pdf", sample_pages(3));
        let reporter = ProgressReporter::silent();

        let rotated = rotate(
            &input,
            dir.path().join("rotated.pdf"),
            &BTreeMap::from([(2, 90), (3, -90)]),
            &reporter,
        )
        .unwrap();
        let doc = PdfReader::open(&rotated).unwrap().into_document();
        let ids = doc.get_pages();
        assert_eq!(page_rotation(&doc, ids[&1]), 0);
        assert_eq!(page_rotation(&doc, ids[&2]), 90);
        assert_eq!(page_rotation(&doc, ids[&3]), 270);

        let arranged = arrange(&input, dir.path().join("arranged.pdf"), &[3, 1, 1], &reporter)
            .unwrap();
        let texts = page_texts(&arranged);
        assert!(texts[0].contains("Page 3"));
        assert!(texts[2].contains("Page 1"));
        assert!(arrange(&input, dir.path().join("x.pdf"), &[], &reporter).is_err());
        assert!(arrange(&input, dir.path().join("x.pdf"), &[4], &reporter).is_err());
    }

    #[test]
    fn text_and_info() {
        let dir = tempfile::tempdir().unwrap();
        let input = fixture(dir.path(), "in.pdf", sample_document());

        let text = extract_text(&input, Some((2, 3))).unwrap();
        assert!(!text.contains("Page 1"));
        assert!(text.contains("Page 2") && text.contains("Page 3"));
        assert!(extract_text(&input, Some((3, 2))).is_err());

        let info = pdf_info(&input).unwrap();
        assert_eq!(info.page_count, 3);
        assert_eq!(info.title.as_deref(), Some("Quarterly report"));
        assert_eq!(info.file_size, std::fs::metadata(&input).unwrap().len());
    }

    #[test]
    fn images_are_written_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = sample_pages(2);
        add_image(&mut doc, 1, jpeg_image(b"\xFF\xD8jpeg"));
        add_image(&mut doc, 2, rgb_image(3, 3));
        let input = fixture(dir.path(), "in.pdf", doc);

        let files = extract_images(&input, dir.path().join("img"), &ProgressReporter::silent())
            .unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("image_1.jpg"));
        assert!(files[1].ends_with("image_2.png"));
        assert_eq!(std::fs::read(&files[0]).unwrap(), b"\xFF\xD8jpeg");
    }

    #[test]
    fn watermark_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = fixture(dir.path(), "in.pdf", sample_pages(2));
        let output = dir.path().join("marked.pdf");

        watermark(
            &input,
            &output,
            &WatermarkOptions::new("DRAFT"),
            &ProgressReporter::silent(),
        )
        .unwrap();
        let doc = PdfReader::open(&output).unwrap().into_document();
        let first = doc.get_pages()[&1];
        let content = doc.get_page_content(first).unwrap();
        assert!(String::from_utf8_lossy(&content).contains("(DRAFT) Tj"));
    }

    #[test]
    fn word_conversion_both_ways() {
        let dir = tempfile::tempdir().unwrap();
        let input = fixture(dir.path(), "in.pdf", sample_document());
        let docx = dir.path().join("out.docx");
        let reporter = ProgressReporter::silent();

        pdf_to_word(&input, &docx, ConversionMethod::Auto, &reporter).unwrap();
        let paragraphs = read_paragraphs(&std::fs::read(&docx).unwrap()).unwrap();
        assert_eq!(paragraphs[0], "Quarterly report");

        let pdf = word_to_pdf(&docx, dir.path().join("back.pdf"), &reporter).unwrap();
        assert!(PdfReader::open(pdf).unwrap().page_count() >= 1);
    }

    #[test]
    fn failed_conversion_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = fixture(dir.path(), "in.pdf", sample_pages(1));
        let output = dir.path().join("out.docx");
        let result = pdf_to_word(
            &input,
            &output,
            ConversionMethod::LibreOffice,
            &ProgressReporter::silent(),
        );
        assert!(result.is_err());
        assert!(!output.exists());
    }
}
