// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open and inspect existing PDF documents, and plan the page
// selections behind split, merge, rotate and arrange, using `lopdf`.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use cyberpdf_core::error::{CyberPdfError, Result};
use cyberpdf_core::types::{PdfMetadata, SplitMode};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, instrument, warn};

use super::assemble::{PageSource, assemble};
use super::objects::{
    as_dictionary, inherited, name, page_image_ids, page_rotation, parse_pdf_date, pdf_error,
    resolve, text_entry,
};

/// Pages with less trimmed text than this end a chapter in smart split.
pub const SMART_BREAK_THRESHOLD: usize = 50;

/// An entry of the document outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub title: String,
    /// 1-based target page, when the destination resolves to a local page.
    pub page: Option<u32>,
    /// Nesting depth, 0 for top-level entries.
    pub level: usize,
}

/// One output document of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPart {
    /// File name of the part, including the `.pdf` extension.
    pub file_name: String,
    /// 1-based pages in output order.
    pub pages: Vec<u32>,
}

/// Reads existing PDF files.
///
/// Wraps `lopdf::Document` and provides higher-level operations such as text
/// extraction, metadata, outline traversal and building new documents from
/// page selections.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<PathBuf>,
    /// Size of the source in bytes.
    file_size: u64,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    ///
    /// Encrypted documents are rejected with [`CyberPdfError::Encrypted`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let data = std::fs::read(path_ref)?;
        let mut reader = Self::from_bytes(&data).map_err(|err| match err {
            CyberPdfError::Pdf(reason) => {
                CyberPdfError::Pdf(format!("failed to open {}: {reason}", path_ref.display()))
            }
            other => other,
        })?;
        reader.source_path = Some(path_ref.to_path_buf());
        info!(pages = reader.page_count(), "PDF opened");
        Ok(reader)
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| match err {
            lopdf::Error::Decryption(_) => CyberPdfError::Encrypted,
            other => pdf_error("failed to load PDF", other),
        })?;
        let reader = Self::from_document(document)?;
        debug!(pages = reader.page_count(), "PDF loaded from bytes");
        Ok(Self {
            file_size: data.len() as u64,
            ..reader
        })
    }

    /// Wrap an already parsed document.
    pub fn from_document(document: Document) -> Result<Self> {
        if document.trailer.has(b"Encrypt") {
            return Err(CyberPdfError::Encrypted);
        }
        Ok(Self {
            document,
            source_path: None,
            file_size: 0,
        })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Object id of a 1-based page.
    pub fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.document
            .get_pages()
            .get(&page)
            .copied()
            .ok_or(CyberPdfError::PageOutOfRange {
                page,
                total: self.page_count(),
            })
    }

    /// Check that every page of `pages` exists.
    pub fn validate_pages(&self, pages: &[u32]) -> Result<()> {
        let total = self.page_count();
        match pages.iter().find(|p| **p == 0 || **p > total) {
            Some(&page) => Err(CyberPdfError::PageOutOfRange { page, total }),
            None => Ok(()),
        }
    }

    /// Text of one 1-based page.
    pub fn page_text(&self, page: u32) -> Result<String> {
        self.page_id(page)?;
        self.document
            .extract_text(&[page])
            .map_err(|e| pdf_error(&format!("cannot extract text of page {page}"), e))
    }

    /// Text of the pages in `range` (1-based, inclusive; whole document when
    /// `None`), pages separated by a blank line.
    #[instrument(skip(self))]
    pub fn extract_text(&self, range: Option<(u32, u32)>) -> Result<String> {
        let (start, end) = self.resolve_range(range)?;
        let pages = (start..=end)
            .map(|page| self.page_text(page))
            .collect::<Result<Vec<_>>>()?;
        Ok(pages.join("\n\n"))
    }

    /// Validate an inclusive page range against the document.
    pub fn resolve_range(&self, range: Option<(u32, u32)>) -> Result<(u32, u32)> {
        let total = self.page_count();
        let (start, end) = range.unwrap_or((1, total));
        if start == 0 || start > end {
            return Err(CyberPdfError::InvalidArgument(format!(
                "invalid page range {start}-{end}"
            )));
        }
        if end > total {
            return Err(CyberPdfError::PageOutOfRange { page: end, total });
        }
        Ok((start, end))
    }

    /// The document Info dictionary, if any.
    fn info(&self) -> Option<&Dictionary> {
        let info = self.document.trailer.get(b"Info").ok()?;
        as_dictionary(&self.document, info)
    }

    /// `/Title` from the Info dictionary.
    pub fn title(&self) -> Option<String> {
        text_entry(&self.document, self.info()?, b"Title")
    }

    /// Document information, fonts and image count.
    pub fn metadata(&self) -> PdfMetadata {
        let doc = &self.document;
        let entry = |key: &[u8]| self.info().and_then(|info| text_entry(doc, info, key));
        let date = |key: &[u8]| entry(key).and_then(|raw| parse_pdf_date(&raw));

        PdfMetadata {
            page_count: self.page_count(),
            file_size: self.file_size,
            pdf_version: doc.version.clone(),
            title: entry(b"Title"),
            author: entry(b"Author"),
            subject: entry(b"Subject"),
            keywords: entry(b"Keywords"),
            creator: entry(b"Creator"),
            producer: entry(b"Producer"),
            creation_date: date(b"CreationDate"),
            modification_date: date(b"ModDate"),
            encrypted: false,
            fonts: self.fonts(),
            image_count: self.image_count(),
        }
    }

    /// Distinct `/BaseFont` names used by any page, sorted.
    pub fn fonts(&self) -> Vec<String> {
        let doc = &self.document;
        let mut fonts = BTreeSet::new();
        for page_id in doc.get_pages().into_values() {
            let Some(font_dict) = inherited(doc, page_id, b"Resources")
                .and_then(|res| as_dictionary(doc, res))
                .and_then(|res| res.get(b"Font").ok())
                .and_then(|fonts| as_dictionary(doc, fonts))
            else {
                continue;
            };
            for (_, font) in font_dict.iter() {
                if let Some(base) = as_dictionary(doc, font)
                    .and_then(|font| font.get(b"BaseFont").ok())
                    .and_then(name)
                {
                    fonts.insert(String::from_utf8_lossy(base).into_owned());
                }
            }
        }
        fonts.into_iter().collect()
    }

    /// Image XObjects summed over pages; an image shown on two pages counts
    /// twice.
    pub fn image_count(&self) -> u32 {
        self.document
            .get_pages()
            .into_values()
            .map(|page_id| page_image_ids(&self.document, page_id).len() as u32)
            .sum()
    }

    // -- Outline --------------------------------------------------------------

    /// Every outline entry, depth first.
    pub fn outline(&self) -> Vec<Bookmark> {
        let doc = &self.document;
        let Some(first) = doc
            .catalog()
            .ok()
            .and_then(|catalog| catalog.get(b"Outlines").ok())
            .and_then(|outlines| as_dictionary(doc, outlines))
            .and_then(|outlines| outlines.get(b"First").ok())
        else {
            return Vec::new();
        };

        let page_numbers: BTreeMap<ObjectId, u32> = doc
            .get_pages()
            .into_iter()
            .map(|(number, id)| (id, number))
            .collect();
        let mut entries = Vec::new();
        let mut visited = HashSet::new();
        self.collect_outline(first, 0, &page_numbers, &mut visited, &mut entries);
        entries
    }

    fn collect_outline(
        &self,
        first: &Object,
        level: usize,
        page_numbers: &BTreeMap<ObjectId, u32>,
        visited: &mut HashSet<ObjectId>,
        entries: &mut Vec<Bookmark>,
    ) {
        let doc = &self.document;
        let mut cursor = first;
        while let Object::Reference(id) = cursor {
            if !visited.insert(*id) {
                warn!(?id, "outline loop detected");
                return;
            }
            let Ok(item) = doc.get_dictionary(*id) else {
                return;
            };

            entries.push(Bookmark {
                title: text_entry(doc, item, b"Title").unwrap_or_default(),
                page: self.outline_target(item, page_numbers),
                level,
            });
            if let Ok(child) = item.get(b"First") {
                self.collect_outline(child, level + 1, page_numbers, visited, entries);
            }
            match item.get(b"Next") {
                Ok(next) => cursor = next,
                Err(_) => return,
            }
        }
    }

    /// Page targeted by an outline item's `/Dest` or `/A` GoTo action.
    fn outline_target(
        &self,
        item: &Dictionary,
        page_numbers: &BTreeMap<ObjectId, u32>,
    ) -> Option<u32> {
        let doc = &self.document;
        let dest = match item.get(b"Dest") {
            Ok(dest) => dest,
            Err(_) => {
                let action = as_dictionary(doc, item.get(b"A").ok()?)?;
                if action.get(b"S").ok().and_then(name) != Some(b"GoTo".as_slice()) {
                    return None;
                }
                action.get(b"D").ok()?
            }
        };
        self.destination_page(dest, page_numbers, 0)
    }

    fn destination_page(
        &self,
        dest: &Object,
        page_numbers: &BTreeMap<ObjectId, u32>,
        depth: usize,
    ) -> Option<u32> {
        let doc = &self.document;
        if depth > 4 {
            return None;
        }
        match dest {
            Object::Array(items) => match items.first()? {
                Object::Reference(page_id) => page_numbers.get(page_id).copied(),
                Object::Integer(index) => u32::try_from(*index).ok()?.checked_add(1),
                _ => None,
            },
            Object::Reference(_) => {
                self.destination_page(resolve(doc, dest), page_numbers, depth + 1)
            }
            Object::Dictionary(dict) => {
                self.destination_page(dict.get(b"D").ok()?, page_numbers, depth + 1)
            }
            Object::Name(key) | Object::String(key, _) => {
                let target = self.named_destination(key)?;
                self.destination_page(target, page_numbers, depth + 1)
            }
            _ => None,
        }
    }

    /// Look up a named destination in the catalog `/Dests` dictionary or the
    /// `/Names /Dests` name tree.
    fn named_destination(&self, key: &[u8]) -> Option<&Object> {
        let doc = &self.document;
        let catalog = doc.catalog().ok()?;
        if let Some(found) = catalog
            .get(b"Dests")
            .ok()
            .and_then(|dests| as_dictionary(doc, dests))
            .and_then(|dests| dests.get(key).ok())
        {
            return Some(found);
        }
        let tree = catalog
            .get(b"Names")
            .ok()
            .and_then(|names| as_dictionary(doc, names))
            .and_then(|names| names.get(b"Dests").ok())
            .and_then(|dests| as_dictionary(doc, dests))?;
        self.search_name_tree(tree, key, 0)
    }

    fn search_name_tree<'a>(
        &'a self,
        node: &'a Dictionary,
        key: &[u8],
        depth: usize,
    ) -> Option<&'a Object> {
        let doc = &self.document;
        if depth > 16 {
            return None;
        }
        if let Ok(Object::Array(names)) = node.get(b"Names").map(|n| resolve(doc, n)) {
            for pair in names.chunks_exact(2) {
                if let Object::String(candidate, _) = resolve(doc, &pair[0])
                    && candidate.as_slice() == key
                {
                    return Some(&pair[1]);
                }
            }
        }
        if let Ok(Object::Array(kids)) = node.get(b"Kids").map(|k| resolve(doc, k)) {
            for kid in kids {
                if let Some(kid) = as_dictionary(doc, kid)
                    && let Some(found) = self.search_name_tree(kid, key, depth + 1)
                {
                    return Some(found);
                }
            }
        }
        None
    }

    // -- Page selections ------------------------------------------------------

    /// Build a standalone document from 1-based `pages`, in order.
    pub fn extract_pages(&self, pages: &[u32]) -> Result<Document> {
        self.validate_pages(pages)?;
        let all = self.document.get_pages();
        let order: Vec<PageSource> = pages.iter().map(|p| (0, all[p])).collect();
        assemble(&[&self.document], &order)
    }

    /// The parts a split in `mode` produces, without writing anything.
    #[instrument(skip(self))]
    pub fn split_plan(&self, mode: &SplitMode) -> Result<Vec<SplitPart>> {
        let total = self.page_count();
        if total == 0 {
            return Err(CyberPdfError::InvalidArgument(
                "document has no pages".into(),
            ));
        }

        let parts = match mode {
            SplitMode::ByPages(points) => {
                if points.is_empty() {
                    return Err(CyberPdfError::InvalidArgument(
                        "at least one split point is required".into(),
                    ));
                }
                let mut starts = vec![1];
                starts.extend(SplitMode::normalized_points(points, total));
                numbered_parts("part", ranges_from_starts(&starts, total))
            }
            SplitMode::ByCount(0) => {
                return Err(CyberPdfError::InvalidArgument(
                    "pages per part must be at least 1".into(),
                ));
            }
            SplitMode::ByCount(count) => {
                let starts: Vec<u32> = (1..=total).step_by(*count as usize).collect();
                numbered_parts("part", ranges_from_starts(&starts, total))
            }
            SplitMode::ByBookmarks => self.bookmark_parts(total)?,
            SplitMode::Smart => self.smart_parts(total)?,
        };

        info!(mode = ?mode, parts = parts.len(), "split planned");
        Ok(parts)
    }

    fn bookmark_parts(&self, total: u32) -> Result<Vec<SplitPart>> {
        let top_level: Vec<(String, u32)> = self
            .outline()
            .into_iter()
            .filter(|b| b.level == 0)
            .filter_map(|b| b.page.filter(|p| *p >= 1 && *p <= total).map(|p| (b.title, p)))
            .collect();
        if top_level.is_empty() {
            return Err(CyberPdfError::InvalidArgument(
                "document has no bookmarks to split at".into(),
            ));
        }

        let mut parts = Vec::new();
        let mut used = HashSet::new();
        for (i, (title, start)) in top_level.iter().enumerate() {
            let end = top_level
                .get(i + 1)
                .map(|(_, next)| next.saturating_sub(1))
                .unwrap_or(total);
            if end < *start {
                warn!(title, start, "bookmark has no pages of its own, skipped");
                continue;
            }
            let stem = match sanitize_title(title) {
                s if s.is_empty() => format!("section_{}", i + 1),
                s => s,
            };
            let mut file_name = format!("{stem}.pdf");
            let mut n = 2;
            while !used.insert(file_name.to_lowercase()) {
                file_name = format!("{stem}_{n}.pdf");
                n += 1;
            }
            parts.push(SplitPart {
                file_name,
                pages: (*start..=end).collect(),
            });
        }
        Ok(parts)
    }

    fn smart_parts(&self, total: u32) -> Result<Vec<SplitPart>> {
        let mut ranges = Vec::new();
        let mut start = 1;
        for page in 1..=total {
            let text = self.page_text(page).unwrap_or_else(|err| {
                warn!(page, %err, "text extraction failed, treating page as blank");
                String::new()
            });
            if text.trim().chars().count() < SMART_BREAK_THRESHOLD {
                ranges.push((start, page));
                start = page + 1;
            }
        }
        if start <= total {
            ranges.push((start, total));
        }
        Ok(numbered_parts("chapter", ranges))
    }
}

/// Add `degrees` to the `/Rotate` of each listed 1-based page.
///
/// Degrees must be multiples of 90; the result is normalised to `0..360`.
pub fn rotate_pages(document: &mut Document, rotations: &BTreeMap<u32, i32>) -> Result<()> {
    let pages = document.get_pages();
    let total = pages.len() as u32;
    for (&page, &degrees) in rotations {
        if degrees % 90 != 0 {
            return Err(CyberPdfError::InvalidArgument(format!(
                "rotation must be a multiple of 90, got {degrees}"
            )));
        }
        let page_id = *pages
            .get(&page)
            .ok_or(CyberPdfError::PageOutOfRange { page, total })?;

        let existing = page_rotation(document, page_id);
        let new_rotation = (existing + degrees.rem_euclid(360)).rem_euclid(360);
        document
            .get_dictionary_mut(page_id)
            .map_err(|e| pdf_error("cannot update page", e))?
            .set("Rotate", i64::from(new_rotation));
        debug!(page, existing, new_rotation, "page rotated");
    }
    Ok(())
}

/// Inclusive ranges starting at each of the sorted `starts`.
fn ranges_from_starts(starts: &[u32], total: u32) -> Vec<(u32, u32)> {
    starts
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let end = starts.get(i + 1).map(|next| next - 1).unwrap_or(total);
            (*start, end)
        })
        .collect()
}

fn numbered_parts(prefix: &str, ranges: Vec<(u32, u32)>) -> Vec<SplitPart> {
    ranges
        .into_iter()
        .filter(|(start, end)| start <= end)
        .enumerate()
        .map(|(i, (start, end))| SplitPart {
            file_name: format!("{prefix}_{}.pdf", i + 1),
            pages: (start..=end).collect(),
        })
        .collect()
}

/// Keep alphanumerics, spaces, `-` and `_`, trimmed.
fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}
