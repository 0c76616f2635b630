// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page arranger — an editing session over the page order of one document,
// with undo and redo.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cyberpdf_core::error::{CyberPdfError, Result};
use cyberpdf_core::output::write_atomic;
use cyberpdf_core::types::PageInfo;
use tracing::{info, instrument};

use crate::pdf::assemble::{PageSource, assemble};
use crate::pdf::objects::{media_box, page_image_ids, page_rotation, pdf_error};
use crate::pdf::reader::{PdfReader, rotate_pages};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    /// 1-based source page for each position.
    order: Vec<u32>,
    /// Extra rotation per source page, applied on save.
    rotations: BTreeMap<u32, i32>,
}

/// Reorders, removes, duplicates and rotates pages before writing a new
/// document. Positions are 0-based indices into the current order.
pub struct PageArranger {
    reader: PdfReader,
    layout: Layout,
    undo_stack: Vec<Layout>,
    redo_stack: Vec<Layout>,
}

impl PageArranger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(PdfReader::open(path)?))
    }

    pub fn new(reader: PdfReader) -> Self {
        let order = (1..=reader.page_count()).collect();
        Self {
            reader,
            layout: Layout {
                order,
                rotations: BTreeMap::new(),
            },
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Current order as 1-based source page numbers.
    pub fn order(&self) -> &[u32] {
        &self.layout.order
    }

    pub fn len(&self) -> usize {
        self.layout.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.order.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Replace the whole order. The new order must have as many entries as
    /// the current one.
    pub fn reorder(&mut self, new_order: Vec<u32>) -> Result<()> {
        if new_order.len() != self.len() {
            return Err(CyberPdfError::InvalidArgument(format!(
                "new order has {} pages, expected {}",
                new_order.len(),
                self.len()
            )));
        }
        self.reader.validate_pages(&new_order)?;
        self.edit(|layout| layout.order = new_order);
        info!(order = ?self.layout.order, "pages reordered");
        Ok(())
    }

    pub fn move_page(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_position(from)?;
        self.check_position(to)?;
        self.edit(|layout| {
            let page = layout.order.remove(from);
            layout.order.insert(to, page);
        });
        info!(from, to, "page moved");
        Ok(())
    }

    /// Remove the pages at `positions`. At least one page must remain.
    pub fn delete_pages(&mut self, positions: &[usize]) -> Result<()> {
        for &position in positions {
            self.check_position(position)?;
        }
        let mut doomed = positions.to_vec();
        doomed.sort_unstable();
        doomed.dedup();
        if doomed.len() >= self.len() {
            return Err(CyberPdfError::InvalidArgument(
                "cannot delete every page".into(),
            ));
        }
        self.edit(|layout| {
            for position in doomed.iter().rev() {
                layout.order.remove(*position);
            }
        });
        info!(count = positions.len(), "pages deleted");
        Ok(())
    }

    /// Insert a copy of each page at `positions` right after it.
    pub fn duplicate_pages(&mut self, positions: &[usize]) -> Result<()> {
        for &position in positions {
            self.check_position(position)?;
        }
        let mut sources = positions.to_vec();
        sources.sort_unstable();
        self.edit(|layout| {
            for (offset, position) in sources.iter().enumerate() {
                let at = position + offset;
                let page = layout.order[at];
                layout.order.insert(at + 1, page);
            }
        });
        info!(count = positions.len(), "pages duplicated");
        Ok(())
    }

    /// Rotate the page at `position` by ±90, ±180 or ±270 degrees.
    ///
    /// Rotation belongs to the source page, so duplicates turn with it.
    pub fn rotate_page(&mut self, position: usize, degrees: i32) -> Result<()> {
        if !matches!(degrees.abs(), 90 | 180 | 270) {
            return Err(CyberPdfError::InvalidArgument(format!(
                "angle must be 90, 180 or 270 degrees, got {degrees}"
            )));
        }
        self.check_position(position)?;
        let page = self.layout.order[position];
        self.edit(|layout| {
            let entry = layout.rotations.entry(page).or_insert(0);
            *entry = (*entry + degrees).rem_euclid(360);
        });
        info!(position, degrees, "page rotated");
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.layout, previous);
        self.redo_stack.push(current);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.layout, next);
        self.undo_stack.push(current);
        true
    }

    /// Details of the page at `position`.
    pub fn page_info(&self, position: usize) -> Result<PageInfo> {
        self.check_position(position)?;
        let page = self.layout.order[position];
        let doc = self.reader.document();
        let page_id = self.reader.page_id(page)?;

        let rotation = (page_rotation(doc, page_id)
            + self.layout.rotations.get(&page).copied().unwrap_or(0))
        .rem_euclid(360);
        let [x0, y0, x1, y1] = media_box(doc, page_id);
        let (mut width, mut height) = (x1 - x0, y1 - y0);
        if rotation % 180 != 0 {
            std::mem::swap(&mut width, &mut height);
        }

        Ok(PageInfo {
            original_page: page,
            current_index: position,
            width,
            height,
            rotation,
            has_images: !page_image_ids(doc, page_id).is_empty(),
            has_text: self
                .reader
                .page_text(page)
                .map(|text| !text.trim().is_empty())
                .unwrap_or(false),
        })
    }

    /// Write the arranged document.
    #[instrument(skip_all, fields(output = %output.as_ref().display()))]
    pub fn save(&self, output: impl AsRef<Path>) -> Result<PathBuf> {
        let mut document = self.build()?;
        let path = write_atomic(output, |mut w| {
            document
                .save_to(&mut w)
                .map_err(|e| pdf_error("failed to write PDF", e))?;
            Ok(())
        })?;
        info!(pages = self.len(), "arranged document saved");
        Ok(path)
    }

    fn build(&self) -> Result<lopdf::Document> {
        let ids = self.reader.document().get_pages();
        let order: Vec<PageSource> = self.layout.order.iter().map(|p| (0, ids[p])).collect();
        let mut document = assemble(&[self.reader.document()], &order)?;

        let rotations: BTreeMap<u32, i32> = self
            .layout
            .order
            .iter()
            .enumerate()
            .filter_map(|(i, page)| {
                let extra = self.layout.rotations.get(page).copied().unwrap_or(0);
                (extra != 0).then_some((i as u32 + 1, extra))
            })
            .collect();
        rotate_pages(&mut document, &rotations)?;
        Ok(document)
    }

    fn edit(&mut self, change: impl FnOnce(&mut Layout)) {
        self.undo_stack.push(self.layout.clone());
        self.redo_stack.clear();
        change(&mut self.layout);
    }

    fn check_position(&self, position: usize) -> Result<()> {
        if position >= self.len() {
            return Err(CyberPdfError::InvalidArgument(format!(
                "position {position} out of range (arrangement has {} pages)",
                self.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{add_image, jpeg_image, sample_document, sample_pages, save};

    fn arranger(mut doc: lopdf::Document) -> PageArranger {
        PageArranger::new(PdfReader::from_bytes(&save(&mut doc)).unwrap())
    }

    #[test]
    fn move_delete_duplicate() {
        let mut arr = arranger(sample_pages(4));
        arr.move_page(0, 3).unwrap();
        assert_eq!(arr.order(), &[2, 3, 4, 1]);
        arr.delete_pages(&[1, 2]).unwrap();
        assert_eq!(arr.order(), &[2, 1]);
        arr.duplicate_pages(&[0, 1]).unwrap();
        assert_eq!(arr.order(), &[2, 2, 1, 1]);
    }

    #[test]
    fn undo_and_redo_walk_history() {
        let mut arr = arranger(sample_pages(3));
        assert!(!arr.undo());
        arr.move_page(2, 0).unwrap();
        arr.delete_pages(&[0]).unwrap();
        assert_eq!(arr.order(), &[1, 2]);

        assert!(arr.undo());
        assert_eq!(arr.order(), &[3, 1, 2]);
        assert!(arr.undo());
        assert_eq!(arr.order(), &[1, 2, 3]);
        assert!(arr.redo());
        assert_eq!(arr.order(), &[3, 1, 2]);

        arr.duplicate_pages(&[0]).unwrap();
        assert!(!arr.can_redo());
    }

    #[test]
    fn reorder_requires_same_length() {
        let mut arr = arranger(sample_pages(3));
        assert!(arr.reorder(vec![1, 2]).is_err());
        assert!(arr.reorder(vec![1, 2, 4]).is_err());
        arr.reorder(vec![3, 3, 1]).unwrap();
        assert_eq!(arr.order(), &[3, 3, 1]);
    }

    #[test]
    fn refuses_to_delete_everything() {
        let mut arr = arranger(sample_pages(2));
        assert!(arr.delete_pages(&[0, 1]).is_err());
        assert!(arr.delete_pages(&[5]).is_err());
        assert_eq!(arr.len(), 2);
    }

    #[test]
    fn rotation_is_undoable_and_reported() {
        let mut arr = arranger(sample_pages(2));
        assert!(arr.rotate_page(0, 45).is_err());
        arr.rotate_page(0, 90).unwrap();

        let info = arr.page_info(0).unwrap();
        assert_eq!(info.rotation, 90);
        assert_eq!((info.width, info.height), (792.0, 612.0));
        assert!(info.has_text);
        assert!(!info.has_images);

        arr.undo();
        assert_eq!(arr.page_info(0).unwrap().rotation, 0);
    }

    #[test]
    fn page_info_sees_images() {
        let mut doc = sample_pages(1);
        add_image(&mut doc, 1, jpeg_image(b"jpeg"));
        let arr = arranger(doc);
        assert!(arr.page_info(0).unwrap().has_images);
        assert!(arr.page_info(1).is_err());
    }

    #[test]
    fn save_writes_arranged_document() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("arranged.pdf");

        let mut arr = arranger(sample_document());
        arr.move_page(2, 0).unwrap();
        arr.rotate_page(0, 180).unwrap();
        arr.save(&output).unwrap();

        let reader = PdfReader::open(&output).unwrap();
        assert_eq!(reader.page_count(), 3);
        assert!(reader.page_text(1).unwrap().contains("Page 3"));
        let first = reader.page_id(1).unwrap();
        assert_eq!(page_rotation(reader.document(), first), 180);
        assert_eq!(reader.title().as_deref(), Some("Quarterly report"));
    }
}
