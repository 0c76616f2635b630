// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page assembly — build a new document from pages of one or more source
// documents, deep-copying everything each page references.

use std::collections::HashMap;

use cyberpdf_core::error::Result;
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::{debug, warn};

use super::objects::{INHERITABLE, as_dictionary, has_type, inherited, pdf_error};

/// One page of the output: `(source index, page object id)`.
pub type PageSource = (usize, ObjectId);

/// Copies objects from source documents into a target, each source object at
/// most once.
struct Copier<'a> {
    sources: &'a [&'a Document],
    target: &'a mut Document,
    /// Source object to its copy in the target.
    copied: HashMap<(usize, ObjectId), ObjectId>,
    /// First output slot of every selected page.
    page_slots: HashMap<(usize, ObjectId), ObjectId>,
}

impl Copier<'_> {
    fn copy(&mut self, src: usize, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.copy_reference(src, *id),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(src, dict)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.copy(src, item)).collect())
            }
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dictionary(src, &stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, src: usize, dict: &Dictionary) -> Dictionary {
        let mut out = Dictionary::new();
        for (key, value) in dict.iter() {
            out.set(key.clone(), self.copy(src, value));
        }
        out
    }

    fn copy_reference(&mut self, src: usize, id: ObjectId) -> Object {
        if let Some(slot) = self.page_slots.get(&(src, id)) {
            return Object::Reference(*slot);
        }
        if let Some(existing) = self.copied.get(&(src, id)) {
            return Object::Reference(*existing);
        }

        let source = self.sources[src];
        let Ok(object) = source.get_object(id) else {
            warn!(?id, "dangling reference replaced with null");
            return Object::Null;
        };

        // Pages that are not part of the output, and the page tree and
        // catalog themselves, are never dragged along.
        if let Some(dict) = as_dictionary(source, object)
            && (has_type(dict, b"Page") || has_type(dict, b"Pages") || has_type(dict, b"Catalog"))
        {
            return Object::Null;
        }

        let new_id = self.target.new_object_id();
        self.copied.insert((src, id), new_id);
        let copy = self.copy(src, object);
        self.target.objects.insert(new_id, copy);
        Object::Reference(new_id)
    }
}

/// Build a document containing `pages` in order.
///
/// Inherited page attributes are materialised on each copied page, so every
/// page renders the same as in its source. The Info dictionary of the first
/// source is carried over. A page listed twice is copied twice.
pub fn assemble(sources: &[&Document], pages: &[PageSource]) -> Result<Document> {
    let version = sources
        .first()
        .map(|doc| doc.version.clone())
        .unwrap_or_else(|| "1.5".to_string());
    let mut target = Document::with_version(version);
    let pages_id = target.new_object_id();

    let slots: Vec<ObjectId> = pages.iter().map(|_| target.new_object_id()).collect();
    let mut page_slots = HashMap::new();
    for (page, slot) in pages.iter().zip(&slots) {
        page_slots.entry(*page).or_insert(*slot);
    }

    let mut copier = Copier {
        sources,
        target: &mut target,
        copied: HashMap::new(),
        page_slots,
    };

    for (&(src, page_id), &slot) in pages.iter().zip(&slots) {
        let source = sources
            .get(src)
            .ok_or_else(|| pdf_error("page source", format!("no input #{}", src + 1)))?;
        let page = source
            .get_dictionary(page_id)
            .map_err(|e| pdf_error("cannot read page", e))?;

        let mut copy = Dictionary::new();
        for (key, value) in page.iter() {
            if key == b"Parent" {
                continue;
            }
            copy.set(key.clone(), copier.copy(src, value));
        }
        for key in INHERITABLE {
            if !copy.has(key)
                && let Some(value) = inherited(source, page_id, key)
            {
                copy.set(key.to_vec(), copier.copy(src, value));
            }
        }
        copy.set("Parent", pages_id);
        copier.target.objects.insert(slot, Object::Dictionary(copy));
    }

    if let Some(info) = sources.first().and_then(|doc| doc.trailer.get(b"Info").ok()) {
        let info = copier.copy(0, info);
        if !matches!(info, Object::Null) {
            target.trailer.set("Info", info);
        }
    }

    let kids: Vec<Object> = slots.iter().map(|id| Object::Reference(*id)).collect();
    target.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = target.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    target.trailer.set("Root", catalog_id);

    debug!(
        pages = pages.len(),
        objects = target.objects.len(),
        "document assembled"
    );
    Ok(target)
}

/// Serialise a document into memory.
pub fn to_bytes(document: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|e| pdf_error("failed to serialise PDF", e))?;
    Ok(output)
}
