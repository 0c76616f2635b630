// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic documents for tests and benchmarks.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

/// One page per entry of `texts`; each line of an entry becomes a line of
/// Helvetica text. Font, resources and media box live on the page tree node
/// and are inherited by the pages.
pub fn document_with_texts(texts: &[&str]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::with_capacity(texts.len());
    for text in texts {
        let mut operations = Vec::new();
        for (i, line) in text.lines().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new(
                "Td",
                vec![72.into(), (720 - 16 * i as i64).into()],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(line.as_bytes().to_vec(), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let bytes = content.encode().unwrap_or_default();
        let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// `count` pages reading "Page 1", "Page 2", and so on, each followed by a
/// line of filler so that no page counts as blank.
pub fn sample_pages(count: u32) -> Document {
    let texts: Vec<String> = (1..=count)
        .map(|i| {
            format!(
                "Page {i}\nThe quick brown fox jumps over the lazy dog on page {i}."
            )
        })
        .collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    document_with_texts(&refs)
}

/// Three pages with an Info dictionary carrying a title and author.
pub fn sample_document() -> Document {
    let mut doc = sample_pages(3);
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Quarterly report"),
        "Author" => Object::string_literal("Finance team"),
        "Producer" => Object::string_literal("cyberpdf tests"),
        "CreationDate" => Object::string_literal("D:20240315103000+02'00'"),
    });
    doc.trailer.set("Info", info_id);
    doc
}

/// Attach a flat outline with one top-level entry per `(title, page)`.
pub fn add_outline(doc: &mut Document, entries: &[(&str, u32)]) {
    let pages = doc.get_pages();
    let outlines_id = doc.new_object_id();
    let ids: Vec<ObjectId> = entries.iter().map(|_| doc.new_object_id()).collect();

    for (i, (title, page)) in entries.iter().enumerate() {
        let mut item = dictionary! {
            "Title" => Object::string_literal(*title),
            "Parent" => outlines_id,
        };
        if let Some(page_id) = pages.get(page) {
            item.set("Dest", vec![(*page_id).into(), "Fit".into()]);
        }
        if i > 0 {
            item.set("Prev", ids[i - 1]);
        }
        if i + 1 < ids.len() {
            item.set("Next", ids[i + 1]);
        }
        doc.objects.insert(ids[i], Object::Dictionary(item));
    }

    let mut outlines = dictionary! {
        "Type" => "Outlines",
        "Count" => ids.len() as i64,
    };
    if let (Some(first), Some(last)) = (ids.first(), ids.last()) {
        outlines.set("First", *first);
        outlines.set("Last", *last);
    }
    doc.objects.insert(outlines_id, Object::Dictionary(outlines));
    if let Ok(catalog) = doc.catalog_mut() {
        catalog.set("Outlines", outlines_id);
    }
}

/// Add an image XObject to the resources of page `page` and draw it.
pub fn add_image(doc: &mut Document, page: u32, image: Stream) -> ObjectId {
    let image_id = doc.add_object(image);
    let Some(page_id) = doc.get_pages().get(&page).copied() else {
        return image_id;
    };
    let name = format!("Im{}", image_id.0);

    let mut resources: Dictionary = crate::pdf::objects::page_resources(doc, page_id);
    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();
    xobjects.set(name.as_bytes().to_vec(), image_id);
    resources.set("XObject", xobjects);

    let draw = format!("q 100 0 0 100 72 72 cm /{name} Do Q\n").into_bytes();
    let draw_id = doc.add_object(Stream::new(dictionary! {}, draw));

    if let Ok(page_dict) = doc.get_dictionary_mut(page_id) {
        let mut contents = match page_dict.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(other) => vec![other.clone()],
            Err(_) => Vec::new(),
        };
        contents.push(Object::Reference(draw_id));
        page_dict.set("Contents", contents);
        page_dict.set("Resources", resources);
    }
    image_id
}

/// A `width` x `height` DeviceRGB image with raw samples.
pub fn rgb_image(width: u32, height: u32) -> Stream {
    let samples: Vec<u8> = (0..width * height)
        .flat_map(|i| [(i % 256) as u8, 0x80, 0xFF])
        .collect();
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
        },
        samples,
    )
}

/// An image XObject whose payload is declared as JPEG.
pub fn jpeg_image(payload: &[u8]) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1_i64,
            "Height" => 1_i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
            "Filter" => "DCTDecode",
        },
        payload.to_vec(),
    )
}

/// Serialise `doc` into memory.
pub fn save(doc: &mut Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap_or_default();
    bytes
}

/// Serialise `doc` to `path`.
pub fn write(doc: &mut Document, path: impl AsRef<Path>) -> std::io::Result<()> {
    std::fs::write(path, save(doc))
}
