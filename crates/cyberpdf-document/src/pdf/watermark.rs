// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text watermarks stamped over existing page content.

use cyberpdf_core::error::Result;
use cyberpdf_core::types::{WatermarkOptions, WatermarkPosition};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, instrument};

use super::objects::{media_box, page_resources, pdf_error, resolve};

/// Resource names used for the watermark font and graphics state.
const FONT_RESOURCE: &str = "CpdfWm";
const STATE_RESOURCE: &str = "CpdfGs";

/// Distance from the page edge for top and bottom placement, in points.
const EDGE_MARGIN: f32 = 36.0;

/// Stamp `options.text` on every page of `document`.
///
/// Existing page content is wrapped in `q`/`Q` so its graphics state cannot
/// leak into the watermark.
#[instrument(skip(document), fields(text = %options.text))]
pub fn apply_watermark(document: &mut Document, options: &WatermarkOptions) -> Result<u32> {
    options.validate()?;

    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let state_id = document.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => options.opacity,
        "CA" => options.opacity,
    });
    let save_id = document.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));

    let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
    for &page_id in &page_ids {
        let stamp = stamp_content(document, page_id, options)?;
        let stamp_id = document.add_object(Stream::new(dictionary! {}, stamp));

        let mut resources = page_resources(document, page_id);
        add_resource(&mut resources, b"Font", FONT_RESOURCE, font_id);
        add_resource(&mut resources, b"ExtGState", STATE_RESOURCE, state_id);

        let mut contents = vec![Object::Reference(save_id)];
        contents.extend(existing_contents(document, page_id));
        contents.push(Object::Reference(stamp_id));

        let page = document
            .get_dictionary_mut(page_id)
            .map_err(|e| pdf_error("cannot update page", e))?;
        page.set("Contents", contents);
        page.set("Resources", resources);
    }

    debug!(pages = page_ids.len(), "watermark applied");
    Ok(page_ids.len() as u32)
}

/// The page's content streams as a flat list of references.
fn existing_contents(document: &Document, page_id: ObjectId) -> Vec<Object> {
    let Some(contents) = document
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Contents").ok())
    else {
        return Vec::new();
    };
    match resolve(document, contents) {
        Object::Array(items) => items.clone(),
        Object::Stream(_) => vec![contents.clone()],
        _ => Vec::new(),
    }
}

fn add_resource(resources: &mut Dictionary, category: &[u8], key: &str, id: ObjectId) {
    let mut entries = match resources.get(category) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    entries.set(key, id);
    resources.set(category.to_vec(), entries);
}

/// Content stream drawing the watermark on one page. Closes the `q` that
/// precedes the original content.
fn stamp_content(
    document: &Document,
    page_id: ObjectId,
    options: &WatermarkOptions,
) -> Result<Vec<u8>> {
    let [x0, y0, x1, y1] = media_box(document, page_id);
    let size = options.font_size;
    let text_width = estimate_width(&options.text, size);

    let center_x = (x0 + x1) / 2.0;
    let (anchor_y, degrees) = match options.position {
        WatermarkPosition::Center => ((y0 + y1) / 2.0, options.rotation),
        WatermarkPosition::Top => (y1 - EDGE_MARGIN - size / 2.0, options.rotation),
        WatermarkPosition::Bottom => (y0 + EDGE_MARGIN + size / 2.0, options.rotation),
        WatermarkPosition::Diagonal => ((y0 + y1) / 2.0, 45),
    };

    // Rotate the text box around its centre, which sits on the anchor.
    let (sin, cos) = (degrees as f32).to_radians().sin_cos();
    let (dx, dy) = (-text_width / 2.0, -size / 3.0);
    let origin_x = center_x + dx * cos - dy * sin;
    let origin_y = anchor_y + dx * sin + dy * cos;

    let [r, g, b] = options.color;
    let operations = vec![
        Operation::new("Q", vec![]),
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(STATE_RESOURCE.into())]),
        Operation::new("rg", vec![r.into(), g.into(), b.into()]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(FONT_RESOURCE.into()), size.into()]),
        Operation::new(
            "Tm",
            vec![
                cos.into(),
                sin.into(),
                (-sin).into(),
                cos.into(),
                origin_x.into(),
                origin_y.into(),
            ],
        ),
        Operation::new(
            "Tj",
            vec![Object::String(win_ansi(&options.text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ];
    Content { operations }
        .encode()
        .map_err(|e| pdf_error("cannot encode watermark", e))
}

/// Rough Helvetica advance width: half the font size per character.
fn estimate_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5
}

/// Latin-1 bytes for the WinAnsi font; other characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
