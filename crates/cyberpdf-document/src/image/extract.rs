// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image extraction — pull image XObjects out of PDF pages in a format an
// ordinary viewer can open, using `lopdf` for the streams and `image` for
// re-encoding raw samples.

use std::collections::HashSet;
use std::io::Cursor;

use cyberpdf_core::error::{CyberPdfError, Result};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use crate::pdf::objects::{name, page_image_ids, resolve};

/// File format chosen for an extracted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Jpeg2000,
    Png,
    /// Undecoded stream payload.
    Raw,
}

impl ImageKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Jpeg2000 => "jp2",
            Self::Png => "png",
            Self::Raw => "bin",
        }
    }
}

/// An image pulled out of a document.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    /// 1-based page the image was first found on.
    pub page: u32,
    pub object_id: ObjectId,
    pub kind: ImageKind,
    pub data: Vec<u8>,
}

impl ExtractedImage {
    /// `image_<n>.<ext>` for the `n`-th extracted image.
    pub fn file_name(&self, n: usize) -> String {
        format!("image_{n}.{}", self.kind.extension())
    }

    /// Decode into pixels, where the format allows it.
    pub fn decode(&self) -> Option<DynamicImage> {
        let format = match self.kind {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
            ImageKind::Jpeg2000 | ImageKind::Raw => return None,
        };
        image::load_from_memory_with_format(&self.data, format).ok()
    }
}

/// Every image XObject used by `pages` (1-based), each object once, in page
/// order.
pub fn extract_images(document: &Document, pages: &[u32]) -> Vec<ExtractedImage> {
    let all_pages = document.get_pages();
    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for &page in pages {
        let Some(&page_id) = all_pages.get(&page) else {
            continue;
        };
        for id in page_image_ids(document, page_id) {
            if !seen.insert(id) {
                continue;
            }
            match export_image(document, id) {
                Ok((kind, data)) => images.push(ExtractedImage {
                    page,
                    object_id: id,
                    kind,
                    data,
                }),
                Err(err) => warn!(?id, page, %err, "image skipped"),
            }
        }
    }

    debug!(count = images.len(), "images extracted");
    images
}

/// Encode one image XObject.
pub fn export_image(document: &Document, id: ObjectId) -> Result<(ImageKind, Vec<u8>)> {
    let stream = match document.get_object(id) {
        Ok(Object::Stream(stream)) => stream,
        _ => {
            return Err(CyberPdfError::Image(format!(
                "object {} {} is not an image stream",
                id.0, id.1
            )));
        }
    };

    let filters = filters(document, stream);
    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") if filters.len() == 1 => {
            return Ok((ImageKind::Jpeg, stream.content.clone()));
        }
        Some(b"JPXDecode") if filters.len() == 1 => {
            return Ok((ImageKind::Jpeg2000, stream.content.clone()));
        }
        _ => {}
    }

    let samples = if filters.is_empty() {
        Some(stream.content.clone())
    } else {
        stream.decompressed_content().ok()
    };
    if let Some(png) = samples.and_then(|samples| encode_png(document, stream, samples)) {
        return Ok((ImageKind::Png, png));
    }
    Ok((ImageKind::Raw, stream.content.clone()))
}

fn filters(document: &Document, stream: &Stream) -> Vec<Vec<u8>> {
    match stream.dict.get(b"Filter").map(|f| resolve(document, f)) {
        Ok(Object::Name(filter)) => vec![filter.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| name(resolve(document, item)).map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// PNG for 8-bit DeviceRGB and DeviceGray samples; `None` for anything else.
fn encode_png(document: &Document, stream: &Stream, samples: Vec<u8>) -> Option<Vec<u8>> {
    let dict = &stream.dict;
    let int = |key: &[u8]| {
        dict.get(key)
            .ok()
            .and_then(|v| resolve(document, v).as_i64().ok())
    };
    let width = u32::try_from(int(b"Width")?).ok()?;
    let height = u32::try_from(int(b"Height")?).ok()?;
    if int(b"BitsPerComponent")? != 8 {
        return None;
    }
    let color_space = dict.get(b"ColorSpace").ok().map(|cs| resolve(document, cs))?;

    let pixels = width as usize * height as usize;
    let image = match name(color_space)? {
        b"DeviceRGB" if samples.len() >= pixels * 3 => {
            let mut samples = samples;
            samples.truncate(pixels * 3);
            DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, samples)?)
        }
        b"DeviceGray" if samples.len() >= pixels => {
            let mut samples = samples;
            samples.truncate(pixels);
            DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, samples)?)
        }
        _ => return None,
    };

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .ok()?;
    Some(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{add_image, jpeg_image, rgb_image, sample_pages};
    use lopdf::dictionary;

    #[test]
    fn jpeg_payload_is_passed_through() {
        let mut doc = sample_pages(1);
        add_image(&mut doc, 1, jpeg_image(b"\xFF\xD8fake\xFF\xD9"));

        let images = extract_images(&doc, &[1]);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].kind, ImageKind::Jpeg);
        assert_eq!(images[0].data, b"\xFF\xD8fake\xFF\xD9");
        assert_eq!(images[0].file_name(1), "image_1.jpg");
    }

    #[test]
    fn raw_rgb_becomes_png() {
        let mut doc = sample_pages(1);
        add_image(&mut doc, 1, rgb_image(4, 3));

        let images = extract_images(&doc, &[1]);
        assert_eq!(images[0].kind, ImageKind::Png);
        let decoded = images[0].decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn flate_rgb_becomes_png() {
        let mut doc = sample_pages(1);
        let mut stream = rgb_image(2, 2);
        stream.compress().unwrap();
        assert!(stream.dict.has(b"Filter"));
        add_image(&mut doc, 1, stream);

        let images = extract_images(&doc, &[1]);
        assert_eq!(images[0].kind, ImageKind::Png);
    }

    #[test]
    fn unknown_layouts_are_saved_raw() {
        let mut doc = sample_pages(1);
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 8_i64,
                "Height" => 8_i64,
                "ColorSpace" => "DeviceCMYK",
                "BitsPerComponent" => 8_i64,
            },
            vec![0u8; 8 * 8 * 4],
        );
        add_image(&mut doc, 1, stream);

        let images = extract_images(&doc, &[1]);
        assert_eq!(images[0].kind, ImageKind::Raw);
        assert_eq!(images[0].file_name(3), "image_3.bin");
    }

    #[test]
    fn shared_images_are_extracted_once() {
        let mut doc = sample_pages(2);
        let id = add_image(&mut doc, 1, jpeg_image(b"jpeg"));
        let page_two = doc.get_pages()[&2];
        let mut resources = crate::pdf::objects::page_resources(&doc, page_two);
        resources.set("XObject", dictionary! { "Shared" => id });
        doc.get_dictionary_mut(page_two)
            .unwrap()
            .set("Resources", resources);

        let images = extract_images(&doc, &[1, 2]);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].page, 1);
    }
}
