// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Object-level helpers shared by the PDF operations: reference resolution,
// inherited page attributes, text strings and dates.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use cyberpdf_core::error::CyberPdfError;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

/// Attributes a page may inherit from its ancestors in the page tree.
pub const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// US Letter, used when no ancestor declares a `/MediaBox`.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Reference chains longer than this are treated as broken.
const MAX_REFERENCE_DEPTH: usize = 32;

pub(crate) fn pdf_error(context: &str, err: impl std::fmt::Display) -> CyberPdfError {
    CyberPdfError::Pdf(format!("{context}: {err}"))
}

/// Follow references until a direct object is reached.
///
/// Dangling references resolve to `Object::Null`.
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    let mut current = object;
    for _ in 0..MAX_REFERENCE_DEPTH {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(next) => current = next,
                Err(_) => return &Object::Null,
            },
            other => return other,
        }
    }
    &Object::Null
}

/// The dictionary behind `object`, looking through references and streams.
pub fn as_dictionary<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object) {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

pub fn name(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name),
        _ => None,
    }
}

/// Integer or real as `f32`.
pub fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Whether `dict` has `/Type` equal to `type_name`.
pub fn has_type(dict: &Dictionary, type_name: &[u8]) -> bool {
    dict.get(b"Type").ok().and_then(name) == Some(type_name)
}

/// Look up `key` on a page, walking up `/Parent` links for inheritable
/// attributes.
pub fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_REFERENCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        node = as_dictionary(doc, node.get(b"Parent").ok()?)?;
    }
    None
}

/// Page box as `[x0, y0, x1, y1]`, normalised so that `x0 <= x1` and
/// `y0 <= y1`.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let parsed = inherited(doc, page_id, b"MediaBox")
        .map(|obj| resolve(doc, obj))
        .and_then(|obj| match obj {
            Object::Array(values) if values.len() == 4 => {
                let mut out = [0.0; 4];
                for (slot, value) in out.iter_mut().zip(values) {
                    *slot = number(resolve(doc, value))?;
                }
                Some(out)
            }
            _ => None,
        });
    let [x0, y0, x1, y1] = parsed.unwrap_or(DEFAULT_MEDIA_BOX);
    [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]
}

/// Effective `/Rotate` of a page in `0..360`.
pub fn page_rotation(doc: &Document, page_id: ObjectId) -> i32 {
    inherited(doc, page_id, b"Rotate")
        .and_then(|obj| resolve(doc, obj).as_i64().ok())
        .map(|r| (r as i32).rem_euclid(360))
        .unwrap_or(0)
}

/// A standalone copy of a page's resource dictionary, with every
/// top-level category resolved into a direct dictionary.
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|obj| as_dictionary(doc, obj))
        .cloned()
        .unwrap_or_default();
    for (_, value) in resources.iter_mut() {
        if let Object::Reference(id) = *value
            && let Some(dict) = doc.get_object(id).ok().and_then(|obj| as_dictionary(doc, obj))
        {
            *value = Object::Dictionary(dict.clone());
        }
    }
    resources
}

/// Image XObjects reachable from a page's resources, in resource order.
pub fn page_image_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let Some(xobjects) = inherited(doc, page_id, b"Resources")
        .and_then(|obj| as_dictionary(doc, obj))
        .and_then(|res| res.get(b"XObject").ok())
        .and_then(|obj| as_dictionary(doc, obj))
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(_, value)| match value {
            Object::Reference(id) => Some(*id),
            _ => None,
        })
        .filter(|id| {
            doc.get_object(*id)
                .ok()
                .and_then(|obj| as_dictionary(doc, obj))
                .and_then(|dict| dict.get(b"Subtype").ok())
                .and_then(name)
                == Some(b"Image".as_slice())
        })
        .collect()
}

// -- Text strings -------------------------------------------------------------

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8 with BOM, or
/// PDFDocEncoding (treated as Latin-1).
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode `text` as a PDF text string: a literal when it is plain ASCII,
/// otherwise UTF-16BE with a byte-order mark.
pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Read a text string entry from `dict`, trimming it and dropping empties.
pub fn text_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::String(bytes, _) => {
            let text = decode_text_string(bytes);
            let trimmed = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

// -- Dates --------------------------------------------------------------------

/// Parse a PDF date (`D:YYYYMMDDHHmmSSOHH'mm'`). Every field after the year
/// is optional; a missing offset means UTC.
pub fn parse_pdf_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    let raw = raw.strip_prefix("D:").unwrap_or(raw);
    let digits_end = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, zone) = raw.split_at(digits_end);
    if digits.len() < 4 {
        return None;
    }

    let field = |start: usize, len: usize, default: u32| -> Option<u32> {
        match digits.get(start..start + len) {
            Some(s) => s.parse().ok(),
            None => Some(default),
        }
    };
    let year: i32 = digits.get(0..4)?.parse().ok()?;
    let month = field(4, 2, 1)?;
    let day = field(6, 2, 1)?;
    let hour = field(8, 2, 0)?;
    let minute = field(10, 2, 0)?;
    let second = field(12, 2, 0)?;

    let offset = parse_offset(zone)?;
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    offset.from_local_datetime(&naive).single()
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let mut chars = zone.chars();
    let sign = match chars.next() {
        None | Some('Z') => return FixedOffset::east_opt(0),
        Some('+') => 1,
        Some('-') => -1,
        Some(_) => return None,
    };
    let numbers: Vec<i32> = chars
        .as_str()
        .split('\'')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().ok())
        .collect::<Option<_>>()?;
    let hours = numbers.first().copied().unwrap_or(0);
    let minutes = numbers.get(1).copied().unwrap_or(0);
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Format a timestamp as a PDF date string.
pub fn format_pdf_date(date: &DateTime<FixedOffset>) -> String {
    let offset = date.offset().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let offset = offset.abs();
    format!(
        "D:{}{}{:02}'{:02}'",
        date.format("%Y%m%d%H%M%S"),
        sign,
        offset / 3600,
        (offset % 3600) / 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use lopdf::dictionary;

    #[test]
    fn decodes_utf16_and_latin1() {
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0xE9]), "Hé");
        assert_eq!(decode_text_string(b"Caf\xe9"), "Café");
        assert_eq!(decode_text_string(b"\xEF\xBB\xBFna\xC3\xAFve"), "naïve");
    }

    #[test]
    fn encodes_non_ascii_as_utf16() {
        let Object::String(bytes, StringFormat::Hexadecimal) = encode_text_string("Ünï") else {
            panic!("expected a hex string");
        };
        assert_eq!(decode_text_string(&bytes), "Ünï");
        assert!(matches!(
            encode_text_string("plain"),
            Object::String(_, StringFormat::Literal)
        ));
    }

    #[test]
    fn parses_full_and_partial_dates() {
        let date = parse_pdf_date("D:20240315103000+02'00'").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 15));
        assert_eq!(date.hour(), 10);
        assert_eq!(date.offset().local_minus_utc(), 7200);

        let date = parse_pdf_date("D:2023").unwrap();
        assert_eq!((date.month(), date.day()), (1, 1));

        let date = parse_pdf_date("20231201120000Z").unwrap();
        assert_eq!(date.offset().local_minus_utc(), 0);

        let date = parse_pdf_date("D:20231201120000-05'30").unwrap();
        assert_eq!(date.offset().local_minus_utc(), -(5 * 3600 + 30 * 60));
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(parse_pdf_date("yesterday").is_none());
        assert!(parse_pdf_date("D:20231345").is_none());
        assert!(parse_pdf_date("D:202312011200?").is_none());
    }

    #[test]
    fn formatted_dates_parse_back() {
        let date = parse_pdf_date("D:20240101090807-03'00'").unwrap();
        assert_eq!(format_pdf_date(&date), "D:20240101090807-03'00'");
    }

    #[test]
    fn page_attributes_are_inherited() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1_i64,
                "MediaBox" => vec![0.into(), 0.into(), 200.into(), 100.into()],
                "Rotate" => -90_i64,
            }),
        );

        assert_eq!(media_box(&doc, page_id), [0.0, 0.0, 200.0, 100.0]);
        assert_eq!(page_rotation(&doc, page_id), 270);
        assert!(inherited(&doc, page_id, b"Resources").is_none());
        assert!(page_resources(&doc, page_id).is_empty());
    }
}
