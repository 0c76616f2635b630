// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal WordprocessingML packages: writing headings, paragraphs and page
// breaks with `zip`, and reading paragraph text back out with `regex`.

use std::io::{Cursor, Read, Write};
use std::sync::LazyLock;

use chrono::Utc;
use cyberpdf_core::error::{CyberPdfError, Result};
use regex::Regex;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:rPr><w:b/><w:sz w:val="56"/></w:rPr></w:style>
</w:styles>"#;

const DOCUMENT_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

const DOCUMENT_CLOSE: &str = "<w:sectPr/></w:body></w:document>";

static PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:p\b[^>]*?(?:/>|>(.*?)</w:p>)").expect("paragraph pattern")
});
/// A run of text, a tab, or a line break inside a paragraph.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab\s*/>|<w:(?:br|cr)\b[^>]*/>")
        .expect("token pattern")
});
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(amp|lt|gt|quot|apos|#[0-9]+|#x[0-9a-fA-F]+);").expect("entity pattern")
});
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<dc:title>(.*?)</dc:title>").expect("title pattern"));

/// Builds a `.docx` package in memory.
#[derive(Debug, Default)]
pub struct DocxBuilder {
    title: Option<String>,
    body: String,
    paragraphs: usize,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `Title`-styled heading and record it as the document title.
    pub fn title(&mut self, text: &str) -> &mut Self {
        self.title = Some(text.to_string());
        self.body.push_str(r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr>"#);
        self.push_run(text);
        self.body.push_str("</w:p>");
        self.paragraphs += 1;
        self
    }

    pub fn paragraph(&mut self, text: &str) -> &mut Self {
        self.body.push_str("<w:p>");
        self.push_run(text);
        self.body.push_str("</w:p>");
        self.paragraphs += 1;
        self
    }

    pub fn page_break(&mut self) -> &mut Self {
        self.body
            .push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
        self
    }

    /// Number of text paragraphs, including the title.
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs
    }

    fn push_run(&mut self, text: &str) {
        self.body.push_str(r#"<w:r><w:t xml:space="preserve">"#);
        self.body.push_str(&escape_xml(text));
        self.body.push_str("</w:t></w:r>");
    }

    /// Zip the package.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let document = format!("{DOCUMENT_OPEN}{}{DOCUMENT_CLOSE}", self.body);
        let core = core_properties(self.title.as_deref());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let parts: [(&str, &str); 6] = [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", PACKAGE_RELS),
            ("word/document.xml", &document),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS),
            ("word/styles.xml", STYLES),
            ("docProps/core.xml", &core),
        ];
        for (name, content) in parts {
            zip.start_file(name, options).map_err(docx_error)?;
            zip.write_all(content.as_bytes())?;
        }
        let cursor = zip.finish().map_err(docx_error)?;

        debug!(paragraphs = self.paragraphs, "docx package written");
        Ok(cursor.into_inner())
    }
}

fn core_properties(title: Option<&str>) -> String {
    let created = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let title = title
        .map(|t| format!("<dc:title>{}</dc:title>", escape_xml(t)))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">{title}<dc:creator>CyberPDF</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created></cp:coreProperties>"#
    )
}

fn docx_error(err: zip::result::ZipError) -> CyberPdfError {
    CyberPdfError::Docx(err.to_string())
}

/// Escape XML special characters and drop characters XML 1.0 cannot carry.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

/// Undo XML entity escaping.
fn unescape_xml(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => name
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .unwrap_or_else(|| name[1..].parse())
                    .ok()
                    .and_then(char::from_u32),
            };
            decoded.map(String::from).unwrap_or_default()
        })
        .into_owned()
}

/// Text of every paragraph in `word/document.xml`, empty paragraphs
/// included.
pub fn read_paragraphs(package: &[u8]) -> Result<Vec<String>> {
    let xml = read_part(package, "word/document.xml")?
        .ok_or_else(|| CyberPdfError::Docx("package has no word/document.xml".into()))?;
    Ok(paragraphs_from_xml(&xml))
}

/// `dc:title` from `docProps/core.xml`, when present.
pub fn read_title(package: &[u8]) -> Result<Option<String>> {
    let Some(core) = read_part(package, "docProps/core.xml")? else {
        return Ok(None);
    };
    Ok(TITLE
        .captures(&core)
        .map(|caps| unescape_xml(caps[1].trim()))
        .filter(|t| !t.is_empty()))
}

fn read_part(package: &[u8], name: &str) -> Result<Option<String>> {
    let mut archive = ZipArchive::new(Cursor::new(package)).map_err(docx_error)?;
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(docx_error(err)),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|e| CyberPdfError::Docx(format!("cannot read {name}: {e}")))?;
    Ok(Some(xml))
}

fn paragraphs_from_xml(xml: &str) -> Vec<String> {
    PARAGRAPH
        .captures_iter(xml)
        .map(|caps| {
            let Some(inner) = caps.get(1) else {
                return String::new();
            };
            let mut text = String::new();
            for tok in TOKEN.captures_iter(inner.as_str()) {
                match tok.get(1) {
                    Some(run) => text.push_str(&unescape_xml(run.as_str())),
                    None if tok[0].starts_with("<w:tab") => text.push('\t'),
                    None if tok[0].contains("w:type=\"page\"") => {}
                    None => text.push('\n'),
                }
            }
            text
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_specials_and_drops_controls() {
        assert_eq!(
            escape_xml("a<b & \"c\"\u{0}\u{7}\tok"),
            "a&lt;b &amp; &quot;c&quot;\tok"
        );
    }

    #[test]
    fn unescapes_entities() {
        assert_eq!(unescape_xml("&lt;&amp;&#65;&#x42;&bogus;"), "<&AB&bogus;");
    }

    #[test]
    fn written_package_reads_back() {
        let mut builder = DocxBuilder::new();
        builder
            .title("Report <2024>")
            .paragraph("First & foremost")
            .page_break()
            .paragraph("Second page");
        let bytes = builder.to_bytes().unwrap();

        let paragraphs = read_paragraphs(&bytes).unwrap();
        assert_eq!(
            paragraphs,
            vec!["Report <2024>", "First & foremost", "", "Second page"]
        );
        assert_eq!(read_title(&bytes).unwrap().as_deref(), Some("Report <2024>"));
        assert_eq!(builder.paragraph_count(), 3);
    }

    #[test]
    fn package_has_required_parts() {
        let bytes = DocxBuilder::new().paragraph("x").to_bytes().unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "docProps/core.xml",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing {name}");
        }
    }

    #[test]
    fn parses_word_markup() {
        let xml = r#"<w:body><w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>Hello</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve"> world</w:t></w:r></w:p><w:p/><w:p w:rsidR="00A1"><w:r><w:t>a</w:t><w:br/><w:t>b</w:t></w:r></w:p></w:body>"#;
        assert_eq!(
            paragraphs_from_xml(xml),
            vec!["Hello\t world", "", "a\nb"]
        );
    }

    #[test]
    fn rejects_non_zip_input() {
        assert!(matches!(
            read_paragraphs(b"plain text"),
            Err(CyberPdfError::Docx(_))
        ));
    }
}
