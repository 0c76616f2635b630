// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metadata stripping.

use std::path::{Path, PathBuf};

use cyberpdf_core::error::{CyberPdfError, Result};
use cyberpdf_core::output::write_atomic;
use cyberpdf_core::runner::ProgressReporter;
use lopdf::{Document, Object};
use tracing::{info, instrument};

use crate::open::open_document;

/// Remove the Info dictionary and the catalog's XMP `/Metadata` stream.
///
/// Returns the names of the entries that were removed.
pub fn strip_metadata(document: &mut Document) -> Vec<String> {
    let mut removed = Vec::new();

    if let Some(info) = document.trailer.remove(b"Info") {
        if let Object::Reference(id) = info {
            if let Ok(dict) = document.get_dictionary(id) {
                removed.extend(dict.iter().map(|(k, _)| String::from_utf8_lossy(k).into_owned()));
            }
            document.objects.remove(&id);
        }
        if removed.is_empty() {
            removed.push("Info".to_string());
        }
    }

    let metadata = document
        .catalog_mut()
        .ok()
        .and_then(|catalog| catalog.remove(b"Metadata"));
    if let Some(metadata) = metadata {
        if let Object::Reference(id) = metadata {
            document.objects.remove(&id);
        }
        removed.push("Metadata".to_string());
    }

    removed
}

/// Write a copy of `input` without document metadata.
#[instrument(skip_all, fields(input = %input.as_ref().display()))]
pub fn remove_metadata(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    reporter: &ProgressReporter,
) -> Result<PathBuf> {
    reporter.set_total(2);

    let bytes = std::fs::read(input.as_ref())?;
    let mut document = open_document(&bytes)?;
    if document.is_encrypted() {
        return Err(CyberPdfError::Encrypted);
    }

    let removed = strip_metadata(&mut document);
    reporter.advance("metadata removed");
    reporter.checkpoint()?;

    let path = write_atomic(output, |mut w| {
        document
            .save_to(&mut w)
            .map_err(|e| CyberPdfError::Pdf(format!("failed to write PDF: {e}")))?;
        Ok(())
    })?;
    reporter.advance("saved");
    info!(fields = ?removed, "metadata removed");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protect::tests::{document_with_text, sample_document, save};
    use crate::inspect::check_security;
    use lopdf::{Stream, dictionary};

    #[test]
    fn strips_info_and_xmp() {
        let mut doc = sample_document();
        let xmp = doc.add_object(Stream::new(
            dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
            b"<x:xmpmeta/>".to_vec(),
        ));
        doc.catalog_mut().unwrap().set("Metadata", xmp);

        let removed = strip_metadata(&mut doc);
        assert_eq!(removed, vec!["Title".to_string(), "Metadata".to_string()]);
        assert!(!doc.trailer.has(b"Info"));
        assert!(!doc.catalog().unwrap().has(b"Metadata"));
        assert!(doc.get_object(xmp).is_err());
    }

    #[test]
    fn cleaned_file_has_no_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        std::fs::write(&input, save(&mut sample_document())).unwrap();

        remove_metadata(&input, &output, &ProgressReporter::silent()).unwrap();
        let report = check_security(&output).unwrap();
        assert!(!report.has_metadata);
        assert!(report.metadata_fields.is_empty());
    }

    #[test]
    fn page_text_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        std::fs::write(&input, save(&mut document_with_text("see /Encrypt entry"))).unwrap();

        remove_metadata(&input, &output, &ProgressReporter::silent()).unwrap();
        let doc = Document::load(&output).unwrap();
        assert!(doc.extract_text(&[1]).unwrap().contains("see /Encrypt entry"));
    }
}
