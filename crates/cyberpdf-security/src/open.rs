// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Parsing input that may be password protected.

use std::collections::{BTreeMap, HashSet};

use cyberpdf_core::error::{CyberPdfError, Result};
use lopdf::xref::XrefEntry;
use lopdf::{Document, ObjectId, Reader};
use tracing::debug;

/// Parse `bytes` without decrypting anything that needs a password.
///
/// lopdf only loads the `/Encrypt` dictionary of a file whose user password
/// is not empty. The remaining objects are read verbatim here, so strings
/// and streams stay encrypted until [`crate::unlock_document`] runs. A file
/// with an empty user password comes back already decrypted, with
/// `encryption_state` set.
pub fn open_document(bytes: &[u8]) -> Result<Document> {
    let document = Document::load_mem(bytes)
        .map_err(|e| CyberPdfError::Pdf(format!("failed to parse PDF: {e}")))?;
    if !document.is_encrypted() || document.encryption_state.is_some() {
        return Ok(document);
    }
    Ok(read_sealed_objects(bytes, document))
}

fn read_sealed_objects(bytes: &[u8], document: Document) -> Document {
    // Offsets count from the header, as in lopdf's own reader.
    let start = bytes.windows(5).position(|w| w == b"%PDF-").unwrap_or(0);
    let ids: Vec<ObjectId> = document
        .reference_table
        .entries
        .iter()
        .filter_map(|(&number, entry)| match *entry {
            XrefEntry::Normal { generation, .. } => Some((number, generation)),
            _ => None,
        })
        .collect();

    let mut reader = Reader {
        buffer: &bytes[start..],
        document,
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    };
    let mut skipped = 0usize;
    for id in ids {
        if reader.document.objects.contains_key(&id) {
            continue;
        }
        match reader.get_object(id, &mut HashSet::new()) {
            Ok(object) => {
                reader.document.objects.insert(id, object);
            }
            Err(e) => {
                skipped += 1;
                debug!(?id, error = %e, "unreadable object skipped");
            }
        }
    }
    debug!(
        objects = reader.document.objects.len(),
        skipped, "encrypted objects read"
    );
    reader.document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protect::tests::{encrypted_bytes, sample_document, save};

    #[test]
    fn plain_file_loads_normally() {
        let bytes = save(&mut sample_document());
        let doc = open_document(&bytes).unwrap();
        assert!(!doc.is_encrypted());
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn protected_file_keeps_its_structure() {
        let bytes = encrypted_bytes("user", Some("owner"));
        let doc = open_document(&bytes).unwrap();
        assert!(doc.is_encrypted());
        assert!(doc.encryption_state.is_none());
        assert_eq!(doc.get_pages().len(), 1);
        assert!(doc.trailer.has(b"Info"));
    }

    #[test]
    fn garbage_is_a_pdf_error() {
        assert!(matches!(
            open_document(b"not a pdf at all"),
            Err(CyberPdfError::Pdf(_))
        ));
    }
}
