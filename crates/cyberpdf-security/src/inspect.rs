// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Security inspection: encryption, permissions, metadata and JavaScript.

use std::path::Path;

use cyberpdf_core::error::Result;
use cyberpdf_core::types::{Permissions, SecurityReport};
use lopdf::{Dictionary, Document, Object};
use tracing::{debug, instrument};

use crate::open::open_document;

/// Inspect a PDF without needing its password.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn check_security(path: impl AsRef<Path>) -> Result<SecurityReport> {
    let bytes = std::fs::read(path.as_ref())?;
    let document = open_document(&bytes)?;
    let report = inspect(&document);
    debug!(
        encrypted = report.is_encrypted,
        javascript = report.has_javascript,
        "security checked"
    );
    Ok(report)
}

/// Build a report for an already parsed document.
pub fn inspect(document: &Document) -> SecurityReport {
    let handler = document.get_encrypted().ok();
    let metadata_fields = info_fields(document);
    let has_xmp = document
        .catalog()
        .map(|catalog| catalog.has(b"Metadata"))
        .unwrap_or(false);

    SecurityReport {
        is_encrypted: handler.is_some(),
        encryption: handler.map(describe_handler),
        permissions: handler.map(handler_permissions),
        has_metadata: has_xmp || !metadata_fields.is_empty(),
        metadata_fields,
        has_javascript: has_javascript(document),
    }
}

/// Short description such as `Standard V5 R6 (AES-256)`.
fn describe_handler(handler: &Dictionary) -> String {
    let filter = handler
        .get(b"Filter")
        .and_then(Object::as_name)
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .unwrap_or_else(|_| "Standard".to_string());
    let version = handler.get(b"V").and_then(Object::as_i64).unwrap_or(0);
    let revision = handler.get(b"R").and_then(Object::as_i64).unwrap_or(0);

    let method: &[u8] = if version >= 4 {
        handler
            .get(b"StmF")
            .and_then(Object::as_name)
            .ok()
            .and_then(|name| {
                handler
                    .get(b"CF")
                    .and_then(Object::as_dict)
                    .and_then(|filters| filters.get(name))
                    .and_then(Object::as_dict)
                    .and_then(|filter| filter.get(b"CFM"))
                    .and_then(Object::as_name)
                    .ok()
            })
            .unwrap_or(b"Identity")
    } else {
        b"V2"
    };
    let algorithm = match method {
        b"AESV3" => "AES-256".to_string(),
        b"AESV2" => "AES-128".to_string(),
        b"V2" => {
            let bits = handler.get(b"Length").and_then(Object::as_i64).unwrap_or(40);
            format!("RC4 {bits}-bit")
        }
        _ => "no stream encryption".to_string(),
    };
    format!("{filter} V{version} R{revision} ({algorithm})")
}

fn handler_permissions(handler: &Dictionary) -> Permissions {
    let p = handler.get(b"P").and_then(Object::as_i64).unwrap_or(0);
    Permissions::from_p_value(p as i32)
}

/// Names of the non-empty entries of the Info dictionary.
fn info_fields(document: &Document) -> Vec<String> {
    let info = match document.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => document.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    let Some(info) = info else {
        return Vec::new();
    };

    info.iter()
        .filter(|(_, value)| !matches!(value, Object::String(bytes, _) if bytes.is_empty()))
        .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
        .collect()
}

/// JavaScript can live in the document-level name tree, an open action, or
/// any action dictionary (links, form fields, page actions).
fn has_javascript(document: &Document) -> bool {
    let in_names = document
        .catalog()
        .ok()
        .and_then(|catalog| resolve_dict(document, catalog.get(b"Names").ok()?))
        .is_some_and(|names| names.has(b"JavaScript"));
    if in_names {
        return true;
    }

    document.objects.values().any(|object| match object {
        Object::Dictionary(dict) => dict_has_javascript(document, dict),
        Object::Stream(stream) => dict_has_javascript(document, &stream.dict),
        _ => false,
    })
}

fn dict_has_javascript(document: &Document, dict: &Dictionary) -> bool {
    if is_javascript_action(dict) {
        return true;
    }
    // Inline action dictionaries (e.g. /A, /OpenAction, /AA entries).
    dict.iter().any(|(_, value)| match value {
        Object::Dictionary(inner) => {
            is_javascript_action(inner)
                || inner.iter().any(|(_, v)| {
                    resolve_dict(document, v).is_some_and(is_javascript_action)
                })
        }
        _ => false,
    })
}

fn is_javascript_action(dict: &Dictionary) -> bool {
    dict.has(b"JS") || matches!(dict.get(b"S"), Ok(Object::Name(name)) if name == b"JavaScript")
}

fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => document.get_dictionary(*id).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protect::tests::{legacy_bytes, sample_document, save};
    use crate::protect::{EncryptionSettings, encrypt_document};
    use lopdf::dictionary;

    #[test]
    fn plain_document_report() {
        let mut doc = sample_document();
        let report = inspect(&open_document(&save(&mut doc)).unwrap());

        assert!(!report.is_encrypted);
        assert!(report.permissions.is_none());
        assert!(report.has_metadata);
        assert_eq!(report.metadata_fields, vec!["Title".to_string()]);
        assert!(!report.has_javascript);
    }

    #[test]
    fn encrypted_document_reports_permissions() {
        let mut doc = sample_document();
        let mut permissions = Permissions::all();
        permissions.copy = false;
        encrypt_document(
            &mut doc,
            &EncryptionSettings {
                user_password: "pw".into(),
                owner_password: None,
                permissions,
            },
        )
        .unwrap();

        let report = inspect(&open_document(&save(&mut doc)).unwrap());
        assert!(report.is_encrypted);
        assert_eq!(report.encryption.as_deref(), Some("Standard V5 R6 (AES-256)"));
        let reported = report.permissions.unwrap();
        assert!(reported.print);
        assert!(!reported.copy);
    }

    #[test]
    fn open_action_javascript_is_found() {
        let mut doc = sample_document();
        let catalog = doc.catalog_mut().unwrap();
        catalog.set(
            "OpenAction",
            dictionary! {
                "S" => "JavaScript",
                "JS" => Object::string_literal("app.alert('hi')"),
            },
        );
        let loaded = open_document(&save(&mut doc)).unwrap();
        assert!(inspect(&loaded).has_javascript);
    }

    #[test]
    fn name_tree_javascript_is_found() {
        let mut doc = sample_document();
        let js_tree = doc.add_object(dictionary! { "Names" => Vec::<Object>::new() });
        let catalog = doc.catalog_mut().unwrap();
        catalog.set("Names", dictionary! { "JavaScript" => js_tree });
        let loaded = open_document(&save(&mut doc)).unwrap();
        assert!(inspect(&loaded).has_javascript);
    }

    #[test]
    fn legacy_handlers_are_described() {
        let rc4 = inspect(&open_document(&legacy_bytes(sample_document(), false)).unwrap());
        assert_eq!(rc4.encryption.as_deref(), Some("Standard V2 R3 (RC4 128-bit)"));
        let aes = inspect(&open_document(&legacy_bytes(sample_document(), true)).unwrap());
        assert_eq!(aes.encryption.as_deref(), Some("Standard V4 R4 (AES-128)"));
        assert!(aes.has_metadata);
    }
}
