// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Password protection on top of lopdf's standard security handler.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cyberpdf_core::error::{CyberPdfError, Result};
use cyberpdf_core::output::{write_atomic, write_bytes_atomic};
use cyberpdf_core::runner::ProgressReporter;
use cyberpdf_core::types::Permissions;
use lopdf::encryption::DecryptionError;
use lopdf::encryption::crypt_filters::{Aes256CryptFilter, CryptFilter};
use lopdf::{Document, EncryptionState, EncryptionVersion, Object, StringFormat, dictionary};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, info, instrument, warn};

use crate::open::open_document;

const CRYPT_FILTER: &[u8] = b"StdCF";

/// What [`decrypt_file`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptOutcome {
    Decrypted {
        /// The owner password was given.
        owner: bool,
    },
    /// The input had no password; it was copied unchanged.
    NotEncrypted,
}

/// Password and permission settings for [`encrypt_document`].
#[derive(Debug, Clone)]
pub struct EncryptionSettings {
    pub user_password: String,
    /// Falls back to the user password when `None`.
    pub owner_password: Option<String>,
    pub permissions: Permissions,
}

/// Encrypt every string and stream with AES-256 (V5 / R6, AESV3).
pub fn encrypt_document(document: &mut Document, settings: &EncryptionSettings) -> Result<()> {
    if document.is_encrypted() {
        return Err(CyberPdfError::AlreadyEncrypted);
    }

    let owner = settings
        .owner_password
        .as_deref()
        .unwrap_or(&settings.user_password);
    let file_key = random_bytes::<32>()?;
    let filter: Arc<dyn CryptFilter> = Arc::new(Aes256CryptFilter);
    let permissions =
        lopdf::Permissions::from_bits_truncate(u64::from(settings.permissions.to_p_value() as u32));

    let state = EncryptionState::try_from(EncryptionVersion::V5 {
        encrypt_metadata: true,
        crypt_filters: BTreeMap::from([(CRYPT_FILTER.to_vec(), filter)]),
        file_encryption_key: &file_key,
        stream_filter: CRYPT_FILTER.to_vec(),
        string_filter: CRYPT_FILTER.to_vec(),
        owner_password: owner,
        user_password: &settings.user_password,
        permissions,
    })
    .map_err(security_error)?;

    ensure_file_id(document)?;
    drop_derived_streams(document);
    declare_aes256_support(document)?;
    document.encrypt(&state).map_err(security_error)?;
    debug!("document encrypted with AES-256");
    Ok(())
}

/// Remove encryption in place with the user or owner password.
///
/// Returns `true` when the owner password was given. On a wrong password
/// the document is left untouched.
pub fn unlock_document(document: &mut Document, password: &str) -> Result<bool> {
    document
        .authenticate_password(password)
        .map_err(security_error)?;
    let owner = document.authenticate_owner_password(password).is_ok();

    if document.encryption_state.is_some() {
        // Already decrypted while loading; only the handler is left.
        if let Some(Object::Reference(id)) = document.trailer.remove(b"Encrypt") {
            document.objects.remove(&id);
        }
    } else {
        document.decrypt(password).map_err(security_error)?;
    }
    document.encryption_state = None;
    drop_derived_streams(document);
    Ok(owner)
}

/// Write a password-protected copy of `input` (AES-256, V5 / R6).
///
/// The owner password defaults to the user password.
#[instrument(skip_all, fields(input = %input.as_ref().display()))]
pub fn encrypt_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    user_password: &str,
    owner_password: Option<&str>,
    permissions: Permissions,
    reporter: &ProgressReporter,
) -> Result<PathBuf> {
    reporter.set_total(3);

    let bytes = std::fs::read(input.as_ref())?;
    let mut document = open_document(&bytes)?;
    if document.is_encrypted() {
        return Err(CyberPdfError::AlreadyEncrypted);
    }
    reporter.advance("loaded");
    reporter.checkpoint()?;

    encrypt_document(
        &mut document,
        &EncryptionSettings {
            user_password: user_password.to_string(),
            owner_password: owner_password.map(str::to_string),
            permissions,
        },
    )?;
    reporter.advance("encrypted");
    reporter.checkpoint()?;

    let path = write_atomic(output, |mut w| {
        document
            .save_to(&mut w)
            .map_err(|e| CyberPdfError::Encryption(format!("failed to write PDF: {e}")))?;
        Ok(())
    })?;
    reporter.advance("saved");
    info!(output = %path.display(), "PDF encrypted");
    Ok(path)
}

/// Remove password protection using the user or owner password.
///
/// Unencrypted input is copied through unchanged.
#[instrument(skip_all, fields(input = %input.as_ref().display()))]
pub fn decrypt_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    password: &str,
    reporter: &ProgressReporter,
) -> Result<DecryptOutcome> {
    reporter.set_total(3);

    let bytes = std::fs::read(input.as_ref())?;
    let mut document = open_document(&bytes)?;
    reporter.advance("loaded");

    if !document.is_encrypted() {
        warn!("input is not encrypted, copying it unchanged");
        write_bytes_atomic(output, &bytes)?;
        reporter.advance("copied");
        reporter.advance("saved");
        return Ok(DecryptOutcome::NotEncrypted);
    }

    reporter.checkpoint()?;
    let owner = unlock_document(&mut document, password)?;
    reporter.advance("decrypted");
    reporter.checkpoint()?;

    let path = write_atomic(output, |mut w| {
        document
            .save_to(&mut w)
            .map_err(|e| CyberPdfError::Pdf(format!("failed to write PDF: {e}")))?;
        Ok(())
    })?;
    reporter.advance("saved");
    info!(output = %path.display(), owner, "PDF decrypted");
    Ok(DecryptOutcome::Decrypted { owner })
}

fn security_error(err: lopdf::Error) -> CyberPdfError {
    match err {
        lopdf::Error::Decryption(DecryptionError::IncorrectPassword) => CyberPdfError::WrongPassword,
        lopdf::Error::AlreadyEncrypted => CyberPdfError::AlreadyEncrypted,
        lopdf::Error::Decryption(
            e @ (DecryptionError::UnsupportedEncryption
            | DecryptionError::UnsupportedVersion
            | DecryptionError::UnsupportedRevision),
        ) => CyberPdfError::UnsupportedEncryption(e.to_string()),
        lopdf::Error::UnsupportedSecurityHandler(name) => CyberPdfError::UnsupportedEncryption(
            format!("security handler /{}", String::from_utf8_lossy(&name)),
        ),
        other => CyberPdfError::Encryption(other.to_string()),
    }
}

fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| CyberPdfError::Encryption("system random source unavailable".into()))?;
    Ok(buf)
}

fn has_type(object: &Object, expected: &[u8]) -> bool {
    matches!(object, Object::Stream(stream) if stream.dict.has_type(expected))
}

/// Object streams are expanded on load and cross-reference streams are
/// rebuilt on save, so neither may be carried over.
fn drop_derived_streams(document: &mut Document) {
    document
        .objects
        .retain(|_, object| !has_type(object, b"ObjStm") && !has_type(object, b"XRef"));
}

fn ensure_file_id(document: &mut Document) -> Result<()> {
    let present = matches!(
        document.trailer.get(b"ID"),
        Ok(Object::Array(ids)) if matches!(ids.first(), Some(Object::String(..)))
    );
    if !present {
        let id = random_bytes::<16>()?.to_vec();
        document.trailer.set(
            "ID",
            Object::Array(vec![
                Object::String(id.clone(), StringFormat::Hexadecimal),
                Object::String(id, StringFormat::Hexadecimal),
            ]),
        );
    }
    Ok(())
}

/// AES-256 needs PDF 1.7 with Adobe extension level 8 (or PDF 2.0).
fn declare_aes256_support(document: &mut Document) -> Result<()> {
    let version: f32 = document.version.parse().unwrap_or(1.4);
    if version >= 2.0 {
        return Ok(());
    }
    document.version = "1.7".to_string();

    let catalog = document
        .catalog_mut()
        .map_err(|e| CyberPdfError::Pdf(format!("document has no catalog: {e}")))?;
    catalog.set(
        "Extensions",
        dictionary! {
            "ADBE" => dictionary! {
                "BaseVersion" => Object::Name(b"1.7".to_vec()),
                "ExtensionLevel" => 8_i64,
            },
        },
    );
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::Stream;
    use lopdf::content::{Content, Operation};
    use lopdf::encryption::crypt_filters::Aes128CryptFilter;

    /// One-page document showing `text`, with an Info title.
    pub(crate) fn document_with_text(text: &str) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1_i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Quarterly report"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        doc
    }

    pub(crate) fn sample_document() -> Document {
        document_with_text("Secret text")
    }

    pub(crate) fn save(doc: &mut Document) -> Vec<u8> {
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    pub(crate) fn encrypted_bytes(user: &str, owner: Option<&str>) -> Vec<u8> {
        let mut doc = sample_document();
        encrypt_document(
            &mut doc,
            &EncryptionSettings {
                user_password: user.into(),
                owner_password: owner.map(Into::into),
                permissions: Permissions::all(),
            },
        )
        .unwrap();
        save(&mut doc)
    }

    fn title(doc: &Document) -> Vec<u8> {
        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        match doc.get_dictionary(info_id).unwrap().get(b"Title").unwrap() {
            Object::String(bytes, _) => bytes.clone(),
            other => panic!("unexpected title {other:?}"),
        }
    }

    fn sample_file(dir: &Path) -> PathBuf {
        let path = dir.join("plain.pdf");
        std::fs::write(&path, save(&mut sample_document())).unwrap();
        path
    }

    /// Encrypt `doc` with a legacy scheme built by lopdf and return the bytes.
    pub(crate) fn legacy_bytes(mut doc: Document, aes: bool) -> Vec<u8> {
        let id = b"0123456789abcdef".to_vec();
        doc.trailer.set(
            "ID",
            Object::Array(vec![
                Object::String(id.clone(), StringFormat::Hexadecimal),
                Object::String(id, StringFormat::Hexadecimal),
            ]),
        );
        let state = if aes {
            let filter: Arc<dyn CryptFilter> = Arc::new(Aes128CryptFilter);
            EncryptionState::try_from(EncryptionVersion::V4 {
                document: &doc,
                encrypt_metadata: true,
                crypt_filters: BTreeMap::from([(CRYPT_FILTER.to_vec(), filter)]),
                stream_filter: CRYPT_FILTER.to_vec(),
                string_filter: CRYPT_FILTER.to_vec(),
                owner_password: "pw-owner",
                user_password: "pw",
                permissions: lopdf::Permissions::all(),
            })
            .unwrap()
        } else {
            EncryptionState::try_from(EncryptionVersion::V2 {
                document: &doc,
                owner_password: "pw-owner",
                user_password: "pw",
                key_length: 128,
                permissions: lopdf::Permissions::all(),
            })
            .unwrap()
        };
        doc.encrypt(&state).unwrap();
        save(&mut doc)
    }

    #[test]
    fn encrypted_output_hides_plaintext() {
        let bytes = encrypted_bytes("user", Some("owner"));
        let haystack = String::from_utf8_lossy(&bytes);
        assert!(!haystack.contains("Quarterly report"));
        assert!(!haystack.contains("Secret text"));
        assert!(haystack.contains("/AESV3"));
    }

    #[test]
    fn round_trip_with_user_and_owner_password() {
        let bytes = encrypted_bytes("user", Some("owner"));

        for (password, owner) in [("user", false), ("owner", true)] {
            let mut doc = open_document(&bytes).unwrap();
            assert_eq!(unlock_document(&mut doc, password).unwrap(), owner);
            assert!(!doc.is_encrypted());
            assert_eq!(title(&doc), b"Quarterly report");
            assert!(doc.extract_text(&[1]).unwrap().contains("Secret text"));
        }
    }

    #[test]
    fn wrong_password_leaves_document_encrypted() {
        let bytes = encrypted_bytes("user", None);
        let mut doc = open_document(&bytes).unwrap();
        assert!(matches!(
            unlock_document(&mut doc, "guess"),
            Err(CyberPdfError::WrongPassword)
        ));
        assert!(doc.is_encrypted());
        // The owner password defaults to the user password.
        assert!(unlock_document(&mut doc, "user").unwrap());
    }

    #[test]
    fn encrypting_twice_is_rejected() {
        let mut doc = sample_document();
        let settings = EncryptionSettings {
            user_password: "a".into(),
            owner_password: None,
            permissions: Permissions::all(),
        };
        encrypt_document(&mut doc, &settings).unwrap();
        assert!(matches!(
            encrypt_document(&mut doc, &settings),
            Err(CyberPdfError::AlreadyEncrypted)
        ));
    }

    #[test]
    fn legacy_rc4_and_aes128_files_decrypt() {
        for aes in [false, true] {
            let bytes = legacy_bytes(sample_document(), aes);
            let mut doc = open_document(&bytes).unwrap();
            assert!(!unlock_document(&mut doc, "pw").unwrap());
            assert_eq!(title(&doc), b"Quarterly report");

            let mut doc = open_document(&bytes).unwrap();
            assert!(unlock_document(&mut doc, "pw-owner").unwrap());
        }
    }

    #[test]
    fn empty_user_password_opens_with_owner_password() {
        let mut doc = sample_document();
        encrypt_document(
            &mut doc,
            &EncryptionSettings {
                user_password: String::new(),
                owner_password: Some("owner".into()),
                permissions: Permissions::all(),
            },
        )
        .unwrap();
        let bytes = save(&mut doc);

        let mut doc = open_document(&bytes).unwrap();
        assert!(doc.is_encrypted());
        assert!(unlock_document(&mut doc, "owner").unwrap());
        assert!(!doc.is_encrypted());
        assert_eq!(title(&doc), b"Quarterly report");
    }

    #[test]
    fn encrypt_then_decrypt_files() {
        let dir = tempfile::tempdir().unwrap();
        let plain = sample_file(dir.path());
        let locked = dir.path().join("locked.pdf");
        let unlocked = dir.path().join("unlocked.pdf");
        let reporter = ProgressReporter::silent();

        encrypt_file(&plain, &locked, "pw", None, Permissions::all(), &reporter).unwrap();
        assert_eq!(reporter.snapshot().done, 3);

        let outcome = decrypt_file(&locked, &unlocked, "pw", &ProgressReporter::silent()).unwrap();
        assert_eq!(outcome, DecryptOutcome::Decrypted { owner: true });

        let doc = Document::load(&unlocked).unwrap();
        assert!(doc.extract_text(&[1]).unwrap().contains("Secret text"));
    }

    #[test]
    fn literal_encrypt_name_in_page_text_survives_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.pdf");
        let locked = dir.path().join("locked.pdf");
        let unlocked = dir.path().join("unlocked.pdf");
        std::fs::write(&plain, save(&mut document_with_text("see /Encrypt entry"))).unwrap();

        encrypt_file(&plain, &locked, "pw", None, Permissions::all(), &ProgressReporter::silent())
            .unwrap();
        decrypt_file(&locked, &unlocked, "pw", &ProgressReporter::silent()).unwrap();

        let doc = Document::load(&unlocked).unwrap();
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains("see /Encrypt entry"), "got {text:?}");
        assert!(!text.contains("EncHold"));
    }

    #[test]
    fn encrypting_an_encrypted_file_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let plain = sample_file(dir.path());
        let locked = dir.path().join("locked.pdf");
        let twice = dir.path().join("twice.pdf");
        let reporter = ProgressReporter::silent();

        encrypt_file(&plain, &locked, "pw", Some("owner"), Permissions::all(), &reporter).unwrap();
        let err = encrypt_file(&locked, &twice, "x", None, Permissions::all(), &reporter);
        assert!(matches!(err, Err(CyberPdfError::AlreadyEncrypted)));
        assert!(!twice.exists());
    }

    #[test]
    fn wrong_password_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let plain = sample_file(dir.path());
        let locked = dir.path().join("locked.pdf");
        let out = dir.path().join("out.pdf");

        encrypt_file(&plain, &locked, "pw", None, Permissions::all(), &ProgressReporter::silent())
            .unwrap();
        let err = decrypt_file(&locked, &out, "nope", &ProgressReporter::silent());
        assert!(matches!(err, Err(CyberPdfError::WrongPassword)));
        assert!(!out.exists());
    }

    #[test]
    fn plain_input_is_copied_through() {
        let dir = tempfile::tempdir().unwrap();
        let plain = sample_file(dir.path());
        let out = dir.path().join("copy.pdf");

        let outcome = decrypt_file(&plain, &out, "ignored", &ProgressReporter::silent()).unwrap();
        assert_eq!(outcome, DecryptOutcome::NotEncrypted);
        assert!(crate::integrity::same_contents(&plain, &out).unwrap());
    }
}
