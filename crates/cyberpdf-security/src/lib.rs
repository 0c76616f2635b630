// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! cyberpdf-security — password protection and privacy checks for PDFs.
//!
//! Encrypts documents with lopdf's standard security handler (V5 / R6,
//! AES-256), removes protection given the user or owner password (also for
//! older RC4 and AES-128 files), reports permissions and embedded
//! JavaScript, strips document metadata and fingerprints files with SHA-256.

pub mod inspect;
pub mod integrity;
pub mod open;
pub mod protect;
pub mod sanitize;

// PUBLIC API: Re-export the file-level operations
pub use inspect::check_security;
pub use integrity::{hash_bytes, hash_file};
pub use open::open_document;
pub use protect::{
    DecryptOutcome, EncryptionSettings, decrypt_file, encrypt_document, encrypt_file,
    unlock_document,
};
pub use sanitize::remove_metadata;
