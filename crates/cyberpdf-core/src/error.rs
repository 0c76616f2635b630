// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for CyberPDF.

use thiserror::Error;

/// Top-level error type for all CyberPDF operations.
#[derive(Debug, Error)]
pub enum CyberPdfError {
    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("page {page} out of range (document has {total} pages)")]
    PageOutOfRange { page: u32, total: u32 },

    #[error("invalid page selection '{input}': {reason}")]
    InvalidPageSelection { input: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("document is encrypted; decrypt it first")]
    Encrypted,

    #[error("image extraction failed: {0}")]
    Image(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    // -- Conversion errors --
    #[error("unsupported conversion: {0}")]
    UnsupportedConversion(String),

    #[error("Word document error: {0}")]
    Docx(String),

    // -- Security errors --
    #[error("incorrect password")]
    WrongPassword,

    #[error("document is already encrypted")]
    AlreadyEncrypted,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("unsupported encryption: {0}")]
    UnsupportedEncryption(String),

    // -- Settings / cache --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cache error: {0}")]
    Cache(String),

    // -- Runner --
    #[error("operation cancelled")]
    Cancelled,

    // -- Persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CyberPdfError>;
