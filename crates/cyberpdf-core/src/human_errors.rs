// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the command line and any future front end.
//
// Every technical error is mapped to a plain sentence plus a suggestion. The
// severity drives how the message is presented (icon, colour, exit code).

use crate::error::CyberPdfError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The user has to change something (password, page range, file choice).
    ActionRequired,
    /// Cannot be fixed by retrying: damaged file, unsupported feature.
    Permanent,
    /// Might work on a second attempt (disk full, interrupted write).
    Transient,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// One-line summary.
    pub message: String,
    /// What the user should try next.
    pub suggestion: String,
    /// Severity level.
    pub severity: Severity,
}

impl HumanError {
    fn new(message: impl Into<String>, suggestion: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            severity,
        }
    }
}

/// Convert a `CyberPdfError` into a `HumanError`.
pub fn humanize_error(err: &CyberPdfError) -> HumanError {
    match err {
        // -- Document errors --
        CyberPdfError::Pdf(_) => HumanError::new(
            "There's a problem with this PDF file.",
            "The file may be damaged or not a PDF at all. Try opening it in a viewer first, or use a different file.",
            Severity::Permanent,
        ),

        CyberPdfError::PageOutOfRange { page, total } => HumanError::new(
            format!("Page {page} doesn't exist."),
            format!("This document has {total} pages. Choose page numbers between 1 and {total}."),
            Severity::ActionRequired,
        ),

        CyberPdfError::InvalidPageSelection { input, reason } => HumanError::new(
            format!("The page selection '{input}' couldn't be understood."),
            format!("Use page numbers and ranges like 1-5,7,9-12 ({reason})."),
            Severity::ActionRequired,
        ),

        CyberPdfError::InvalidArgument(detail) => HumanError::new(
            "One of the options isn't valid.",
            format!("Check the command options and try again ({detail})."),
            Severity::ActionRequired,
        ),

        CyberPdfError::Encrypted => HumanError::new(
            "This PDF is password protected.",
            "Remove the password with the decrypt command first, then run this operation on the decrypted copy.",
            Severity::ActionRequired,
        ),

        CyberPdfError::Image(_) => HumanError::new(
            "An image inside the PDF couldn't be read.",
            "The image may use an unusual format. The other images were not affected; try again without this page.",
            Severity::Permanent,
        ),

        CyberPdfError::Ocr(_) => HumanError::new(
            "Text recognition didn't work on this document.",
            "Make sure the OCR models are installed and the scanned pages are clear and in focus.",
            Severity::Transient,
        ),

        // -- Conversion --
        CyberPdfError::UnsupportedConversion(detail) => HumanError::new(
            "That conversion isn't available.",
            format!("Choose a different target format or method ({detail})."),
            Severity::Permanent,
        ),

        CyberPdfError::Docx(_) => HumanError::new(
            "The Word document couldn't be read.",
            "Make sure the file is a .docx document (not the older .doc format) and that it isn't damaged.",
            Severity::Permanent,
        ),

        // -- Security --
        CyberPdfError::WrongPassword => HumanError::new(
            "That password isn't correct.",
            "Check for typing mistakes and Caps Lock, then try again.",
            Severity::ActionRequired,
        ),

        CyberPdfError::AlreadyEncrypted => HumanError::new(
            "This PDF already has a password.",
            "Decrypt it first if you want to change the password.",
            Severity::ActionRequired,
        ),

        CyberPdfError::Encryption(_) => HumanError::new(
            "The PDF couldn't be protected.",
            "Try again. If this keeps happening, the source file may be damaged.",
            Severity::Transient,
        ),

        CyberPdfError::UnsupportedEncryption(detail) => HumanError::new(
            "This PDF uses a kind of protection we can't open.",
            format!("Only password (standard) security is supported ({detail})."),
            Severity::Permanent,
        ),

        // -- Settings / cache --
        CyberPdfError::Config(detail) => HumanError::new(
            "The settings file has a problem.",
            format!("Fix the value in the settings file or run `cyberpdf config reset` ({detail})."),
            Severity::ActionRequired,
        ),

        CyberPdfError::Cache(_) => HumanError::new(
            "The cache had a problem.",
            "Run `cyberpdf cache clear` and try again.",
            Severity::Transient,
        ),

        CyberPdfError::Cancelled => HumanError::new(
            "The operation was cancelled.",
            "No output files were kept. Run it again when you're ready.",
            Severity::ActionRequired,
        ),

        // -- Persistence --
        CyberPdfError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError::new(
                "The file couldn't be found.",
                "It may have been moved or deleted. Check the path and try again.",
                Severity::ActionRequired,
            ),
            std::io::ErrorKind::PermissionDenied => HumanError::new(
                "There's no permission to read or write that file.",
                "Check the file permissions, or choose a different output folder.",
                Severity::ActionRequired,
            ),
            _ => HumanError::new(
                "There was a problem reading or writing a file.",
                "Try again. If this keeps happening, the disk may be full.",
                Severity::Transient,
            ),
        },

        CyberPdfError::Serialization(_) | CyberPdfError::Yaml(_) => HumanError::new(
            "Some stored data couldn't be read.",
            "Try again. If this keeps happening, clear the cache or reset the settings.",
            Severity::Transient,
        ),
    }
}
