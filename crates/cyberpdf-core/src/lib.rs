// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CyberPDF — Core types, errors, settings and the operation runner shared
// across all crates.

pub mod config;
pub mod data_dir;
pub mod error;
pub mod human_errors;
pub mod output;
pub mod runner;
pub mod types;

pub use config::{AppConfig, ConfigStore};
pub use error::{CyberPdfError, Result};
pub use runner::{CancelToken, OperationHandle, OperationRunner, ProgressReporter};
pub use types::*;
