// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Terminal output: success lines, progress bars and error reports.

use std::fmt::Display;

use cyberpdf_core::error::CyberPdfError;
use cyberpdf_core::human_errors::{Severity, humanize_error};
use cyberpdf_core::runner::{OperationRunner, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

/// How much the command prints besides its results.
#[derive(Debug, Clone, Copy)]
pub struct Ui {
    quiet: bool,
}

impl Ui {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// A copy that shows no progress or success lines.
    pub fn silent(&self) -> Self {
        Self { quiet: true }
    }

    pub fn success(&self, message: impl Display) {
        if !self.quiet {
            println!("✓ {message}");
        }
    }

    pub fn item(&self, message: impl Display) {
        if !self.quiet {
            println!("  - {message}");
        }
    }

    /// A bar with `len` steps, hidden in quiet mode.
    pub fn bar(&self, len: u64) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar
    }

    /// Run `op` on the blocking pool, mirroring its progress in a bar.
    ///
    /// Ctrl-C cancels the operation; it then fails with
    /// [`CyberPdfError::Cancelled`] and leaves no output behind.
    pub async fn run<T, F>(&self, name: &'static str, op: F) -> cyberpdf_core::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&ProgressReporter) -> cyberpdf_core::Result<T> + Send + 'static,
    {
        let handle = OperationRunner::new().spawn(name, op);
        let cancel = handle.cancel_token();
        let mut progress = handle.progress();

        let bar = self.bar(0);
        bar.set_message(name);
        let watcher = {
            let bar = bar.clone();
            tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    let snapshot = progress.borrow_and_update().clone();
                    if snapshot.total > 0 {
                        bar.set_length(snapshot.total);
                    }
                    bar.set_position(snapshot.done);
                    if !snapshot.message.is_empty() {
                        bar.set_message(snapshot.message);
                    }
                }
            })
        };
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling");
                cancel.cancel();
            }
        });

        let result = handle.wait().await;
        interrupt.abort();
        watcher.abort();
        bar.finish_and_clear();
        result
    }
}

/// Print `err` as `✗ Error: ...` on stderr, with a suggestion when the
/// error came from a CyberPDF operation.
pub fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<CyberPdfError>() {
        Some(e) => {
            let human = humanize_error(e);
            eprintln!("✗ Error: {}", human.message);
            let hint = match human.severity {
                Severity::Transient => "Try again",
                Severity::ActionRequired | Severity::Permanent => "Hint",
            };
            eprintln!("  {hint}: {}", human.suggestion);
        }
        None => eprintln!("✗ Error: {err:#}"),
    }
}
