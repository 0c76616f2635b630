// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Runs blocking document operations off the caller's thread.
//
// An operation receives a `ProgressReporter`. It publishes progress through a
// `watch` channel and checks for cancellation between units of work.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span};

use crate::error::{CyberPdfError, Result};
use crate::types::{OperationId, Progress};

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handed to an operation so it can report progress and observe cancellation.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Arc<watch::Sender<Progress>>,
    cancel: CancelToken,
}

impl ProgressReporter {
    pub fn new(cancel: CancelToken) -> (Self, watch::Receiver<Progress>) {
        let (tx, rx) = watch::channel(Progress::default());
        (
            Self {
                tx: Arc::new(tx),
                cancel,
            },
            rx,
        )
    }

    /// A reporter nobody listens to, for synchronous callers.
    pub fn silent() -> Self {
        Self::new(CancelToken::new()).0
    }

    pub fn set_total(&self, total: u64) {
        self.tx.send_modify(|p| p.total = total);
    }

    /// Record one finished unit of work.
    pub fn advance(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|p| {
            p.done += 1;
            p.message = message;
        });
    }

    pub fn message(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|p| p.message = message);
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(CyberPdfError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn snapshot(&self) -> Progress {
        self.tx.borrow().clone()
    }
}

/// A running operation.
#[derive(Debug)]
pub struct OperationHandle<T> {
    id: OperationId,
    progress: watch::Receiver<Progress>,
    cancel: CancelToken,
    join: JoinHandle<Result<T>>,
}

impl<T> OperationHandle<T> {
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// A receiver that observes every progress update.
    pub fn progress(&self) -> watch::Receiver<Progress> {
        self.progress.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the operation to finish.
    pub async fn wait(self) -> Result<T> {
        match self.join.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(CyberPdfError::Cancelled),
            Err(e) => Err(CyberPdfError::Io(std::io::Error::other(format!(
                "operation task failed: {e}"
            )))),
        }
    }
}

/// Starts operations on tokio's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationRunner;

impl OperationRunner {
    pub fn new() -> Self {
        Self
    }

    /// Spawn `op`. Must be called from within a tokio runtime.
    pub fn spawn<T, F>(&self, name: &'static str, op: F) -> OperationHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&ProgressReporter) -> Result<T> + Send + 'static,
    {
        let id = OperationId::new();
        let cancel = CancelToken::new();
        let (reporter, progress) = ProgressReporter::new(cancel.clone());

        let join = tokio::task::spawn_blocking(move || {
            let span = info_span!("operation", %id, name);
            let _guard = span.enter();
            info!("started");
            let result = op(&reporter);
            match &result {
                Ok(_) => info!("finished"),
                Err(CyberPdfError::Cancelled) => info!("cancelled"),
                Err(e) => error!(error = %e, "failed"),
            }
            result
        });

        OperationHandle {
            id,
            progress,
            cancel,
            join,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_and_reports_progress() {
        let handle = OperationRunner::new().spawn("count", |reporter| {
            reporter.set_total(3);
            for i in 0..3 {
                reporter.checkpoint()?;
                reporter.advance(format!("step {i}"));
            }
            Ok(42)
        });
        let rx = handle.progress();
        assert_eq!(handle.wait().await.unwrap(), 42);
        let last = rx.borrow().clone();
        assert_eq!(last.done, 3);
        assert_eq!(last.total, 3);
        assert_eq!(last.message, "step 2");
    }

    #[tokio::test]
    async fn cancellation_is_observed_at_checkpoints() {
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (go_tx, go_rx) = std::sync::mpsc::channel::<()>();
        let handle = OperationRunner::new().spawn("wait", move |reporter| {
            started_tx.send(()).ok();
            go_rx.recv().ok();
            reporter.checkpoint()?;
            Ok(())
        });
        started_rx.recv().unwrap();
        handle.cancel();
        go_tx.send(()).unwrap();
        assert!(matches!(handle.wait().await, Err(CyberPdfError::Cancelled)));
    }

    #[test]
    fn silent_reporter_accepts_updates() {
        let reporter = ProgressReporter::silent();
        reporter.set_total(2);
        reporter.advance("one");
        assert_eq!(reporter.snapshot().done, 1);
        assert!(reporter.checkpoint().is_ok());
    }
}
