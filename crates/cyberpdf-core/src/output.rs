// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// All-or-nothing output files.
//
// Every file an operation produces is written to a temporary file in the
// destination directory and renamed into place only once it is complete.
// Multi-file operations collect their outputs in an `OutputBatch`, which
// deletes everything it wrote unless the whole batch is finished.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::Result;

/// A single output file that appears at its target path only on `commit`.
#[derive(Debug)]
pub struct AtomicOutput {
    target: PathBuf,
    temp: NamedTempFile,
}

impl AtomicOutput {
    /// Start writing `target`. Missing parent directories are created.
    pub fn create(target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;
        let temp = tempfile::Builder::new()
            .prefix(".cyberpdf-")
            .suffix(".part")
            .tempfile_in(&parent)?;
        Ok(Self { target, temp })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn file_mut(&mut self) -> &mut File {
        self.temp.as_file_mut()
    }

    /// Rename the finished file onto the target path.
    pub fn commit(self) -> Result<PathBuf> {
        self.temp.as_file().sync_all()?;
        self.temp.persist(&self.target).map_err(|e| e.error)?;
        debug!(path = %self.target.display(), "output committed");
        Ok(self.target)
    }
}

/// Write `target` through `write`, committing only if it returns `Ok`.
pub fn write_atomic<F>(target: impl AsRef<Path>, write: F) -> Result<PathBuf>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let mut output = AtomicOutput::create(target)?;
    {
        let mut writer = BufWriter::new(output.file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    output.commit()
}

/// Write raw bytes atomically.
pub fn write_bytes_atomic(target: impl AsRef<Path>, bytes: &[u8]) -> Result<PathBuf> {
    write_atomic(target, |w| Ok(w.write_all(bytes)?))
}

/// Outputs of a multi-file operation, removed again unless `finish` is called.
#[derive(Debug, Default)]
pub struct OutputBatch {
    written: Vec<PathBuf>,
    finished: bool,
}

impl OutputBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically write one member of the batch.
    pub fn write<F>(&mut self, target: impl AsRef<Path>, write: F) -> Result<PathBuf>
    where
        F: FnOnce(&mut dyn Write) -> Result<()>,
    {
        let path = write_atomic(target, write)?;
        self.written.push(path.clone());
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    /// Keep every written file and return their paths.
    pub fn finish(mut self) -> Vec<PathBuf> {
        self.finished = true;
        std::mem::take(&mut self.written)
    }
}

impl Drop for OutputBatch {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        for path in &self.written {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "failed to remove partial output");
            }
        }
        if !self.written.is_empty() {
            debug!(count = self.written.len(), "rolled back partial outputs");
        }
    }
}
