// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cache manager: thumbnail paths in an LRU cache backed by `<key>.jpg` files,
// and operation results persisted as `result_<id>.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use cyberpdf_core::error::{CyberPdfError, Result};
use cyberpdf_security::hash_bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::lru::LruCache;

/// Default number of thumbnail paths kept in memory.
pub const DEFAULT_THUMBNAIL_CAPACITY: usize = 500;

/// Cache usage figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Thumbnail paths plus operation results held in memory.
    pub memory_items: usize,
    pub disk_files: usize,
    pub disk_bytes: u64,
}

impl CacheStats {
    pub fn disk_megabytes(&self) -> f64 {
        self.disk_bytes as f64 / (1024.0 * 1024.0)
    }
}

pub struct CacheManager {
    dir: PathBuf,
    thumbnails: LruCache<String, PathBuf>,
    results: HashMap<String, Value>,
}

impl CacheManager {
    /// Open the cache rooted at `dir`, creating the directory if needed.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display(), capacity = thumbnail_capacity))]
    pub fn new(dir: impl AsRef<Path>, thumbnail_capacity: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            CyberPdfError::Cache(format!("cannot create {}: {e}", dir.display()))
        })?;
        info!("cache opened");
        Ok(Self {
            dir,
            thumbnails: LruCache::new(thumbnail_capacity),
            results: HashMap::new(),
        })
    }

    /// The cache in the user's cache directory.
    pub fn open_default(thumbnail_capacity: usize) -> Result<Self> {
        Self::new(cyberpdf_core::data_dir::cache_dir(), thumbnail_capacity)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Key of the thumbnail of `page` of `pdf_path` at `size` pixels.
    pub fn thumbnail_key(pdf_path: &Path, page: u32, size: u32) -> String {
        hash_bytes(format!("{}_{page}_{size}", pdf_path.display()).as_bytes())
    }

    /// Where a thumbnail with this key is stored on disk.
    pub fn thumbnail_file(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.jpg"))
    }

    /// Cached thumbnail path, if the file still exists.
    pub fn get_thumbnail(&mut self, pdf_path: &Path, page: u32, size: u32) -> Option<PathBuf> {
        let key = Self::thumbnail_key(pdf_path, page, size);

        if let Some(path) = self.thumbnails.get(&key) {
            if path.exists() {
                return Some(path.clone());
            }
            debug!(%key, "cached thumbnail file vanished");
            self.thumbnails.remove(&key);
        }

        let on_disk = self.thumbnail_file(&key);
        if on_disk.is_file() {
            self.thumbnails.put(key, on_disk.clone());
            return Some(on_disk);
        }
        None
    }

    /// Remember where the thumbnail of `page` of `pdf_path` lives.
    pub fn cache_thumbnail(
        &mut self,
        pdf_path: &Path,
        page: u32,
        size: u32,
        thumbnail: impl Into<PathBuf>,
    ) {
        let key = Self::thumbnail_key(pdf_path, page, size);
        if let Some((evicted, _)) = self.thumbnails.put(key, thumbnail.into()) {
            debug!(%evicted, "thumbnail evicted from memory");
        }
    }

    fn result_file(&self, operation_id: &str) -> PathBuf {
        self.dir.join(format!("result_{operation_id}.json"))
    }

    /// Store an operation result in memory and on disk.
    pub fn cache_operation_result<T: Serialize>(
        &mut self,
        operation_id: &str,
        result: &T,
    ) -> Result<()> {
        check_id(operation_id)?;
        let value = serde_json::to_value(result)?;
        let json = serde_json::to_vec_pretty(&value)?;
        cyberpdf_core::output::write_bytes_atomic(self.result_file(operation_id), &json)?;
        self.results.insert(operation_id.to_string(), value);
        debug!(operation_id, "operation result cached");
        Ok(())
    }

    /// A stored operation result, from memory or disk.
    pub fn get_operation_result<T: DeserializeOwned>(
        &mut self,
        operation_id: &str,
    ) -> Result<Option<T>> {
        check_id(operation_id)?;
        if let Some(value) = self.results.get(operation_id) {
            return Ok(Some(serde_json::from_value(value.clone())?));
        }

        let file = self.result_file(operation_id);
        let bytes = match std::fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value: Value = serde_json::from_slice(&bytes)?;
        let result = serde_json::from_value(value.clone())?;
        self.results.insert(operation_id.to_string(), value);
        Ok(Some(result))
    }

    /// Delete cache files last modified more than `max_age` ago. Returns
    /// the number of files removed.
    #[instrument(skip(self))]
    pub fn cleanup_old_cache(&mut self, max_age: Duration) -> Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;
        for (path, metadata) in self.files()? {
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age <= max_age {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "cannot remove cache file"),
            }
        }

        let dir = self.dir.clone();
        self.results
            .retain(|id, _| dir.join(format!("result_{id}.json")).exists());
        info!(removed, "old cache files removed");
        Ok(removed)
    }

    /// Empty memory and delete every cache file.
    pub fn clear_all(&mut self) -> Result<()> {
        self.thumbnails.clear();
        self.results.clear();
        for (path, _) in self.files()? {
            std::fs::remove_file(&path).map_err(|e| {
                CyberPdfError::Cache(format!("cannot remove {}: {e}", path.display()))
            })?;
        }
        info!("cache cleared");
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let files = self.files()?;
        Ok(CacheStats {
            memory_items: self.thumbnails.len() + self.results.len(),
            disk_files: files.len(),
            disk_bytes: files.iter().map(|(_, m)| m.len()).sum(),
        })
    }

    /// Regular files directly inside the cache directory.
    fn files(&self) -> Result<Vec<(PathBuf, std::fs::Metadata)>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            CyberPdfError::Cache(format!("cannot read {}: {e}", self.dir.display()))
        })?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                files.push((entry.path(), metadata));
            }
        }
        Ok(files)
    }
}

/// Operation ids become file names, so only a safe alphabet is accepted.
fn check_id(operation_id: &str) -> Result<()> {
    let valid = !operation_id.is_empty()
        && operation_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(CyberPdfError::Cache(format!(
            "invalid operation id '{operation_id}'"
        )))
    }
}
