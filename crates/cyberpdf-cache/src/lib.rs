// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! cyberpdf-cache — local caching for CyberPDF.
//!
//! A generic LRU cache and a manager that keeps thumbnail paths in memory,
//! backed by files in the cache directory, and persists operation results
//! as JSON.

pub mod lru;
pub mod manager;

pub use lru::LruCache;
pub use manager::{CacheManager, CacheStats, DEFAULT_THUMBNAIL_CAPACITY};
