// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// XDG-style directory resolution for settings, logs and cache.

use std::path::PathBuf;

const APP_DIR: &str = "cyberpdf";

/// Directory holding `config.yaml` and the log files.
///
/// Not created here; callers create it when they first write.
pub fn config_dir() -> PathBuf {
    xdg_base("XDG_CONFIG_HOME", ".config").join(APP_DIR)
}

/// Default location of the preferences file.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

/// Directory for cached thumbnails and operation results.
pub fn cache_dir() -> PathBuf {
    xdg_base("XDG_CACHE_HOME", ".cache").join(APP_DIR)
}

fn xdg_base(var: &str, home_fallback: &str) -> PathBuf {
    if let Some(dir) = std::env::var_os(var).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join(home_fallback);
    }
    // Last resort
    std::env::temp_dir()
}
