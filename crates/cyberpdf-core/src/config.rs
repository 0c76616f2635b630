// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// The preferences file is YAML. `ConfigStore` keeps the raw document so keys
// it does not know about survive a round trip, and offers dotted-key access
// for the `config` subcommand. `AppConfig` is the typed, validated view.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, instrument};

use crate::error::{CyberPdfError, Result};
use crate::output::write_bytes_atomic;

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub performance: PerformanceConfig,
    pub security: SecurityConfig,
    pub ocr: OcrConfig,
    pub plugins: PluginsConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// `dark` or `light`.
    pub theme: String,
    pub language: String,
    pub check_updates: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// `auto`, `true` or `false`. Stored only.
    pub enable_gpu: Value,
    /// In-memory thumbnail entries kept by the cache.
    pub thumbnail_cache_size: usize,
    pub max_memory_mb: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub secure_mode: bool,
    pub auto_cleanup_temp: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub default_language: String,
    /// `low`, `medium` or `high`.
    pub quality: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    pub enabled: bool,
    pub auto_update: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Edge length in pixels.
    pub thumbnail_size: u32,
    /// `auto` or a column count.
    pub grid_columns: Value,
    pub show_page_numbers: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            performance: PerformanceConfig::default(),
            security: SecurityConfig::default(),
            ocr: OcrConfig::default(),
            plugins: PluginsConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            theme: "dark".into(),
            language: "en".into(),
            check_updates: true,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enable_gpu: Value::String("auto".into()),
            thumbnail_cache_size: 500,
            max_memory_mb: 1024,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secure_mode: false,
            auto_cleanup_temp: true,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            default_language: "eng".into(),
            quality: "medium".into(),
        }
    }
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_update: false,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: 200,
            grid_columns: Value::String("auto".into()),
            show_page_numbers: true,
        }
    }
}

impl AppConfig {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.general.theme.as_str(), "dark" | "light") {
            return Err(CyberPdfError::Config(format!(
                "general.theme must be 'dark' or 'light', got '{}'",
                self.general.theme
            )));
        }
        if self.performance.thumbnail_cache_size < 1 {
            return Err(CyberPdfError::Config(
                "performance.thumbnail_cache_size must be at least 1".into(),
            ));
        }
        if self.performance.max_memory_mb < 64 {
            return Err(CyberPdfError::Config(format!(
                "performance.max_memory_mb must be at least 64, got {}",
                self.performance.max_memory_mb
            )));
        }
        if !(16..=2048).contains(&self.ui.thumbnail_size) {
            return Err(CyberPdfError::Config(format!(
                "ui.thumbnail_size must be between 16 and 2048, got {}",
                self.ui.thumbnail_size
            )));
        }
        if !matches!(self.ocr.quality.as_str(), "low" | "medium" | "high") {
            return Err(CyberPdfError::Config(format!(
                "ocr.quality must be low, medium or high, got '{}'",
                self.ocr.quality
            )));
        }
        Ok(())
    }
}

/// The preferences file on disk, kept as a raw YAML document.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    doc: Value,
}

impl ConfigStore {
    /// Load the file at `path`, writing the defaults first if it is missing.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            info!("no preferences file, writing defaults");
            let store = Self {
                path,
                doc: default_document()?,
            };
            store.save()?;
            return Ok(store);
        }

        let text = std::fs::read_to_string(&path)?;
        let doc = match serde_yaml::from_str::<Value>(&text)? {
            // An empty file parses as null.
            Value::Null => default_document()?,
            doc @ Value::Mapping(_) => doc,
            _ => {
                return Err(CyberPdfError::Config(
                    "top level of the preferences file must be a mapping".into(),
                ));
            }
        };
        debug!("preferences loaded");
        Ok(Self { path, doc })
    }

    /// Load from the default location.
    pub fn load_default() -> Result<Self> {
        Self::load(crate::data_dir::config_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value at a dotted key such as `general.theme`.
    ///
    /// Returns `None` for missing keys or when an intermediate value is not
    /// a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut current = &self.doc;
        for part in key.split('.') {
            current = current.as_mapping()?.get(part)?;
        }
        Some(current)
    }

    /// Like [`get`](Self::get) but falls back to `default`.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Set a dotted key, creating intermediate mappings, then persist.
    ///
    /// The result must still pass typed validation; otherwise nothing changes.
    #[instrument(skip(self, value))]
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        if key.is_empty() || parts.iter().any(|p| p.is_empty()) {
            return Err(CyberPdfError::Config(format!("invalid key '{key}'")));
        }

        let mut doc = self.doc.clone();
        let mut current = &mut doc;
        for part in &parts[..parts.len() - 1] {
            let map = as_mapping_mut(current);
            let entry = map
                .entry(Value::String((*part).to_string()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if !entry.is_mapping() {
                *entry = Value::Mapping(Mapping::new());
            }
            current = entry;
        }
        let last = parts[parts.len() - 1];
        as_mapping_mut(current).insert(Value::String(last.to_string()), value);

        typed_view(&doc)?.validate()?;
        self.doc = doc;
        self.save()?;
        info!(key, "preference updated");
        Ok(())
    }

    /// Restore the default document and persist it.
    pub fn reset(&mut self) -> Result<()> {
        self.doc = default_document()?;
        self.save()?;
        info!("preferences reset to defaults");
        Ok(())
    }

    /// Typed, validated view of the document.
    pub fn app_config(&self) -> Result<AppConfig> {
        let config = typed_view(&self.doc)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the document back to disk.
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&self.doc)?;
        write_bytes_atomic(&self.path, yaml.as_bytes())?;
        Ok(())
    }
}

/// Parse a command-line value as a YAML scalar (`true`, `42`, `light`).
pub fn parse_value(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn default_document() -> Result<Value> {
    Ok(serde_yaml::to_value(AppConfig::default())?)
}

fn typed_view(doc: &Value) -> Result<AppConfig> {
    serde_yaml::from_value(doc.clone())
        .map_err(|e| CyberPdfError::Config(format!("invalid preferences: {e}")))
}

fn as_mapping_mut(value: &mut Value) -> &mut Mapping {
    if !value.is_mapping() {
        *value = Value::Mapping(Mapping::new());
    }
    match value {
        Value::Mapping(map) => map,
        _ => unreachable!("value was just replaced with a mapping"),
    }
}
