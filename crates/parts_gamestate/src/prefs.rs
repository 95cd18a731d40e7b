//! Key/value preferences persisted to disk

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Key under which the best score is kept
pub const HIGH_SCORE_KEY: &str = "highscore";

/// Prefs errors
#[derive(Debug, Error)]
pub enum PrefsError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Result type for prefs operations
pub type Result<T> = std::result::Result<T, PrefsError>;

/// On-disk format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrefsFormat {
    /// JSON (human readable)
    Json,
    /// Binary (compact)
    Binary,
}

impl Default for PrefsFormat {
    fn default() -> Self {
        Self::Binary
    }
}

/// A stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrefValue {
    Float(f32),
    Int(i32),
    Str(String),
}

/// Prefs shared between the systems that read and write them
pub type SharedPrefs = Arc<Mutex<Prefs>>;

/// String-keyed settings store. Reads of a missing key, or of a key holding
/// another type, return the caller's default.
#[derive(Debug, Clone, Default)]
pub struct Prefs {
    values: BTreeMap<String, PrefValue>,
    path: Option<PathBuf>,
    format: PrefsFormat,
    dirty: bool,
}

impl Prefs {
    /// In-memory prefs; `save` and `load` do nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefs backed by a file. Nothing is read until `load`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Prefs backed by a file, loaded right away
    pub fn open(path: impl Into<PathBuf>, format: PrefsFormat) -> Result<Self> {
        let mut prefs = Self::at(path).with_format(format);
        prefs.load()?;
        Ok(prefs)
    }

    /// Set file format
    pub fn with_format(mut self, format: PrefsFormat) -> Self {
        self.format = format;
        self
    }

    /// Wrap for sharing
    pub fn shared(self) -> SharedPrefs {
        Arc::new(Mutex::new(self))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn format(&self) -> PrefsFormat {
        self.format
    }

    /// Whether there are changes not yet saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        match self.values.get(key) {
            Some(PrefValue::Float(v)) => *v,
            _ => default,
        }
    }

    pub fn set_float(&mut self, key: impl Into<String>, value: f32) {
        self.set(key.into(), PrefValue::Float(value));
    }

    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        match self.values.get(key) {
            Some(PrefValue::Int(v)) => *v,
            _ => default,
        }
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i32) {
        self.set(key.into(), PrefValue::Int(value));
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            Some(PrefValue::Str(v)) => v.clone(),
            _ => default.to_string(),
        }
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key.into(), PrefValue::Str(value.into()));
    }

    fn set(&mut self, key: String, value: PrefValue) {
        self.values.insert(key, value);
        self.dirty = true;
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Remove a key. Returns true if it existed.
    pub fn delete_key(&mut self, key: &str) -> bool {
        let removed = self.values.remove(key).is_some();
        self.dirty |= removed;
        removed
    }

    pub fn delete_all(&mut self) {
        if !self.values.is_empty() {
            self.values.clear();
            self.dirty = true;
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write every value to the backing file
    pub fn save(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            self.dirty = false;
            return Ok(());
        };

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let bytes = match self.format {
            PrefsFormat::Json => serde_json::to_vec_pretty(&self.values)
                .map_err(|e| PrefsError::Serialization(e.to_string()))?,
            PrefsFormat::Binary => {
                bincode::serialize(&self.values).map_err(|e| PrefsError::Serialization(e.to_string()))?
            }
        };

        fs::write(path, bytes)?;
        self.dirty = false;
        log::debug!("prefs saved to {}", path.display());
        Ok(())
    }

    /// Replace the values with the backing file's. A missing file leaves the
    /// store empty.
    pub fn load(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if !path.exists() {
            log::debug!("no prefs at {}, starting empty", path.display());
            self.values.clear();
            self.dirty = false;
            return Ok(());
        }

        let bytes = fs::read(path)?;
        self.values = match self.format {
            PrefsFormat::Json => {
                serde_json::from_slice(&bytes).map_err(|e| PrefsError::Deserialization(e.to_string()))?
            }
            PrefsFormat::Binary => {
                bincode::deserialize(&bytes).map_err(|e| PrefsError::Deserialization(e.to_string()))?
            }
        };
        self.dirty = false;
        Ok(())
    }
}
