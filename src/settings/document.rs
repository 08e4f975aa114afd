//! Read-merge-write access to a folder's `settings.json`.
//!
//! Every write re-reads the file first and only replaces the entries it was
//! given, so keys written by other tools in between survive.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Key;
use crate::error::Result;
use crate::files;
use crate::toolchain::HostPlatform;

#[derive(Debug, Clone)]
pub struct SettingsDocument {
    path: PathBuf,
}

impl SettingsDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current entries; empty when the file is missing or malformed.
    pub fn read(&self) -> Map<String, Value> {
        match files::read_json_file::<Value>(&self.path) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Overlays `entries` onto the file. Returns whether it changed.
    pub fn merge(&self, entries: Map<String, Value>) -> Result<bool> {
        let mut doc = self.read();
        for (key, value) in entries {
            doc.insert(key, value);
        }
        let written = files::write_json_if_changed(&self.path, &Value::Object(doc))?;
        if written {
            info!(path = %self.path.display(), "persisted settings");
        } else {
            debug!(path = %self.path.display(), "settings unchanged");
        }
        Ok(written)
    }

    /// Writes a single key.
    pub fn update(&self, key: Key, value: Value) -> Result<bool> {
        let mut entries = Map::new();
        entries.insert(key.qualified(), value);
        self.merge(entries)
    }
}

/// Native Windows paths are persisted with backslashes. Other hosts, Cygwin
/// included, keep values as given.
pub fn normalize_for_platform(key: Key, value: Value, platform: HostPlatform) -> Value {
    if !platform.uses_windows_shell() || !key.holds_paths() {
        return value;
    }
    match value {
        Value::String(s) => Value::String(s.replace('/', "\\")),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Value::String(s.replace('/', "\\")),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}
