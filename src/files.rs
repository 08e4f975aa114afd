//! Filesystem helpers: source classification, folder enumeration and JSON
//! documents.
//!
//! Folder enumeration skips any path segment that
//! - contains `.` (hidden and tooling directories such as `.vscode`),
//! - contains `__` (`__pycache__` and friends),
//! - contains `CMake` (`CMakeFiles`),
//! - is literally `build`.
//!
//! An excluded directory hides its whole subtree.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

pub const C_SOURCE_EXTENSIONS: &[&str] = &["c"];
pub const CPP_SOURCE_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx"];
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hh", "hxx"];

/// Language a folder is compiled as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Cpp,
}

impl Language {
    pub fn source_extensions(&self) -> &'static [&'static str] {
        match self {
            Language::C => C_SOURCE_EXTENSIONS,
            Language::Cpp => CPP_SOURCE_EXTENSIONS,
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

pub fn is_source_file(path: &Path) -> bool {
    extension(path).is_some_and(|e| {
        C_SOURCE_EXTENSIONS.contains(&e.as_str()) || CPP_SOURCE_EXTENSIONS.contains(&e.as_str())
    })
}

pub fn is_header_file(path: &Path) -> bool {
    extension(path).is_some_and(|e| HEADER_EXTENSIONS.contains(&e.as_str()))
}

/// A single C++ source makes the whole folder C++.
pub fn folder_language(files: &[PathBuf]) -> Language {
    let has_cpp = files.iter().any(|f| {
        extension(f).is_some_and(|e| CPP_SOURCE_EXTENSIONS.contains(&e.as_str()))
    });
    if has_cpp { Language::Cpp } else { Language::C }
}

/// Sources of `language`, in the order given. C++ folders drop plain `.c`
/// files.
pub fn sources_for(files: &[PathBuf], language: Language) -> Vec<PathBuf> {
    let exts = language.source_extensions();
    files
        .iter()
        .filter(|f| extension(f).is_some_and(|e| exts.contains(&e.as_str())))
        .cloned()
        .collect()
}

/// Whether a directory name is hidden from folder selection.
pub fn is_excluded_segment(name: &str) -> bool {
    name.contains('.') || name.contains("__") || name.contains("CMake") || name == "build"
}

/// Files directly inside `dir`, sorted by name. Hidden and dunder names are
/// skipped. An unreadable directory is empty.
pub fn files_in_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .filter(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            !name.starts_with('.') && !name.contains("__")
        })
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

/// Every selectable folder below `root` (not including `root`), depth-first
/// and sorted within each level.
pub fn folders_in_dir(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !e.file_type().is_dir() || !is_excluded_segment(&e.file_name().to_string_lossy())
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect()
}

/// Unfiltered names of the subdirectories of `dir`.
pub fn dir_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect()
}

/// Reads a JSON document. Missing or malformed files are `None`.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "ignoring malformed JSON document");
            None
        }
    }
}

fn render_json<T: Serialize>(path: &Path, value: &T) -> Result<String> {
    let mut text = serde_json::to_string_pretty(value).map_err(|source| Error::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    text.push('\n');
    Ok(text)
}

/// Writes a JSON document, creating the parent directory.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = render_json(path, value)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, text).map_err(|e| Error::io(path, e))?;
    debug!(path = %path.display(), "wrote JSON document");
    Ok(())
}

/// Like [`write_json_file`] but leaves the file untouched when its content
/// would not change. Returns whether it wrote.
pub fn write_json_if_changed<T: Serialize>(path: &Path, value: &T) -> Result<bool> {
    let text = render_json(path, value)?;
    if fs::read_to_string(path).is_ok_and(|existing| existing == text) {
        return Ok(false);
    }
    write_json_file(path, value)?;
    Ok(true)
}
