//! Error types shared by the settings engine, synthesizers and session.
//!
//! Detection failures never appear here: a missing compiler or a malformed
//! settings file degrades to a default value instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for crunner operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// I/O failure on a specific path.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document could not be serialized.
    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No folder has been selected yet.
    #[error("no active folder selected (run `crun select-folder`)")]
    NoActiveFolder,

    /// The active folder has no compilable sources.
    #[error("no C/C++ source files found in {0}")]
    NoSources(PathBuf),

    /// Two sources in the folder share a file stem and would overwrite each
    /// other's object file.
    #[error("{first} and {second} both compile to {object}")]
    ObjectCollision {
        object: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    /// The tool required for the action is not installed.
    #[error("{tool} not found: {path}")]
    ToolUnavailable { tool: &'static str, path: String },

    /// A CMake project was detected and activation was not forced.
    #[error("CMake project detected in {0}; pass --force to activate anyway")]
    NotActivated(PathBuf),

    /// The configuration directory could not be watched.
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// A setting name that is not recognised, or a value of the wrong type.
    #[error("invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    /// Unrecognized build mode name.
    #[error("invalid build mode '{0}' (expected debug or release)")]
    InvalidBuildMode(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
