//! Whether crunner should take charge of a workspace at all.

use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::config::{CMAKE_SOURCE_DIR_DEFAULT, CMAKE_SOURCE_DIR_KEY};
use crate::error::{Error, Result};
use crate::files;
use crate::settings::{SETTINGS_FILE, config_dir};

/// Why a workspace counts as a CMake project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmakeMarker {
    ListsFile,
    SourceDirectory(String),
}

/// Looks for a `CMakeLists.txt` in the workspace root, then for a
/// non-default `cmake.sourceDirectory` in the root's settings.
pub fn cmake_marker(workspace: &Path) -> Option<CmakeMarker> {
    if workspace.join("CMakeLists.txt").is_file() {
        return Some(CmakeMarker::ListsFile);
    }
    let settings: Value =
        files::read_json_file(&config_dir(workspace).join(SETTINGS_FILE))?;
    match settings.get(CMAKE_SOURCE_DIR_KEY).and_then(Value::as_str) {
        Some(dir) if dir != CMAKE_SOURCE_DIR_DEFAULT => {
            Some(CmakeMarker::SourceDirectory(dir.to_string()))
        }
        _ => None,
    }
}

/// Refuses CMake workspaces unless `force` is set. Nothing is probed or
/// written before this passes.
pub fn check_activation(workspace: &Path, force: bool) -> Result<()> {
    match cmake_marker(workspace) {
        None => Ok(()),
        Some(marker) if force => {
            info!(?marker, "CMake project detected; activation forced");
            Ok(())
        }
        Some(marker) => {
            debug!(?marker, "not activating in CMake project");
            Err(Error::NotActivated(workspace.to_path_buf()))
        }
    }
}
