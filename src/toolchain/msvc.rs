//! MSVC toolset lookup relative to a `vcvarsall.bat`-style batch file.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::types::{Architecture, Detected};
use crate::files::dir_names;

/// Finds the newest `VC/Tools/MSVC/<version>/bin/<host>/<target>` directory
/// for the installation that owns `batch_path`
/// (`<root>/VC/Auxiliary/Build/vcvarsall.bat`).
///
/// A missing segment anywhere on the way yields `Defaulted("")`.
pub fn find_tools_path(batch_path: &str, arch: Architecture) -> Detected<String> {
    if batch_path.is_empty() {
        return Detected::Defaulted(String::new());
    }
    match locate(Path::new(batch_path), arch) {
        Some(path) => {
            debug!(path = %path.display(), "MSVC tools path resolved");
            Detected::Resolved(path.to_string_lossy().to_string())
        }
        None => {
            warn!(batch_path, "MSVC toolset not found next to batch file");
            Detected::Defaulted(String::new())
        }
    }
}

fn locate(batch_path: &Path, arch: Architecture) -> Option<PathBuf> {
    let install_root = batch_path.ancestors().nth(4)?;
    let tools = install_root.join("VC").join("Tools").join("MSVC");
    if !tools.is_dir() {
        return None;
    }

    let mut versions = dir_names(&tools);
    versions.sort();
    let newest = versions.pop()?;

    let bin = arch
        .msvc_bin_dir()
        .split('/')
        .fold(tools.join(newest).join("bin"), |acc, part| acc.join(part));
    bin.is_dir().then_some(bin)
}
