//! Command synthesis for build, run, debug and clean.
//!
//! Nothing here spawns a process. Each operation returns a
//! [`ShellTask`](crate::executor::ShellTask) whose working directory is the
//! active folder, with every path in the command line relative to it.

mod clean;
mod core;
mod run;
pub mod utils;

pub use clean::synthesize_clean;
pub use core::{BuildPlan, plan_build};
pub use run::{DebuggerKind, synthesize_debug, synthesize_run};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::SettingsSnapshot;
use crate::error::Error;
use crate::toolchain::HostPlatform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Debug,
    Release,
}

impl BuildMode {
    pub const ALL: [BuildMode; 2] = [BuildMode::Debug, BuildMode::Release];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Debug => "debug",
            BuildMode::Release => "release",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(BuildMode::Debug),
            "release" => Ok(BuildMode::Release),
            other => Err(Error::InvalidBuildMode(other.to_string())),
        }
    }
}

/// Inputs shared by every synthesis call.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub snapshot: &'a SettingsSnapshot,
    pub folder: &'a Path,
    pub mode: BuildMode,
    pub platform: HostPlatform,
}

/// `build/<mode>`, relative to the active folder.
pub fn build_dir(mode: BuildMode) -> PathBuf {
    Path::new("build").join(mode.as_str())
}

/// `<mode>Main`, with `.exe` on Windows hosts.
pub fn executable_name(mode: BuildMode, platform: HostPlatform) -> String {
    format!("{}Main{}", mode.as_str(), platform.exe_suffix())
}

/// Executable path relative to the active folder.
pub fn executable_path(mode: BuildMode, platform: HostPlatform) -> PathBuf {
    build_dir(mode).join(executable_name(mode, platform))
}
