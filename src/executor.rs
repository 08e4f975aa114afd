//! Handing synthesized command lines to a shell.

use colored::*;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::toolchain::HostPlatform;

/// One shell command line and the directory to run it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellTask {
    pub label: &'static str,
    pub command_line: String,
    pub cwd: PathBuf,
}

impl fmt::Display for ShellTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (in {})", self.label, self.command_line, self.cwd.display())
    }
}

/// Runs a [`ShellTask`] and reports the process exit code.
pub trait TaskExecutor {
    fn execute(&self, task: &ShellTask) -> Result<i32>;

    /// Executors that only report tasks skip the side effects around them,
    /// such as creating the build directory.
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Runs tasks through `sh -c` (or `cmd /C` on a native Windows shell),
/// streaming output to the terminal.
#[derive(Debug, Clone, Copy)]
pub struct ShellExecutor {
    pub platform: HostPlatform,
}

impl TaskExecutor for ShellExecutor {
    fn execute(&self, task: &ShellTask) -> Result<i32> {
        println!("   {} {}", "▶".green(), task.command_line.dimmed());
        debug!(%task, "spawning shell task");

        let status = if self.platform.uses_windows_shell() {
            Command::new("cmd")
                .args(["/C", &task.command_line])
                .current_dir(&task.cwd)
                .status()
        } else {
            Command::new("sh")
                .args(["-c", &task.command_line])
                .current_dir(&task.cwd)
                .status()
        }
        .map_err(|e| Error::io(&task.cwd, e))?;

        Ok(status.code().unwrap_or(1))
    }
}

/// Prints tasks instead of running them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

impl TaskExecutor for DryRunExecutor {
    fn execute(&self, task: &ShellTask) -> Result<i32> {
        println!("{} Would execute in {}:", "DRY RUN".yellow().bold(), task.cwd.display());
        println!("  {}", task.command_line);
        Ok(0)
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}
