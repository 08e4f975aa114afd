//! Removal of a mode's build output.
//!
//! The directory is not checked beforehand: cleaning a folder that was never
//! built surfaces as the shell's own error.

use super::utils::shell_path;
use super::{BuildContext, build_dir};
use crate::executor::ShellTask;

/// `rm -r build/<mode>` or, on a native Windows shell, `rmdir /s /q`.
pub fn synthesize_clean(ctx: &BuildContext<'_>) -> ShellTask {
    let dir = shell_path(&build_dir(ctx.mode), ctx.platform);
    let command_line = if ctx.platform.uses_windows_shell() {
        format!("rmdir /s /q {}", dir)
    } else {
        format!("rm -r {}", dir)
    };
    ShellTask {
        label: "clean",
        command_line,
        cwd: ctx.folder.to_path_buf(),
    }
}
