use super::utils::{quote, shell_path};
use super::{BuildContext, BuildMode, executable_path};
use crate::executor::ShellTask;
use crate::toolchain::types::file_name;

fn executable_invocation(ctx: &BuildContext<'_>, mode: BuildMode) -> String {
    let exe = shell_path(&executable_path(mode, ctx.platform), ctx.platform);
    if ctx.platform.uses_windows_shell() {
        format!(".\\{}", exe)
    } else {
        format!("./{}", exe)
    }
}

fn with_args(mut line: String, args: &[String]) -> String {
    for arg in args {
        line.push(' ');
        line.push_str(&quote(arg));
    }
    line
}

/// Runs the mode's executable. Whether it was built is left to the shell to
/// report.
pub fn synthesize_run(ctx: &BuildContext<'_>, args: &[String]) -> ShellTask {
    ShellTask {
        label: "run",
        command_line: with_args(executable_invocation(ctx, ctx.mode), args),
        cwd: ctx.folder.to_path_buf(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerKind {
    Gdb,
    Lldb,
}

impl DebuggerKind {
    pub fn from_path(path: &str) -> Self {
        if file_name(path).contains("lldb") {
            DebuggerKind::Lldb
        } else {
            DebuggerKind::Gdb
        }
    }
}

/// Starts the debug-mode executable under the configured debugger. `None`
/// under MSVC, which has no command-line debugger to hand off to.
pub fn synthesize_debug(ctx: &BuildContext<'_>, args: &[String]) -> Option<ShellTask> {
    if ctx.snapshot.use_msvc {
        return None;
    }
    let debugger = quote(&ctx.snapshot.debugger_path);
    let exe = executable_invocation(ctx, BuildMode::Debug);
    let line = match DebuggerKind::from_path(&ctx.snapshot.debugger_path) {
        DebuggerKind::Gdb => format!("{} --args {}", debugger, exe),
        DebuggerKind::Lldb => format!("{} -- {}", debugger, exe),
    };
    Some(ShellTask {
        label: "debug",
        command_line: with_args(line, args),
        cwd: ctx.folder.to_path_buf(),
    })
}
