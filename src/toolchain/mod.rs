//! Toolchain discovery.
//!
//! Everything here degrades instead of failing: a compiler that cannot be
//! found is `None`, an architecture probe that cannot run is
//! [`Detected::Defaulted`].

pub mod msvc;
pub mod types;

pub use types::{
    Architecture, CompilerFamily, Detected, HostPlatform, OperatingSystem, ToolchainInfo,
};

use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::files::Language;

/// The probing operations the settings engine and session depend on.
pub trait Probe {
    fn platform(&self) -> HostPlatform;

    fn lookup(&self, name: &str) -> CommandLookup;

    fn detect(&self) -> ToolchainInfo;

    fn architecture(&self, compiler: &str) -> Detected<Architecture>;

    fn system_include_dirs(&self, compiler: &str, language: Language) -> Vec<String>;
}

/// [`Probe`] backed by the real search path and compiler processes.
#[derive(Debug, Clone, Copy)]
pub struct SystemProbe {
    pub platform: HostPlatform,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self {
            platform: host_platform(),
        }
    }
}

impl Probe for SystemProbe {
    fn platform(&self) -> HostPlatform {
        self.platform
    }

    fn lookup(&self, name: &str) -> CommandLookup {
        command_exists(name)
    }

    fn detect(&self) -> ToolchainInfo {
        detect_toolchain_with(self.platform, command_exists, get_architecture)
    }

    fn architecture(&self, compiler: &str) -> Detected<Architecture> {
        get_architecture(compiler)
    }

    fn system_include_dirs(&self, compiler: &str, language: Language) -> Vec<String> {
        system_include_dirs(compiler, language)
    }
}

/// Outcome of a search-path lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLookup {
    pub found: bool,
    pub path: Option<String>,
}

/// Looks `name` up on the executable search path. Absolute and relative
/// paths are accepted as long as they point at an executable.
pub fn command_exists(name: &str) -> CommandLookup {
    if name.is_empty() {
        return CommandLookup {
            found: false,
            path: None,
        };
    }
    match which::which(name) {
        Ok(path) => {
            let mut path = path.to_string_lossy().to_string();
            if cfg!(windows) && path.ends_with(".EXE") {
                let stem_len = path.len() - ".EXE".len();
                path.truncate(stem_len);
                path.push_str(".exe");
            }
            CommandLookup {
                found: true,
                path: Some(path),
            }
        }
        Err(_) => CommandLookup {
            found: false,
            path: None,
        },
    }
}

/// Platform of the running process.
pub fn host_platform() -> HostPlatform {
    // MSYS/Cygwin shells run native Windows binaries but announce themselves
    // through the environment.
    if cfg!(windows)
        && let Ok(ostype) = std::env::var("OSTYPE")
    {
        let platform = HostPlatform::from_identifier(&ostype);
        if platform.cygwin_like {
            return platform;
        }
    }
    HostPlatform::from_identifier(std::env::consts::OS)
}

/// Asks the compiler for its target triple and looks for `64` in it.
///
/// Any failure yields `Defaulted(X86)`.
pub fn get_architecture(compiler: &str) -> Detected<Architecture> {
    let output = match Command::new(compiler).arg("-dumpmachine").output() {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            debug!(compiler, status = ?output.status, "architecture probe exited unsuccessfully");
            return Detected::Defaulted(Architecture::X86);
        }
        Err(e) => {
            debug!(compiler, error = %e, "architecture probe could not run");
            return Detected::Defaulted(Architecture::X86);
        }
    };
    architecture_from_machine(&String::from_utf8_lossy(&output.stdout))
}

pub(crate) fn architecture_from_machine(machine: &str) -> Detected<Architecture> {
    let machine = machine.trim();
    if machine.is_empty() {
        Detected::Defaulted(Architecture::X86)
    } else if machine.contains("64") {
        Detected::Resolved(Architecture::X64)
    } else {
        Detected::Resolved(Architecture::X86)
    }
}

/// Candidate (c, c++, debugger) triples in preference order.
fn compiler_candidates(os: OperatingSystem) -> [(&'static str, &'static str, &'static str); 2] {
    let gnu = ("gcc", "g++", "gdb");
    let llvm = ("clang", "clang++", "lldb");
    match os {
        OperatingSystem::Mac => [llvm, gnu],
        _ => [gnu, llvm],
    }
}

/// Probes the search path for a C/C++ toolchain, asking `lookup` for each
/// candidate executable and `probe_arch` for the chosen compiler's target.
pub fn detect_toolchain_with(
    platform: HostPlatform,
    lookup: impl Fn(&str) -> CommandLookup,
    probe_arch: impl Fn(&str) -> Detected<Architecture>,
) -> ToolchainInfo {
    let mut c_compiler = None;
    let mut cpp_compiler = None;
    let mut debugger = None;

    for (cc, cxx, dbg) in compiler_candidates(platform.os) {
        let c = lookup(cc);
        let cpp = lookup(cxx);
        if !c.found && !cpp.found {
            continue;
        }
        c_compiler = c.path;
        cpp_compiler = cpp.path;
        debugger = lookup(dbg).path;
        break;
    }

    // A gcc install on macOS usually ships without gdb.
    if debugger.is_none() {
        debugger = ["gdb", "lldb"].into_iter().find_map(|d| lookup(d).path);
    }

    let make_candidates: &[&str] = if platform.os == OperatingSystem::Windows {
        &["make", "mingw32-make"]
    } else {
        &["make"]
    };
    let make_path = make_candidates.iter().find_map(|m| lookup(m).path);

    let architecture = c_compiler
        .as_deref()
        .or(cpp_compiler.as_deref())
        .map(probe_arch)
        .unwrap_or(Detected::Defaulted(Architecture::X86));

    let info = ToolchainInfo {
        c_compiler,
        cpp_compiler,
        debugger,
        make_path,
        architecture,
        platform,
    };
    debug!(?info, "toolchain detection finished");
    info
}

/// Include directories the compiler searches implicitly.
///
/// Parses the `#include <...> search starts here:` block of `-v` output.
/// Returns an empty list when the compiler cannot be run.
pub fn system_include_dirs(compiler: &str, language: Language) -> Vec<String> {
    let lang = match language {
        Language::C => "c",
        Language::Cpp => "c++",
    };
    let child = Command::new(compiler)
        .args(["-E", "-x", lang, "-", "-v"])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn();
    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            debug!(compiler, error = %e, "include discovery could not run");
            return Vec::new();
        }
    };
    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(b"");
    }
    match child.wait_with_output() {
        Ok(output) => parse_include_search(&String::from_utf8_lossy(&output.stderr)),
        Err(_) => Vec::new(),
    }
}

pub(crate) fn parse_include_search(verbose_output: &str) -> Vec<String> {
    let mut dirs = Vec::new();
    let mut inside = false;
    for line in verbose_output.lines() {
        if line.starts_with("#include <...> search starts here:") {
            inside = true;
            continue;
        }
        if line.starts_with("End of search list.") {
            break;
        }
        if inside {
            let dir = line.trim().trim_end_matches(" (framework directory)");
            if !dir.is_empty() {
                dirs.push(dir.replace('\\', "/"));
            }
        }
    }
    dirs
}
