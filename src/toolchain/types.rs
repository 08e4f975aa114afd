use serde::{Deserialize, Serialize};
use std::fmt;

/// Target CPU architecture as understood by the IDE language service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    X64,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::X64 => "x64",
        }
    }

    /// Host/target binary subdirectory of an MSVC toolset.
    pub fn msvc_bin_dir(&self) -> &'static str {
        match self {
            Architecture::X86 => "Hostx86/x86",
            Architecture::X64 => "Hostx64/x64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Windows,
    Linux,
    Mac,
}

impl OperatingSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingSystem::Windows => "windows",
            OperatingSystem::Linux => "linux",
            OperatingSystem::Mac => "macos",
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host operating system plus the emulation-layer flag.
///
/// Cygwin/MSYS hosts report [`OperatingSystem::Windows`] but keep Unix path
/// separators and shell commands, so callers check `cygwin_like` for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: OperatingSystem,
    pub cygwin_like: bool,
}

impl HostPlatform {
    /// Maps a platform identifier (`std::env::consts::OS` style).
    pub fn from_identifier(id: &str) -> Self {
        let id = id.to_lowercase();
        if id.contains("cygwin") || id.contains("msys") || id.contains("mingw") {
            return Self {
                os: OperatingSystem::Windows,
                cygwin_like: true,
            };
        }
        let os = match id.as_str() {
            "windows" | "win32" => OperatingSystem::Windows,
            "macos" | "darwin" => OperatingSystem::Mac,
            _ => OperatingSystem::Linux,
        };
        Self {
            os,
            cygwin_like: false,
        }
    }

    /// Whether paths are written with backslashes and commands use `cmd`.
    pub fn uses_windows_shell(&self) -> bool {
        self.os == OperatingSystem::Windows && !self.cygwin_like
    }

    pub fn exe_suffix(&self) -> &'static str {
        if self.os == OperatingSystem::Windows {
            ".exe"
        } else {
            ""
        }
    }
}

/// A probed value, tagged with whether the probe succeeded or fell back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detected<T> {
    Resolved(T),
    Defaulted(T),
}

impl<T> Detected<T> {
    pub fn value(self) -> T {
        match self {
            Detected::Resolved(v) | Detected::Defaulted(v) => v,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Detected::Defaulted(_))
    }
}

/// Compiler family, inferred from a compiler's file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerFamily {
    Gcc,
    Clang,
    Msvc,
}

impl CompilerFamily {
    pub fn from_compiler_path(path: &str) -> Self {
        let name = file_name(path).to_lowercase();
        if name == "cl" || name == "cl.exe" {
            CompilerFamily::Msvc
        } else if name.contains("clang") {
            CompilerFamily::Clang
        } else {
            CompilerFamily::Gcc
        }
    }

    /// Language-service family tag (`gcc`, `clang`, `msvc`).
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
            CompilerFamily::Msvc => "msvc",
        }
    }
}

/// Result of one auto-detection pass. Fields are `None` when not found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainInfo {
    pub c_compiler: Option<String>,
    pub cpp_compiler: Option<String>,
    pub debugger: Option<String>,
    pub make_path: Option<String>,
    pub architecture: Detected<Architecture>,
    pub platform: HostPlatform,
}

/// Final path component, accepting both separator styles.
pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_mapping() {
        assert_eq!(
            HostPlatform::from_identifier("linux").os,
            OperatingSystem::Linux
        );
        assert_eq!(
            HostPlatform::from_identifier("macos").os,
            OperatingSystem::Mac
        );
        let win = HostPlatform::from_identifier("windows");
        assert_eq!(win.os, OperatingSystem::Windows);
        assert!(win.uses_windows_shell());
    }

    #[test]
    fn test_cygwin_is_windows_with_flag() {
        let p = HostPlatform::from_identifier("cygwin");
        assert_eq!(p.os, OperatingSystem::Windows);
        assert!(p.cygwin_like);
        assert!(!p.uses_windows_shell());
        assert_eq!(p.exe_suffix(), ".exe");
    }

    #[test]
    fn test_compiler_family() {
        assert_eq!(
            CompilerFamily::from_compiler_path("/usr/bin/clang-17"),
            CompilerFamily::Clang
        );
        assert_eq!(
            CompilerFamily::from_compiler_path(r"C:\mingw\bin\gcc.exe"),
            CompilerFamily::Gcc
        );
        assert_eq!(CompilerFamily::from_compiler_path("cl.exe"), CompilerFamily::Msvc);
    }

    #[test]
    fn test_detected_marker() {
        let d = Detected::Defaulted(Architecture::X86);
        assert!(d.is_defaulted());
        assert_eq!(d.value(), Architecture::X86);
        assert!(!Detected::Resolved(Architecture::X86).is_defaulted());
    }
}
