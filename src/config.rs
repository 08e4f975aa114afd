//! Settings keys, built-in defaults and the resolved [`SettingsSnapshot`].
//!
//! On disk every setting is a flat `C_Cpp_Runner.<name>` entry of a JSON
//! object, shared with whatever else lives in the same `settings.json`.

use serde_json::{Map, Value, json};

use crate::toolchain::Architecture;

/// Prefix of every persisted key.
pub const NAMESPACE: &str = "C_Cpp_Runner";

/// Workspace setting that relocates a CMake project's source directory.
pub const CMAKE_SOURCE_DIR_KEY: &str = "cmake.sourceDirectory";
pub const CMAKE_SOURCE_DIR_DEFAULT: &str = "${workspaceFolder}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    CCompilerPath,
    CppCompilerPath,
    DebuggerPath,
    MakePath,
    CStandard,
    CppStandard,
    UseMsvc,
    MsvcBatchPath,
    EnableWarnings,
    Warnings,
    WarningsAsError,
    CompilerArgs,
    LinkerArgs,
    IncludePaths,
    IncludeSearch,
    ExcludeSearch,
}

impl Key {
    pub const ALL: [Key; 16] = [
        Key::CCompilerPath,
        Key::CppCompilerPath,
        Key::DebuggerPath,
        Key::MakePath,
        Key::CStandard,
        Key::CppStandard,
        Key::UseMsvc,
        Key::MsvcBatchPath,
        Key::EnableWarnings,
        Key::Warnings,
        Key::WarningsAsError,
        Key::CompilerArgs,
        Key::LinkerArgs,
        Key::IncludePaths,
        Key::IncludeSearch,
        Key::ExcludeSearch,
    ];

    /// Keys whose joint presence marks a persisted document as complete.
    pub const MANDATORY: [Key; 3] = [Key::CCompilerPath, Key::CppCompilerPath, Key::DebuggerPath];

    pub fn name(&self) -> &'static str {
        match self {
            Key::CCompilerPath => "cCompilerPath",
            Key::CppCompilerPath => "cppCompilerPath",
            Key::DebuggerPath => "debuggerPath",
            Key::MakePath => "makePath",
            Key::CStandard => "cStandard",
            Key::CppStandard => "cppStandard",
            Key::UseMsvc => "useMsvc",
            Key::MsvcBatchPath => "msvcBatchPath",
            Key::EnableWarnings => "enableWarnings",
            Key::Warnings => "warnings",
            Key::WarningsAsError => "warningsAsError",
            Key::CompilerArgs => "compilerArgs",
            Key::LinkerArgs => "linkerArgs",
            Key::IncludePaths => "includePaths",
            Key::IncludeSearch => "includeSearch",
            Key::ExcludeSearch => "excludeSearch",
        }
    }

    /// `C_Cpp_Runner.<name>`
    pub fn qualified(&self) -> String {
        format!("{}.{}", NAMESPACE, self.name())
    }

    /// Accepts either the bare or the namespaced name.
    pub fn parse(name: &str) -> Option<Key> {
        let bare = name
            .strip_prefix(NAMESPACE)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name);
        Key::ALL.into_iter().find(|k| k.name() == bare)
    }

    /// Values that are filesystem paths and get backslashes on Windows.
    pub fn holds_paths(&self) -> bool {
        matches!(
            self,
            Key::CCompilerPath
                | Key::CppCompilerPath
                | Key::DebuggerPath
                | Key::MakePath
                | Key::MsvcBatchPath
                | Key::IncludePaths
        )
    }

    pub fn default_value(&self) -> Value {
        match self {
            Key::CCompilerPath => json!("gcc"),
            Key::CppCompilerPath => json!("g++"),
            Key::DebuggerPath => json!("gdb"),
            Key::MakePath => json!("make"),
            Key::CStandard | Key::CppStandard | Key::MsvcBatchPath => json!(""),
            Key::UseMsvc | Key::WarningsAsError => json!(false),
            Key::EnableWarnings => json!(true),
            Key::Warnings => json!(GCC_WARNINGS),
            Key::CompilerArgs | Key::LinkerArgs | Key::IncludePaths => json!([]),
            Key::IncludeSearch => json!(["*", "**/*"]),
            Key::ExcludeSearch => json!([
                "**/build",
                "**/build/**",
                "**/.*",
                "**/.*/**",
                "**/.vscode",
                "**/.vscode/**"
            ]),
        }
    }
}

pub const GCC_WARNINGS: &[&str] = &["-Wall", "-Wextra", "-Wpedantic"];
pub const MSVC_WARNINGS: &[&str] = &["/W4"];

/// Resolved build configuration for one active folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSnapshot {
    pub c_compiler_path: String,
    pub cpp_compiler_path: String,
    pub debugger_path: String,
    pub make_path: String,
    pub c_standard: String,
    pub cpp_standard: String,
    pub use_msvc: bool,
    pub msvc_batch_path: String,
    /// Derived from `msvc_batch_path`; never persisted. Empty when unknown.
    pub msvc_tools_path: String,
    pub enable_warnings: bool,
    pub warnings: Vec<String>,
    pub warnings_as_error: bool,
    pub compiler_args: Vec<String>,
    pub linker_args: Vec<String>,
    pub include_paths: Vec<String>,
    pub include_search: Vec<String>,
    pub exclude_search: Vec<String>,
    /// Not persisted; probed from the compiler or read from the IDE tag.
    pub architecture: Architecture,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self::from_lookup(|key| key.default_value())
    }
}

fn as_string(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

fn as_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

impl SettingsSnapshot {
    /// Builds a snapshot by asking `get` for every key.
    pub fn from_lookup(mut get: impl FnMut(Key) -> Value) -> Self {
        Self {
            c_compiler_path: as_string(&get(Key::CCompilerPath)),
            cpp_compiler_path: as_string(&get(Key::CppCompilerPath)),
            debugger_path: as_string(&get(Key::DebuggerPath)),
            make_path: as_string(&get(Key::MakePath)),
            c_standard: as_string(&get(Key::CStandard)),
            cpp_standard: as_string(&get(Key::CppStandard)),
            use_msvc: get(Key::UseMsvc).as_bool().unwrap_or(false),
            msvc_batch_path: as_string(&get(Key::MsvcBatchPath)),
            msvc_tools_path: String::new(),
            enable_warnings: get(Key::EnableWarnings).as_bool().unwrap_or(true),
            warnings: as_list(&get(Key::Warnings)),
            warnings_as_error: get(Key::WarningsAsError).as_bool().unwrap_or(false),
            compiler_args: as_list(&get(Key::CompilerArgs)),
            linker_args: as_list(&get(Key::LinkerArgs)),
            include_paths: as_list(&get(Key::IncludePaths)),
            include_search: as_list(&get(Key::IncludeSearch)),
            exclude_search: as_list(&get(Key::ExcludeSearch)),
            architecture: Architecture::X86,
        }
    }

    pub fn value_of(&self, key: Key) -> Value {
        match key {
            Key::CCompilerPath => json!(self.c_compiler_path),
            Key::CppCompilerPath => json!(self.cpp_compiler_path),
            Key::DebuggerPath => json!(self.debugger_path),
            Key::MakePath => json!(self.make_path),
            Key::CStandard => json!(self.c_standard),
            Key::CppStandard => json!(self.cpp_standard),
            Key::UseMsvc => json!(self.use_msvc),
            Key::MsvcBatchPath => json!(self.msvc_batch_path),
            Key::EnableWarnings => json!(self.enable_warnings),
            Key::Warnings => json!(self.warnings),
            Key::WarningsAsError => json!(self.warnings_as_error),
            Key::CompilerArgs => json!(self.compiler_args),
            Key::LinkerArgs => json!(self.linker_args),
            Key::IncludePaths => json!(self.include_paths),
            Key::IncludeSearch => json!(self.include_search),
            Key::ExcludeSearch => json!(self.exclude_search),
        }
    }

    /// Flat `{namespace}.{key}` entries for every persisted key.
    pub fn to_entries(&self) -> Map<String, Value> {
        Key::ALL
            .into_iter()
            .map(|key| (key.qualified(), self.value_of(key)))
            .collect()
    }

    /// Replaces a warning list whose style does not match `use_msvc` with the
    /// default list of the right style. Returns whether it rewrote.
    pub fn normalize_warning_style(&mut self) -> bool {
        let wrong_prefix = if self.use_msvc { "-W" } else { "/W" };
        if !self.warnings.iter().any(|w| w.starts_with(wrong_prefix)) {
            return false;
        }
        let defaults = if self.use_msvc {
            MSVC_WARNINGS
        } else {
            GCC_WARNINGS
        };
        self.warnings = defaults.iter().map(|w| w.to_string()).collect();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names_round_trip() {
        for key in Key::ALL {
            assert_eq!(Key::parse(key.name()), Some(key));
            assert_eq!(Key::parse(&key.qualified()), Some(key));
        }
        assert_eq!(Key::parse("C_Cpp_Runner.nope"), None);
        assert_eq!(
            Key::CCompilerPath.qualified(),
            "C_Cpp_Runner.cCompilerPath"
        );
    }

    #[test]
    fn test_defaults() {
        let s = SettingsSnapshot::default();
        assert_eq!(s.c_compiler_path, "gcc");
        assert_eq!(s.cpp_compiler_path, "g++");
        assert_eq!(s.debugger_path, "gdb");
        assert_eq!(s.warnings, vec!["-Wall", "-Wextra", "-Wpedantic"]);
        assert!(s.enable_warnings);
        assert!(!s.use_msvc);
        assert_eq!(s.include_search, vec!["*", "**/*"]);
    }

    #[test]
    fn test_entries_cover_every_key() {
        let entries = SettingsSnapshot::default().to_entries();
        assert_eq!(entries.len(), Key::ALL.len());
        assert_eq!(entries["C_Cpp_Runner.useMsvc"], json!(false));
    }

    #[test]
    fn test_unix_warnings_under_msvc_are_replaced() {
        let mut s = SettingsSnapshot {
            use_msvc: true,
            ..Default::default()
        };
        assert!(s.normalize_warning_style());
        assert_eq!(s.warnings, vec!["/W4"]);
        assert!(!s.normalize_warning_style());
    }

    #[test]
    fn test_msvc_warnings_without_msvc_are_replaced() {
        let mut s = SettingsSnapshot {
            warnings: vec!["-Wall".into(), "/W3".into()],
            ..Default::default()
        };
        assert!(s.normalize_warning_style());
        assert_eq!(s.warnings, vec!["-Wall", "-Wextra", "-Wpedantic"]);
    }

    #[test]
    fn test_custom_warnings_of_right_style_survive() {
        let mut s = SettingsSnapshot {
            warnings: vec!["-Wshadow".into()],
            ..Default::default()
        };
        assert!(!s.normalize_warning_style());
        assert_eq!(s.warnings, vec!["-Wshadow"]);
    }
}
