//! Configuration sources and their precedence.
//!
//! A [`Layered`] stack is walked top to bottom; the first source holding a
//! well-typed value for a key wins. The built-in defaults always sit at the
//! bottom so every lookup resolves.

use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

use crate::config::Key;
use crate::files;
use crate::toolchain::ToolchainInfo;
use crate::toolchain::types::file_name;

pub trait ConfigSource {
    /// Short label for logs.
    fn label(&self) -> &str;

    fn get(&self, key: Key) -> Option<Value>;
}

/// Values compiled into the binary.
pub struct BuiltinDefaults;

impl ConfigSource for BuiltinDefaults {
    fn label(&self) -> &str {
        "defaults"
    }

    fn get(&self, key: Key) -> Option<Value> {
        Some(key.default_value())
    }
}

/// A flat `{namespace}.{key}` JSON object loaded from disk (global user
/// settings or a folder's `.vscode/settings.json`).
#[derive(Debug, Clone)]
pub struct JsonScope {
    label: &'static str,
    path: PathBuf,
    entries: Map<String, Value>,
}

impl JsonScope {
    /// Loads `path`; a missing or malformed file is an empty scope.
    pub fn load(label: &'static str, path: &Path) -> Self {
        let entries = files::read_json_file::<Value>(path)
            .and_then(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();
        Self {
            label,
            path: path.to_path_buf(),
            entries,
        }
    }

    /// A scope with no backing file.
    pub fn empty(label: &'static str) -> Self {
        Self {
            label,
            path: PathBuf::new(),
            entries: Map::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn contains(&self, key: Key) -> bool {
        self.entries.contains_key(&key.qualified())
    }

    /// All mandatory keys present.
    pub fn is_complete(&self) -> bool {
        Key::MANDATORY.iter().all(|k| self.contains(*k))
    }

    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }
}

impl ConfigSource for JsonScope {
    fn label(&self) -> &str {
        self.label
    }

    fn get(&self, key: Key) -> Option<Value> {
        self.entries.get(&key.qualified()).cloned()
    }
}

/// Compiler/debugger paths found by auto-detection.
pub struct ProbedToolchain<'a>(pub &'a ToolchainInfo);

impl ConfigSource for ProbedToolchain<'_> {
    fn label(&self) -> &str {
        "probe"
    }

    fn get(&self, key: Key) -> Option<Value> {
        let info = self.0;
        let found = match key {
            Key::CCompilerPath => info.c_compiler.as_ref(),
            Key::CppCompilerPath => info.cpp_compiler.as_ref(),
            Key::DebuggerPath => info.debugger.as_ref(),
            Key::MakePath => info.make_path.as_ref(),
            _ => None,
        };
        found.map(|p| json!(p))
    }
}

/// Settings reverse-engineered from an IDE properties document.
///
/// Only the C compiler path is recorded there. The C++ compiler and debugger
/// are guessed from its file name: anything containing `clang` pairs with
/// `clang++`/`lldb`, everything else with `g++`/`gdb`. Custom compiler names
/// are not recognised.
pub struct DerivedFromProperties {
    values: Vec<(Key, Value)>,
}

impl DerivedFromProperties {
    pub fn new(
        compiler_path: &str,
        c_standard: Option<&str>,
        cpp_standard: Option<&str>,
        include_paths: Vec<String>,
    ) -> Self {
        let name = file_name(compiler_path);
        let dir = &compiler_path[..compiler_path.len() - name.len()];
        let ext = if name.to_lowercase().ends_with(".exe") {
            ".exe"
        } else {
            ""
        };
        let (cpp, dbg) = if name.contains("clang") {
            ("clang++", "lldb")
        } else {
            ("g++", "gdb")
        };

        let mut values = vec![
            (Key::CCompilerPath, json!(compiler_path)),
            (Key::CppCompilerPath, json!(format!("{dir}{cpp}{ext}"))),
            (Key::DebuggerPath, json!(format!("{dir}{dbg}{ext}"))),
        ];
        if let Some(std) = c_standard {
            values.push((Key::CStandard, json!(std)));
        }
        if let Some(std) = cpp_standard {
            values.push((Key::CppStandard, json!(std)));
        }
        if !include_paths.is_empty() {
            values.push((Key::IncludePaths, json!(include_paths)));
        }
        Self { values }
    }
}

impl ConfigSource for DerivedFromProperties {
    fn label(&self) -> &str {
        "properties"
    }

    fn get(&self, key: Key) -> Option<Value> {
        self.values
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    }
}

/// Ordered stack of sources, highest precedence first.
pub struct Layered<'a> {
    sources: Vec<&'a dyn ConfigSource>,
}

/// Whether `value` has the JSON type of the key's default.
pub(crate) fn matches_default_type(key: Key, value: &Value) -> bool {
    let default = key.default_value();
    match (&default, value) {
        (Value::String(_), Value::String(_)) | (Value::Bool(_), Value::Bool(_)) => true,
        (Value::Array(_), Value::Array(items)) => items.iter().all(Value::is_string),
        _ => false,
    }
}

impl<'a> Layered<'a> {
    pub fn new(sources: Vec<&'a dyn ConfigSource>) -> Self {
        Self { sources }
    }

    /// First well-typed value, or the built-in default.
    pub fn get(&self, key: Key) -> Value {
        self.sources
            .iter()
            .filter_map(|s| s.get(key))
            .find(|v| matches_default_type(key, v))
            .unwrap_or_else(|| key.default_value())
    }

    /// Label of the source that answered `key`.
    pub fn origin(&self, key: Key) -> &str {
        self.sources
            .iter()
            .find(|s| s.get(key).is_some_and(|v| matches_default_type(key, &v)))
            .map(|s| s.label())
            .unwrap_or("defaults")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::{Architecture, Detected, HostPlatform};
    use std::fs;

    struct Fixed(Vec<(Key, Value)>);

    impl ConfigSource for Fixed {
        fn label(&self) -> &str {
            "fixed"
        }
        fn get(&self, key: Key) -> Option<Value> {
            self.0.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn test_precedence_and_fallback() {
        let top = Fixed(vec![(Key::CStandard, json!("c17"))]);
        let below = Fixed(vec![
            (Key::CStandard, json!("c99")),
            (Key::CppStandard, json!("c++20")),
        ]);
        let layered = Layered::new(vec![&top, &below, &BuiltinDefaults]);
        assert_eq!(layered.get(Key::CStandard), json!("c17"));
        assert_eq!(layered.get(Key::CppStandard), json!("c++20"));
        assert_eq!(layered.get(Key::DebuggerPath), json!("gdb"));
        assert_eq!(layered.origin(Key::DebuggerPath), "defaults");
    }

    #[test]
    fn test_wrong_type_falls_through() {
        let top = Fixed(vec![
            (Key::UseMsvc, json!("yes")),
            (Key::Warnings, json!([1, 2])),
        ]);
        let layered = Layered::new(vec![&top, &BuiltinDefaults]);
        assert_eq!(layered.get(Key::UseMsvc), json!(false));
        assert_eq!(
            layered.get(Key::Warnings),
            json!(["-Wall", "-Wextra", "-Wpedantic"])
        );
    }

    #[test]
    fn test_json_scope_completeness() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(
            &path,
            r#"{
                "editor.tabSize": 4,
                "C_Cpp_Runner.cCompilerPath": "gcc",
                "C_Cpp_Runner.cppCompilerPath": "g++"
            }"#,
        )
        .unwrap();
        let scope = JsonScope::load("workspace", &path);
        assert!(scope.exists());
        assert!(!scope.is_complete());
        assert!(scope.contains(Key::CCompilerPath));

        let missing = JsonScope::load("workspace", &tmp.path().join("none.json"));
        assert!(!missing.exists());
        assert!(!missing.is_complete());
    }

    #[test]
    fn test_derive_gcc_pairing() {
        let derived = DerivedFromProperties::new("/opt/gcc/bin/gcc-13", None, None, vec![]);
        assert_eq!(
            derived.get(Key::CppCompilerPath),
            Some(json!("/opt/gcc/bin/g++"))
        );
        assert_eq!(derived.get(Key::DebuggerPath), Some(json!("/opt/gcc/bin/gdb")));
        assert_eq!(derived.get(Key::CStandard), None);
    }

    #[test]
    fn test_derive_clang_pairing_keeps_dir_and_exe() {
        let derived = DerivedFromProperties::new(
            r"C:\LLVM\bin\clang.exe",
            Some("c17"),
            Some("c++20"),
            vec!["inc".into()],
        );
        assert_eq!(
            derived.get(Key::CppCompilerPath),
            Some(json!(r"C:\LLVM\bin\clang++.exe"))
        );
        assert_eq!(
            derived.get(Key::DebuggerPath),
            Some(json!(r"C:\LLVM\bin\lldb.exe"))
        );
        assert_eq!(derived.get(Key::CppStandard), Some(json!("c++20")));
        assert_eq!(derived.get(Key::IncludePaths), Some(json!(["inc"])));
    }

    #[test]
    fn test_probed_toolchain_only_answers_paths() {
        let info = ToolchainInfo {
            c_compiler: Some("/usr/bin/clang".into()),
            cpp_compiler: None,
            debugger: Some("/usr/bin/lldb".into()),
            make_path: None,
            architecture: Detected::Resolved(Architecture::X64),
            platform: HostPlatform::from_identifier("linux"),
        };
        let probe = ProbedToolchain(&info);
        assert_eq!(probe.get(Key::CCompilerPath), Some(json!("/usr/bin/clang")));
        assert_eq!(probe.get(Key::CppCompilerPath), None);
        assert_eq!(probe.get(Key::Warnings), None);
    }
}
