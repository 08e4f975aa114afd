//! IDE documents: the C/C++ language-service properties
//! (`c_cpp_properties.json`) and the debug launch configuration
//! (`launch.json`).
//!
//! Both are merged into whatever the folder already has, keyed by
//! configuration name, and only rewritten when their content changes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::build::DebuggerKind;
use crate::config::SettingsSnapshot;
use crate::error::Result;
use crate::files;
use crate::toolchain::{Architecture, CompilerFamily, OperatingSystem};

pub const PROPERTIES_FILE: &str = "c_cpp_properties.json";
pub const LAUNCH_FILE: &str = "launch.json";
pub const PROPERTIES_VERSION: u32 = 4;
pub const LAUNCH_CONFIGURATION_NAME: &str = "C/C++ Runner: Debug Session";

const DEFAULT_STANDARD: &str = "${default}";
const WORKSPACE_GLOB: &str = "${workspaceFolder}/**";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertiesDocument {
    #[serde(default)]
    pub configurations: Vec<PropertiesConfiguration>,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    PROPERTIES_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertiesConfiguration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub include_path: Vec<String>,
    #[serde(default)]
    pub compiler_args: Vec<String>,
    #[serde(default)]
    pub c_standard: String,
    #[serde(default)]
    pub cpp_standard: String,
    #[serde(default)]
    pub intelli_sense_mode: String,
    #[serde(default)]
    pub compiler_path: String,
    #[serde(default)]
    pub defines: Vec<String>,
    /// Fields written by other tools, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PropertiesConfiguration {
    /// Standard value with the `${default}` placeholder mapped to `None`.
    pub fn c_standard(&self) -> Option<&str> {
        explicit_standard(&self.c_standard)
    }

    pub fn cpp_standard(&self) -> Option<&str> {
        explicit_standard(&self.cpp_standard)
    }

    /// Architecture encoded at the end of `intelliSenseMode`.
    pub fn architecture(&self) -> Option<Architecture> {
        let suffix = self.intelli_sense_mode.rsplit('-').next()?;
        match suffix {
            "x64" | "arm64" => Some(Architecture::X64),
            "x86" | "arm" => Some(Architecture::X86),
            _ => None,
        }
    }

    /// Include paths minus the workspace glob this module always adds and
    /// the compiler's own `system_includes`, which are written after them.
    pub fn user_include_paths(&self, system_includes: &[String]) -> Vec<String> {
        let is_system = |path: &str| {
            let path = path.replace('\\', "/");
            system_includes.iter().any(|s| s.replace('\\', "/") == path)
        };
        self.include_path
            .iter()
            .filter(|p| p.as_str() != WORKSPACE_GLOB && !is_system(p))
            .cloned()
            .collect()
    }
}

fn explicit_standard(value: &str) -> Option<&str> {
    if value.is_empty() || value == DEFAULT_STANDARD {
        None
    } else {
        Some(value)
    }
}

pub fn properties_path(config_dir: &Path) -> PathBuf {
    config_dir.join(PROPERTIES_FILE)
}

pub fn launch_path(config_dir: &Path) -> PathBuf {
    config_dir.join(LAUNCH_FILE)
}

pub fn read_properties(config_dir: &Path) -> Option<PropertiesDocument> {
    files::read_json_file(&properties_path(config_dir))
}

/// Compiler path the language service should use.
fn intellisense_compiler(snapshot: &SettingsSnapshot) -> String {
    if snapshot.use_msvc {
        if snapshot.msvc_tools_path.is_empty() {
            "cl.exe".to_string()
        } else {
            Path::new(&snapshot.msvc_tools_path)
                .join("cl.exe")
                .to_string_lossy()
                .to_string()
        }
    } else {
        snapshot.c_compiler_path.clone()
    }
}

/// `<os>-<family>-<arch>`, e.g. `linux-gcc-x64`.
pub fn intellisense_mode(
    os: OperatingSystem,
    family: CompilerFamily,
    arch: Architecture,
) -> String {
    format!("{}-{}-{}", os.as_str(), family.as_str(), arch.as_str())
}

/// Projects a snapshot into one language-service configuration.
///
/// `system_includes` are the compiler's implicit include directories; they
/// follow the explicit include paths. Pure: equal inputs give equal output.
pub fn synthesize_configuration(
    snapshot: &SettingsSnapshot,
    os: OperatingSystem,
    system_includes: &[String],
) -> PropertiesConfiguration {
    let compiler_path = intellisense_compiler(snapshot);
    let family = if snapshot.use_msvc {
        CompilerFamily::Msvc
    } else {
        CompilerFamily::from_compiler_path(&compiler_path)
    };
    let mode = intellisense_mode(os, family, snapshot.architecture);

    let mut include_path = vec![WORKSPACE_GLOB.to_string()];
    for path in snapshot.include_paths.iter().chain(system_includes) {
        if !include_path.contains(path) {
            include_path.push(path.clone());
        }
    }

    let defines = if family == CompilerFamily::Msvc {
        vec!["_DEBUG".into(), "UNICODE".into(), "_UNICODE".into()]
    } else {
        Vec::new()
    };

    let standard = |s: &str| {
        if s.is_empty() {
            DEFAULT_STANDARD.to_string()
        } else {
            s.to_string()
        }
    };

    PropertiesConfiguration {
        name: mode.clone(),
        include_path,
        compiler_args: snapshot.compiler_args.clone(),
        c_standard: standard(&snapshot.c_standard),
        cpp_standard: standard(&snapshot.cpp_standard),
        intelli_sense_mode: mode,
        compiler_path,
        defines,
        extra: Map::new(),
    }
}

/// Replaces the configuration of the same name, or appends it. Fields
/// written by other tools into that configuration are kept.
pub fn merge_configuration(
    existing: Option<PropertiesDocument>,
    mut configuration: PropertiesConfiguration,
) -> PropertiesDocument {
    let mut doc = existing.unwrap_or(PropertiesDocument {
        configurations: Vec::new(),
        version: PROPERTIES_VERSION,
    });
    match doc
        .configurations
        .iter_mut()
        .find(|c| c.name == configuration.name)
    {
        Some(slot) => {
            configuration.extra = std::mem::take(&mut slot.extra);
            *slot = configuration;
        }
        None => doc.configurations.push(configuration),
    }
    doc
}

/// Writes the properties document for `config_dir`. Returns whether the file
/// changed.
pub fn write_properties(
    config_dir: &Path,
    configuration: PropertiesConfiguration,
) -> Result<bool> {
    let path = properties_path(config_dir);
    let doc = merge_configuration(read_properties(config_dir), configuration);
    let written = files::write_json_if_changed(&path, &doc)?;
    if written {
        info!(path = %path.display(), "updated IDE properties");
    }
    Ok(written)
}

/// Debug launch configuration for the debug-mode executable.
pub fn synthesize_launch(
    snapshot: &SettingsSnapshot,
    folder: &Path,
    program: &Path,
    args: &[String],
) -> Value {
    let program = program.to_string_lossy();
    let cwd = folder.to_string_lossy();
    if snapshot.use_msvc {
        return json!({
            "name": LAUNCH_CONFIGURATION_NAME,
            "type": "cppvsdbg",
            "request": "launch",
            "program": program,
            "args": args,
            "stopAtEntry": false,
            "cwd": cwd,
            "environment": [],
            "console": "externalTerminal"
        });
    }

    let mi_mode = match DebuggerKind::from_path(&snapshot.debugger_path) {
        DebuggerKind::Lldb => "lldb",
        DebuggerKind::Gdb => "gdb",
    };
    json!({
        "name": LAUNCH_CONFIGURATION_NAME,
        "type": "cppdbg",
        "request": "launch",
        "program": program,
        "args": args,
        "stopAtEntry": false,
        "cwd": cwd,
        "environment": [],
        "externalConsole": false,
        "MIMode": mi_mode,
        "miDebuggerPath": snapshot.debugger_path,
        "setupCommands": [
            {
                "description": "Enable pretty-printing for gdb",
                "text": "-enable-pretty-printing",
                "ignoreFailures": true
            }
        ]
    })
}

/// Merges `configuration` into `launch.json` by name. Returns whether the
/// file changed.
pub fn write_launch(config_dir: &Path, configuration: Value) -> Result<bool> {
    let path = launch_path(config_dir);
    let mut doc = files::read_json_file::<Value>(&path)
        .filter(Value::is_object)
        .unwrap_or_else(|| json!({ "version": "0.2.0", "configurations": [] }));

    let name = configuration.get("name").cloned();
    if !doc.get("configurations").is_some_and(Value::is_array) {
        doc["configurations"] = json!([]);
    }
    if let Some(configs) = doc["configurations"].as_array_mut() {
        match configs.iter_mut().find(|c| c.get("name") == name.as_ref()) {
            Some(slot) => *slot = configuration,
            None => configs.push(configuration),
        }
    }

    let written = files::write_json_if_changed(&path, &doc)?;
    if written {
        info!(path = %path.display(), "updated launch configuration");
    }
    Ok(written)
}
