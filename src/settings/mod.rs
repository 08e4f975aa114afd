//! Settings resolution for one active folder.
//!
//! A load picks one of three strategies from what the folder already has on
//! disk, stacks the matching [`ConfigSource`]s in precedence order and reads
//! every key through them:
//!
//! | strategy | when | stack (highest first) |
//! |---|---|---|
//! | [`LoadStrategy::Warm`] | `settings.json` holds every mandatory key | workspace, global, defaults |
//! | [`LoadStrategy::Partial`] | otherwise, a properties document names a compiler | workspace, properties, global, defaults |
//! | [`LoadStrategy::ColdStart`] | neither | workspace, global, probe, defaults |
//!
//! The resolved snapshot is written back with read-merge-write, so the next
//! load of the same folder is warm.

pub mod document;
pub mod sources;

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{Key, SettingsSnapshot};
use crate::error::{Error, Result};
use crate::files;
use crate::ide::{self, PropertiesConfiguration};
use crate::toolchain::{
    Architecture, CompilerFamily, Detected, HostPlatform, Probe, ToolchainInfo, msvc,
};

pub use document::{SettingsDocument, normalize_for_platform};
pub use sources::{
    BuiltinDefaults, ConfigSource, DerivedFromProperties, JsonScope, Layered, ProbedToolchain,
};

/// Per-folder configuration directory.
pub const CONFIG_DIR: &str = ".vscode";
pub const SETTINGS_FILE: &str = "settings.json";

pub fn config_dir(folder: &Path) -> PathBuf {
    folder.join(CONFIG_DIR)
}

/// `<user config dir>/crunner/settings.json`, when the platform has one.
pub fn global_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("crunner").join(SETTINGS_FILE))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    ColdStart,
    Partial,
    Warm,
}

impl LoadStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStrategy::ColdStart => "cold start",
            LoadStrategy::Partial => "partial",
            LoadStrategy::Warm => "warm",
        }
    }
}

/// Owns the resolved [`SettingsSnapshot`] of one folder.
#[derive(Debug, Clone)]
pub struct SettingsEngine {
    folder: PathBuf,
    global_path: Option<PathBuf>,
    platform: HostPlatform,
    strategy: LoadStrategy,
    snapshot: SettingsSnapshot,
    architecture: Detected<Architecture>,
}

/// First configuration in the properties document with a compiler path,
/// preferring one tagged for `platform`'s OS.
fn derivable_configuration(
    config_dir: &Path,
    platform: HostPlatform,
) -> Option<PropertiesConfiguration> {
    let doc = ide::read_properties(config_dir)?;
    let prefix = format!("{}-", platform.os.as_str());
    let mut candidates: Vec<PropertiesConfiguration> = doc
        .configurations
        .into_iter()
        .filter(|c| !c.compiler_path.is_empty())
        .collect();
    let index = candidates
        .iter()
        .position(|c| c.name.starts_with(&prefix))
        .unwrap_or(0);
    if candidates.is_empty() {
        None
    } else {
        Some(candidates.swap_remove(index))
    }
}

fn string_list(value: Option<Value>) -> Vec<String> {
    value
        .and_then(|v| match v {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .map(|items| {
            items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

impl SettingsEngine {
    /// Resolves the settings of `folder` and persists them.
    pub fn load(folder: &Path, global_path: Option<&Path>, probe: &dyn Probe) -> Result<Self> {
        let platform = probe.platform();
        let config_dir = config_dir(folder);
        let workspace = JsonScope::load("workspace", &config_dir.join(SETTINGS_FILE));
        let global = Self::global_scope(global_path);

        let (strategy, snapshot, architecture) = if workspace.is_complete() {
            let layered = Layered::new(vec![&workspace, &global, &BuiltinDefaults]);
            let mut snapshot = Self::resolve(&layered, platform);
            for path in string_list(global.get(Key::IncludePaths)) {
                if !snapshot.include_paths.contains(&path) {
                    snapshot.include_paths.push(path);
                }
            }
            let architecture = probe.architecture(&snapshot.c_compiler_path);
            (LoadStrategy::Warm, snapshot, architecture)
        } else if let Some(cfg) = derivable_configuration(&config_dir, platform) {
            let system = Self::implicit_includes(probe, &cfg.compiler_path);
            let derived = DerivedFromProperties::new(
                &cfg.compiler_path,
                cfg.c_standard(),
                cfg.cpp_standard(),
                cfg.user_include_paths(&system),
            );
            let layered = Layered::new(vec![&workspace, &derived, &global, &BuiltinDefaults]);
            let snapshot = Self::resolve(&layered, platform);
            let architecture = match cfg.architecture() {
                Some(arch) => Detected::Resolved(arch),
                None => probe.architecture(&snapshot.c_compiler_path),
            };
            (LoadStrategy::Partial, snapshot, architecture)
        } else {
            let info = probe.detect();
            let (snapshot, architecture) =
                Self::cold_start(&[&workspace, &global], &info, platform, probe);
            (LoadStrategy::ColdStart, snapshot, architecture)
        };
        debug!(folder = %folder.display(), strategy = strategy.as_str(), "resolved settings");
        Self::install(folder, global_path, platform, strategy, snapshot, architecture)
    }

    /// Resolves `folder` from a fresh toolchain probe, whatever the folder
    /// has on disk. Used after configuration files were deleted; values left
    /// in the folder's settings still take precedence over probed ones.
    pub fn load_cold(folder: &Path, global_path: Option<&Path>, probe: &dyn Probe) -> Result<Self> {
        let platform = probe.platform();
        let workspace = JsonScope::load("workspace", &config_dir(folder).join(SETTINGS_FILE));
        let global = Self::global_scope(global_path);
        let info = probe.detect();
        let (snapshot, architecture) =
            Self::cold_start(&[&workspace, &global], &info, platform, probe);
        Self::install(
            folder,
            global_path,
            platform,
            LoadStrategy::ColdStart,
            snapshot,
            architecture,
        )
    }

    fn install(
        folder: &Path,
        global_path: Option<&Path>,
        platform: HostPlatform,
        strategy: LoadStrategy,
        snapshot: SettingsSnapshot,
        architecture: Detected<Architecture>,
    ) -> Result<Self> {
        let mut engine = Self {
            folder: folder.to_path_buf(),
            global_path: global_path.map(Path::to_path_buf),
            platform,
            strategy,
            snapshot,
            architecture,
        };
        engine.finish();
        engine.persist()?;
        info!(
            folder = %folder.display(),
            strategy = strategy.as_str(),
            "settings loaded"
        );
        Ok(engine)
    }

    /// Directories `compiler` searches on its own, for both languages.
    fn implicit_includes(probe: &dyn Probe, compiler: &str) -> Vec<String> {
        if CompilerFamily::from_compiler_path(compiler) == CompilerFamily::Msvc {
            return Vec::new();
        }
        let mut dirs = probe.system_include_dirs(compiler, files::Language::C);
        for dir in probe.system_include_dirs(compiler, files::Language::Cpp) {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }

    fn global_scope(global_path: Option<&Path>) -> JsonScope {
        match global_path {
            Some(path) => JsonScope::load("global", path),
            None => JsonScope::empty("global"),
        }
    }

    fn resolve(layered: &Layered<'_>, platform: HostPlatform) -> SettingsSnapshot {
        SettingsSnapshot::from_lookup(|key| normalize_for_platform(key, layered.get(key), platform))
    }

    /// Probed paths only fill keys that `scopes` leave unset.
    fn cold_start(
        scopes: &[&JsonScope],
        info: &ToolchainInfo,
        platform: HostPlatform,
        probe: &dyn Probe,
    ) -> (SettingsSnapshot, Detected<Architecture>) {
        let probed = ProbedToolchain(info);
        let mut stack: Vec<&dyn ConfigSource> =
            scopes.iter().map(|s| *s as &dyn ConfigSource).collect();
        stack.push(&probed);
        stack.push(&BuiltinDefaults);
        let layered = Layered::new(stack);
        let snapshot = Self::resolve(&layered, platform);
        if info.c_compiler.is_none() {
            warn!("no C compiler found on the search path; keeping configured value");
        }
        let probed_compiler = info.c_compiler.as_deref() == Some(snapshot.c_compiler_path.as_str());
        let architecture = if probed_compiler {
            info.architecture
        } else {
            probe.architecture(&snapshot.c_compiler_path)
        };
        (snapshot, architecture)
    }

    /// Applies the derived fields and invariants every strategy shares.
    fn finish(&mut self) {
        if self.snapshot.normalize_warning_style() {
            warn!(
                use_msvc = self.snapshot.use_msvc,
                "warning flags did not match the toolchain style; reset to defaults"
            );
        }
        if self.architecture.is_defaulted() {
            debug!("architecture probe failed; assuming x86");
        }
        self.snapshot.architecture = self.architecture.value();
        self.snapshot.msvc_tools_path = if self.snapshot.use_msvc {
            msvc::find_tools_path(&self.snapshot.msvc_batch_path, self.snapshot.architecture)
                .value()
        } else {
            String::new()
        };
    }

    fn document(&self) -> SettingsDocument {
        SettingsDocument::new(self.settings_path())
    }

    fn persist(&self) -> Result<bool> {
        self.document().merge(self.snapshot.to_entries())
    }

    /// Drops every value of the folder's own settings and resolves again from
    /// the global scope and a fresh probe. The result is persisted.
    pub fn reset(&mut self, probe: &dyn Probe) -> Result<()> {
        let global = Self::global_scope(self.global_path.as_deref());
        let info = probe.detect();
        let (snapshot, architecture) = Self::cold_start(&[&global], &info, self.platform, probe);
        self.snapshot = snapshot;
        self.architecture = architecture;
        self.strategy = LoadStrategy::ColdStart;
        self.finish();
        self.persist()?;
        info!(folder = %self.folder.display(), "settings reset");
        Ok(())
    }

    /// Writes one key into the folder's settings. Other keys in the file,
    /// including ones this crate does not own, are kept.
    pub fn update(&mut self, key: Key, value: Value) -> Result<bool> {
        if !sources::matches_default_type(key, &value) {
            return Err(Error::InvalidSetting {
                key: key.qualified(),
                reason: format!("expected a value shaped like {}", key.default_value()),
            });
        }
        let value = normalize_for_platform(key, value, self.platform);
        let mut written = self.document().update(key, value.clone())?;

        let previous = self.snapshot.clone();
        let mut snapshot = SettingsSnapshot::from_lookup(|k| {
            if k == key {
                value.clone()
            } else {
                previous.value_of(k)
            }
        });
        snapshot.architecture = previous.architecture;
        self.snapshot = snapshot;
        self.finish();
        if self.snapshot.warnings != previous.warnings || key == Key::UseMsvc {
            written |= self
                .document()
                .update(Key::Warnings, self.snapshot.value_of(Key::Warnings))?;
        }
        debug!(key = key.name(), written, "setting updated");
        Ok(written)
    }

    /// Probes the search path again and stores whichever compiler, debugger
    /// and make paths it finds.
    pub fn redetect(&mut self, probe: &dyn Probe) -> Result<ToolchainInfo> {
        let info = probe.detect();
        let probed = ProbedToolchain(&info);
        let mut changed = false;
        for key in [
            Key::CCompilerPath,
            Key::CppCompilerPath,
            Key::DebuggerPath,
            Key::MakePath,
        ] {
            if let Some(value) = probed.get(key) {
                changed |= self.update(key, value)?;
            }
        }
        if info.c_compiler.as_deref() == Some(self.snapshot.c_compiler_path.as_str()) {
            self.architecture = info.architecture;
            self.finish();
        }
        debug!(changed, "toolchain re-detected");
        Ok(info)
    }

    /// Writes this folder's configuration into the IDE properties document.
    /// System include directories are asked from the compiler unless MSVC is
    /// in use.
    pub fn sync_properties(&self, probe: &dyn Probe) -> Result<bool> {
        let language = files::folder_language(&files::files_in_dir(&self.folder));
        let system_includes = if self.snapshot.use_msvc {
            Vec::new()
        } else {
            let compiler = match language {
                files::Language::C => &self.snapshot.c_compiler_path,
                files::Language::Cpp => &self.snapshot.cpp_compiler_path,
            };
            probe.system_include_dirs(compiler, language)
        };
        let configuration =
            ide::synthesize_configuration(&self.snapshot, self.platform.os, &system_includes);
        ide::write_properties(&self.config_dir(), configuration)
    }

    pub fn snapshot(&self) -> &SettingsSnapshot {
        &self.snapshot
    }

    pub fn strategy(&self) -> LoadStrategy {
        self.strategy
    }

    pub fn architecture(&self) -> Detected<Architecture> {
        self.architecture
    }

    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn config_dir(&self) -> PathBuf {
        config_dir(&self.folder)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir().join(SETTINGS_FILE)
    }
}
