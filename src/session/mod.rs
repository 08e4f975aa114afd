//! The orchestrator: active folder, build mode and toolchain availability
//! for one workspace, and the actions that drive the settings engine and the
//! command synthesizers.
//!
//! Fields the user picks (folder, mode, arguments, status visibility) are
//! stored in `<workspace>/.crunner/session.json` so they survive between
//! invocations. Availability is always recomputed.

pub mod watcher;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::build::{self, BuildContext, BuildMode};
use crate::config::Key;
use crate::error::{Error, Result};
use crate::executor::TaskExecutor;
use crate::files::{self, Language};
use crate::ide;
use crate::settings::{self, SettingsEngine};
use crate::toolchain::Probe;

pub const STATE_DIR: &str = ".crunner";
pub const STATE_FILE: &str = "session.json";

/// User selections persisted between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionState {
    pub active_folder: Option<PathBuf>,
    pub build_mode: BuildMode,
    pub status_bar_visible: bool,
    pub run_args: Vec<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            active_folder: None,
            build_mode: BuildMode::Debug,
            status_bar_visible: true,
            run_args: Vec::new(),
        }
    }
}

impl SessionState {
    pub fn path(workspace: &Path) -> PathBuf {
        workspace.join(STATE_DIR).join(STATE_FILE)
    }

    /// Missing or malformed state is a fresh session.
    pub fn load(workspace: &Path) -> Self {
        files::read_json_file(&Self::path(workspace)).unwrap_or_default()
    }

    pub fn save(&self, workspace: &Path) -> Result<()> {
        files::write_json_if_changed(&Self::path(workspace), self)?;
        Ok(())
    }
}

/// Whether each configured tool was found on the last check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Availability {
    pub c_compiler: bool,
    pub cpp_compiler: bool,
    pub debugger: bool,
}

impl Availability {
    pub fn any_compiler(&self) -> bool {
        self.c_compiler || self.cpp_compiler
    }
}

/// Inputs the session reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A file in the active folder's configuration directory was removed.
    ConfigDeleted(PathBuf),
    FolderSelected(PathBuf),
    BuildModeSelected(BuildMode),
    Shutdown,
}

/// Identifies one settings load. A load whose ticket is older than the
/// session's current generation is discarded on commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    folder: PathBuf,
    cold: bool,
}

impl LoadTicket {
    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

pub struct Session {
    workspace: PathBuf,
    global_path: Option<PathBuf>,
    probe: Box<dyn Probe>,
    state: SessionState,
    availability: Availability,
    active: bool,
    generation: u64,
    engine: Option<SettingsEngine>,
}

impl Session {
    /// Opens the session of `workspace`, restoring the persisted selections.
    /// No settings are loaded until they are needed.
    pub fn open(workspace: &Path, global_path: Option<PathBuf>, probe: Box<dyn Probe>) -> Self {
        let state = SessionState::load(workspace);
        debug!(workspace = %workspace.display(), ?state, "session opened");
        Self {
            workspace: workspace.to_path_buf(),
            global_path,
            probe,
            state,
            availability: Availability::default(),
            active: false,
            generation: 0,
            engine: None,
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn engine(&self) -> Option<&SettingsEngine> {
        self.engine.as_ref()
    }

    /// Starts reacting to configuration deletions.
    pub fn activate(&mut self) -> Result<()> {
        self.active = true;
        if self.state.active_folder.is_some() {
            self.reload()?;
        }
        info!(workspace = %self.workspace.display(), "session activated");
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        debug!("session deactivated");
    }

    /// The workspace root followed by every selectable subfolder.
    pub fn folders(&self) -> Vec<PathBuf> {
        let mut folders = vec![self.workspace.clone()];
        folders.extend(files::folders_in_dir(&self.workspace));
        folders
    }

    fn active_folder(&self) -> Result<PathBuf> {
        self.state.active_folder.clone().ok_or(Error::NoActiveFolder)
    }

    /// Makes `folder` the target of every action and loads its settings.
    pub fn select_folder(&mut self, folder: &Path) -> Result<()> {
        let folder = if folder.is_absolute() {
            folder.to_path_buf()
        } else {
            self.workspace.join(folder)
        };
        if !folder.is_dir() {
            return Err(Error::io(
                &folder,
                io::Error::new(io::ErrorKind::NotFound, "not a directory"),
            ));
        }
        self.state.active_folder = Some(folder.clone());
        self.engine = None;
        self.state.save(&self.workspace)?;
        info!(folder = %folder.display(), "active folder selected");
        self.reload()?;
        Ok(())
    }

    pub fn select_mode(&mut self, mode: BuildMode) -> Result<()> {
        self.state.build_mode = mode;
        self.state.save(&self.workspace)?;
        info!(%mode, "build mode selected");
        Ok(())
    }

    /// Replaces the arguments passed to run and debug. Empty clears them.
    pub fn set_run_args(&mut self, args: Vec<String>) -> Result<()> {
        self.state.run_args = args;
        self.state.save(&self.workspace)
    }

    /// Returns the new visibility.
    pub fn toggle_status_bar(&mut self) -> Result<bool> {
        self.state.status_bar_visible = !self.state.status_bar_visible;
        self.state.save(&self.workspace)?;
        Ok(self.state.status_bar_visible)
    }

    /// Starts a settings load for the active folder. Any load begun earlier
    /// becomes stale.
    pub fn begin_load(&mut self) -> Result<LoadTicket> {
        self.begin(false)
    }

    /// Like [`Session::begin_load`], for a load that re-probes the toolchain
    /// instead of deriving anything from the IDE properties document.
    pub fn begin_cold_load(&mut self) -> Result<LoadTicket> {
        self.begin(true)
    }

    fn begin(&mut self, cold: bool) -> Result<LoadTicket> {
        let folder = self.active_folder()?;
        self.generation += 1;
        Ok(LoadTicket {
            generation: self.generation,
            folder,
            cold,
        })
    }

    /// Runs the load a ticket stands for. Does not touch session state.
    pub fn run_load(&self, ticket: &LoadTicket) -> Result<SettingsEngine> {
        let global = self.global_path.as_deref();
        if ticket.cold {
            SettingsEngine::load_cold(&ticket.folder, global, self.probe.as_ref())
        } else {
            SettingsEngine::load(&ticket.folder, global, self.probe.as_ref())
        }
    }

    /// Installs a finished load unless a newer one has begun since. Returns
    /// whether it was installed.
    pub fn commit_load(&mut self, ticket: LoadTicket, engine: SettingsEngine) -> bool {
        if ticket.generation != self.generation {
            debug!(
                stale = ticket.generation,
                current = self.generation,
                "discarding stale settings load"
            );
            return false;
        }
        self.engine = Some(engine);
        true
    }

    /// Loads the active folder's settings, refreshes availability and the IDE
    /// properties document.
    pub fn reload(&mut self) -> Result<&SettingsEngine> {
        let ticket = self.begin_load()?;
        self.finish_reload(ticket)
    }

    /// Reloads from a fresh toolchain probe.
    pub fn reload_cold(&mut self) -> Result<&SettingsEngine> {
        let ticket = self.begin_cold_load()?;
        self.finish_reload(ticket)
    }

    fn finish_reload(&mut self, ticket: LoadTicket) -> Result<&SettingsEngine> {
        let engine = self.run_load(&ticket)?;
        self.commit_load(ticket, engine);
        self.refresh_availability()?;
        self.sync_ide_documents()?;
        self.current_engine()
    }

    fn current_engine(&self) -> Result<&SettingsEngine> {
        self.engine.as_ref().ok_or(Error::NoActiveFolder)
    }

    fn ensure_engine(&mut self) -> Result<()> {
        if self.engine.is_none() {
            self.reload()?;
        }
        Ok(())
    }

    /// The active folder's settings, loading them on first use.
    pub fn load_settings(&mut self) -> Result<&SettingsEngine> {
        self.ensure_engine()?;
        self.current_engine()
    }

    /// Stores one setting for the active folder and refreshes everything
    /// derived from it.
    pub fn update_setting(&mut self, key: Key, value: Value) -> Result<bool> {
        self.ensure_engine()?;
        let changed = match self.engine.as_mut() {
            Some(engine) => engine.update(key, value)?,
            None => return Err(Error::NoActiveFolder),
        };
        self.refresh_availability()?;
        self.sync_ide_documents()?;
        Ok(changed)
    }

    /// Checks the configured tools. When neither compiler is found the
    /// search path is probed again and the new paths are stored.
    pub fn refresh_availability(&mut self) -> Result<Availability> {
        let probe = self.probe.as_ref();
        let Some(engine) = self.engine.as_mut() else {
            return Ok(self.availability);
        };
        let check = |engine: &SettingsEngine| {
            let snapshot = engine.snapshot();
            Availability {
                c_compiler: probe.lookup(&snapshot.c_compiler_path).found,
                cpp_compiler: probe.lookup(&snapshot.cpp_compiler_path).found,
                debugger: probe.lookup(&snapshot.debugger_path).found,
            }
        };

        let mut availability = check(engine);
        if !availability.any_compiler() && !engine.snapshot().use_msvc {
            warn!("no configured compiler found; re-detecting toolchain");
            engine.redetect(probe)?;
            availability = check(engine);
        }
        debug!(?availability, "toolchain availability");
        self.availability = availability;
        Ok(availability)
    }

    /// Regenerates the IDE properties document of the active folder.
    pub fn sync_ide_documents(&self) -> Result<bool> {
        self.current_engine()?.sync_properties(self.probe.as_ref())
    }

    /// Drops the folder's settings back to global defaults.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_engine()?;
        let probe = self.probe.as_ref();
        if let Some(engine) = self.engine.as_mut() {
            engine.reset(probe)?;
        }
        self.refresh_availability()?;
        self.sync_ide_documents()?;
        Ok(())
    }

    fn context(&self) -> Result<BuildContext<'_>> {
        let engine = self.current_engine()?;
        Ok(BuildContext {
            snapshot: engine.snapshot(),
            folder: engine.folder(),
            mode: self.state.build_mode,
            platform: engine.platform(),
        })
    }

    fn require_compiler(&self) -> Result<()> {
        let engine = self.current_engine()?;
        let snapshot = engine.snapshot();
        if snapshot.use_msvc {
            return Ok(());
        }
        let language = files::folder_language(&files::files_in_dir(engine.folder()));
        let (available, path) = match language {
            Language::C => (self.availability.c_compiler, &snapshot.c_compiler_path),
            Language::Cpp => (self.availability.cpp_compiler, &snapshot.cpp_compiler_path),
        };
        if available {
            Ok(())
        } else {
            Err(Error::ToolUnavailable {
                tool: "compiler",
                path: path.clone(),
            })
        }
    }

    /// Compiles and links the active folder.
    pub fn build(&mut self, executor: &dyn TaskExecutor) -> Result<i32> {
        self.ensure_engine()?;
        self.require_compiler()?;
        let plan = build::plan_build(&self.context()?)?;
        if !executor.is_dry_run() {
            plan.prepare()?;
        }
        executor.execute(&plan.task)
    }

    /// Runs the executable of the current mode with the stored arguments.
    pub fn run(&mut self, executor: &dyn TaskExecutor) -> Result<i32> {
        self.ensure_engine()?;
        self.require_compiler()?;
        let task = build::synthesize_run(&self.context()?, &self.state.run_args);
        executor.execute(&task)
    }

    /// Writes the launch configuration and starts the debugger. `None` when
    /// the toolchain has no command-line debugger and only the launch
    /// configuration was written.
    pub fn debug(&mut self, executor: &dyn TaskExecutor) -> Result<Option<i32>> {
        self.ensure_engine()?;
        self.require_compiler()?;
        let ctx = self.context()?;
        if !ctx.snapshot.use_msvc && !self.availability.debugger {
            return Err(Error::ToolUnavailable {
                tool: "debugger",
                path: ctx.snapshot.debugger_path.clone(),
            });
        }

        let program = ctx
            .folder
            .join(build::executable_path(BuildMode::Debug, ctx.platform));
        let launch =
            ide::synthesize_launch(ctx.snapshot, ctx.folder, &program, &self.state.run_args);
        if !executor.is_dry_run() {
            ide::write_launch(&settings::config_dir(ctx.folder), launch)?;
        }

        match build::synthesize_debug(&ctx, &self.state.run_args) {
            Some(task) => executor.execute(&task).map(Some),
            None => Ok(None),
        }
    }

    /// Deletes the current mode's build directory.
    pub fn clean(&mut self, executor: &dyn TaskExecutor) -> Result<i32> {
        self.ensure_engine()?;
        let task = build::synthesize_clean(&self.context()?);
        executor.execute(&task)
    }

    /// Applies one event. Returns `false` once the session should stop.
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<bool> {
        match event {
            SessionEvent::ConfigDeleted(path) => {
                if !self.active {
                    debug!(path = %path.display(), "ignoring deletion while inactive");
                    return Ok(true);
                }
                let Some(folder) = self.state.active_folder.clone() else {
                    return Ok(true);
                };
                if path.parent() != Some(settings::config_dir(&folder).as_path()) {
                    return Ok(true);
                }
                info!(path = %path.display(), "configuration removed; reloading");
                self.reload_cold()?;
                Ok(true)
            }
            SessionEvent::FolderSelected(folder) => {
                self.select_folder(&folder)?;
                Ok(true)
            }
            SessionEvent::BuildModeSelected(mode) => {
                self.select_mode(mode)?;
                Ok(true)
            }
            SessionEvent::Shutdown => {
                self.deactivate();
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ShellTask;
    use crate::settings::LoadStrategy;
    use crate::toolchain::testing::FakeProbe;
    use std::cell::RefCell;
    use std::fs;

    #[derive(Default)]
    struct Recorder {
        tasks: RefCell<Vec<ShellTask>>,
    }

    impl TaskExecutor for Recorder {
        fn execute(&self, task: &ShellTask) -> Result<i32> {
            self.tasks.borrow_mut().push(task.clone());
            Ok(0)
        }
    }

    fn gnu() -> Box<dyn Probe> {
        Box::new(FakeProbe::linux(&["gcc", "g++", "gdb", "make"]))
    }

    fn workspace_with_app() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let app = tmp.path().join("app");
        fs::create_dir(&app).unwrap();
        fs::write(app.join("main.c"), "int main(void) { return 0; }").unwrap();
        tmp
    }

    #[test]
    fn test_state_survives_reopen() {
        let tmp = workspace_with_app();
        let mut session = Session::open(tmp.path(), None, gnu());
        session.select_folder(Path::new("app")).unwrap();
        session.select_mode(BuildMode::Release).unwrap();
        session.set_run_args(vec!["-v".into()]).unwrap();
        assert!(!session.toggle_status_bar().unwrap());

        let reopened = Session::open(tmp.path(), None, gnu());
        let state = reopened.state();
        assert_eq!(state.active_folder, Some(tmp.path().join("app")));
        assert_eq!(state.build_mode, BuildMode::Release);
        assert_eq!(state.run_args, vec!["-v"]);
        assert!(!state.status_bar_visible);
    }

    #[test]
    fn test_malformed_state_is_fresh() {
        let tmp = tempfile::tempdir().unwrap();
        let path = SessionState::path(tmp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ nope").unwrap();
        assert_eq!(SessionState::load(tmp.path()), SessionState::default());
    }

    #[test]
    fn test_select_folder_writes_documents() {
        let tmp = workspace_with_app();
        let mut session = Session::open(tmp.path(), None, gnu());
        session.select_folder(&tmp.path().join("app")).unwrap();

        let config = tmp.path().join("app").join(".vscode");
        assert!(config.join("settings.json").is_file());
        assert!(config.join("c_cpp_properties.json").is_file());
        assert_eq!(
            session.availability(),
            Availability {
                c_compiler: true,
                cpp_compiler: true,
                debugger: true
            }
        );
    }

    #[test]
    fn test_select_missing_folder_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = Session::open(tmp.path(), None, gnu());
        assert!(session.select_folder(Path::new("missing")).is_err());
        assert!(session.state().active_folder.is_none());
    }

    #[test]
    fn test_folders_lists_root_first() {
        let tmp = workspace_with_app();
        fs::create_dir_all(tmp.path().join("build").join("debug")).unwrap();
        let session = Session::open(tmp.path(), None, gnu());
        let folders = session.folders();
        assert_eq!(folders, vec![tmp.path().to_path_buf(), tmp.path().join("app")]);
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let tmp = workspace_with_app();
        let mut session = Session::open(tmp.path(), None, gnu());
        session.select_folder(Path::new("app")).unwrap();

        let first = session.begin_load().unwrap();
        let first_engine = session.run_load(&first).unwrap();
        let second = session.begin_load().unwrap();
        let second_engine = session.run_load(&second).unwrap();

        assert!(session.commit_load(second, second_engine));
        assert!(!session.commit_load(first, first_engine));
    }

    #[test]
    fn test_build_hands_command_to_executor() {
        let tmp = workspace_with_app();
        let mut session = Session::open(tmp.path(), None, gnu());
        session.select_folder(Path::new("app")).unwrap();

        let recorder = Recorder::default();
        assert_eq!(session.build(&recorder).unwrap(), 0);
        let tasks = recorder.tasks.borrow();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].cwd, tmp.path().join("app"));
        assert!(tasks[0].command_line.starts_with("/usr/bin/gcc "));
        assert!(tasks[0].command_line.ends_with("-o build/debug/debugMain"));
        assert!(tmp.path().join("app/build/debug").is_dir());
    }

    #[test]
    fn test_build_without_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = Session::open(tmp.path(), None, gnu());
        let err = session.build(&Recorder::default()).unwrap_err();
        assert!(matches!(err, Error::NoActiveFolder));
    }

    #[test]
    fn test_missing_compiler_refuses_build() {
        let tmp = workspace_with_app();
        let mut session = Session::open(tmp.path(), None, Box::new(FakeProbe::linux(&["gdb"])));
        session.select_folder(Path::new("app")).unwrap();
        assert!(!session.availability().any_compiler());
        let err = session.build(&Recorder::default()).unwrap_err();
        assert!(matches!(err, Error::ToolUnavailable { tool: "compiler", .. }));
    }

    #[test]
    fn test_debug_writes_launch_and_runs_debugger() {
        let tmp = workspace_with_app();
        let mut session = Session::open(tmp.path(), None, gnu());
        session.select_folder(Path::new("app")).unwrap();
        session.set_run_args(vec!["1".into()]).unwrap();

        let recorder = Recorder::default();
        assert_eq!(session.debug(&recorder).unwrap(), Some(0));
        assert_eq!(
            recorder.tasks.borrow()[0].command_line,
            "/usr/bin/gdb --args ./build/debug/debugMain 1"
        );
        let launch = tmp.path().join("app/.vscode/launch.json");
        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(launch).unwrap()).unwrap();
        assert_eq!(doc["configurations"][0]["name"], ide::LAUNCH_CONFIGURATION_NAME);
        assert_eq!(doc["configurations"][0]["args"][0], "1");
    }

    #[test]
    fn test_deletion_reloads_only_when_active() {
        let tmp = workspace_with_app();
        let mut session = Session::open(tmp.path(), None, gnu());
        session.select_folder(Path::new("app")).unwrap();
        let settings_path = tmp.path().join("app/.vscode/settings.json");
        fs::remove_file(&settings_path).unwrap();

        let event = SessionEvent::ConfigDeleted(settings_path.clone());
        assert!(session.handle_event(event.clone()).unwrap());
        assert!(!settings_path.exists());

        session.activate().unwrap();
        fs::remove_file(&settings_path).unwrap();
        fs::remove_file(tmp.path().join("app/.vscode/c_cpp_properties.json")).unwrap();
        assert!(session.handle_event(event).unwrap());
        assert!(settings_path.is_file());
        assert_eq!(
            session.engine().map(|e| e.strategy()),
            Some(LoadStrategy::ColdStart)
        );

        assert!(!session.handle_event(SessionEvent::Shutdown).unwrap());
        assert!(!session.is_active());
    }

    #[test]
    fn test_deleted_settings_are_not_rebuilt_from_properties() {
        let tmp = workspace_with_app();
        let mut session = Session::open(tmp.path(), None, gnu());
        session.select_folder(Path::new("app")).unwrap();
        session.activate().unwrap();
        let properties = ide::read_properties(&tmp.path().join("app/.vscode")).unwrap();
        assert!(properties.configurations[0]
            .include_path
            .contains(&"/usr/include".to_string()));

        let settings_path = tmp.path().join("app/.vscode/settings.json");
        fs::remove_file(&settings_path).unwrap();
        session
            .handle_event(SessionEvent::ConfigDeleted(settings_path.clone()))
            .unwrap();

        let engine = session.engine().unwrap();
        assert_eq!(engine.strategy(), LoadStrategy::ColdStart);
        assert!(engine.snapshot().include_paths.is_empty());
        assert!(settings_path.is_file());

        let recorder = Recorder::default();
        session.build(&recorder).unwrap();
        assert!(!recorder.tasks.borrow()[0].command_line.contains("-I"));
    }

    #[test]
    fn test_update_setting_refreshes_properties() {
        let tmp = workspace_with_app();
        let mut session = Session::open(tmp.path(), None, gnu());
        session.select_folder(Path::new("app")).unwrap();
        assert!(
            session
                .update_setting(Key::CStandard, serde_json::json!("c11"))
                .unwrap()
        );
        let doc = ide::read_properties(&tmp.path().join("app/.vscode")).unwrap();
        assert_eq!(doc.configurations[0].c_standard, "c11");
    }

    #[test]
    fn test_clean_targets_mode_directory() {
        let tmp = workspace_with_app();
        let mut session = Session::open(tmp.path(), None, gnu());
        session.select_folder(Path::new("app")).unwrap();
        session
            .handle_event(SessionEvent::BuildModeSelected(BuildMode::Release))
            .unwrap();

        let recorder = Recorder::default();
        session.clean(&recorder).unwrap();
        assert_eq!(recorder.tasks.borrow()[0].command_line, "rm -r build/release");
    }
}
