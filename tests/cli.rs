//! End-to-end tests for the `crun` binary.
//!
//! Each test works in its own temporary workspace with the user config
//! directory redirected, so no real settings are read or written.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn crun(workspace: &Path, args: &[&str]) -> Output {
    let config_home = workspace.join(".config-home");
    Command::new(env!("CARGO_BIN_EXE_crun"))
        .args(args)
        .current_dir(workspace)
        .env("XDG_CONFIG_HOME", &config_home)
        .env("APPDATA", &config_home)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run crun")
}

fn output_text(output: &Output) -> String {
    format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn workspace_with_folder(source: &str) -> tempfile::TempDir {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let app = tmp.path().join("app");
    fs::create_dir(&app).unwrap();
    fs::write(app.join(source), "int main() { return 0; }\n").unwrap();
    tmp
}

fn has_compiler() -> bool {
    ["gcc", "clang"]
        .iter()
        .any(|name| which::which(name).is_ok())
}

#[test]
fn cmake_workspace_is_not_activated() {
    let tmp = workspace_with_folder("main.c");
    fs::write(tmp.path().join("CMakeLists.txt"), "project(demo)\n").unwrap();

    let output = crun(tmp.path(), &["select-folder", "app"]);
    let text = output_text(&output);
    assert!(output.status.success(), "{}", text);
    assert!(text.contains("CMake project detected"), "{}", text);
    assert!(!tmp.path().join(".crunner").exists());
    assert!(!tmp.path().join("app").join(".vscode").exists());

    let forced = crun(tmp.path(), &["--force", "select-folder", "app"]);
    assert!(forced.status.success(), "{}", output_text(&forced));
    assert!(tmp.path().join("app/.vscode/settings.json").is_file());
}

#[test]
fn select_folder_writes_settings_and_session() {
    let tmp = workspace_with_folder("main.cpp");

    let output = crun(tmp.path(), &["select-folder", "app"]);
    assert!(output.status.success(), "{}", output_text(&output));

    let config = tmp.path().join("app").join(".vscode");
    let settings = fs::read_to_string(config.join("settings.json")).unwrap();
    assert!(settings.contains("C_Cpp_Runner.cCompilerPath"));
    assert!(config.join("c_cpp_properties.json").is_file());

    let session = fs::read_to_string(tmp.path().join(".crunner/session.json")).unwrap();
    assert!(session.contains("\"buildMode\": \"debug\""), "{}", session);
}

#[test]
fn folders_skip_build_and_hidden_dirs() {
    let tmp = workspace_with_folder("main.c");
    fs::create_dir_all(tmp.path().join("build/debug")).unwrap();
    fs::create_dir_all(tmp.path().join(".git")).unwrap();
    fs::create_dir_all(tmp.path().join("lib/CMakeFiles")).unwrap();

    let output = crun(tmp.path(), &["folders"]);
    let text = output_text(&output);
    assert!(output.status.success(), "{}", text);
    assert!(text.contains("app"));
    assert!(text.contains("lib"));
    assert!(!text.contains("build"));
    assert!(!text.contains(".git"));
    assert!(!text.contains("CMakeFiles"));
}

#[test]
fn build_dry_run_prints_command() {
    if !has_compiler() {
        eprintln!("Skipping test: no C compiler on PATH");
        return;
    }
    let tmp = workspace_with_folder("main.c");
    assert!(crun(tmp.path(), &["select-folder", "app"]).status.success());

    let output = crun(tmp.path(), &["build", "--dry-run"]);
    let text = output_text(&output);
    assert!(output.status.success(), "{}", text);
    assert!(text.contains("DRY RUN"), "{}", text);
    assert!(text.contains("-c main.c -o build/debug/main.o"), "{}", text);
    assert!(text.contains("-o build/debug/debugMain"), "{}", text);
    assert!(!tmp.path().join("app/build").exists());
}

#[cfg(unix)]
#[test]
fn clean_dry_run_uses_selected_mode() {
    let tmp = workspace_with_folder("main.c");
    assert!(crun(tmp.path(), &["select-folder", "app"]).status.success());
    assert!(crun(tmp.path(), &["select-mode", "release"]).status.success());

    let output = crun(tmp.path(), &["clean", "--dry-run"]);
    let text = output_text(&output);
    assert!(output.status.success(), "{}", text);
    assert!(text.contains("rm -r build/release"), "{}", text);
}

#[test]
fn set_updates_settings_file() {
    let tmp = workspace_with_folder("main.cpp");
    assert!(crun(tmp.path(), &["select-folder", "app"]).status.success());

    let output = crun(tmp.path(), &["set", "cppStandard", "c++20"]);
    assert!(output.status.success(), "{}", output_text(&output));
    let settings = fs::read_to_string(tmp.path().join("app/.vscode/settings.json")).unwrap();
    assert!(settings.contains("\"C_Cpp_Runner.cppStandard\": \"c++20\""));

    let bad = crun(tmp.path(), &["set", "noSuchKey", "1"]);
    assert!(!bad.status.success());
    assert!(output_text(&bad).contains("Unknown setting"));
}

#[test]
fn build_without_folder_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let output = crun(tmp.path(), &["build", "--dry-run"]);
    assert!(!output.status.success());
    assert!(output_text(&output).contains("no active folder"));
}

#[test]
fn invalid_mode_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let output = crun(tmp.path(), &["select-mode", "fast"]);
    assert!(!output.status.success());
    assert!(output_text(&output).contains("invalid build mode"));
}
