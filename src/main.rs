//! # crun CLI Entry Point
//!
//! Plays the part of the editor host: every subcommand is one of the
//! interactive commands (select folder, select mode, build, run, debug,
//! clean, ...) and is routed to a [`Session`] for the workspace.

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use inquire::Select;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use crunner::Error;
use crunner::activation;
use crunner::build::BuildMode;
use crunner::config::Key;
use crunner::executor::{DryRunExecutor, ShellExecutor, TaskExecutor};
use crunner::session::Session;
use crunner::session::watcher::ConfigWatcher;
use crunner::settings;
use crunner::toolchain::{Probe, SystemProbe};
use crunner::ui;

#[derive(Parser)]
#[command(name = "crun")]
#[command(about = "Build, run and debug a folder of C/C++ sources", version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Workspace root [default: current directory]
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,
    /// Activate even when the workspace is a CMake project
    #[arg(long, global = true)]
    force: bool,
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the folders that can be selected
    Folders,
    /// Select the folder to build (interactive if omitted)
    SelectFolder { path: Option<PathBuf> },
    /// Select debug or release mode (interactive if omitted)
    SelectMode { mode: Option<String> },
    /// Compile and link the active folder
    Build {
        /// Show what would be executed without running
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the executable of the current mode
    Run {
        /// Show what would be executed without running
        #[arg(long)]
        dry_run: bool,
    },
    /// Write the launch configuration and start the debugger
    Debug {
        /// Show what would be executed without running
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove the build directory of the current mode
    Clean {
        /// Show what would be executed without running
        #[arg(long)]
        dry_run: bool,
    },
    /// Set the arguments passed to run and debug (none clears them)
    Args {
        #[arg(num_args = 0.., allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Show or hide the status items
    ToggleStatusBar,
    /// Reset the active folder's settings to the global defaults
    Reset,
    /// Change one setting of the active folder
    Set {
        /// Setting name, e.g. cppStandard
        key: String,
        /// JSON value; bare words are taken as strings
        value: String,
    },
    /// Show the active folder, mode, toolchain and resolved settings
    Status,
    /// Regenerate settings whenever configuration files are deleted
    Watch,
    /// Generate shell completion scripts
    Completion { shell: Shell },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "crunner=debug,crun=debug"
    } else {
        "crunner=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Commands::Completion { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(());
    }

    let workspace = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let workspace = workspace
        .canonicalize()
        .with_context(|| format!("Workspace not found: {}", workspace.display()))?;

    match activation::check_activation(&workspace, cli.force) {
        Ok(()) => {}
        Err(Error::NotActivated(_)) => {
            println!(
                "{} CMake project detected in {}; not activating (use --force to override).",
                "!".yellow(),
                workspace.display()
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let probe = SystemProbe::default();
    let platform = probe.platform();
    let mut session = Session::open(
        &workspace,
        settings::global_settings_path(),
        Box::new(probe),
    );

    let executor = |dry_run: bool| -> Box<dyn TaskExecutor> {
        if dry_run {
            Box::new(DryRunExecutor)
        } else {
            Box::new(ShellExecutor { platform })
        }
    };

    let code = match cli.command {
        Commands::Folders => {
            list_folders(&session);
            0
        }
        Commands::SelectFolder { path } => {
            let path = match path {
                Some(path) => path,
                None => pick_folder(&session)?,
            };
            session.select_folder(&path)?;
            let engine = session.load_settings()?;
            println!(
                "{} Active folder: {} ({} load)",
                "✓".green(),
                display_relative(&workspace, engine.folder()).bold(),
                engine.strategy().as_str()
            );
            warn_unavailable(&session);
            0
        }
        Commands::SelectMode { mode } => {
            let mode = match mode {
                Some(mode) => BuildMode::from_str(&mode)?,
                None => {
                    let names: Vec<&str> = BuildMode::ALL.iter().map(|m| m.as_str()).collect();
                    let choice = Select::new("Select build mode:", names)
                        .prompt()
                        .context("No build mode selected")?;
                    BuildMode::from_str(choice)?
                }
            };
            session.select_mode(mode)?;
            println!("{} Build mode: {}", "✓".green(), mode.to_string().bold());
            0
        }
        Commands::Build { dry_run } => {
            let code = session.build(executor(dry_run).as_ref())?;
            report("Build", code);
            code
        }
        Commands::Run { dry_run } => session.run(executor(dry_run).as_ref())?,
        Commands::Debug { dry_run } => match session.debug(executor(dry_run).as_ref())? {
            Some(code) => code,
            None => {
                println!(
                    "{} Launch configuration written; start debugging from the editor.",
                    "✓".green()
                );
                0
            }
        },
        Commands::Clean { dry_run } => {
            let code = session.clean(executor(dry_run).as_ref())?;
            report("Clean", code);
            code
        }
        Commands::Args { args } => {
            if args.is_empty() {
                println!("{} Arguments cleared", "✓".green());
            } else {
                println!("{} Arguments: {}", "✓".green(), args.join(" ").bold());
            }
            session.set_run_args(args)?;
            0
        }
        Commands::ToggleStatusBar => {
            let visible = session.toggle_status_bar()?;
            let state = if visible { "shown" } else { "hidden" };
            println!("{} Status items {}", "✓".green(), state);
            0
        }
        Commands::Reset => {
            session.reset()?;
            println!("{} Settings reset to defaults", "✓".green());
            0
        }
        Commands::Set { key, value } => {
            let Some(key) = Key::parse(&key) else {
                bail!("Unknown setting '{}'", key);
            };
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            if session.update_setting(key, value)? {
                println!("{} Updated {}", "✓".green(), key.qualified().bold());
            } else {
                println!("{} {} unchanged", "•".blue(), key.qualified());
            }
            0
        }
        Commands::Status => {
            print_status(&mut session)?;
            0
        }
        Commands::Watch => {
            watch(&mut session)?;
            0
        }
        Commands::Completion { .. } => 0,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn display_relative(workspace: &Path, folder: &Path) -> String {
    match folder.strip_prefix(workspace) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => folder.display().to_string(),
    }
}

fn list_folders(session: &Session) {
    let active = session.state().active_folder.as_deref();
    let mut table = ui::Table::new(&["", "Folder"]);
    for folder in session.folders() {
        let marker = if Some(folder.as_path()) == active {
            "*".green().to_string()
        } else {
            String::new()
        };
        table.add_row(vec![marker, display_relative(session.workspace(), &folder)]);
    }
    table.print();
}

fn pick_folder(session: &Session) -> Result<PathBuf> {
    let folders = session.folders();
    let names: Vec<String> = folders
        .iter()
        .map(|f| display_relative(session.workspace(), f))
        .collect();
    let choice = Select::new("Select folder:", names.clone())
        .prompt()
        .context("No folder selected")?;
    let index = names.iter().position(|n| *n == choice).unwrap_or(0);
    Ok(folders[index].clone())
}

fn report(action: &str, code: i32) {
    if code == 0 {
        println!("{} {} finished", "✓".green(), action);
    } else {
        println!("{} {} failed (exit code {})", "x".red(), action, code);
    }
}

fn warn_unavailable(session: &Session) {
    let availability = session.availability();
    if !availability.any_compiler() {
        println!("{} No C/C++ compiler found. Install gcc or clang.", "!".yellow());
    } else if !availability.debugger {
        println!("{} No debugger found; debugging is unavailable.", "!".yellow());
    }
}

fn print_status(session: &mut Session) -> Result<()> {
    if session.state().active_folder.is_some() {
        session.load_settings()?;
    }

    if session.state().status_bar_visible {
        let mut table = ui::Table::new(&["Item", "Value"]);
        for (label, value) in ui::status_items(
            session.workspace(),
            session.state(),
            session.availability(),
        ) {
            table.add_row(vec![label, value]);
        }
        table.print();
    } else {
        println!("{} Status items hidden (crun toggle-status-bar)", "•".blue());
    }

    let Some(engine) = session.engine() else {
        return Ok(());
    };
    let availability = session.availability();
    println!(
        "\n{} Toolchain ({}, {})",
        "⚙".cyan(),
        engine.snapshot().architecture,
        engine.strategy().as_str()
    );
    println!(
        "   {} C compiler   {} {}",
        ui::mark(availability.c_compiler),
        engine.snapshot().c_compiler_path,
        if engine.architecture().is_defaulted() {
            "(architecture defaulted)".dimmed().to_string()
        } else {
            String::new()
        }
    );
    println!(
        "   {} C++ compiler {}",
        ui::mark(availability.cpp_compiler),
        engine.snapshot().cpp_compiler_path
    );
    println!(
        "   {} Debugger     {}",
        ui::mark(availability.debugger),
        engine.snapshot().debugger_path
    );

    let mut table = ui::Table::new(&["Setting", "Value"]);
    for key in Key::ALL {
        let value = match engine.snapshot().value_of(key) {
            Value::String(s) => s,
            other => other.to_string(),
        };
        table.add_row(vec![key.name().to_string(), value]);
    }
    println!();
    table.print();
    Ok(())
}

fn watch(session: &mut Session) -> Result<()> {
    session.activate()?;
    let config_dir = session.load_settings()?.config_dir();
    let mut watcher = ConfigWatcher::new(&config_dir)
        .with_context(|| format!("Failed to watch {}", config_dir.display()))?;
    println!(
        "{} Watching {} (Ctrl-C to stop)",
        "👀".cyan(),
        config_dir.display()
    );

    while let Some(events) = watcher.next_events() {
        for event in events {
            if !session.handle_event(event)? {
                return Ok(());
            }
        }
        println!("{} Configuration regenerated", "🔄".yellow());
    }
    session.deactivate();
    Ok(())
}
