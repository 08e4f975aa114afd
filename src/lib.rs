//! # crunner - build settings and command synthesis for C/C++ folders
//!
//! crunner detects an installed C/C++ toolchain, resolves layered settings
//! for one selected folder and turns them into shell command lines that
//! compile every source file into an object file and link the objects into
//! a single executable.
//!
//! ## Flow
//!
//! ```text
//! toolchain (probe) -> settings (engine) -> ide / build (synthesizers) -> session -> executor
//! ```
//!
//! ## Module Organization
//!
//! - [`toolchain`] - Compiler, debugger and architecture detection
//! - [`settings`] - Layered settings resolution and persistence
//! - [`ide`] - IDE properties and launch documents
//! - [`build`] - Build, run, debug and clean command lines
//! - [`session`] - Active folder, build mode and reactions to file deletions
//! - [`activation`] - CMake project suppression

/// CMake project detection.
pub mod activation;

/// Command synthesis for build/run/debug/clean.
pub mod build;

/// Setting keys, defaults and the resolved snapshot.
pub mod config;

/// Error types.
pub mod error;

/// Shell task execution.
pub mod executor;

/// File classification, directory listing and JSON documents.
pub mod files;

/// IDE document synthesis (`c_cpp_properties.json`, `launch.json`).
pub mod ide;

/// Process-wide state and event handling.
pub mod session;

/// Settings resolution engine.
pub mod settings;

/// Toolchain detection.
pub mod toolchain;

/// Terminal output helpers.
pub mod ui;

pub use error::{Error, Result};
