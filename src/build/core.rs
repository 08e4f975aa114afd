use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::utils::{compile_flags, quote, shell_path};
use super::{BuildContext, build_dir, executable_path};
use crate::error::{Error, Result};
use crate::executor::ShellTask;
use crate::files::{self, Language};

/// A synthesized build: the command line plus the output directory that has
/// to exist before it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub task: ShellTask,
    pub language: Language,
    pub sources: Vec<PathBuf>,
    /// Absolute `build/<mode>` directory.
    pub build_dir: PathBuf,
}

impl BuildPlan {
    /// Creates the mode's build directory if it is missing.
    pub fn prepare(&self) -> Result<()> {
        if !self.build_dir.is_dir() {
            fs::create_dir_all(&self.build_dir).map_err(|e| Error::io(&self.build_dir, e))?;
            debug!(dir = %self.build_dir.display(), "created build directory");
        }
        Ok(())
    }
}

fn object_path(source: &Path, ctx: &BuildContext<'_>) -> PathBuf {
    let ext = if ctx.snapshot.use_msvc { "obj" } else { "o" };
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    build_dir(ctx.mode).join(format!("{}.{}", stem, ext))
}

/// Compiles every source directly in the folder to `build/<mode>/` and links
/// the objects into `<mode>Main`. Steps are chained with `&&` in listing
/// order, so the first failure stops the rest.
pub fn plan_build(ctx: &BuildContext<'_>) -> Result<BuildPlan> {
    let listing = files::files_in_dir(ctx.folder);
    let language = files::folder_language(&listing);
    let sources = files::sources_for(&listing, language);
    if sources.is_empty() {
        return Err(Error::NoSources(ctx.folder.to_path_buf()));
    }

    let snapshot = ctx.snapshot;
    let flags = compile_flags(snapshot, ctx.mode, language).join(" ");
    let compiler = if snapshot.use_msvc {
        "cl".to_string()
    } else {
        quote(match language {
            Language::C => &snapshot.c_compiler_path,
            Language::Cpp => &snapshot.cpp_compiler_path,
        })
    };
    let with_flags = |rest: String| {
        if flags.is_empty() {
            format!("{} {}", compiler, rest)
        } else {
            format!("{} {} {}", compiler, flags, rest)
        }
    };

    let mut steps = Vec::new();
    if snapshot.use_msvc && !snapshot.msvc_batch_path.is_empty() {
        steps.push(format!(
            "\"{}\" {}",
            snapshot.msvc_batch_path, snapshot.architecture
        ));
    }

    let mut objects = Vec::new();
    let mut owners: HashMap<PathBuf, &PathBuf> = HashMap::new();
    for source in &sources {
        let object = object_path(source, ctx);
        if let Some(first) = owners.insert(object.clone(), source) {
            return Err(Error::ObjectCollision {
                object,
                first: first.clone(),
                second: source.clone(),
            });
        }
        let name = source.file_name().map(Path::new).unwrap_or(source.as_path());
        let src = shell_path(name, ctx.platform);
        let obj = shell_path(&object, ctx.platform);
        steps.push(if snapshot.use_msvc {
            with_flags(format!("/c {} /Fo{}", src, obj))
        } else {
            with_flags(format!("-c {} -o {}", src, obj))
        });
        objects.push(obj);
    }

    let exe = shell_path(&executable_path(ctx.mode, ctx.platform), ctx.platform);
    steps.push(if snapshot.use_msvc {
        with_flags(format!("{} /Fe{}", objects.join(" "), exe))
    } else {
        with_flags(format!("{} -o {}", objects.join(" "), exe))
    });

    debug!(
        folder = %ctx.folder.display(),
        mode = %ctx.mode,
        sources = sources.len(),
        "synthesized build"
    );

    Ok(BuildPlan {
        task: ShellTask {
            label: "build",
            command_line: steps.join(" && "),
            cwd: ctx.folder.to_path_buf(),
        },
        language,
        sources,
        build_dir: ctx.folder.join(build_dir(ctx.mode)),
    })
}
