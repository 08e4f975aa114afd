use std::path::Path;

use super::BuildMode;
use crate::config::SettingsSnapshot;
use crate::files::Language;
use crate::toolchain::HostPlatform;

/// Standard flag for `standard`, or `None` when the compiler default applies.
pub fn standard_flag(standard: &str, msvc: bool) -> Option<String> {
    if standard.is_empty() {
        return None;
    }
    Some(if msvc {
        get_std_flag_msvc(standard)
    } else {
        get_std_flag_gcc(standard)
    })
}

/// MSVC spells standards `/std:` and lacks the older ones.
pub fn get_std_flag_msvc(edition: &str) -> String {
    if edition.starts_with("/std:") {
        return edition.to_string();
    }
    let lower = edition.to_lowercase();
    let bare = lower.strip_prefix("gnu").unwrap_or(&lower);
    let (is_c, number) = match bare.strip_prefix("c++").or_else(|| bare.strip_prefix("++")) {
        Some(number) => (false, number),
        None => (true, bare.strip_prefix('c').unwrap_or(bare)),
    };

    match (is_c, number) {
        (true, "89" | "90" | "99" | "11") => "/std:c11".to_string(),
        (true, "17" | "18") => "/std:c17".to_string(),
        (true, "23" | "2x") => "/std:clatest".to_string(),
        (false, "98" | "03" | "11" | "0x" | "14" | "1y") => "/std:c++14".to_string(),
        (false, "17" | "1z") => "/std:c++17".to_string(),
        (false, "20" | "2a") => "/std:c++20".to_string(),
        (false, "23" | "2b" | "26" | "2c" | "latest") => "/std:c++latest".to_string(),
        _ => format!("/std:{}", edition),
    }
}

/// GCC/Clang `-std=` flag, resolving the draft aliases.
pub fn get_std_flag_gcc(edition: &str) -> String {
    let normalized = edition.to_lowercase();
    let clean = normalized.strip_prefix("-std=").unwrap_or(&normalized);

    let canonical = match clean {
        "c90" => "c89",
        "c18" => "c17",
        "c2x" => "c23",
        "c++98" => "c++03",
        "c++0x" => "c++11",
        "c++1y" => "c++14",
        "c++1z" => "c++17",
        "c++2a" => "c++20",
        "c++2b" => "c++23",
        "c++2c" => "c++26",
        "gnu90" => "gnu89",
        "gnu18" => "gnu17",
        "gnu2x" => "gnu23",
        "gnu++98" => "gnu++03",
        "gnu++0x" => "gnu++11",
        "gnu++1y" => "gnu++14",
        "gnu++1z" => "gnu++17",
        "gnu++2a" => "gnu++20",
        "gnu++2b" => "gnu++23",
        "gnu++2c" => "gnu++26",
        other => other,
    };
    format!("-std={}", canonical)
}

/// Wraps `value` in double quotes when it contains whitespace.
pub fn quote(value: &str) -> String {
    if value.chars().any(char::is_whitespace) && !value.starts_with('"') {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

/// Renders a folder-relative path for the target shell.
pub fn shell_path(path: &Path, platform: HostPlatform) -> String {
    let text = path.to_string_lossy();
    let text = if platform.uses_windows_shell() {
        text.replace('/', "\\")
    } else {
        text.replace('\\', "/")
    };
    quote(&text)
}

fn optimization_flags(mode: BuildMode, msvc: bool) -> &'static [&'static str] {
    match (mode, msvc) {
        (BuildMode::Debug, false) => &["-g3", "-O0"],
        (BuildMode::Release, false) => &["-O3", "-DNDEBUG"],
        (BuildMode::Debug, true) => &["/Od", "/Zi"],
        (BuildMode::Release, true) => &["/Ox", "/GL", "/DNDEBUG"],
    }
}

/// Flags shared by every compile step and the link step, in the order
/// warnings, standard, optimization pair, compiler args, linker args,
/// include paths. Compilers apply later flags over earlier ones, so the
/// order is part of the output contract.
pub fn compile_flags(
    snapshot: &SettingsSnapshot,
    mode: BuildMode,
    language: Language,
) -> Vec<String> {
    let msvc = snapshot.use_msvc;
    let mut flags = Vec::new();

    if snapshot.enable_warnings {
        flags.extend(snapshot.warnings.iter().cloned());
        if snapshot.warnings_as_error {
            flags.push(if msvc { "/WX" } else { "-Werror" }.to_string());
        }
    }

    let standard = match language {
        Language::C => &snapshot.c_standard,
        Language::Cpp => &snapshot.cpp_standard,
    };
    flags.extend(standard_flag(standard, msvc));
    if msvc && language == Language::Cpp {
        flags.push("/EHsc".to_string());
    }

    flags.extend(optimization_flags(mode, msvc).iter().map(|f| f.to_string()));
    flags.extend(snapshot.compiler_args.iter().cloned());
    flags.extend(snapshot.linker_args.iter().cloned());

    let include_prefix = if msvc { "/I" } else { "-I" };
    flags.extend(
        snapshot
            .include_paths
            .iter()
            .map(|p| format!("{}{}", include_prefix, quote(p))),
    );
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_std_flag_msvc_cpp_standards() {
        assert_eq!(get_std_flag_msvc("c++14"), "/std:c++14");
        assert_eq!(get_std_flag_msvc("c++17"), "/std:c++17");
        assert_eq!(get_std_flag_msvc("c++20"), "/std:c++20");
        assert_eq!(get_std_flag_msvc("c++23"), "/std:c++latest");
        assert_eq!(get_std_flag_msvc("c++11"), "/std:c++14");
        assert_eq!(get_std_flag_msvc("c++2c"), "/std:c++latest");
    }

    #[test]
    fn test_get_std_flag_msvc_gnu_dialects() {
        assert_eq!(get_std_flag_msvc("gnu++17"), "/std:c++17");
        assert_eq!(get_std_flag_msvc("gnu++2a"), "/std:c++20");
        assert_eq!(get_std_flag_msvc("gnu17"), "/std:c17");
        assert_eq!(get_std_flag_msvc("gnu99"), "/std:c11");
    }

    #[test]
    fn test_get_std_flag_msvc_c_standards() {
        assert_eq!(get_std_flag_msvc("c99"), "/std:c11");
        assert_eq!(get_std_flag_msvc("c11"), "/std:c11");
        assert_eq!(get_std_flag_msvc("c17"), "/std:c17");
        assert_eq!(get_std_flag_msvc("c23"), "/std:clatest");
        assert_eq!(get_std_flag_msvc("/std:c++20"), "/std:c++20");
    }

    #[test]
    fn test_get_std_flag_gcc() {
        assert_eq!(get_std_flag_gcc("c++17"), "-std=c++17");
        assert_eq!(get_std_flag_gcc("c++2a"), "-std=c++20");
        assert_eq!(get_std_flag_gcc("c18"), "-std=c17");
        assert_eq!(get_std_flag_gcc("gnu++1z"), "-std=gnu++17");
        assert_eq!(get_std_flag_gcc("-std=c99"), "-std=c99");
    }

    #[test]
    fn test_empty_standard_adds_no_flag() {
        assert_eq!(standard_flag("", false), None);
        assert_eq!(standard_flag("", true), None);
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("a.cpp"), "a.cpp");
        assert_eq!(quote("my file.cpp"), "\"my file.cpp\"");
        assert_eq!(quote("\"already quoted\""), "\"already quoted\"");
    }

    #[test]
    fn test_shell_path_separators() {
        let win = HostPlatform::from_identifier("windows");
        let linux = HostPlatform::from_identifier("linux");
        let cyg = HostPlatform::from_identifier("cygwin");
        let p = Path::new("build/debug/a.o");
        assert_eq!(shell_path(p, win), "build\\debug\\a.o");
        assert_eq!(shell_path(p, linux), "build/debug/a.o");
        assert_eq!(shell_path(p, cyg), "build/debug/a.o");
    }

    #[test]
    fn test_flag_order() {
        let snapshot = SettingsSnapshot {
            cpp_standard: "c++20".into(),
            warnings_as_error: true,
            compiler_args: vec!["-fno-rtti".into()],
            linker_args: vec!["-lm".into()],
            include_paths: vec!["/opt/my inc".into(), "/usr/local/include".into()],
            ..Default::default()
        };
        let flags = compile_flags(&snapshot, BuildMode::Release, Language::Cpp);
        assert_eq!(
            flags,
            vec![
                "-Wall",
                "-Wextra",
                "-Wpedantic",
                "-Werror",
                "-std=c++20",
                "-O3",
                "-DNDEBUG",
                "-fno-rtti",
                "-lm",
                "-I\"/opt/my inc\"",
                "-I/usr/local/include",
            ]
        );
    }

    #[test]
    fn test_debug_flags_and_disabled_warnings() {
        let snapshot = SettingsSnapshot {
            enable_warnings: false,
            c_standard: "c11".into(),
            ..Default::default()
        };
        let flags = compile_flags(&snapshot, BuildMode::Debug, Language::C);
        assert_eq!(flags, vec!["-std=c11", "-g3", "-O0"]);
    }

    #[test]
    fn test_msvc_flag_order() {
        let snapshot = SettingsSnapshot {
            use_msvc: true,
            warnings: vec!["/W4".into()],
            cpp_standard: "c++17".into(),
            include_paths: vec!["C:/inc".into()],
            ..Default::default()
        };
        let flags = compile_flags(&snapshot, BuildMode::Debug, Language::Cpp);
        assert_eq!(
            flags,
            vec!["/W4", "/std:c++17", "/EHsc", "/Od", "/Zi", "/IC:/inc"]
        );
    }
}
