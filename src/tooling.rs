//! Build and documentation tooling for the native engine.
//!
//! None of this runs during analysis. It covers what packaging needs:
//! finding the version, driving CMake, translating the engine's makefiles
//! into CMake fragments, keeping manual sources within MSVC's string-literal
//! limit, and a few documentation helpers.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use once_cell::sync::Lazy;
use regex::bytes::{Captures as ByteCaptures, Regex as ByteRegex};
use regex::Regex;

use crate::error::{Error, Result};

static VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#define PARSELMOUTH_VERSION ([0-9a-z.]+)$").expect("valid pattern"));

/// The version in a header containing `#define PARSELMOUTH_VERSION x.y.z`.
pub fn find_version(header: &str) -> Result<String> {
    VERSION
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(Error::VersionNotFound)
}

/// [`find_version`] on a file.
pub fn read_version(path: impl AsRef<Path>) -> Result<String> {
    find_version(&fs::read_to_string(path)?)
}

// ========== CMake ==========

/// Minimal CMake version on Windows.
pub const MIN_WINDOWS_CMAKE: &str = "3.1.0";

/// Platform family, as far as the build cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows { x64: bool },
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows {
                x64: cfg!(target_pointer_width = "64"),
            }
        } else {
            Platform::Unix
        }
    }
}

/// Check that `cmake` runs, and is recent enough on Windows.
///
/// `extensions` only serve the error message. Returns the `--version` output.
pub fn check_tool(cmake: &Path, extensions: &[&str], platform: Platform) -> Result<String> {
    let output = Command::new(cmake)
        .arg("--version")
        .output()
        .map_err(|_| Error::BuildToolMissing(extensions.join(", ")))?;
    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    if let Platform::Windows { .. } = platform {
        check_windows_version(&text)?;
    }
    Ok(text)
}

fn check_windows_version(version_output: &str) -> Result<()> {
    static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"version\s*([\d.]+)").expect("valid pattern"));
    let found = NUMBER
        .captures(version_output)
        .and_then(|caps| caps.get(1))
        .map(|m| dotted(m.as_str()));
    match found {
        Some(version) if version >= dotted(MIN_WINDOWS_CMAKE) => Ok(()),
        _ => Err(Error::BuildToolTooOld {
            required: MIN_WINDOWS_CMAKE.to_string(),
            platform: "Windows".to_string(),
        }),
    }
}

fn dotted(version: &str) -> Vec<u64> {
    version
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

/// How to configure and build the extension with CMake.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    /// Where the built library must land.
    pub output_dir: PathBuf,
    /// Interpreter the extension is built for.
    pub interpreter: PathBuf,
    pub debug: bool,
    pub version: String,
    pub platform: Platform,
}

impl BuildPlan {
    fn config(&self) -> &'static str {
        if self.debug {
            "Debug"
        } else {
            "Release"
        }
    }

    /// Arguments for the configure step, after the source directory.
    pub fn configure_args(&self) -> Vec<String> {
        let output = self.output_dir.display();
        let mut args = vec![
            format!("-DCMAKE_LIBRARY_OUTPUT_DIRECTORY={}", output),
            format!("-DPYTHON_EXECUTABLE={}", self.interpreter.display()),
        ];
        match self.platform {
            Platform::Windows { x64 } => {
                args.push(format!(
                    "-DCMAKE_LIBRARY_OUTPUT_DIRECTORY_{}={}",
                    self.config().to_uppercase(),
                    output
                ));
                if x64 {
                    args.extend(["-A".to_string(), "x64".to_string()]);
                }
            }
            Platform::Unix => args.push(format!("-DCMAKE_BUILD_TYPE={}", self.config())),
        }
        args
    }

    /// Arguments for `cmake --build .`.
    pub fn build_args(&self) -> Vec<String> {
        let native = match self.platform {
            Platform::Windows { .. } => "/m",
            Platform::Unix => "-j2",
        };
        vec![
            "--config".to_string(),
            self.config().to_string(),
            "--".to_string(),
            native.to_string(),
        ]
    }

    /// `CXXFLAGS` for the build: the existing flags plus `VERSION_INFO`.
    pub fn cxxflags(&self, existing: Option<&str>) -> String {
        format!("{} -DVERSION_INFO=\\\"{}\\\"", existing.unwrap_or(""), self.version)
    }

    /// Configure and build, stopping at the first failing step.
    pub fn run(&self, cmake: &Path) -> Result<()> {
        fs::create_dir_all(&self.build_dir)?;
        let cxxflags = self.cxxflags(std::env::var("CXXFLAGS").ok().as_deref());

        let mut configure = Command::new(cmake);
        configure
            .arg(&self.source_dir)
            .args(self.configure_args())
            .current_dir(&self.build_dir)
            .env("CXXFLAGS", cxxflags);
        run_step(configure)?;

        let mut build = Command::new(cmake);
        build.args(["--build", "."]).args(self.build_args()).current_dir(&self.build_dir);
        run_step(build)
    }
}

fn run_step(mut command: Command) -> Result<()> {
    let line: Vec<OsString> = std::iter::once(command.get_program().to_os_string())
        .chain(command.get_args().map(|a| a.to_os_string()))
        .collect();
    let line = line
        .iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    log::info!("running {}", line);
    let status = command.status()?;
    if !status.success() {
        return Err(Error::BuildFailed {
            command: line,
            status: status.to_string(),
        });
    }
    Ok(())
}

// ========== Makefile translation ==========

/// Value of `name = …` in a makefile, with `$(VAR)` references expanded.
///
/// Backslash-continued lines are part of the value.
pub fn makefile_variable(contents: &str, name: &str) -> Option<String> {
    makefile_variable_at(contents, name, 0)
}

fn makefile_variable_at(contents: &str, name: &str, depth: usize) -> Option<String> {
    if depth > 32 {
        return None;
    }
    let pattern = format!(r"(?m)^{} = ((?:\\\n|.)+)$", regex::escape(name));
    let definition = Regex::new(&pattern).ok()?;
    let value = definition.captures(contents)?.get(1)?.as_str().to_string();

    static REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\((\w+)\)").expect("valid pattern"));
    Some(
        REFERENCE
            .replace_all(&value, |caps: &regex::Captures<'_>| {
                makefile_variable_at(contents, &caps[1], depth + 1).unwrap_or_default()
            })
            .into_owned(),
    )
}

/// The C or C++ source for an object file; `.cpp` wins over `.c`.
fn source_for_object(object: &str, dir: &Path) -> Result<String> {
    let stem = object.strip_suffix(".o").ok_or_else(|| {
        Error::Io(io::Error::new(io::ErrorKind::InvalidInput, format!("{} is not an object file", object)))
    })?;
    for ext in ["cpp", "c"] {
        let candidate = format!("{}.{}", stem, ext);
        if dir.join(&candidate).exists() {
            return Ok(candidate);
        }
    }
    Err(Error::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no source found for {}", object),
    )))
}

/// Rewrite an engine makefile as an `add_praat_subdir` CMake call.
///
/// Object files are looked up as sources next to `makefile_dir`; include
/// directories are made relative to `engine_root`.
pub fn makefile_to_cmake(contents: &str, makefile_dir: &Path, engine_root: &Path) -> Result<String> {
    static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" +").expect("valid pattern"));
    static OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+\.o").expect("valid pattern"));
    static INCLUDE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-I (\S+)").expect("valid pattern"));

    let objects = makefile_variable(contents, "OBJECTS").unwrap_or_default();
    let mut source_lines = Vec::new();
    for line in objects.replace("\\\n", "\n").lines() {
        let line = SPACES.replace_all(line.trim(), " ").into_owned();
        if line.trim().is_empty() {
            continue;
        }
        let mut rewritten = String::new();
        let mut last = 0;
        for m in OBJECT.find_iter(&line) {
            rewritten.push_str(&line[last..m.start()]);
            rewritten.push_str(&source_for_object(m.as_str(), makefile_dir)?);
            last = m.end();
        }
        rewritten.push_str(&line[last..]);
        source_lines.push(rewritten);
    }

    let cppflags = makefile_variable(contents, "CPPFLAGS").unwrap_or_default();
    let root = engine_root.canonicalize()?;
    let mut include_dirs = Vec::new();
    for caps in INCLUDE.captures_iter(&cppflags) {
        let dir = makefile_dir.join(&caps[1]).canonicalize()?;
        let relative = dir.strip_prefix(&root).map_err(|_| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is outside {}", dir.display(), root.display()),
            ))
        })?;
        include_dirs.push(relative.display().to_string());
    }

    let mut cmake = format!("add_praat_subdir(SOURCES\n\t{}", source_lines.join("\n\t"));
    if !include_dirs.is_empty() {
        cmake.push_str(&format!("\nINCLUDE_DIRS\n\t{}", include_dirs.join(" ")));
    }
    cmake.push_str("\n)");
    Ok(cmake)
}

// ========== Manual strings ==========

const RAW_START: &[u8] = b"R\"~~~(";
const RAW_END: &[u8] = b")~~~\"";

/// Longest string literal MSVC accepts, in bytes.
pub const MSVC_MAX_LENGTH: usize = 16380;

/// Split `R"~~~(…)~~~"` literals so no piece exceeds [`MSVC_MAX_LENGTH`].
///
/// Earlier splits are undone first, so running this twice changes nothing.
/// Pieces break at line ends and are joined by adjacent-literal concatenation.
pub fn split_raw_strings(content: &[u8]) -> Vec<u8> {
    static JOINT: Lazy<ByteRegex> =
        Lazy::new(|| ByteRegex::new(r#"\)~~~"\s+R"~~~\("#).expect("valid pattern"));
    static LITERAL: Lazy<ByteRegex> =
        Lazy::new(|| ByteRegex::new(r#"(?s-u)R"~~~\((.*?)\)~~~""#).expect("valid pattern"));

    let joined = JOINT.replace_all(content, &b""[..]);
    LITERAL
        .replace_all(&joined, |caps: &ByteCaptures<'_>| split_literal(&caps[1]))
        .into_owned()
}

fn split_literal(body: &[u8]) -> Vec<u8> {
    let mut lines: Vec<Vec<u8>> = body.split_inclusive(|&b| b == b'\n').map(<[u8]>::to_vec).collect();
    let mut length = 0;
    for i in 0..lines.len() {
        if length + lines[i].len() > MSVC_MAX_LENGTH && i > 0 {
            let previous = &mut lines[i - 1];
            if let Some(last) = previous.pop() {
                previous.extend_from_slice(RAW_END);
                previous.push(b' ');
                previous.extend_from_slice(RAW_START);
                previous.push(last);
            }
            length = 0;
        }
        length += lines[i].len();
    }
    let mut out = RAW_START.to_vec();
    out.extend(lines.concat());
    out.extend_from_slice(RAW_END);
    out
}

/// Apply [`split_raw_strings`] to every `manual_*.cpp` under `root`.
pub fn split_manual_sources(root: &Path) -> Result<usize> {
    let mut count = 0;
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            if name.starts_with("manual_") && name.ends_with(".cpp") {
                let content = fs::read(&path)?;
                fs::write(&path, split_raw_strings(&content))?;
                log::debug!("split manual strings in {}", path.display());
                count += 1;
            }
        }
    }
    Ok(count)
}

// ========== Documentation ==========

/// Base URL of Praat's online manual pages.
pub const MANUAL_URL: &str = "https://www.fon.hum.uva.nl/praat/manual/";

/// A rendered link to a manual page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualLink {
    pub title: String,
    pub url: String,
}

/// Link for a `Title <page>` or bare `page` reference to the Praat manual.
pub fn manual_link(text: &str) -> ManualLink {
    static EXPLICIT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?s)^(.+?)\s*<([^<]*?)>$").expect("valid pattern"));
    static UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_+-]").expect("valid pattern"));

    let (title, page) = match EXPLICIT.captures(text) {
        Some(caps) => (Some(caps[1].to_string()), caps[2].to_string()),
        None => (None, text.to_string()),
    };
    ManualLink {
        url: format!("{}{}.html", MANUAL_URL, UNSAFE.replace_all(&page, "_")),
        title: title.unwrap_or_else(|| format!("Praat: \"{}\"", page)),
    }
}

/// Escape `*args` and `**kwargs` so reStructuredText does not read them as
/// emphasis. Already escaped occurrences are left alone.
pub fn escape_args_kwargs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut previous: Option<char> = None;
    let mut rest = line;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with("**kwargs") && previous != Some('\\') {
            out.push_str(r"\*\*kwargs");
            rest = &rest["**kwargs".len()..];
            previous = Some('s');
            continue;
        }
        if rest.starts_with("*args") && !matches!(previous, Some('*') | Some('\\')) {
            out.push_str(r"\*args");
            rest = &rest["*args".len()..];
            previous = Some('s');
            continue;
        }
        out.push(c);
        previous = Some(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Longest docstring line, signatures excepted.
pub const MAX_DOC_LINE: usize = 75;

/// Formatting problems in the docstring of `name`.
pub fn lint_docstring(name: &str, doc: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if doc.contains('\t') {
        problems.push(format!("{}: docstring contains a tab", name));
    }
    if doc.starts_with('\n') {
        problems.push(format!("{}: docstring starts with a newline", name));
    }
    let signature = Regex::new(&format!(r"^(?:\d+\. )?{}\(.*\)(?: -> .+)?$", regex::escape(name))).ok();
    for line in doc.lines() {
        let is_signature = signature.as_ref().map_or(false, |re| re.is_match(line));
        if line.chars().count() > MAX_DOC_LINE && !is_signature {
            problems.push(format!("{}: line longer than {} characters: {}", name, MAX_DOC_LINE, line));
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_marker() {
        let header = "#pragma once\n#define PARSELMOUTH_VERSION 0.5.0.dev0\n";
        assert_eq!(find_version(header).unwrap(), "0.5.0.dev0");
        let err = find_version("#define OTHER 1\n").unwrap_err();
        assert_eq!(err.to_string(), "Unable to find version string.");
    }

    fn plan(platform: Platform) -> BuildPlan {
        BuildPlan {
            source_dir: PathBuf::from("/src"),
            build_dir: PathBuf::from("/build"),
            output_dir: PathBuf::from("/out"),
            interpreter: PathBuf::from("/usr/bin/python3"),
            debug: false,
            version: "0.5.0".into(),
            platform,
        }
    }

    #[test]
    fn unix_build_arguments() {
        let plan = plan(Platform::Unix);
        assert_eq!(
            plan.configure_args(),
            vec![
                "-DCMAKE_LIBRARY_OUTPUT_DIRECTORY=/out",
                "-DPYTHON_EXECUTABLE=/usr/bin/python3",
                "-DCMAKE_BUILD_TYPE=Release",
            ]
        );
        assert_eq!(plan.build_args(), vec!["--config", "Release", "--", "-j2"]);
        assert_eq!(plan.cxxflags(Some("-O2")), "-O2 -DVERSION_INFO=\\\"0.5.0\\\"");
    }

    #[test]
    fn windows_build_arguments() {
        let mut plan = plan(Platform::Windows { x64: true });
        plan.debug = true;
        let args = plan.configure_args();
        assert_eq!(args[2], "-DCMAKE_LIBRARY_OUTPUT_DIRECTORY_DEBUG=/out");
        assert_eq!(&args[3..], ["-A", "x64"]);
        assert_eq!(plan.build_args(), vec!["--config", "Debug", "--", "/m"]);
    }

    #[test]
    fn windows_cmake_version() {
        assert!(check_windows_version("cmake version 3.27.4\n").is_ok());
        let err = check_windows_version("cmake version 2.8.12\n").unwrap_err();
        assert_eq!(err.to_string(), "CMake >= 3.1.0 is required on Windows");
    }

    #[test]
    fn missing_cmake() {
        let err = check_tool(Path::new("/nonexistent/cmake"), &["parselmouth"], Platform::Unix).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CMake must be installed to build the following extensions: parselmouth"
        );
    }

    #[test]
    fn makefile_variables_expand() {
        let makefile = "A = x.o\nOBJECTS = $(A) y.o \\\n   z.o\n";
        assert_eq!(makefile_variable(makefile, "OBJECTS").unwrap(), "x.o y.o \\\n   z.o");
        assert!(makefile_variable(makefile, "CPPFLAGS").is_none());
    }

    #[test]
    fn makefile_becomes_cmake() {
        let root = tempfile::tempdir().unwrap();
        let sys = root.path().join("sys");
        let melder = root.path().join("melder");
        fs::create_dir_all(&sys).unwrap();
        fs::create_dir_all(&melder).unwrap();
        for file in ["a.cpp", "b.c", "c.cpp", "c.c"] {
            fs::write(sys.join(file), "").unwrap();
        }
        let makefile = "CPPFLAGS = -I ../melder\nOBJECTS = a.o  b.o \\\n\tc.o\n";
        let cmake = makefile_to_cmake(makefile, &sys, root.path()).unwrap();
        assert_eq!(cmake, "add_praat_subdir(SOURCES\n\ta.cpp b.c\n\tc.cpp\nINCLUDE_DIRS\n\tmelder\n)");
    }

    #[test]
    fn long_literals_are_split_at_line_ends() {
        let line = format!("{}\n", "x".repeat(9999));
        let source = format!("auto s = R\"~~~({}{}{})~~~\";", line, line, line);
        let split = split_raw_strings(source.as_bytes());
        let text = String::from_utf8(split.clone()).unwrap();
        assert_eq!(text.matches("R\"~~~(").count(), 3);
        for piece in text.split(")~~~\" R\"~~~(") {
            assert!(piece.len() <= MSVC_MAX_LENGTH + 16);
        }
        assert_eq!(split_raw_strings(&split), split);
    }

    #[test]
    fn short_literals_are_untouched() {
        let source = b"R\"~~~(short\ntext)~~~\" and R\"~~~(more)~~~\"";
        assert_eq!(split_raw_strings(source), source.to_vec());
    }

    #[test]
    fn manual_links() {
        let link = manual_link("Sound: To Pitch...");
        assert_eq!(link.title, "Praat: \"Sound: To Pitch...\"");
        assert_eq!(link.url, "https://www.fon.hum.uva.nl/praat/manual/Sound__To_Pitch___.html");
        let link = manual_link("pitch analysis <Intro 4. Pitch analysis>");
        assert_eq!(link.title, "pitch analysis");
        assert_eq!(link.url, "https://www.fon.hum.uva.nl/praat/manual/Intro_4__Pitch_analysis.html");
    }

    #[test]
    fn args_and_kwargs_escaped_once() {
        assert_eq!(escape_args_kwargs("f(*args, **kwargs)"), r"f(\*args, \*\*kwargs)");
        assert_eq!(escape_args_kwargs(r"f(\*args, \*\*kwargs)"), r"f(\*args, \*\*kwargs)");
    }

    #[test]
    fn docstring_lint() {
        assert!(lint_docstring("to_pitch", "Compute pitch.\n\nMore text.").is_empty());
        let long_signature = format!("to_pitch(self, {}) -> Pitch", "x: float, ".repeat(10));
        assert!(lint_docstring("to_pitch", &long_signature).is_empty());
        let problems = lint_docstring("to_pitch", &format!("\n\t{}", "y".repeat(80)));
        assert_eq!(problems.len(), 3);
    }
}
