//! External tools driven during sketch preprocessing.
//!
//! Two collaborators are abstracted behind traits so the discovery loop
//! and the prototype pipeline can be exercised without a compiler:
//!
//! - [`Preprocessor`]: runs the C++ preprocessor to find missing headers
//!   and to produce the expanded sketch source.
//! - [`TagLister`]: lists the symbols of a source file as ctags records.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::util::process::ProcessBuilder;

mod ctags;
mod gcc;

pub use ctags::CtagsRunner;
pub use gcc::GccPreprocessor;

/// Result of running the preprocessor in discovery mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// The file preprocessed without errors.
    Clean,
    /// An `#include` named a header that is not on the include path.
    MissingHeader(String),
    /// The preprocessor failed for another reason; compiler output verbatim.
    Failed(String),
}

/// The C++ preprocessor.
pub trait Preprocessor {
    /// Preprocess `source` and report the first missing header, if any.
    fn discover(&self, source: &Path, include_dirs: &[PathBuf]) -> Result<DiscoveryOutcome>;

    /// Preprocess `source` with diagnostics enabled and return them verbatim.
    fn diagnose(&self, source: &Path, include_dirs: &[PathBuf]) -> Result<String>;

    /// Return the fully preprocessed text of `source`.
    fn preprocess(&self, source: &Path, include_dirs: &[PathBuf]) -> Result<String>;
}

/// A ctags-compatible symbol lister.
pub trait TagLister {
    /// Raw tab-separated tag records for `source`.
    fn list(&self, source: &Path) -> Result<String>;
}

/// A command to execute, with program, arguments, and environment.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The program to run (e.g., "avr-g++", "ctags")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
    /// Environment variables to set
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Turn the spec into a runnable process.
    pub fn to_process(&self) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.program).args(&self.args);
        for (key, value) in &self.env {
            cmd = cmd.env(key, value);
        }
        cmd
    }
}

static GCC_MISSING_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)fatal error:\s*(\S+?):\s*No such file or directory").expect("valid regex")
});

static CLANG_MISSING_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)fatal error:\s*'([^']+)'\s*file not found").expect("valid regex")
});

/// The `#include` line gcc echoes under the error.
static ECHOED_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*\d*\s*\|?\s*#[ \t]*include\s*[<"](\S+)[">]"#).expect("valid regex")
});

/// Extract the missing header name from preprocessor stderr.
pub fn missing_header(output: &str) -> Option<String> {
    [&*GCC_MISSING_HEADER, &*CLANG_MISSING_HEADER]
        .iter()
        .find_map(|re| re.captures(output))
        .map(|caps| caps[1].trim().to_string())
        .or_else(|| {
            if output.contains("fatal error") {
                ECHOED_INCLUDE
                    .captures(output)
                    .map(|caps| caps[1].trim().to_string())
            } else {
                None
            }
        })
}
