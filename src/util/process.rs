//! Running the external preprocessing tools.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{bail, Context, Result};

/// Builder for one tool invocation.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl ProcessBuilder {
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string_lossy().into_owned()));
        self
    }

    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env.insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Run to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit is not an error here: the preprocessor's failure
    /// output is exactly what include discovery inspects.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        cmd.output()
            .with_context(|| format!("failed to run `{}`", self.program.display()))
    }

    /// Run and fail unless the tool exits successfully.
    pub fn exec_and_check(&self) -> Result<Output> {
        let output = self.exec()?;
        if !output.status.success() {
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                self.display_command(),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(output)
    }

    pub fn display_command(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// The C++ compiler used as preprocessor: `$CXX`, then common names.
pub fn find_cxx() -> Option<PathBuf> {
    find_tool("CXX", &["g++", "c++", "clang++"])
}

/// The ctags binary: `$CTAGS`, then common names.
pub fn find_ctags() -> Option<PathBuf> {
    find_tool("CTAGS", &["ctags", "universal-ctags", "exuberant-ctags"])
}

fn find_tool(env_var: &str, candidates: &[&str]) -> Option<PathBuf> {
    if let Ok(name) = std::env::var(env_var) {
        if let Some(path) = find_executable(&name) {
            return Some(path);
        }
    }
    candidates.iter().find_map(|name| find_executable(name))
}
