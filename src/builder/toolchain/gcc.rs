//! GCC/Clang preprocessor driver.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::{missing_header, CommandSpec, DiscoveryOutcome, Preprocessor};

/// Runs `g++ -E` (or a cross compiler with the same interface).
#[derive(Debug, Clone)]
pub struct GccPreprocessor {
    cxx: PathBuf,
    flags: Vec<String>,
}

impl GccPreprocessor {
    /// Create a preprocessor for the given C++ compiler and extra flags.
    ///
    /// Dependency-file flags (`-MMD`) are dropped: preprocessing must not
    /// leave `.d` files behind.
    pub fn new(cxx: impl Into<PathBuf>, flags: impl IntoIterator<Item = String>) -> Self {
        GccPreprocessor {
            cxx: cxx.into(),
            flags: flags.into_iter().filter(|f| f != "-MMD").collect(),
        }
    }

    /// Base `-E` command for `source`.
    pub fn command(&self, source: &Path, include_dirs: &[PathBuf], quiet: bool) -> CommandSpec {
        // The missing-header patterns only match untranslated diagnostics.
        let mut cmd = CommandSpec::new(&self.cxx)
            .env("LC_ALL", "C")
            .args(self.flags.iter().cloned())
            .args(["-E", "-CC", "-x", "c++"]);

        if quiet {
            cmd = cmd.arg("-w");
        }

        for dir in include_dirs {
            cmd = cmd.arg(format!("-I{}", dir.display()));
        }

        cmd.arg(source.display().to_string())
    }
}

impl Preprocessor for GccPreprocessor {
    fn discover(&self, source: &Path, include_dirs: &[PathBuf]) -> Result<DiscoveryOutcome> {
        let sink = tempfile::NamedTempFile::new()
            .context("failed to create preprocessor output file")?;

        let cmd = self
            .command(source, include_dirs, true)
            .arg("-o")
            .arg(sink.path().display().to_string());

        tracing::debug!("{}", cmd.to_process().display_command());
        let output = cmd.to_process().exec()?;

        if output.status.success() {
            return Ok(DiscoveryOutcome::Clean);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        Ok(match missing_header(&stderr) {
            Some(header) => DiscoveryOutcome::MissingHeader(header),
            None => DiscoveryOutcome::Failed(stderr),
        })
    }

    fn diagnose(&self, source: &Path, include_dirs: &[PathBuf]) -> Result<String> {
        let sink = tempfile::NamedTempFile::new()
            .context("failed to create preprocessor output file")?;

        let output = self
            .command(source, include_dirs, false)
            .arg("-o")
            .arg(sink.path().display().to_string())
            .to_process()
            .exec()?;

        Ok(String::from_utf8_lossy(&output.stderr).into_owned())
    }

    fn preprocess(&self, source: &Path, include_dirs: &[PathBuf]) -> Result<String> {
        let process = self.command(source, include_dirs, true).to_process();
        tracing::debug!("{}", process.display_command());

        let output = process.exec_and_check()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
