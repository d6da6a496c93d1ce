//! Exuberant/Universal ctags driver.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{CommandSpec, TagLister};

/// Flags producing the record format the tag parser expects.
pub const CTAGS_FLAGS: &[&str] = &[
    "-u",
    "--language-force=c++",
    "-f",
    "-",
    "--c++-kinds=svpf",
    "--fields=KSTtzns",
    "--line-directives",
];

/// Runs ctags on a single file and captures its stdout.
#[derive(Debug, Clone)]
pub struct CtagsRunner {
    ctags: PathBuf,
}

impl CtagsRunner {
    pub fn new(ctags: impl Into<PathBuf>) -> Self {
        CtagsRunner {
            ctags: ctags.into(),
        }
    }

    pub fn command(&self, source: &Path) -> CommandSpec {
        CommandSpec::new(&self.ctags)
            .args(CTAGS_FLAGS.iter().copied())
            .arg(source.display().to_string())
    }
}

impl TagLister for CtagsRunner {
    fn list(&self, source: &Path) -> Result<String> {
        let process = self.command(source).to_process();
        tracing::debug!("{}", process.display_command());

        let output = process.exec_and_check()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
