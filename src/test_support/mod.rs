//! Test doubles for sketchport unit tests.
//!
//! The external tools (the C++ preprocessor and ctags) are replaced by
//! in-process fakes that read real files from a temporary directory, so
//! the discovery loop and the preprocessing pipeline can be tested
//! without a toolchain installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use sketchport::test_support::{FakePreprocessor, LibraryFixture};
//!
//! #[test]
//! fn test_example() {
//!     let tmp = tempfile::TempDir::new().unwrap();
//!     LibraryFixture::new("Servo").header("Servo.h").create(tmp.path());
//!
//!     let pp = FakePreprocessor::new();
//!     // Run discovery against `pp`...
//! }
//! ```

pub mod fixtures;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};

use anyhow::{Context, Result};
use regex::Regex;

use crate::builder::toolchain::{DiscoveryOutcome, Preprocessor, TagLister};
use crate::util::fs::normalize_path;

pub use fixtures::*;

static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*#\s*include\s*[<"]([^>"]+)[>"]"#).expect("valid regex")
});

/// A preprocessor that follows `#include` lines through real files.
///
/// A header is found next to the including file or in one of the include
/// directories. The first header that cannot be found is reported the
/// way gcc reports it.
#[derive(Debug, Default)]
pub struct FakePreprocessor {
    failures: HashMap<PathBuf, String>,
    calls: Mutex<HashMap<PathBuf, usize>>,
}

impl FakePreprocessor {
    pub fn new() -> Self {
        FakePreprocessor::default()
    }

    /// Make `source` fail with `output` instead of being scanned.
    pub fn fail_on(mut self, source: &Path, output: impl Into<String>) -> Self {
        self.failures.insert(normalize_path(source), output.into());
        self
    }

    /// How many times `discover` ran on `source`.
    pub fn discover_calls(&self, source: &Path) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.get(&normalize_path(source)).copied().unwrap_or(0)
    }

    fn first_missing(&self, source: &Path, include_dirs: &[PathBuf]) -> Result<Option<String>> {
        let mut visited = HashSet::new();
        let mut stack = vec![source.to_path_buf()];

        while let Some(file) = stack.pop() {
            if !visited.insert(normalize_path(&file)) {
                continue;
            }
            let text = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;

            let mut found = Vec::new();
            for caps in INCLUDE.captures_iter(&text) {
                let header = &caps[1];
                let local = file.parent().map(|dir| dir.join(header));
                let hit = local
                    .into_iter()
                    .chain(include_dirs.iter().map(|dir| dir.join(header)))
                    .find(|candidate| candidate.is_file());

                match hit {
                    Some(path) => found.push(path),
                    None => return Ok(Some(header.to_string())),
                }
            }

            // Depth first, in include order.
            stack.extend(found.into_iter().rev());
        }

        Ok(None)
    }
}

impl Preprocessor for FakePreprocessor {
    fn discover(&self, source: &Path, include_dirs: &[PathBuf]) -> Result<DiscoveryOutcome> {
        let key = normalize_path(source);
        *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;

        if let Some(output) = self.failures.get(&key) {
            return Ok(DiscoveryOutcome::Failed(output.clone()));
        }

        Ok(match self.first_missing(source, include_dirs)? {
            Some(header) => DiscoveryOutcome::MissingHeader(header),
            None => DiscoveryOutcome::Clean,
        })
    }

    fn diagnose(&self, source: &Path, include_dirs: &[PathBuf]) -> Result<String> {
        Ok(match self.first_missing(source, include_dirs)? {
            Some(header) => format!(
                "{}:1:10: fatal error: {}: No such file or directory\n\
                 #include <{}>\n\
                 compilation terminated.\n",
                source.display(),
                header,
                header
            ),
            None => String::new(),
        })
    }

    fn preprocess(&self, source: &Path, _include_dirs: &[PathBuf]) -> Result<String> {
        let text = fs::read_to_string(source)
            .with_context(|| format!("failed to read {}", source.display()))?;
        Ok(format!("# 1 \"{}\"\n{}", source.display(), text))
    }
}

/// A tag lister that returns canned ctags output and remembers what it
/// was asked to list.
#[derive(Debug, Default)]
pub struct FakeTagLister {
    output: String,
    listed: Mutex<Vec<PathBuf>>,
}

impl FakeTagLister {
    pub fn new(output: impl Into<String>) -> Self {
        FakeTagLister {
            output: output.into(),
            listed: Mutex::new(Vec::new()),
        }
    }

    pub fn listed(&self) -> Vec<PathBuf> {
        self.listed.lock().unwrap().clone()
    }
}

impl TagLister for FakeTagLister {
    fn list(&self, source: &Path) -> Result<String> {
        self.listed.lock().unwrap().push(source.to_path_buf());
        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fake_preprocessor_follows_includes() {
        let tmp = TempDir::new().unwrap();
        let inc = tmp.path().join("inc");
        fs::create_dir_all(&inc).unwrap();
        fs::write(inc.join("a.h"), "#include \"b.h\"\n").unwrap();
        fs::write(inc.join("b.h"), "#include <c.h>\n").unwrap();
        let main = tmp.path().join("main.cpp");
        fs::write(&main, "#include <a.h>\n").unwrap();

        let pp = FakePreprocessor::new();
        assert_eq!(
            pp.discover(&main, &[]).unwrap(),
            DiscoveryOutcome::MissingHeader("a.h".to_string())
        );
        assert_eq!(
            pp.discover(&main, &[inc.clone()]).unwrap(),
            DiscoveryOutcome::MissingHeader("c.h".to_string())
        );
        assert_eq!(pp.discover_calls(&main), 2);

        let diag = pp.diagnose(&main, &[inc]).unwrap();
        assert!(diag.contains("fatal error: c.h: No such file or directory"));
    }
}
