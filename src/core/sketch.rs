//! Sketch loading, merging and filtering.
//!
//! A sketch is a folder whose main file shares the folder's name. Every
//! `.ino`/`.pde` file in the folder is concatenated into one C++
//! translation unit; `.c`/`.cpp`/`.h` files alongside are compiled as-is.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;

use crate::util::fs::{glob_files, read_to_string};

/// Extensions of the files merged into the sketch translation unit.
pub const MAIN_FILE_EXTENSIONS: &[&str] = &["ino", "pde"];

/// Extensions of sketch files compiled on their own.
pub const ADDITIONAL_FILE_EXTENSIONS: &[&str] = &["h", "c", "hpp", "cpp", "S"];

static ARDUINO_H_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*#\s*include\s*[<"]Arduino\.h[>"]"#).expect("valid regex")
});

/// gcc line marker: `# 12 "file.ino" 2`.
static LINE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^#\s*(?:line\s+)?\d+\s+"((?:[^"\\]|\\.)*)"(?:\s.*)?$"#).expect("valid regex")
});

/// One file belonging to a sketch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SketchFile {
    pub path: PathBuf,
    pub source: String,
}

impl SketchFile {
    fn load(path: PathBuf) -> Result<Self> {
        let source = read_to_string(&path)?;
        Ok(SketchFile { path, source })
    }
}

/// A loaded sketch.
#[derive(Debug, Clone)]
pub struct Sketch {
    pub folder: PathBuf,
    pub main_file: SketchFile,
    /// Other `.ino`/`.pde` files, sorted by path.
    pub other_files: Vec<SketchFile>,
    /// `.c`, `.cpp`, `.h` files in the folder and under `src/`.
    pub additional_files: Vec<SketchFile>,
}

/// The concatenated sketch source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedSource {
    pub source: String,
    /// Number of lines preceding line 1 of the main file.
    pub line_offset: usize,
}

impl Sketch {
    /// Load a sketch from its folder or its main file.
    pub fn load(path: &Path) -> Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("sketch not found: {}", path.display()))?;

        let (folder, main_path) = if path.is_dir() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let main = MAIN_FILE_EXTENSIONS
                .iter()
                .map(|ext| path.join(format!("{}.{}", name, ext)))
                .find(|p| p.is_file());
            match main {
                Some(main) => (path.clone(), main),
                None => bail!(
                    "no main sketch file found in {}: expected {}.ino",
                    path.display(),
                    name
                ),
            }
        } else {
            let folder = match path.parent() {
                Some(parent) => parent.to_path_buf(),
                None => bail!("sketch file has no parent folder: {}", path.display()),
            };
            (folder, path.clone())
        };

        if !has_extension(&main_path, MAIN_FILE_EXTENSIONS) {
            bail!(
                "unknown sketch file extension: {} (expected .ino or .pde)",
                main_path.display()
            );
        }

        let main_file = SketchFile::load(main_path.clone())?;

        let mut other_files = Vec::new();
        let mut additional_files = Vec::new();

        let patterns: Vec<String> = MAIN_FILE_EXTENSIONS
            .iter()
            .chain(ADDITIONAL_FILE_EXTENSIONS)
            .flat_map(|ext| [format!("*.{}", ext), format!("src/**/*.{}", ext)])
            .collect();

        for path in glob_files(&folder, &patterns)? {
            if path == main_path || is_hidden(&path) {
                continue;
            }
            let in_root = path.parent() == Some(folder.as_path());
            if in_root && has_extension(&path, MAIN_FILE_EXTENSIONS) {
                other_files.push(SketchFile::load(path)?);
            } else if has_extension(&path, ADDITIONAL_FILE_EXTENSIONS) {
                additional_files.push(SketchFile::load(path)?);
            }
        }

        Ok(Sketch {
            folder,
            main_file,
            other_files,
            additional_files,
        })
    }

    /// File name of the main sketch file, e.g. `Blink.ino`.
    pub fn name(&self) -> String {
        self.main_file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Files merged into the translation unit, main file first.
    pub fn merged_files(&self) -> impl Iterator<Item = &SketchFile> {
        std::iter::once(&self.main_file).chain(self.other_files.iter())
    }

    /// Concatenate the sketch into one source.
    ///
    /// Each file is preceded by a `#line 1` directive so diagnostics point
    /// back at the original file. `Arduino.h` is included first unless the
    /// main file already includes it.
    pub fn merge(&self) -> MergedSource {
        let mut source = String::new();
        let mut line_offset = 0;

        if !includes_arduino_h(&self.main_file.source) {
            source.push_str("#include <Arduino.h>\n");
            line_offset += 1;
        }

        for file in self.merged_files() {
            source.push_str(&line_directive(1, &file.path));
            source.push('\n');
            source.push_str(&file.source);
            source.push('\n');
        }
        line_offset += 1;

        MergedSource {
            source,
            line_offset,
        }
    }

    /// Keep only the preprocessed lines that belong to merged sketch files.
    ///
    /// Ownership of each line follows the most recent line marker.
    pub fn filter_source(&self, preprocessed: &str) -> String {
        let names: Vec<String> = self
            .merged_files()
            .map(|f| f.path.to_string_lossy().into_owned())
            .collect();

        let mut in_sketch = false;
        let mut result = String::new();
        for line in preprocessed.lines() {
            if let Some(file) = parse_line_marker(line) {
                in_sketch = names.iter().any(|n| *n == file);
            }
            if in_sketch {
                result.push_str(line);
                result.push('\n');
            }
        }
        result
    }
}

/// Whether the source already includes `Arduino.h`.
pub fn includes_arduino_h(source: &str) -> bool {
    ARDUINO_H_INCLUDE.is_match(source)
}

/// A `#line` directive naming `path`.
pub fn line_directive(line: usize, path: &Path) -> String {
    format!("#line {} \"{}\"", line, escape_cpp_string(&path.to_string_lossy()))
}

/// The file named by a preprocessor line marker, unescaped.
pub fn parse_line_marker(line: &str) -> Option<String> {
    let caps = LINE_MARKER.captures(line)?;
    Some(unescape_cpp_string(&caps[1]))
}

fn escape_cpp_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unescape_cpp_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.contains(&e))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}
