//! Fixture generators for library folders and ctags output.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::library::Library;

/// Builder for a library folder on disk.
#[derive(Debug, Clone)]
pub struct LibraryFixture {
    /// Folder name.
    pub name: String,
    /// `library.properties` content; `None` makes a legacy library.
    pub properties: Option<String>,
    /// Whether sources go under `src/`.
    pub recursive: bool,
    /// Files relative to the source folder.
    pub files: Vec<(PathBuf, String)>,
}

impl LibraryFixture {
    /// A current-format library with every mandatory property.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let properties = format!(
            "name={name}\n\
             version=1.0.0\n\
             author=Test Author\n\
             maintainer=Test Author <test@example.com>\n\
             sentence={name} for tests.\n\
             category=Other\n\
             architectures=*\n"
        );

        LibraryFixture {
            name,
            properties: Some(properties),
            recursive: false,
            files: Vec::new(),
        }
    }

    /// A library without `library.properties`.
    pub fn legacy(name: impl Into<String>) -> Self {
        LibraryFixture {
            properties: None,
            ..LibraryFixture::new(name)
        }
    }

    /// Replace the properties file content.
    pub fn properties(mut self, text: impl Into<String>) -> Self {
        self.properties = Some(text.into());
        self
    }

    /// Use the recursive `src/` layout.
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// Add an empty header.
    pub fn header(self, name: &str) -> Self {
        self.header_with(name, "")
    }

    pub fn header_with(mut self, name: &str, content: &str) -> Self {
        self.files.push((PathBuf::from(name), content.to_string()));
        self
    }

    /// Add a source file; `path` may contain subfolders.
    pub fn source(mut self, path: &str, content: &str) -> Self {
        self.files.push((PathBuf::from(path), content.to_string()));
        self
    }

    /// Write the library under `parent` and return its folder.
    pub fn create(&self, parent: &Path) -> PathBuf {
        let root = parent.join(&self.name);
        let src = if self.recursive {
            root.join("src")
        } else {
            root.clone()
        };
        fs::create_dir_all(&src).unwrap();

        if let Some(properties) = &self.properties {
            fs::write(root.join("library.properties"), properties).unwrap();
        }

        for (path, content) in &self.files {
            let path = src.join(path);
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).unwrap();
            }
            fs::write(path, content).unwrap();
        }

        root
    }
}

/// A legacy library record at `path`, without touching the filesystem.
pub fn library_at(path: &str) -> Arc<Library> {
    Arc::new(Library::legacy(Path::new(path)))
}

/// One ctags record in the `--fields=KSTtzns` format.
pub fn tag_line(name: &str, file: &str, kind: &str, line: usize, extra: &[&str], code: &str) -> String {
    let mut fields = vec![
        name.to_string(),
        file.to_string(),
        format!("/^{}$/;\"", code),
        format!("kind:{}", kind),
        format!("line:{}", line),
    ];
    fields.extend(extra.iter().map(|f| f.to_string()));
    fields.join("\t")
}
