//! The library catalog and header index.
//!
//! The catalog is built once per run from every configured libraries
//! folder and never changes afterwards. Library folders are scanned in
//! parallel, but the resulting order is always folder order, then
//! alphabetical within a folder, so header candidates are deterministic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::core::library::{is_ignored_entry, Library};
use crate::core::platform::PlatformContext;
use crate::util::fs::normalize_path;

/// Every library available to a build.
#[derive(Debug, Clone, Default)]
pub struct LibraryCatalog {
    folders: Vec<PathBuf>,
    libraries: Vec<Arc<Library>>,
}

impl LibraryCatalog {
    /// Load all libraries found directly under each of `folders`.
    pub fn load(folders: &[PathBuf]) -> Result<Self> {
        let mut library_dirs = Vec::new();
        for folder in folders {
            library_dirs.extend(library_dirs_in(folder)?);
        }

        let libraries = library_dirs
            .par_iter()
            .map(|dir| Library::load(dir).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "loaded {} libraries from {} folders",
            libraries.len(),
            folders.len()
        );

        Ok(LibraryCatalog {
            folders: folders.to_vec(),
            libraries,
        })
    }

    pub fn libraries(&self) -> &[Arc<Library>] {
        &self.libraries
    }

    /// Folders the catalog was loaded from.
    pub fn folders(&self) -> &[PathBuf] {
        &self.folders
    }

    /// Find a library by folder name.
    pub fn find(&self, name: &str) -> Option<&Arc<Library>> {
        self.libraries.iter().find(|lib| lib.name == name)
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Index every library by the headers in its source folder.
    pub fn header_index(&self) -> Result<HeaderIndex> {
        let headers = self
            .libraries
            .par_iter()
            .map(|lib| {
                lib.headers()
                    .with_context(|| format!("failed to list headers of `{}`", lib.name))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut index = HeaderIndex::default();
        for (lib, names) in self.libraries.iter().zip(headers) {
            for name in names {
                index.insert(name, Arc::clone(lib));
            }
        }
        Ok(index)
    }
}

/// Library folders for a build, in catalog order.
///
/// The configured folders come first, then the `libraries` folder of the
/// target platform and of the core platform when they exist. Paths are
/// absolutized and duplicates dropped.
pub fn library_folders(configured: &[PathBuf], platforms: &PlatformContext) -> Vec<PathBuf> {
    let mut folders: Vec<PathBuf> = Vec::new();

    let mut push = |folder: PathBuf| {
        let folder = normalize_path(&folder);
        if !folders.contains(&folder) {
            folders.push(folder);
        }
    };

    for folder in configured {
        push(folder.clone());
    }

    for platform in [&platforms.target, &platforms.core] {
        let folder = platform.libraries_folder();
        if folder.is_dir() {
            push(folder);
        }
    }

    folders
}

fn library_dirs_in(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(folder)
        .with_context(|| format!("failed to read libraries folder: {}", folder.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() && !is_ignored_entry(&name) {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Header file name to the libraries exposing it.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    entries: HashMap<String, Vec<Arc<Library>>>,
}

impl HeaderIndex {
    /// Register `library` as a candidate for `header`.
    pub fn insert(&mut self, header: impl Into<String>, library: Arc<Library>) {
        self.entries.entry(header.into()).or_default().push(library);
    }

    /// Candidate libraries for a header, in catalog order.
    pub fn candidates(&self, header: &str) -> &[Arc<Library>] {
        self.entries.get(header).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
