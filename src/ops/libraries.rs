//! Implementation of `sketchport libs`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::core::catalog::{library_folders, LibraryCatalog};
use crate::core::library::Library;
use crate::core::platform::PlatformContext;
use crate::resolver::{resolve_library, ImportedSet};
use crate::util::fs::relative_path;

/// Catalog every library visible to a build.
pub fn list_libraries(configured: &[PathBuf], platforms: &PlatformContext) -> Result<LibraryCatalog> {
    let folders = library_folders(configured, platforms);
    LibraryCatalog::load(&folders)
}

/// How a header would be resolved on an empty sketch.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderReport {
    pub header: String,
    /// The chosen library, if any provides the header
    pub library: Option<LibrarySummary>,
    pub from_platform: bool,
    pub not_used: Vec<LibrarySummary>,
}

/// Short description of a library for reports.
#[derive(Debug, Clone, Serialize)]
pub struct LibrarySummary {
    pub name: String,
    pub version: String,
    pub folder: PathBuf,
    pub architectures: String,
    pub legacy: bool,
}

impl LibrarySummary {
    pub fn new(library: &Library) -> Self {
        LibrarySummary {
            name: library.name.clone(),
            version: library.version.clone(),
            folder: library.folder.clone(),
            architectures: library.architectures.to_string(),
            legacy: library.legacy,
        }
    }

    /// One-line description, with the folder relative to `base`.
    pub fn describe(&self, base: &Path) -> String {
        let version = if self.legacy {
            "legacy".to_string()
        } else {
            self.version.clone()
        };
        format!(
            "{} ({}) [{}] {}",
            self.name,
            version,
            self.architectures,
            relative_path(base, &self.folder).display()
        )
    }
}

/// Resolve `header` against the catalog.
pub fn resolve_header(
    header: &str,
    configured: &[PathBuf],
    platforms: &PlatformContext,
) -> Result<HeaderReport> {
    let catalog = list_libraries(configured, platforms)?;
    let index = catalog.header_index()?;
    let resolution = resolve_library(
        header,
        index.candidates(header),
        &ImportedSet::new(),
        platforms,
    );

    Ok(match resolution {
        Some(resolution) => HeaderReport {
            header: header.to_string(),
            library: Some(LibrarySummary::new(&resolution.library)),
            from_platform: resolution.from_platform,
            not_used: resolution
                .not_used
                .iter()
                .map(|l| LibrarySummary::new(l))
                .collect(),
        },
        None => HeaderReport {
            header: header.to_string(),
            library: None,
            from_platform: false,
            not_used: Vec::new(),
        },
    })
}
