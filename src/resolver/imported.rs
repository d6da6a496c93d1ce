//! Libraries imported into a sketch build.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::library::Library;

/// How a header was mapped to a library.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub library: Arc<Library>,
    /// Whether the library is bundled with one of the build's platforms.
    pub from_platform: bool,
    /// Candidates that also provided the header but were passed over.
    pub not_used: Vec<Arc<Library>>,
}

/// The growing set of libraries a sketch uses.
///
/// Libraries are never removed and never appear twice; identity is the
/// source folder.
#[derive(Debug, Clone, Default)]
pub struct ImportedSet {
    libraries: Vec<Arc<Library>>,
    resolutions: BTreeMap<String, Resolution>,
}

impl ImportedSet {
    pub fn new() -> Self {
        ImportedSet::default()
    }

    /// Whether `library` has been imported.
    pub fn contains(&self, library: &Library) -> bool {
        self.libraries.iter().any(|l| l.same_as(library))
    }

    /// An imported library with the given folder name.
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<Library>> {
        self.libraries.iter().find(|l| l.name == name)
    }

    /// Import a library. Returns `false` if it was already imported.
    pub fn insert(&mut self, library: Arc<Library>) -> bool {
        if self.contains(&library) {
            return false;
        }
        self.libraries.push(library);
        true
    }

    /// Remember how `header` was resolved.
    pub fn record(&mut self, header: impl Into<String>, resolution: Resolution) {
        self.resolutions.insert(header.into(), resolution);
    }

    pub fn resolution(&self, header: &str) -> Option<&Resolution> {
        self.resolutions.get(header)
    }

    /// All recorded resolutions, ordered by header name.
    pub fn resolutions(&self) -> impl Iterator<Item = (&str, &Resolution)> {
        self.resolutions.iter().map(|(h, r)| (h.as_str(), r))
    }

    /// Imported libraries in import order.
    pub fn libraries(&self) -> &[Arc<Library>] {
        &self.libraries
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}
