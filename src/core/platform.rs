//! Hardware platforms a sketch is built for.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::fs::normalize_path;

/// Folder under a platform that holds its bundled libraries.
pub const PLATFORM_LIBRARIES_FOLDER: &str = "libraries";

/// An installed hardware platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Architecture id, matched against library `architectures` (e.g. `avr`).
    pub id: String,
    /// Root folder of the platform installation.
    pub folder: PathBuf,
}

impl Platform {
    pub fn new(id: impl Into<String>, folder: impl Into<PathBuf>) -> Self {
        Platform {
            id: id.into(),
            folder: folder.into(),
        }
    }

    /// Folder holding libraries bundled with the platform.
    pub fn libraries_folder(&self) -> PathBuf {
        self.folder.join(PLATFORM_LIBRARIES_FOLDER)
    }

    /// The same platform with its folder made absolute and free of
    /// symlinks, so it compares equal to catalogued library folders.
    pub fn normalized(self) -> Self {
        Platform {
            folder: normalize_path(&self.folder),
            ..self
        }
    }

    /// Whether `path` lies inside this platform's folder.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.folder)
    }
}

/// The platforms participating in a build.
///
/// The core platform supplies the Arduino core; the target platform is the
/// one the selected board belongs to. They differ when a board reuses the
/// core of another vendor's platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformContext {
    pub core: Platform,
    pub target: Platform,
}

impl PlatformContext {
    /// Platform folders are normalized like library folders are.
    pub fn new(core: Platform, target: Platform) -> Self {
        PlatformContext {
            core: core.normalized(),
            target: target.normalized(),
        }
    }

    /// A build where core and target are the same platform.
    pub fn single(platform: Platform) -> Self {
        let platform = platform.normalized();
        PlatformContext {
            core: platform.clone(),
            target: platform,
        }
    }

    /// Platforms in selection priority order: core first, then target.
    pub fn by_priority(&self) -> [&Platform; 2] {
        [&self.core, &self.target]
    }

    /// Architecture id of the target platform.
    pub fn target_id(&self) -> &str {
        &self.target.id
    }

    /// Whether `path` lies inside any participating platform.
    pub fn contains(&self, path: &Path) -> bool {
        self.by_priority().iter().any(|p| p.contains(path))
    }
}
