//! Configuration file support.
//!
//! Two locations are read:
//! - Global: `~/.sketchport/config.toml` - user-wide defaults
//! - Project: `.sketchport/config.toml` - next to the sketch
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::platform::{Platform, PlatformContext};

/// Name of the config directory, both global and per project.
pub const CONFIG_DIR: &str = ".sketchport";

/// sketchport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub toolchain: ToolchainSettings,
    pub platform: PlatformSettings,
    pub libraries: LibrarySettings,
    pub build: BuildSettings,
}

/// External tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// C++ compiler used as preprocessor (e.g. `avr-g++`)
    pub cxx: Option<PathBuf>,

    /// ctags binary
    pub ctags: Option<PathBuf>,

    /// Flags passed to every preprocessor run (e.g. `-mmcu=atmega328p`)
    pub cxxflags: Vec<String>,
}

/// Hardware platforms the sketch is built for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    /// Platform providing the core
    pub core: Option<Platform>,

    /// Platform of the selected board; defaults to `core`
    pub target: Option<Platform>,

    /// Core and variant include directories
    pub include_dirs: Vec<PathBuf>,
}

/// Library discovery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Folders holding one library per subfolder, highest priority first
    pub folders: Vec<PathBuf>,
}

/// Output locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Build folder, relative to the sketch folder when not absolute
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.expand_home_folders();
        Ok(config)
    }

    /// Replace a leading `~` in every configured folder with the home
    /// directory.
    fn expand_home_folders(&mut self) {
        for folder in self
            .libraries
            .folders
            .iter_mut()
            .chain(self.platform.include_dirs.iter_mut())
            .chain(self.build.path.iter_mut())
        {
            *folder = expand_home(folder);
        }
        for platform in self.platform.core.iter_mut().chain(self.platform.target.iter_mut()) {
            platform.folder = expand_home(&platform.folder);
        }
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    ///
    /// Lists are replaced, not concatenated.
    pub fn merge(&mut self, other: Config) {
        if other.toolchain.cxx.is_some() {
            self.toolchain.cxx = other.toolchain.cxx;
        }
        if other.toolchain.ctags.is_some() {
            self.toolchain.ctags = other.toolchain.ctags;
        }
        if !other.toolchain.cxxflags.is_empty() {
            self.toolchain.cxxflags = other.toolchain.cxxflags;
        }

        if other.platform.core.is_some() {
            self.platform.core = other.platform.core;
        }
        if other.platform.target.is_some() {
            self.platform.target = other.platform.target;
        }
        if !other.platform.include_dirs.is_empty() {
            self.platform.include_dirs = other.platform.include_dirs;
        }

        if !other.libraries.folders.is_empty() {
            self.libraries.folders = other.libraries.folders;
        }

        if other.build.path.is_some() {
            self.build.path = other.build.path;
        }
    }

    /// The configured platforms, if a core platform is set.
    pub fn platforms(&self) -> Option<PlatformContext> {
        let core = self.platform.core.clone()?;
        let target = self.platform.target.clone().unwrap_or_else(|| core.clone());
        Some(PlatformContext::new(core, target))
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.sketchport/config.toml)
/// 2. Global config (~/.sketchport/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// `path` with a leading `~` component replaced by the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

/// Get the global config directory (~/.sketchport).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR))
}

/// Get the global config path (~/.sketchport/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (`<root>/.sketchport/config.toml`).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join("config.toml")
}
