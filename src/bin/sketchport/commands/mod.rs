//! Command implementations

pub mod completions;
pub mod libs;
pub mod preprocess;
pub mod prototypes;

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::cli::PlatformArgs;
use sketchport::core::platform::{Platform, PlatformContext};
use sketchport::util::config::{global_config_path, load_config, project_config_path};
use sketchport::util::diagnostic::suggestions;
use sketchport::util::fs::normalize_path;
use sketchport::util::Config;

/// Configuration in effect for the current directory.
pub fn current_config() -> Result<Config> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let global = global_config_path();
    Ok(load_config(global.as_deref(), &project_config_path(&cwd)))
}

/// The platforms to build for: `--platform` wins over the config.
pub fn platforms(config: &Config, args: &PlatformArgs) -> Result<PlatformContext> {
    if let Some(folder) = &args.platform {
        if !folder.is_dir() {
            anyhow::bail!("platform folder {} does not exist", folder.display());
        }
        let folder = normalize_path(folder);
        let id = match &args.arch {
            Some(arch) => arch.clone(),
            None => folder
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        return Ok(PlatformContext::single(Platform::new(id, folder)));
    }

    let mut platforms = config
        .platforms()
        .ok_or_else(|| anyhow::anyhow!("no platform configured\n{}", suggestions::NO_PLATFORM))?;
    if let Some(arch) = &args.arch {
        platforms.target.id = arch.clone();
    }
    Ok(platforms)
}

/// Libraries folders: flags replace the configured list.
pub fn library_folders(config: &Config, flags: Vec<PathBuf>) -> Vec<PathBuf> {
    if flags.is_empty() {
        config.libraries.folders.clone()
    } else {
        flags
    }
}
