//! `sketchport preprocess` command

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::cli::{PlatformArgs, PreprocessArgs};
use crate::commands::{current_config, library_folders, platforms};
use sketchport::builder::{CtagsRunner, GccPreprocessor};
use sketchport::ops::{default_build_path, preprocess, PreprocessOptions};
use sketchport::util::diagnostic::suggestions;
use sketchport::util::process::{find_ctags, find_cxx};

pub fn execute(args: PreprocessArgs, platform: &PlatformArgs) -> Result<()> {
    if !args.sketch.exists() {
        anyhow::bail!("sketch {} does not exist", args.sketch.display());
    }

    let config = current_config()?;
    let platforms = platforms(&config, platform)?;

    let folders = library_folders(&config, args.libraries);
    if folders.is_empty() {
        tracing::debug!("{}", suggestions::NO_LIBRARY_FOLDERS);
    }

    let mut include_dirs = config.platform.include_dirs.clone();
    include_dirs.extend(args.include);

    let cxx = args
        .cxx
        .or_else(|| config.toolchain.cxx.clone())
        .or_else(find_cxx)
        .context("no C++ compiler found; install g++ or pass `--cxx <PATH>`")?;
    let ctags = args
        .ctags
        .or_else(|| config.toolchain.ctags.clone())
        .or_else(find_ctags)
        .context("no ctags found; install universal-ctags or pass `--ctags <PATH>`")?;
    tracing::debug!("using compiler {} and ctags {}", cxx.display(), ctags.display());

    let build_path: PathBuf = args
        .build_path
        .or_else(|| config.build.path.clone())
        .unwrap_or_else(|| default_build_path(&args.sketch));

    let opts = PreprocessOptions {
        sketch: args.sketch,
        build_path,
        library_folders: folders,
        include_dirs,
        platforms,
    };

    let preprocessor = GccPreprocessor::new(cxx, config.toolchain.cxxflags.clone());
    let tag_lister = CtagsRunner::new(ctags);
    let result = preprocess(&opts, &preprocessor, &tag_lister)?;

    if args.stdout {
        print!("{}", result.source);
    } else {
        println!("{}", result.output.display());
    }

    Ok(())
}
