//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Sketchport - sketch preprocessing and library resolution
#[derive(Parser)]
#[command(name = "sketchport")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(flatten)]
    pub platform: PlatformArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Platform selection shared by every command.
#[derive(Args, Clone, Default)]
pub struct PlatformArgs {
    /// Hardware platform folder (overrides `platform.core`)
    #[arg(long, global = true, value_name = "DIR")]
    pub platform: Option<PathBuf>,

    /// Architecture identifier of the platform (defaults to the folder name)
    #[arg(long, global = true, value_name = "ID")]
    pub arch: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Preprocess a sketch into a single C++ file
    Preprocess(PreprocessArgs),

    /// Inspect installed libraries
    Libs(LibsArgs),

    /// Generate prototypes from a saved ctags listing
    Prototypes(PrototypesArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct PreprocessArgs {
    /// Sketch folder or main sketch file
    pub sketch: PathBuf,

    /// Build folder (defaults to `<sketch>/build`)
    #[arg(long)]
    pub build_path: Option<PathBuf>,

    /// Libraries folder, highest priority first (repeatable)
    #[arg(long = "libraries", value_name = "DIR")]
    pub libraries: Vec<PathBuf>,

    /// Core or variant include directory (repeatable)
    #[arg(long = "include", short = 'I', value_name = "DIR")]
    pub include: Vec<PathBuf>,

    /// C++ compiler used as preprocessor
    #[arg(long, env = "CXX")]
    pub cxx: Option<PathBuf>,

    /// ctags executable
    #[arg(long, env = "CTAGS")]
    pub ctags: Option<PathBuf>,

    /// Print the patched source instead of the output path
    #[arg(long)]
    pub stdout: bool,
}

#[derive(Args)]
pub struct LibsArgs {
    #[command(subcommand)]
    pub command: LibsCommands,
}

#[derive(Subcommand)]
pub enum LibsCommands {
    /// List every library visible to the platform
    List(LibsListArgs),

    /// Show which library provides a header
    Resolve(LibsResolveArgs),
}

#[derive(Args)]
pub struct LibsListArgs {
    /// Libraries folder, highest priority first (repeatable)
    #[arg(long = "libraries", value_name = "DIR")]
    pub libraries: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct LibsResolveArgs {
    /// Header file name, e.g. `Servo.h`
    pub header: String,

    /// Libraries folder, highest priority first (repeatable)
    #[arg(long = "libraries", value_name = "DIR")]
    pub libraries: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct PrototypesArgs {
    /// File holding ctags output (`-` for stdin)
    pub tags_file: PathBuf,

    /// Only functions of this file decide the insertion line
    #[arg(long)]
    pub main_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
