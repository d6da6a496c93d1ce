//! Sketchport CLI - preprocess sketches and resolve their libraries

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use sketchport::core::library::LibraryError;
use sketchport::resolver::ResolveError;
use sketchport::util::diagnostic::{emit, suggestions};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;
    let verbose = cli.verbose;

    if let Err(e) = run(cli) {
        report(&e, color, verbose);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("sketchport=debug")
    } else {
        EnvFilter::new("sketchport=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    match cli.command {
        Commands::Preprocess(args) => commands::preprocess::execute(args, &cli.platform),
        Commands::Libs(args) => commands::libs::execute(args, &cli.platform),
        Commands::Prototypes(args) => commands::prototypes::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print an error. Compiler output goes first, unmodified.
fn report(err: &anyhow::Error, color: bool, verbose: bool) {
    if let Some(resolve) = err.downcast_ref::<ResolveError>() {
        if let Some(output) = resolve.compiler_output() {
            eprint!("{}", output);
        }
        emit(&resolve.to_diagnostic(), color);
        if !verbose && matches!(resolve, ResolveError::Compiler { .. }) {
            eprintln!("{}", suggestions::PREPROCESS_FAILED);
        }
        return;
    }

    if let Some(library) = err.downcast_ref::<LibraryError>() {
        emit(&library.to_diagnostic(), color);
        return;
    }

    eprintln!("error: {:#}", err);
}
