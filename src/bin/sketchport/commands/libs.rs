//! `sketchport libs` command

use anyhow::{Context, Result};

use crate::cli::{LibsArgs, LibsCommands, LibsListArgs, LibsResolveArgs, PlatformArgs};
use crate::commands::{current_config, library_folders, platforms};
use sketchport::ops::{list_libraries, resolve_header, LibrarySummary};
use sketchport::util::diagnostic::suggestions;

pub fn execute(args: LibsArgs, platform: &PlatformArgs) -> Result<()> {
    match args.command {
        LibsCommands::List(args) => list(args, platform),
        LibsCommands::Resolve(args) => resolve(args, platform),
    }
}

fn list(args: LibsListArgs, platform: &PlatformArgs) -> Result<()> {
    let config = current_config()?;
    let platforms = platforms(&config, platform)?;
    let catalog = list_libraries(&library_folders(&config, args.libraries), &platforms)?;

    let summaries: Vec<LibrarySummary> = catalog
        .libraries()
        .iter()
        .map(|l| LibrarySummary::new(l))
        .collect();

    if args.json {
        let json = serde_json::to_string_pretty(&summaries)
            .context("failed to serialize library list")?;
        println!("{}", json);
        return Ok(());
    }

    if summaries.is_empty() {
        eprintln!("No libraries found.");
        eprintln!("{}", suggestions::NO_LIBRARY_FOLDERS);
        return Ok(());
    }

    let cwd = std::env::current_dir().context("failed to get current directory")?;
    for summary in &summaries {
        println!("{}", summary.describe(&cwd));
    }

    Ok(())
}

fn resolve(args: LibsResolveArgs, platform: &PlatformArgs) -> Result<()> {
    let config = current_config()?;
    let platforms = platforms(&config, platform)?;
    let report = resolve_header(
        &args.header,
        &library_folders(&config, args.libraries),
        &platforms,
    )?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("failed to serialize resolution")?;
        println!("{}", json);
        return Ok(());
    }

    let Some(library) = &report.library else {
        anyhow::bail!("no library provides `{}`", report.header);
    };

    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let origin = if report.from_platform { " (platform)" } else { "" };
    println!("{} -> {}{}", report.header, library.describe(&cwd), origin);
    for alternative in &report.not_used {
        println!("  not used: {}", alternative.describe(&cwd));
    }

    Ok(())
}
