//! `sketchport prototypes` command
//!
//! Runs the tag pipeline on a saved ctags listing, which is handy for
//! checking why a function did or did not get a prototype.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::PrototypesArgs;
use sketchport::ctags::prototypes_from_tags;
use sketchport::util::fs::read_to_string;

pub fn execute(args: PrototypesArgs) -> Result<()> {
    let raw = if args.tags_file == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read tags from stdin")?;
        raw
    } else {
        read_to_string(&args.tags_file)?
    };

    let (prototypes, line) = prototypes_from_tags(&raw, args.main_file.as_deref());

    for prototype in &prototypes {
        println!("{}", prototype);
    }
    match line {
        Some(line) => println!("// insert before line {}", line),
        None => println!("// no insertion point"),
    }

    Ok(())
}
