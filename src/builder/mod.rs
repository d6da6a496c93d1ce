//! Sketch preprocessing machinery.
//!
//! This module drives the external tools, discovers the libraries a
//! sketch needs and patches prototypes into the merged source.

pub mod discovery;
pub mod patcher;
pub mod queue;
pub mod toolchain;

pub use discovery::{discover_includes, Discovery, ResolutionSession};
pub use patcher::patch_source;
pub use queue::SourceQueue;
pub use toolchain::{
    missing_header, CommandSpec, CtagsRunner, DiscoveryOutcome, GccPreprocessor, Preprocessor,
    TagLister,
};
