//! High-level operations.
//!
//! This module contains the implementation of sketchport commands.

pub mod libraries;
pub mod preprocess;

pub use libraries::{list_libraries, resolve_header, HeaderReport, LibrarySummary};
pub use preprocess::{
    default_build_path, preprocess, report_resolutions, PreprocessOptions, PreprocessResult,
};
