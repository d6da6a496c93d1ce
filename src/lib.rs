//! sketchport - sketch preprocessing and library resolution
//!
//! This crate turns an Arduino-style sketch into a single C++ translation
//! unit: it discovers the libraries the sketch needs by asking the
//! compiler which headers are missing, and it adds the function
//! prototypes the sketch never declared.

pub mod builder;
pub mod core;
pub mod ctags;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test doubles and fixtures for unit tests.
///
/// Only compiled for tests. Provides fake preprocessor and ctags
/// collaborators and builders for on-disk library folders.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{Library, LibraryCatalog, Sketch};
pub use builder::{discover_includes, patch_source, ResolutionSession};
pub use resolver::{select_library, ResolveError};
