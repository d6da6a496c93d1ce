//! Core data structures for sketchport.
//!
//! This module contains the types everything else builds on:
//! - Libraries and their `library.properties` metadata
//! - The library catalog and header index
//! - Hardware platforms
//! - Sketches and the merged sketch source

pub mod catalog;
pub mod library;
pub mod platform;
pub mod properties;
pub mod sketch;

pub use catalog::{library_folders, HeaderIndex, LibraryCatalog};
pub use library::{Architectures, Library, LibraryDefect, LibraryError, LibraryLayout};
pub use platform::{Platform, PlatformContext};
pub use properties::Properties;
pub use sketch::{MergedSource, Sketch, SketchFile};
