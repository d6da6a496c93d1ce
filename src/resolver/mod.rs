//! Header to library resolution.
//!
//! Given a missing header and the libraries that provide it, pick one.
//! Selection is pure: it reads the catalog and the imported set and never
//! touches the filesystem.

pub mod errors;
pub mod imported;
pub mod select;

pub use errors::ResolveError;
pub use imported::{ImportedSet, Resolution};
pub use select::{best_library_with_header, resolve_library, select_library};
