//! Disk persistence for bayes-sets indexes.
//!
//! An index's canonical representation is four newline-delimited text
//! files living side by side under a shared base name (`<base>.xco`,
//! `<base>.yco`, `<base>.ids`, `<base>.fts`). When the `persistence`
//! feature is enabled, loading also consults an optional `<base>.bsc`
//! binary cache bundle holding the already-built CSR matrix and
//! hyperparameters, so large indexes skip re-parsing and re-building on
//! every reload as long as the four text files are unchanged.
//!
//! Storage access goes through the [`Directory`] trait so the same loading
//! and saving code works against the local filesystem or an in-memory
//! directory in tests.

pub mod directory;
pub mod error;

#[cfg(feature = "persistence")]
pub mod format;

pub use directory::{Directory, FsDirectory, MemoryDirectory};
pub use error::PersistenceError;

/// The four text file extensions that make up an index, in a fixed order
/// used throughout loading, saving, and staleness checks.
pub const TEXT_EXTENSIONS: [&str; 4] = ["xco", "yco", "ids", "fts"];

/// The optional binary cache bundle's extension.
pub const CACHE_EXTENSION: &str = "bsc";

/// Build the file name for `base_name` with extension `ext` (e.g.
/// `"catalog"`, `"xco"` -> `"catalog.xco"`).
pub fn file_name(base_name: &str, ext: &str) -> String {
    format!("{}.{}", base_name, ext)
}
