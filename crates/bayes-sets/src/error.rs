//! Error types for bayes-sets.

use std::fmt;

/// Errors that can occur while appending to or closing a raw index.
#[derive(Debug)]
pub enum BuildError {
    /// `add` was called after `close`.
    AddAfterClose,
    /// I/O failure while writing a coordinate or label stream.
    Io(std::io::Error),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddAfterClose => write!(f, "add() called after close()"),
            Self::Io(e) => write!(f, "I/O error while building index: {}", e),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BuildError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Errors that can occur while loading a computed index from disk.
#[derive(Debug)]
pub enum LoadError {
    /// One of the four required files is missing.
    MissingFile(String),
    /// The `.xco` and `.yco` coordinate streams disagree in length.
    CoordLengthMismatch { xco: usize, yco: usize },
    /// `.ids` disagrees with the row count implied by the `.xco` stream.
    CountMismatch { ids: usize, rows: usize },
    /// `.yco` references a column index that `.fts` has no label for.
    ColumnCountMismatch { fts: usize, cols: usize },
    /// A line that should parse as a decimal integer did not.
    InvalidInteger { file: String, line: usize },
    /// The same external item id appears on two different lines of `.ids`.
    DuplicateId { item_id: i64, line: usize },
    /// `.fts` is empty but `.yco` is not, so column coordinates cannot be
    /// resolved to labels.
    EmptyFeaturesNonEmptyCoords,
    /// I/O failure while reading one of the four files.
    Io(std::io::Error),
    /// The optional binary cache bundle exists but failed a format or
    /// checksum check; not fatal on its own, the loader falls back to
    /// rebuilding from the text files, but is surfaced for diagnostics.
    CacheInvalid(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFile(path) => write!(f, "missing index file: {}", path),
            Self::CoordLengthMismatch { xco, yco } => write!(
                f,
                "coordinate length mismatch: .xco has {} entries but .yco has {}",
                xco, yco
            ),
            Self::CountMismatch { ids, rows } => write!(
                f,
                "row count mismatch: .ids has {} entries but coordinates imply {} rows",
                ids, rows
            ),
            Self::ColumnCountMismatch { fts, cols } => write!(
                f,
                "column count mismatch: .fts has {} entries but coordinates imply {} columns",
                fts, cols
            ),
            Self::InvalidInteger { file, line } => {
                write!(f, "invalid integer on {}:{}", file, line)
            }
            Self::DuplicateId { item_id, line } => {
                write!(f, "duplicate item id {} at .ids:{}", item_id, line)
            }
            Self::EmptyFeaturesNonEmptyCoords => {
                write!(f, ".fts is empty but .yco references feature columns")
            }
            Self::Io(e) => write!(f, "I/O error while loading index: {}", e),
            Self::CacheInvalid(reason) => write!(f, "cache bundle invalid: {}", reason),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Errors produced while validating a [`crate::config::Config`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `smoothing_c` must be strictly positive.
    InvalidSmoothingC(f64),
    /// An environment variable held a value that did not parse for its field.
    InvalidEnvValue { var: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSmoothingC(c) => write!(f, "smoothing_c must be > 0, got {}", c),
            Self::InvalidEnvValue { var, value } => {
                write!(f, "environment variable {} has invalid value {:?}", var, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level error type wrapping every subsystem's error for ergonomic `?`
/// propagation at API boundaries.
#[derive(Debug)]
pub enum BayesSetsError {
    Build(BuildError),
    Load(LoadError),
    Config(ConfigError),
}

impl fmt::Display for BayesSetsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build(e) => write!(f, "{}", e),
            Self::Load(e) => write!(f, "{}", e),
            Self::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for BayesSetsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Build(e) => Some(e),
            Self::Load(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<BuildError> for BayesSetsError {
    fn from(e: BuildError) -> Self {
        Self::Build(e)
    }
}

impl From<LoadError> for BayesSetsError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

impl From<ConfigError> for BayesSetsError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
