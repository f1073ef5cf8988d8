//! Error types for persistence operations.

use std::fmt;

/// Errors that can occur while reading or writing index files.
#[derive(Debug)]
pub enum PersistenceError {
    /// I/O error (file operations, disk I/O).
    Io(std::io::Error),

    /// Format error (invalid magic bytes, version mismatch, corruption).
    Format {
        message: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    /// Serialization error (postcard).
    Serialization(String),

    /// Deserialization error (postcard).
    Deserialization(String),

    /// Checksum mismatch (data corruption detected in the `.bsc` bundle).
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Resource not found (file, directory entry, etc.).
    NotFound(String),

    /// Invalid configuration passed to a persistence operation.
    InvalidConfig(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Format {
                message,
                expected,
                actual,
            } => {
                write!(f, "format error: {}", message)?;
                if let Some(e) = expected {
                    write!(f, " (expected: {})", e)?;
                }
                if let Some(a) = actual {
                    write!(f, " (actual: {})", a)?;
                }
                Ok(())
            }
            Self::Serialization(msg) => write!(f, "serialization error: {}", msg),
            Self::Deserialization(msg) => write!(f, "deserialization error: {}", msg),
            Self::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch: expected {}, got {}", expected, actual)
            }
            Self::NotFound(resource) => write!(f, "resource not found: {}", resource),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(feature = "persistence")]
impl From<postcard::Error> for PersistenceError {
    fn from(e: postcard::Error) -> Self {
        Self::Serialization(format!("postcard error: {}", e))
    }
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;
