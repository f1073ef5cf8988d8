//! On-disk format for the optional `.bsc` binary cache bundle.
//!
//! The canonical representation of an index is the four newline-delimited
//! text files (`.xco`, `.yco`, `.ids`, `.fts`); `.bsc` is a private,
//! best-effort cache of the CSR matrix and hyperparameters derived from
//! them, so reloading a large index does not repeat coordinate-stream
//! parsing and CSR construction. The bundle is:
//!
//! ```text
//! magic:    4 bytes, b"BSC1"
//! version:  u32 little-endian
//! payload:  postcard-encoded serialization of the cached fields
//! checksum: u32 little-endian CRC32 (crc32fast) over magic+version+payload
//! ```
//!
//! The checksum wraps the whole framed bundle rather than just the payload,
//! so it is computed and verified by the caller around [`write_bundle`] and
//! [`read_bundle`] rather than inside them (postcard's own `use-crc` feature
//! only covers its payload, not a caller-supplied header).
//!
//! Staleness is keyed by the byte length and modification time of each of
//! the four text files, not by hashing their contents: hashing multi-GB
//! coordinate streams on every load would erase the cache's entire
//! performance benefit, and length+mtime is the same trade-off `make` and
//! most build caches make.

use crate::persistence::error::{PersistenceError, PersistenceResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

pub const MAGIC: [u8; 4] = *b"BSC1";
pub const FORMAT_VERSION: u32 = 1;

/// Length and modification time of one of the four source text files, used
/// to decide whether a `.bsc` bundle is still valid for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    pub len: u64,
    pub mtime_secs: u64,
}

impl FileStamp {
    pub fn of(path: &std::path::Path) -> PersistenceResult<Self> {
        let meta = std::fs::metadata(path)?;
        let mtime_secs = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(Self {
            len: meta.len(),
            mtime_secs,
        })
    }
}

/// Stamps for all four source files, in `xco, yco, ids, fts` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStamp {
    pub xco: FileStamp,
    pub yco: FileStamp,
    pub ids: FileStamp,
    pub fts: FileStamp,
}

/// Write `payload` (already postcard-encoded upstream) wrapped in the
/// magic/version header. Does not append the trailing checksum; callers
/// checksum the framed bytes this returns and append it themselves.
pub fn write_bundle<W: Write>(writer: &mut W, payload: &[u8]) -> PersistenceResult<()> {
    writer.write_all(&MAGIC)?;
    writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    writer.write_all(payload)?;
    Ok(())
}

/// Validate the header and return the payload slice.
pub fn read_bundle<R: Read>(reader: &mut R) -> PersistenceResult<Vec<u8>> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(PersistenceError::Format {
            message: "invalid cache bundle magic bytes".to_string(),
            expected: Some(format!("{:?}", MAGIC)),
            actual: Some(format!("{:?}", magic)),
        });
    }
    let version = reader.read_u32::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(PersistenceError::Format {
            message: "cache bundle format version mismatch".to_string(),
            expected: Some(FORMAT_VERSION.to_string()),
            actual: Some(version.to_string()),
        });
    }
    let mut payload = Vec::new();
    reader.read_to_end(&mut payload)?;
    Ok(payload)
}
