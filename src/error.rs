//! Error types for catalog loading and querying
//!
//! Two failure classes exist: an artifact that cannot be loaded (reported
//! once, when a catalog is opened) and a read that fails while answering a
//! single query (file-backed sources only). "No eclipse in that direction"
//! is not an error and never shows up here.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// One of the binary artifacts that make up a catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Times,
    Info,
    Series,
    Meta,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Artifact::Times => "timestamps",
            Artifact::Info => "event info",
            Artifact::Series => "saros series",
            Artifact::Meta => "catalog meta",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the catalog
#[derive(Error, Debug)]
pub enum Error {
    /// Artifact missing or unreadable
    #[error("{artifact} unavailable ({}): {source}", path.display())]
    Unavailable {
        artifact: Artifact,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Artifact size is not a whole number of records
    #[error("{artifact} size {len} is not a multiple of the {stride}-byte record")]
    Layout {
        artifact: Artifact,
        len: u64,
        stride: u64,
    },

    /// Artifact record count disagrees with the timestamps or series range
    #[error("{artifact} holds {found} records, expected {expected}")]
    CountMismatch {
        artifact: Artifact,
        expected: u64,
        found: u64,
    },

    /// More records than a 16-bit global index can address
    #[error("{artifact} holds {found} records, at most {max} are addressable")]
    TooLarge {
        artifact: Artifact,
        found: u64,
        max: u64,
    },

    /// Declared series range is empty or outside 1..=180
    #[error("invalid saros range {first}..={last}")]
    SeriesRange { first: u8, last: u8 },

    /// Seek or read failed while answering a query
    #[error("read of {width} bytes at offset {offset} failed: {source}")]
    Read {
        offset: u64,
        width: usize,
        #[source]
        source: io::Error,
    },

    /// Config or catalog meta file could not be parsed
    #[error("invalid {what}: {source}")]
    Config {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// True for load-time failures: the catalog must not serve queries
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Unavailable { .. }
                | Error::Layout { .. }
                | Error::CountMismatch { .. }
                | Error::TooLarge { .. }
                | Error::SeriesRange { .. }
                | Error::Config { .. }
        )
    }

    /// True for a per-query I/O failure
    pub fn is_read_failure(&self) -> bool {
        matches!(self, Error::Read { .. })
    }

    pub(crate) fn short_read(offset: u64, width: usize) -> Self {
        Error::Read {
            offset,
            width,
            source: io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of source"),
        }
    }
}
