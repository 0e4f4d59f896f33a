//! Byte sources for catalog artifacts
//!
//! All multi-byte reads are little-endian. Range safety is the caller's
//! job (record size times record count); an out-of-range read still never
//! panics, it comes back as [`Error::Read`].

use crate::error::{Artifact, Error, Result};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

/// Random-access, read-only view of one artifact
pub trait ByteSource: Send + Sync {
    /// Total size in bytes
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` with the bytes starting at `offset`
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    fn read_u8(&self, offset: u64) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact_at(offset, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&self, offset: u64) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact_at(offset, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&self, offset: u64) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact_at(offset, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}

/// Zero-copy source over a contiguous buffer
///
/// `B` is whatever owns the bytes: `&'static [u8]` for an image linked into
/// the binary, `Vec<u8>` for a buffer read at startup, or [`Mmap`].
#[derive(Debug, Clone)]
pub struct MemorySource<B> {
    bytes: B,
}

impl<B: AsRef<[u8]>> MemorySource<B> {
    pub fn new(bytes: B) -> Self {
        Self { bytes }
    }

    /// The whole underlying buffer
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_ref()
    }

    #[inline]
    fn window(&self, offset: u64, width: usize) -> Result<&[u8]> {
        let bytes = self.bytes.as_ref();
        usize::try_from(offset)
            .ok()
            .and_then(|start| start.checked_add(width).map(|end| (start, end)))
            .and_then(|(start, end)| bytes.get(start..end))
            .ok_or_else(|| Error::short_read(offset, width))
    }
}

impl<B: AsRef<[u8]> + Send + Sync> ByteSource for MemorySource<B> {
    fn len(&self) -> u64 {
        self.bytes.as_ref().len() as u64
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        buf.copy_from_slice(self.window(offset, buf.len())?);
        Ok(())
    }

    #[inline]
    fn read_u8(&self, offset: u64) -> Result<u8> {
        Ok(self.window(offset, 1)?[0])
    }

    #[inline]
    fn read_u16(&self, offset: u64) -> Result<u16> {
        let b = self.window(offset, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    #[inline]
    fn read_u32(&self, offset: u64) -> Result<u32> {
        let b = self.window(offset, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Seekable-file source: every read is a seek followed by a read
///
/// The handle sits behind a mutex so a shared catalog can be queried from
/// several threads; each read holds the lock for one seek + read pair.
#[derive(Debug)]
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    /// Open an artifact for positioned reads
    pub fn open(path: &Path, artifact: Artifact) -> Result<Self> {
        let unavailable = |source| Error::Unavailable {
            artifact,
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(unavailable)?;
        let len = file.metadata().map_err(unavailable)?.len();
        Ok(Self::from_file(file, len))
    }

    pub fn from_file(file: File, len: u64) -> Self {
        Self {
            file: Mutex::new(file),
            len,
        }
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let width = buf.len();
        let read_err = |source| Error::Read {
            offset,
            width,
            source,
        };

        // A poisoned lock only means another reader panicked mid-read; the
        // next seek repositions the handle anyway.
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.seek(SeekFrom::Start(offset)).map_err(read_err)?;
        file.read_exact(buf).map_err(read_err)
    }
}

/// How a hosted catalog reaches its artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Memory-map all three artifacts, zero-copy reads
    #[default]
    Mapped,
    /// Timestamps read into memory, info and series read per access
    File,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Mapped => "mapped",
            Backend::File => "file",
        }
    }
}

/// Backend chosen at runtime
#[derive(Debug)]
pub enum Source {
    /// Image linked into the program (flash / ROM on embedded targets)
    Static(MemorySource<&'static [u8]>),
    /// Buffer read into memory at load time
    Owned(MemorySource<Vec<u8>>),
    /// Memory-mapped artifact file
    Mapped(MemorySource<Mmap>),
    /// Per-read seek + read against an open file
    File(FileSource),
}

impl Source {
    /// Memory-map an artifact file
    pub fn map(path: &Path, artifact: Artifact) -> Result<Self> {
        let unavailable = |source| Error::Unavailable {
            artifact,
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(unavailable)?;
        let len = file.metadata().map_err(unavailable)?.len();

        // Empty artifacts are legal (zero events); skip mapping them
        if len == 0 {
            return Ok(Source::Owned(MemorySource::new(Vec::new())));
        }

        let mmap = unsafe { Mmap::map(&file) }.map_err(unavailable)?;
        Ok(Source::Mapped(MemorySource::new(mmap)))
    }

    /// Read an artifact fully into memory
    pub fn read(path: &Path, artifact: Artifact) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| Error::Unavailable {
            artifact,
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Source::Owned(MemorySource::new(bytes)))
    }

    /// Open an artifact for per-read file access
    pub fn file(path: &Path, artifact: Artifact) -> Result<Self> {
        Ok(Source::File(FileSource::open(path, artifact)?))
    }

    pub fn from_static(bytes: &'static [u8]) -> Self {
        Source::Static(MemorySource::new(bytes))
    }

    /// True when reads go through system calls and may fail
    pub fn is_file_backed(&self) -> bool {
        matches!(self, Source::File(_))
    }
}

impl ByteSource for Source {
    fn len(&self) -> u64 {
        match self {
            Source::Static(s) => s.len(),
            Source::Owned(s) => s.len(),
            Source::Mapped(s) => s.len(),
            Source::File(s) => s.len(),
        }
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        match self {
            Source::Static(s) => s.read_exact_at(offset, buf),
            Source::Owned(s) => s.read_exact_at(offset, buf),
            Source::Mapped(s) => s.read_exact_at(offset, buf),
            Source::File(s) => s.read_exact_at(offset, buf),
        }
    }

    fn read_u8(&self, offset: u64) -> Result<u8> {
        match self {
            Source::Static(s) => s.read_u8(offset),
            Source::Owned(s) => s.read_u8(offset),
            Source::Mapped(s) => s.read_u8(offset),
            Source::File(s) => s.read_u8(offset),
        }
    }

    fn read_u16(&self, offset: u64) -> Result<u16> {
        match self {
            Source::Static(s) => s.read_u16(offset),
            Source::Owned(s) => s.read_u16(offset),
            Source::Mapped(s) => s.read_u16(offset),
            Source::File(s) => s.read_u16(offset),
        }
    }

    fn read_u32(&self, offset: u64) -> Result<u32> {
        match self {
            Source::Static(s) => s.read_u32(offset),
            Source::Owned(s) => s.read_u32(offset),
            Source::Mapped(s) => s.read_u32(offset),
            Source::File(s) => s.read_u32(offset),
        }
    }
}
