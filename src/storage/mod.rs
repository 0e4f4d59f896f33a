//! Byte-level access to catalog artifacts.
//!
//! Everything above this layer reads the catalog through [`ByteSource`],
//! so the decoder, the binary search and the series index are written once
//! and behave identically over every medium:
//!
//! - [`MemorySource`] - zero-copy over a contiguous buffer: a `&'static`
//!   ROM/flash image, an owned `Vec<u8>`, or a memory-mapped file
//! - [`FileSource`] - a seekable file, one seek + read per access
//! - [`Source`] - runtime-selected variant of the above, for when the
//!   backend comes from configuration

pub mod source;

pub use source::{Backend, ByteSource, FileSource, MemorySource, Source};
