//! # Saros - eclipse catalog lookups
//!
//! Saros answers "which eclipse happens at or after / before this instant"
//! and "where does this Saros series stand around this instant" against a
//! precomputed, read-only catalog of solar and lunar eclipses.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`storage`] - Byte-level access to artifacts (memory, mmap, seekable file)
//! - [`catalog`] - Artifact layout, record decoding, sorted index, series table
//! - [`query`] - Query engine and its single-slot interval cache
//! - [`utils`] - App data directory and JSON config
//! - [`output`] - Terminal / JSON rendering (with the `cli` feature)
//!
//! ## Quick Start
//!
//! ```no_run
//! use saros::catalog::Slice;
//! use saros::query::Eclipses;
//! use saros::storage::Backend;
//! use std::path::Path;
//!
//! let mut eclipses = Eclipses::open(Path::new("/data/saros"), Slice::Modern, Backend::Mapped)?;
//!
//! let result = eclipses.solar.find_next(1_712_600_000)?;
//! if let Some(event) = result.eclipse {
//!     println!("{} saros {} #{}", event.timestamp, event.saros_number(), event.saros_pos());
//! }
//! # Ok::<(), saros::Error>(())
//! ```
//!
//! ## Embedded images
//!
//! [`catalog::Catalog::from_static`] builds a catalog directly over
//! `&'static [u8]` images (for example `include_bytes!`), with the same
//! query results as the hosted backends.

pub mod catalog;
pub mod error;
#[cfg(feature = "cli")]
pub mod output;
pub mod query;
pub mod storage;
pub mod utils;

pub use error::{Error, Result};
