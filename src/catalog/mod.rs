//! Eclipse catalog: on-disk layout, decoding, and the series table
//!
//! A catalog of one kind (solar or lunar) is three index-aligned artifacts:
//!
//! 1. **Timestamps** - `i64` seconds, sorted non-decreasing
//! 2. **Info** - one 10-byte record per event
//! 3. **Series** - one 194-byte record per Saros number in range, listing
//!    member indices in chronological order
//!
//! The catalog never changes after it is opened.

pub mod decode;
pub mod kind;
pub mod reader;
pub mod series;
pub mod stats;
pub mod types;
pub mod verify;
pub mod writer;

pub use kind::{EclipseKind, Lunar, Solar};
pub use reader::{ArtifactPaths, Catalog, MAX_EVENTS};
pub use series::SeriesMembers;
pub use stats::CatalogStats;
pub use types::*;
pub use verify::{Issue, VerifyReport, verify};
pub use writer::{CatalogImage, CatalogWriter};
