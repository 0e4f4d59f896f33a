//! Application data directory and JSON configuration.
//!
//! - [`app_data`] - XDG-style app data directory, `config.json` load/save

pub mod app_data;

pub use app_data::*;
