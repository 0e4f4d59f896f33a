//! Per-kind decoding strategies
//!
//! Solar and lunar catalogs share every algorithm and differ only in how a
//! 10-byte info record is read. [`Solar`] and [`Lunar`] are zero-sized
//! markers that pick the decoder at compile time.

use super::decode::{decode_lunar_info, decode_solar_info};
use super::types::{EventInfo, INFO_SIZE, Kind};

/// Decoding strategy for one catalog kind
pub trait EclipseKind: Copy + Default + Send + Sync + 'static {
    const KIND: Kind;

    fn decode_info(raw: &[u8; INFO_SIZE]) -> EventInfo;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Solar;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lunar;

impl EclipseKind for Solar {
    const KIND: Kind = Kind::Solar;

    #[inline]
    fn decode_info(raw: &[u8; INFO_SIZE]) -> EventInfo {
        EventInfo::Solar(decode_solar_info(raw))
    }
}

impl EclipseKind for Lunar {
    const KIND: Kind = Kind::Lunar;

    #[inline]
    fn decode_info(raw: &[u8; INFO_SIZE]) -> EventInfo {
        EventInfo::Lunar(decode_lunar_info(raw))
    }
}
