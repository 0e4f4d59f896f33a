//! Fixed-width record codecs
//!
//! Timestamp record (8 bytes): low 32 bits then high 32 bits, both
//! little-endian, reassembled as a signed 64-bit value.
//!
//! Info record (10 bytes, little-endian):
//!
//! | bytes | solar            | lunar          |
//! |-------|------------------|----------------|
//! | 0-1   | i16 latitude×10  | u16 penumbral  |
//! | 2-3   | i16 longitude×10 | u16 partial    |
//! | 4-5   | u16 central dur. | u16 total      |
//! | 6     | u8 saros number  | u8 saros number|
//! | 7     | u8 saros pos     | u8 saros pos   |
//! | 8     | u8 type code     | u8 type code   |
//! | 9     | u8 sun altitude  | u8 reserved    |
//!
//! Decoding is total: any 10 bytes produce a record.

use super::types::{EventInfo, INFO_SIZE, LunarInfo, SolarInfo, TIME_SIZE, Timestamp};

#[inline]
fn le_u16(b: &[u8; INFO_SIZE], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

/// Decode one timestamp record
#[inline]
pub fn decode_time(buf: &[u8; TIME_SIZE]) -> Timestamp {
    let lo = u64::from(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]));
    let hi = u64::from(u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]));
    (lo | (hi << 32)) as i64
}

/// Encode one timestamp record
pub fn encode_time(ts: Timestamp) -> [u8; TIME_SIZE] {
    ts.to_le_bytes()
}

pub fn decode_solar_info(b: &[u8; INFO_SIZE]) -> SolarInfo {
    SolarInfo {
        latitude_deg10: le_u16(b, 0) as i16,
        longitude_deg10: le_u16(b, 2) as i16,
        central_duration: le_u16(b, 4),
        saros_number: b[6],
        saros_pos: b[7],
        type_code: b[8],
        sun_alt: b[9],
    }
}

pub fn decode_lunar_info(b: &[u8; INFO_SIZE]) -> LunarInfo {
    LunarInfo {
        pen_duration: le_u16(b, 0),
        par_duration: le_u16(b, 2),
        total_duration: le_u16(b, 4),
        saros_number: b[6],
        saros_pos: b[7],
        type_code: b[8],
        reserved: b[9],
    }
}

pub fn encode_solar_info(info: &SolarInfo) -> [u8; INFO_SIZE] {
    let mut b = [0u8; INFO_SIZE];
    b[0..2].copy_from_slice(&info.latitude_deg10.to_le_bytes());
    b[2..4].copy_from_slice(&info.longitude_deg10.to_le_bytes());
    b[4..6].copy_from_slice(&info.central_duration.to_le_bytes());
    b[6] = info.saros_number;
    b[7] = info.saros_pos;
    b[8] = info.type_code;
    b[9] = info.sun_alt;
    b
}

pub fn encode_lunar_info(info: &LunarInfo) -> [u8; INFO_SIZE] {
    let mut b = [0u8; INFO_SIZE];
    b[0..2].copy_from_slice(&info.pen_duration.to_le_bytes());
    b[2..4].copy_from_slice(&info.par_duration.to_le_bytes());
    b[4..6].copy_from_slice(&info.total_duration.to_le_bytes());
    b[6] = info.saros_number;
    b[7] = info.saros_pos;
    b[8] = info.type_code;
    b[9] = info.reserved;
    b
}

/// Encode an info record of either kind
pub fn encode_info(info: &EventInfo) -> [u8; INFO_SIZE] {
    match info {
        EventInfo::Solar(s) => encode_solar_info(s),
        EventInfo::Lunar(l) => encode_lunar_info(l),
    }
}
