use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Position of an event in the time-sorted catalog of one kind
pub type GlobalIndex = u16;

/// Seconds since the Unix epoch (proleptic, negative before 1970)
pub type Timestamp = i64;

/// Size of one timestamp record in bytes
pub const TIME_SIZE: usize = 8;

/// Size of one packed info record in bytes
pub const INFO_SIZE: usize = 10;

/// Maximum members stored per series record
pub const SERIES_CAPACITY: usize = 96;

/// Size of one series record: count, pad, then `SERIES_CAPACITY` u16 indices
pub const SERIES_RECORD_SIZE: usize = 2 + 2 * SERIES_CAPACITY; // 194 bytes

/// Duration value meaning "not applicable"
pub const DURATION_NA: u16 = 0xFFFF;

/// Every Saros series number that can exist
pub const ALL_SERIES: RangeInclusive<u8> = 1..=180;

/// Series covered by the "modern" slice
pub const MODERN_SERIES: RangeInclusive<u8> = 110..=173;

/// Which catalog an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Solar,
    Lunar,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Solar => "solar",
            Kind::Lunar => "lunar",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which precomputed subset of series a catalog holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slice {
    #[default]
    Modern,
    All,
}

impl Slice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slice::Modern => "modern",
            Slice::All => "all",
        }
    }

    /// Series numbers the slice covers
    pub fn series_range(&self) -> RangeInclusive<u8> {
        match self {
            Slice::Modern => MODERN_SERIES,
            Slice::All => ALL_SERIES,
        }
    }
}

fn duration(raw: u16) -> Option<u16> {
    (raw != DURATION_NA).then_some(raw)
}

/// Decoded solar eclipse record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SolarInfo {
    /// Latitude of greatest eclipse, tenths of a degree
    pub latitude_deg10: i16,
    /// Longitude of greatest eclipse, tenths of a degree
    pub longitude_deg10: i16,
    /// Central duration in seconds, `DURATION_NA` when there is none
    pub central_duration: u16,
    pub saros_number: u8,
    pub saros_pos: u8,
    /// Raw type code; see [`SolarType`]
    pub type_code: u8,
    /// Sun altitude at greatest eclipse, degrees
    pub sun_alt: u8,
}

impl SolarInfo {
    pub fn latitude_deg(&self) -> f64 {
        f64::from(self.latitude_deg10) / 10.0
    }

    pub fn longitude_deg(&self) -> f64 {
        f64::from(self.longitude_deg10) / 10.0
    }

    pub fn central_duration_secs(&self) -> Option<u16> {
        duration(self.central_duration)
    }

    pub fn eclipse_type(&self) -> Option<SolarType> {
        SolarType::from_code(self.type_code)
    }
}

/// Decoded lunar eclipse record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LunarInfo {
    /// Penumbral phase duration in seconds
    pub pen_duration: u16,
    /// Partial phase duration in seconds
    pub par_duration: u16,
    /// Total phase duration in seconds
    pub total_duration: u16,
    pub saros_number: u8,
    pub saros_pos: u8,
    /// Raw type code; see [`LunarType`]
    pub type_code: u8,
    /// Trailing byte of the record, kept as found
    pub reserved: u8,
}

impl LunarInfo {
    pub fn penumbral_secs(&self) -> Option<u16> {
        duration(self.pen_duration)
    }

    pub fn partial_secs(&self) -> Option<u16> {
        duration(self.par_duration)
    }

    pub fn total_secs(&self) -> Option<u16> {
        duration(self.total_duration)
    }

    pub fn eclipse_type(&self) -> Option<LunarType> {
        LunarType::from_code(self.type_code)
    }
}

/// Per-kind event details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EventInfo {
    Solar(SolarInfo),
    Lunar(LunarInfo),
}

impl EventInfo {
    pub fn kind(&self) -> Kind {
        match self {
            EventInfo::Solar(_) => Kind::Solar,
            EventInfo::Lunar(_) => Kind::Lunar,
        }
    }

    pub fn saros_number(&self) -> u8 {
        match self {
            EventInfo::Solar(s) => s.saros_number,
            EventInfo::Lunar(l) => l.saros_number,
        }
    }

    pub fn saros_pos(&self) -> u8 {
        match self {
            EventInfo::Solar(s) => s.saros_pos,
            EventInfo::Lunar(l) => l.saros_pos,
        }
    }

    pub fn type_code(&self) -> u8 {
        match self {
            EventInfo::Solar(s) => s.type_code,
            EventInfo::Lunar(l) => l.type_code,
        }
    }

    /// Short type label, `"?"` for codes outside the known set
    pub fn type_abbrev(&self) -> &'static str {
        match self {
            EventInfo::Solar(s) => s.eclipse_type().map_or("?", |t| t.abbrev()),
            EventInfo::Lunar(l) => l.eclipse_type().map_or("?", |t| t.abbrev()),
        }
    }

    pub(crate) fn set_saros_pos(&mut self, pos: u8) {
        match self {
            EventInfo::Solar(s) => s.saros_pos = pos,
            EventInfo::Lunar(l) => l.saros_pos = pos,
        }
    }

    pub fn as_solar(&self) -> Option<&SolarInfo> {
        match self {
            EventInfo::Solar(s) => Some(s),
            EventInfo::Lunar(_) => None,
        }
    }

    pub fn as_lunar(&self) -> Option<&LunarInfo> {
        match self {
            EventInfo::Lunar(l) => Some(l),
            EventInfo::Solar(_) => None,
        }
    }
}

impl From<SolarInfo> for EventInfo {
    fn from(info: SolarInfo) -> Self {
        EventInfo::Solar(info)
    }
}

impl From<LunarInfo> for EventInfo {
    fn from(info: LunarInfo) -> Self {
        EventInfo::Lunar(info)
    }
}

/// One eclipse: when it happens, where it sits in the catalog, and its details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: Timestamp,
    pub global_index: GlobalIndex,
    pub info: EventInfo,
}

impl Event {
    pub fn saros_number(&self) -> u8 {
        self.info.saros_number()
    }

    pub fn saros_pos(&self) -> u8 {
        self.info.saros_pos()
    }
}

/// Answer to a next / past / closest query
///
/// `eclipse` is `None` when nothing exists in the requested direction;
/// the series neighbours are then `None` as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventResult {
    pub eclipse: Option<Event>,
    /// Previous member of the focal event's series
    pub saros_prev: Option<Event>,
    /// Next member of the focal event's series
    pub saros_next: Option<Event>,
}

impl EventResult {
    pub fn is_found(&self) -> bool {
        self.eclipse.is_some()
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        self.eclipse.map(|e| e.timestamp)
    }
}

/// Neighbouring members of one series around a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesWindow {
    pub saros_number: u8,
    /// Latest member strictly before the timestamp
    pub past: Option<Event>,
    /// Earliest member at or after the timestamp
    pub future: Option<Event>,
}

impl SeriesWindow {
    pub fn empty(saros_number: u8) -> Self {
        Self {
            saros_number,
            past: None,
            future: None,
        }
    }
}

/// Catalog description written next to the artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMeta {
    pub version: u32,
    pub kind: Kind,
    pub series_first: u8,
    pub series_last: u8,
    pub event_count: u32,
}

impl CatalogMeta {
    pub const VERSION: u32 = 1;
}

macro_rules! eclipse_types {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident = $code:literal, $abbrev:literal, $desc:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum $name {
            $($variant = $code,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn from_code(code: u8) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn code(self) -> u8 {
                self as u8
            }

            pub fn abbrev(self) -> &'static str {
                match self {
                    $($name::$variant => $abbrev,)+
                }
            }

            pub fn description(self) -> &'static str {
                match self {
                    $($name::$variant => $desc,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.abbrev())
            }
        }
    };
}

eclipse_types! {
    /// Solar eclipse classification codes
    SolarType {
        Annular = 0, "A", "annular";
        AnnularLong = 1, "A+", "annular, long annular phase";
        AnnularSubCentral = 2, "A-", "annular, path near the antumbra edge";
        AnnularShort = 3, "Am", "annular, brief annular phase";
        AnnularNonCentral = 4, "An", "annular, non-central";
        AnnularSaros = 5, "As", "annular, first or last of its series";
        Hybrid = 6, "H", "hybrid";
        Hybrid2 = 7, "H2", "hybrid, variant 2";
        Hybrid3 = 8, "H3", "hybrid, variant 3";
        HybridShort = 9, "Hm", "hybrid, brief hybrid phase";
        Partial = 10, "P", "partial";
        PartialBegin = 11, "Pb", "partial, first of its series";
        PartialEnd = 12, "Pe", "partial, last of its series";
        Total = 13, "T", "total";
        TotalLong = 14, "T+", "total, totality over ~5 minutes";
        TotalSubCentral = 15, "T-", "total, path near the umbra edge";
        TotalShort = 16, "Tm", "total, totality under ~1 minute";
        TotalNonCentral = 17, "Tn", "total, non-central";
        TotalSaros = 18, "Ts", "total, first or last of its series";
    }
}

eclipse_types! {
    /// Lunar eclipse classification codes
    LunarType {
        Penumbral = 0, "N", "penumbral";
        PenumbralBegin = 1, "Nb", "penumbral, first of its series";
        PenumbralEnd = 2, "Ne", "penumbral, last of its series";
        PenumbralNonCentral = 3, "Nx", "penumbral, misses the umbra";
        Partial = 4, "P", "partial";
        PartialBegin = 5, "Pb", "partial, first of its series";
        PartialEnd = 6, "Pe", "partial, last of its series";
        Total = 7, "T", "total";
        TotalLong = 8, "T+", "total, totality over ~100 minutes";
        TotalSubCentral = 9, "T-", "total, near the umbra edge";
        TotalShort = 10, "Tm", "total, totality under ~20 minutes";
        TotalNonCentral = 11, "Tn", "total, misses the shadow axis";
        TotalSaros = 12, "Ts", "total, first or last of its series";
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_record_size() {
        assert_eq!(SERIES_RECORD_SIZE, 194);
    }

    #[test]
    fn test_type_codes_are_dense() {
        for (i, t) in SolarType::ALL.iter().enumerate() {
            assert_eq!(t.code() as usize, i);
            assert_eq!(SolarType::from_code(i as u8), Some(*t));
        }
        for (i, t) in LunarType::ALL.iter().enumerate() {
            assert_eq!(t.code() as usize, i);
        }
        assert_eq!(SolarType::ALL.len(), 19);
        assert_eq!(LunarType::ALL.len(), 13);
    }

    #[test]
    fn test_unknown_type_code_is_preserved() {
        let info = EventInfo::Solar(SolarInfo {
            type_code: 200,
            ..Default::default()
        });
        assert_eq!(info.type_code(), 200);
        assert_eq!(info.type_abbrev(), "?");
        assert!(SolarType::from_code(19).is_none());
        assert!(LunarType::from_code(13).is_none());
    }

    #[test]
    fn test_duration_sentinel() {
        let solar = SolarInfo {
            central_duration: DURATION_NA,
            ..Default::default()
        };
        assert_eq!(solar.central_duration_secs(), None);

        let lunar = LunarInfo {
            pen_duration: 0,
            par_duration: 3600,
            total_duration: DURATION_NA,
            ..Default::default()
        };
        assert_eq!(lunar.penumbral_secs(), Some(0));
        assert_eq!(lunar.partial_secs(), Some(3600));
        assert_eq!(lunar.total_secs(), None);
    }

    #[test]
    fn test_coordinates_in_degrees() {
        let info = SolarInfo {
            latitude_deg10: 633,
            longitude_deg10: -1376,
            ..Default::default()
        };
        assert!((info.latitude_deg() - 63.3).abs() < 1e-9);
        assert!((info.longitude_deg() + 137.6).abs() < 1e-9);
    }

    #[test]
    fn test_slice_ranges() {
        assert_eq!(Slice::Modern.series_range(), 110..=173);
        assert_eq!(Slice::All.series_range(), 1..=180);
        assert_eq!(Slice::default(), Slice::Modern);
    }
}
