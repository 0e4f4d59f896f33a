//! Structural consistency checks over a loaded catalog
//!
//! Only the relationships the query engine relies on are checked: sorted
//! timestamps, in-range and chronological series members, and agreement
//! between each event's `(saros_number, saros_pos)` and the series table.

use super::kind::EclipseKind;
use super::reader::Catalog;
use super::types::*;
use crate::error::Result;
use crate::storage::ByteSource;
use serde::Serialize;
use std::fmt;

/// Seconds in a Julian year
pub const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// Default ceiling on the time between consecutive series members, about
/// one and a half Saros periods
pub const DEFAULT_MAX_GAP_YEARS: f64 = 27.0;

/// One structural problem
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum Issue {
    /// `timestamp[index] < timestamp[index - 1]`
    UnsortedTimes { index: u32 },
    /// Series record declares more members than it can hold
    CountOverCapacity { saros_number: u8, count: u8 },
    /// Series member points past the end of the catalog
    MemberOutOfRange { saros_number: u8, pos: u8, index: GlobalIndex },
    /// Series member is earlier than the one before it
    MembersOutOfOrder { saros_number: u8, pos: u8 },
    /// Event's own series fields disagree with the table that lists it
    PositionMismatch {
        index: GlobalIndex,
        listed_series: u8,
        listed_pos: u8,
        event_series: u8,
        event_pos: u8,
    },
    /// Event is not listed by any series record
    Unlisted { index: GlobalIndex },
    /// Consecutive members are further apart than the configured ceiling
    GapExceeded { saros_number: u8, pos: u8, years: f64 },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::UnsortedTimes { index } => {
                write!(f, "timestamp at index {} is earlier than its predecessor", index)
            }
            Issue::CountOverCapacity { saros_number, count } => write!(
                f,
                "saros {} declares {} members, capacity is {}",
                saros_number, count, SERIES_CAPACITY
            ),
            Issue::MemberOutOfRange { saros_number, pos, index } => write!(
                f,
                "saros {} member {} points at index {} past the catalog end",
                saros_number, pos, index
            ),
            Issue::MembersOutOfOrder { saros_number, pos } => write!(
                f,
                "saros {} member {} is earlier than member {}",
                saros_number,
                pos,
                pos.saturating_sub(1)
            ),
            Issue::PositionMismatch {
                index,
                listed_series,
                listed_pos,
                event_series,
                event_pos,
            } => write!(
                f,
                "event {} listed as saros {} #{} but records saros {} #{}",
                index, listed_series, listed_pos, event_series, event_pos
            ),
            Issue::Unlisted { index } => {
                write!(f, "event {} is not listed by any series", index)
            }
            Issue::GapExceeded { saros_number, pos, years } => write!(
                f,
                "saros {} members {} and {} are {:.1} years apart",
                saros_number,
                pos.saturating_sub(1),
                pos,
                years
            ),
        }
    }
}

/// Outcome of [`verify`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub events: usize,
    pub series_checked: usize,
    pub members_checked: usize,
    /// Largest time between consecutive members of any series, in years
    pub max_gap_years: f64,
    /// Series holding that largest gap
    pub max_gap_series: Option<u8>,
    pub issues: Vec<Issue>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check every structural relationship in `catalog`
///
/// Read failures are errors; anything inconsistent is collected as an issue.
pub fn verify<K: EclipseKind, S: ByteSource>(
    catalog: &Catalog<K, S>,
    max_gap_years: f64,
) -> Result<VerifyReport> {
    let len = catalog.len() as u32;
    let mut report = VerifyReport {
        events: catalog.len(),
        ..Default::default()
    };

    let mut times = Vec::with_capacity(catalog.len());
    for idx in 0..len {
        let t = catalog.time_at(idx)?;
        if times.last().is_some_and(|&prev| t < prev) {
            report.issues.push(Issue::UnsortedTimes { index: idx });
        }
        times.push(t);
    }

    let mut listed = vec![false; catalog.len()];

    for saros_number in catalog.series_range() {
        let raw_count = catalog.raw_series_count(saros_number)?;
        if raw_count as usize > SERIES_CAPACITY {
            report.issues.push(Issue::CountOverCapacity {
                saros_number,
                count: raw_count,
            });
        }

        let series = catalog.load_series(saros_number)?;
        report.series_checked += 1;

        let mut prev_time: Option<Timestamp> = None;
        for (pos, &index) in series.members().iter().enumerate() {
            let pos = pos as u8;
            report.members_checked += 1;

            if u32::from(index) >= len {
                report.issues.push(Issue::MemberOutOfRange {
                    saros_number,
                    pos,
                    index,
                });
                prev_time = None;
                continue;
            }
            listed[index as usize] = true;

            let t = times[index as usize];
            if let Some(prev) = prev_time {
                if t < prev {
                    report
                        .issues
                        .push(Issue::MembersOutOfOrder { saros_number, pos });
                }
                let years = t.abs_diff(prev) as f64 / SECONDS_PER_YEAR;
                if years > report.max_gap_years {
                    report.max_gap_years = years;
                    report.max_gap_series = Some(saros_number);
                }
                if years > max_gap_years {
                    report.issues.push(Issue::GapExceeded {
                        saros_number,
                        pos,
                        years,
                    });
                }
            }
            prev_time = Some(t);

            let info = catalog.info_at(u32::from(index))?;
            if info.saros_number() != saros_number || info.saros_pos() != pos {
                report.issues.push(Issue::PositionMismatch {
                    index,
                    listed_series: saros_number,
                    listed_pos: pos,
                    event_series: info.saros_number(),
                    event_pos: info.saros_pos(),
                });
            }
        }
    }

    for (idx, seen) in listed.iter().enumerate() {
        if !seen {
            report.issues.push(Issue::Unlisted {
                index: idx as GlobalIndex,
            });
        }
    }

    tracing::debug!(
        kind = %K::KIND,
        issues = report.issues.len(),
        max_gap_years = report.max_gap_years,
        "catalog verified"
    );

    Ok(report)
}

impl<K: EclipseKind, S: ByteSource> Catalog<K, S> {
    /// Member count byte as stored, before clamping to capacity
    fn raw_series_count(&self, saros_number: u8) -> Result<u8> {
        let first = *self.series_range().start();
        let base = u64::from(saros_number - first) * SERIES_RECORD_SIZE as u64;
        self.series_source().read_u8(base)
    }
}
