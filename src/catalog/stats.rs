use super::kind::EclipseKind;
use super::reader::Catalog;
use super::types::*;
use crate::error::Result;
use crate::storage::ByteSource;
use serde::Serialize;
use std::collections::BTreeMap;

/// Summary of one loaded catalog
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub kind: Kind,
    pub events: usize,
    pub first_timestamp: Option<Timestamp>,
    pub last_timestamp: Option<Timestamp>,
    pub series_first: u8,
    pub series_last: u8,
    /// Series in range with at least one member
    pub series_populated: usize,
    /// Largest series and its member count
    pub largest_series: Option<(u8, usize)>,
    /// Events per type label, most frequent first
    pub types: Vec<(String, usize)>,
    /// Total artifact size in bytes
    pub bytes: u64,
}

impl<K: EclipseKind, S: ByteSource> Catalog<K, S> {
    /// Walk the catalog once and summarise it
    pub fn stats(&self) -> Result<CatalogStats> {
        let span = self.time_span()?;

        let mut types: BTreeMap<&'static str, usize> = BTreeMap::new();
        for idx in 0..self.len() as u32 {
            *types.entry(self.info_at(idx)?.type_abbrev()).or_insert(0) += 1;
        }
        let mut types: Vec<(String, usize)> = types
            .into_iter()
            .map(|(label, n)| (label.to_string(), n))
            .collect();
        types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut populated = 0;
        let mut largest: Option<(u8, usize)> = None;
        for saros in self.series_range() {
            let n = self.load_series(saros)?.len();
            if n > 0 {
                populated += 1;
            }
            if n > largest.map_or(0, |(_, m)| m) {
                largest = Some((saros, n));
            }
        }

        let range = self.series_range();
        Ok(CatalogStats {
            kind: K::KIND,
            events: self.len(),
            first_timestamp: span.map(|(first, _)| first),
            last_timestamp: span.map(|(_, last)| last),
            series_first: *range.start(),
            series_last: *range.end(),
            series_populated: populated,
            largest_series: largest,
            types,
            bytes: self.artifact_bytes(),
        })
    }
}
