//! Saros series table
//!
//! One fixed-size record per series number in the catalog's range:
//!
//! ```text
//! offset 0   u8       member count
//! offset 1   u8       pad
//! offset 2   [u16;96] global indices, chronological; only `count` are meaningful
//! ```

use super::kind::EclipseKind;
use super::reader::Catalog;
use super::types::*;
use crate::error::Result;
use crate::storage::ByteSource;

/// Members of one series, as global indices in chronological order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesMembers {
    pub saros_number: u8,
    count: u8,
    indices: [GlobalIndex; SERIES_CAPACITY],
}

impl SeriesMembers {
    /// Series with no members
    pub fn empty(saros_number: u8) -> Self {
        Self {
            saros_number,
            count: 0,
            indices: [0; SERIES_CAPACITY],
        }
    }

    /// Meaningful member indices; the filler tail is never exposed
    pub fn members(&self) -> &[GlobalIndex] {
        &self.indices[..self.count as usize]
    }

    pub fn get(&self, pos: usize) -> Option<GlobalIndex> {
        self.members().get(pos).copied()
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Members immediately before and after `pos`
    pub fn neighbors(&self, pos: u8) -> (Option<GlobalIndex>, Option<GlobalIndex>) {
        let pos = pos as usize;
        let prev = pos.checked_sub(1).and_then(|p| self.get(p));
        let next = self.get(pos + 1);
        (prev, next)
    }
}

impl<K: EclipseKind, S: ByteSource> Catalog<K, S> {
    /// True when the series table has a record for `saros_number`
    pub fn contains_series(&self, saros_number: u8) -> bool {
        self.series_range().contains(&saros_number)
    }

    /// Members of `saros_number`, empty when the series is outside the table
    pub fn load_series(&self, saros_number: u8) -> Result<SeriesMembers> {
        if !self.contains_series(saros_number) {
            return Ok(SeriesMembers::empty(saros_number));
        }

        let first = *self.series_range().start();
        let base = u64::from(saros_number - first) * SERIES_RECORD_SIZE as u64;
        let src = self.series_source();

        // A corrupt count must not walk into the next record
        let count = src.read_u8(base)?.min(SERIES_CAPACITY as u8);

        let mut series = SeriesMembers::empty(saros_number);
        series.count = count;
        if count > 0 {
            let mut raw = [0u8; SERIES_CAPACITY * 2];
            let raw = &mut raw[..count as usize * 2];
            src.read_exact_at(base + 2, raw)?;
            for (slot, pair) in series.indices.iter_mut().zip(raw.chunks_exact(2)) {
                *slot = u16::from_le_bytes([pair[0], pair[1]]);
            }
        }

        Ok(series)
    }

    /// Global indices of the members around `saros_pos` in `saros_number`
    pub fn neighbors(
        &self,
        saros_number: u8,
        saros_pos: u8,
    ) -> Result<(Option<GlobalIndex>, Option<GlobalIndex>)> {
        Ok(self.load_series(saros_number)?.neighbors(saros_pos))
    }

    /// First member position whose timestamp is `>= key`, or `len` if none
    pub(crate) fn series_lower_bound(&self, series: &SeriesMembers, key: Timestamp) -> Result<usize> {
        let members = series.members();
        let mut lo = 0usize;
        let mut hi = members.len();

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.time_at(u32::from(members[mid]))? < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        Ok(lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::kind::Solar;
    use crate::storage::MemorySource;

    fn record(members: &[u16], filler: u16) -> Vec<u8> {
        let mut rec = vec![members.len() as u8, 0];
        for i in 0..SERIES_CAPACITY {
            let v = members.get(i).copied().unwrap_or(filler);
            rec.extend_from_slice(&v.to_le_bytes());
        }
        rec
    }

    fn catalog(records: &[Vec<u8>], first: u8, events: usize) -> Catalog<Solar, MemorySource<Vec<u8>>> {
        let times: Vec<u8> = (0..events as i64).flat_map(|t| (t * 100).to_le_bytes()).collect();
        let last = first + records.len() as u8 - 1;
        Catalog::from_sources(
            MemorySource::new(times),
            MemorySource::new(vec![0u8; events * INFO_SIZE]),
            MemorySource::new(records.concat()),
            first..=last,
        )
        .unwrap()
    }

    #[test]
    fn test_load_series_ignores_filler() {
        let cat = catalog(&[record(&[0, 2], 0xBEEF), record(&[1], 0xFFFF)], 10, 3);

        let s10 = cat.load_series(10).unwrap();
        assert_eq!(s10.members(), &[0, 2]);
        assert_eq!(cat.load_series(11).unwrap().members(), &[1]);
        assert_eq!(s10.get(2), None);
    }

    #[test]
    fn test_out_of_range_series_is_empty() {
        let cat = catalog(&[record(&[0], 0)], 10, 1);
        assert!(cat.load_series(9).unwrap().is_empty());
        assert!(cat.load_series(11).unwrap().is_empty());
        assert!(cat.load_series(0).unwrap().is_empty());
        assert!(!cat.contains_series(180));
    }

    #[test]
    fn test_neighbors_at_ends() {
        let cat = catalog(&[record(&[0, 1, 2], 7)], 5, 3);

        assert_eq!(cat.neighbors(5, 0).unwrap(), (None, Some(1)));
        assert_eq!(cat.neighbors(5, 1).unwrap(), (Some(0), Some(2)));
        assert_eq!(cat.neighbors(5, 2).unwrap(), (Some(1), None));
        // Position beyond the member list never reaches the filler
        assert_eq!(cat.neighbors(5, 3).unwrap(), (Some(2), None));
        assert_eq!(cat.neighbors(5, 10).unwrap(), (None, None));
    }

    #[test]
    fn test_single_member_series() {
        let cat = catalog(&[record(&[0], 0)], 5, 1);
        assert_eq!(cat.neighbors(5, 0).unwrap(), (None, None));
    }

    #[test]
    fn test_corrupt_count_is_clamped() {
        let mut rec = record(&[0; SERIES_CAPACITY], 0);
        rec[0] = 200;
        let cat = catalog(&[rec], 1, 1);
        assert_eq!(cat.load_series(1).unwrap().len(), SERIES_CAPACITY);
    }

    #[test]
    fn test_series_lower_bound() {
        // Event times are 0, 100, 200, 300; series holds 0, 200, 300
        let cat = catalog(&[record(&[0, 2, 3], 0)], 1, 4);
        let series = cat.load_series(1).unwrap();

        assert_eq!(cat.series_lower_bound(&series, -5).unwrap(), 0);
        assert_eq!(cat.series_lower_bound(&series, 0).unwrap(), 0);
        assert_eq!(cat.series_lower_bound(&series, 1).unwrap(), 1);
        assert_eq!(cat.series_lower_bound(&series, 200).unwrap(), 1);
        assert_eq!(cat.series_lower_bound(&series, 250).unwrap(), 2);
        assert_eq!(cat.series_lower_bound(&series, 301).unwrap(), 3);
    }
}
