use super::decode::decode_time;
use super::kind::EclipseKind;
use super::types::*;
use crate::error::{Artifact, Error, Result};
use crate::storage::{Backend, ByteSource, MemorySource, Source};
use std::fs::File;
use std::marker::PhantomData;
use std::ops::{Range, RangeInclusive};
use std::path::{Path, PathBuf};

/// Most events a catalog can hold: global indices are 16-bit
pub const MAX_EVENTS: u64 = u16::MAX as u64 + 1;

/// On-disk locations of one catalog's artifacts
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub times: PathBuf,
    pub info: PathBuf,
    pub series: PathBuf,
    pub meta: PathBuf,
}

impl ArtifactPaths {
    /// `<data_dir>/<kind>/{eclipse_times,eclipse_info,saros,meta}_<slice>.*`
    pub fn new(data_dir: &Path, kind: Kind, slice: Slice) -> Self {
        let dir = data_dir.join(kind.as_str());
        let s = slice.as_str();
        Self {
            times: dir.join(format!("eclipse_times_{}.bin", s)),
            info: dir.join(format!("eclipse_info_{}.bin", s)),
            series: dir.join(format!("saros_{}.bin", s)),
            meta: dir.join(format!("meta_{}.json", s)),
        }
    }
}

/// Read-only eclipse catalog of one kind
///
/// Three index-aligned artifacts: sorted timestamps, packed info records,
/// and the per-series member table covering `series_first..=series_last`.
/// Sizes are checked once at construction; queries trust them afterwards.
pub struct Catalog<K, S> {
    times: S,
    info: S,
    series: S,
    len: u32,
    series_first: u8,
    series_last: u8,
    _kind: PhantomData<K>,
}

impl<K: EclipseKind, S: ByteSource> Catalog<K, S> {
    /// Assemble a catalog from three sources, validating their sizes
    pub fn from_sources(
        times: S,
        info: S,
        series: S,
        series_range: RangeInclusive<u8>,
    ) -> Result<Self> {
        let (first, last) = (*series_range.start(), *series_range.end());
        if first == 0 || first > last || last > *ALL_SERIES.end() {
            return Err(Error::SeriesRange { first, last });
        }

        let times_len = times.len();
        if times_len % TIME_SIZE as u64 != 0 {
            return Err(Error::Layout {
                artifact: Artifact::Times,
                len: times_len,
                stride: TIME_SIZE as u64,
            });
        }
        let count = times_len / TIME_SIZE as u64;
        if count > MAX_EVENTS {
            return Err(Error::TooLarge {
                artifact: Artifact::Times,
                found: count,
                max: MAX_EVENTS,
            });
        }

        let info_len = info.len();
        if info_len % INFO_SIZE as u64 != 0 {
            return Err(Error::Layout {
                artifact: Artifact::Info,
                len: info_len,
                stride: INFO_SIZE as u64,
            });
        }
        if info_len / INFO_SIZE as u64 != count {
            return Err(Error::CountMismatch {
                artifact: Artifact::Info,
                expected: count,
                found: info_len / INFO_SIZE as u64,
            });
        }

        let series_len = series.len();
        if series_len % SERIES_RECORD_SIZE as u64 != 0 {
            return Err(Error::Layout {
                artifact: Artifact::Series,
                len: series_len,
                stride: SERIES_RECORD_SIZE as u64,
            });
        }
        let series_count = u64::from(last - first) + 1;
        if series_len / SERIES_RECORD_SIZE as u64 != series_count {
            return Err(Error::CountMismatch {
                artifact: Artifact::Series,
                expected: series_count,
                found: series_len / SERIES_RECORD_SIZE as u64,
            });
        }

        tracing::debug!(
            kind = %K::KIND,
            events = count,
            series_first = first,
            series_last = last,
            "catalog assembled"
        );

        Ok(Self {
            times,
            info,
            series,
            len: count as u32,
            series_first: first,
            series_last: last,
            _kind: PhantomData,
        })
    }

    pub fn kind(&self) -> Kind {
        K::KIND
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Series numbers the series table covers
    pub fn series_range(&self) -> RangeInclusive<u8> {
        self.series_first..=self.series_last
    }

    /// Combined size of the three artifacts
    pub fn artifact_bytes(&self) -> u64 {
        self.times.len() + self.info.len() + self.series.len()
    }

    pub(crate) fn series_source(&self) -> &S {
        &self.series
    }

    /// Timestamp of the event at `idx` (must be `< len`)
    #[inline]
    pub fn time_at(&self, idx: u32) -> Result<Timestamp> {
        let mut buf = [0u8; TIME_SIZE];
        self.times
            .read_exact_at(u64::from(idx) * TIME_SIZE as u64, &mut buf)?;
        Ok(decode_time(&buf))
    }

    /// Decoded info record of the event at `idx` (must be `< len`)
    pub fn info_at(&self, idx: u32) -> Result<EventInfo> {
        let mut buf = [0u8; INFO_SIZE];
        self.info
            .read_exact_at(u64::from(idx) * INFO_SIZE as u64, &mut buf)?;
        Ok(K::decode_info(&buf))
    }

    /// Full event at `idx` (must be `< len`)
    pub fn event_at(&self, idx: u32) -> Result<Event> {
        Ok(Event {
            timestamp: self.time_at(idx)?,
            global_index: idx as GlobalIndex,
            info: self.info_at(idx)?,
        })
    }

    /// Event by global index, `None` past the end
    pub fn get(&self, idx: GlobalIndex) -> Result<Option<Event>> {
        let idx = u32::from(idx);
        if idx >= self.len {
            return Ok(None);
        }
        self.event_at(idx).map(Some)
    }

    /// Smallest index whose timestamp is `>= key`, or `len` if none
    pub fn lower_bound(&self, key: Timestamp) -> Result<u32> {
        let mut lo: u32 = 0;
        let mut hi: u32 = self.len;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.time_at(mid)? < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        Ok(lo)
    }

    /// Smallest index whose timestamp is `> key`, or `len` if none
    ///
    /// `upper_bound(key) - 1` is the last event at or before `key`.
    pub fn upper_bound(&self, key: Timestamp) -> Result<u32> {
        let mut lo: u32 = 0;
        let mut hi: u32 = self.len;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.time_at(mid)? <= key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        Ok(lo)
    }

    /// Global indices of the events with `start <= timestamp <= end`
    ///
    /// Empty when `start > end`.
    pub fn range(&self, start: Timestamp, end: Timestamp) -> Result<Range<u32>> {
        let lo = self.lower_bound(start)?;
        if start > end {
            return Ok(lo..lo);
        }
        let hi = self.upper_bound(end)?;
        Ok(lo..hi)
    }

    /// Decoded events with `start <= timestamp <= end`, in catalog order
    pub fn events_between(&self, start: Timestamp, end: Timestamp) -> Result<Vec<Event>> {
        self.range(start, end)?
            .map(|idx| self.event_at(idx))
            .collect()
    }

    /// Timestamps of the first and last events
    pub fn time_span(&self) -> Result<Option<(Timestamp, Timestamp)>> {
        if self.len == 0 {
            return Ok(None);
        }
        Ok(Some((self.time_at(0)?, self.time_at(self.len - 1)?)))
    }
}

impl<K: EclipseKind> Catalog<K, MemorySource<&'static [u8]>> {
    /// Catalog over images linked into the program
    pub fn from_static(
        times: &'static [u8],
        info: &'static [u8],
        series: &'static [u8],
        series_range: RangeInclusive<u8>,
    ) -> Result<Self> {
        Self::from_sources(
            MemorySource::new(times),
            MemorySource::new(info),
            MemorySource::new(series),
            series_range,
        )
    }
}

impl<K: EclipseKind> Catalog<K, Source> {
    /// Open the catalog of kind `K` for `slice` under `data_dir`
    ///
    /// The three artifacts load concurrently. The series range comes from
    /// the meta file when present, otherwise from the slice.
    pub fn open(data_dir: &Path, slice: Slice, backend: Backend) -> Result<Self> {
        let paths = ArtifactPaths::new(data_dir, K::KIND, slice);
        let meta = read_meta(&paths.meta)?;

        if let Some(meta) = &meta {
            if meta.kind != K::KIND {
                return Err(Error::Unavailable {
                    artifact: Artifact::Meta,
                    path: paths.meta.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("meta describes a {} catalog", meta.kind),
                    ),
                });
            }
        }

        let range = meta
            .as_ref()
            .map(|m| m.series_first..=m.series_last)
            .unwrap_or_else(|| slice.series_range());

        let (times, (info, series)) = match backend {
            Backend::Mapped => rayon::join(
                || Source::map(&paths.times, Artifact::Times),
                || {
                    rayon::join(
                        || Source::map(&paths.info, Artifact::Info),
                        || Source::map(&paths.series, Artifact::Series),
                    )
                },
            ),
            // The timestamp index stays in memory for the binary search
            Backend::File => rayon::join(
                || Source::read(&paths.times, Artifact::Times),
                || {
                    rayon::join(
                        || Source::file(&paths.info, Artifact::Info),
                        || Source::file(&paths.series, Artifact::Series),
                    )
                },
            ),
        };

        let catalog = Self::from_sources(times?, info?, series?, range)?;

        if let Some(meta) = &meta {
            if u64::from(meta.event_count) != catalog.len() as u64 {
                return Err(Error::CountMismatch {
                    artifact: Artifact::Meta,
                    expected: catalog.len() as u64,
                    found: u64::from(meta.event_count),
                });
            }
        }

        tracing::info!(
            kind = %K::KIND,
            slice = slice.as_str(),
            backend = backend.as_str(),
            events = catalog.len(),
            "catalog loaded"
        );

        Ok(catalog)
    }
}

/// Read the optional meta file next to the artifacts
pub fn read_meta(path: &Path) -> Result<Option<CatalogMeta>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).map_err(|source| Error::Unavailable {
        artifact: Artifact::Meta,
        path: path.to_path_buf(),
        source,
    })?;
    let meta = serde_json::from_reader(file).map_err(|source| Error::Config {
        what: "catalog meta",
        source,
    })?;
    Ok(Some(meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::kind::{Lunar, Solar};

    fn times_bytes(ts: &[i64]) -> Vec<u8> {
        ts.iter().flat_map(|t| t.to_le_bytes()).collect()
    }

    fn catalog(ts: &[i64]) -> Catalog<Solar, MemorySource<Vec<u8>>> {
        Catalog::from_sources(
            MemorySource::new(times_bytes(ts)),
            MemorySource::new(vec![0u8; ts.len() * INFO_SIZE]),
            MemorySource::new(vec![0u8; SERIES_RECORD_SIZE]),
            5..=5,
        )
        .unwrap()
    }

    /// Linear reference for the binary searches
    fn reference(ts: &[i64], key: i64) -> (u32, u32) {
        let lower = ts.iter().position(|&t| t >= key).unwrap_or(ts.len());
        let upper = ts.iter().position(|&t| t > key).unwrap_or(ts.len());
        (lower as u32, upper as u32)
    }

    #[test]
    fn test_bounds_match_linear_scan() {
        let arrays: [&[i64]; 6] = [
            &[],
            &[100],
            &[100, 200, 300],
            &[100, 100, 100],
            &[-50, 0, 0, 10, 10, 10, 20],
            &[i64::MIN, -1, 0, 1, i64::MAX],
        ];

        for ts in arrays {
            let cat = catalog(ts);
            let mut keys = vec![i64::MIN, i64::MAX, 0];
            for &t in ts {
                keys.extend([t.saturating_sub(1), t, t.saturating_add(1)]);
            }
            for key in keys {
                let (lower, upper) = reference(ts, key);
                assert_eq!(cat.lower_bound(key).unwrap(), lower, "lower {:?} {}", ts, key);
                assert_eq!(cat.upper_bound(key).unwrap(), upper, "upper {:?} {}", ts, key);
                if !ts.contains(&key) {
                    assert_eq!(lower, upper);
                }
            }
        }
    }

    #[test]
    fn test_range_is_inclusive_on_both_ends() {
        let cat = catalog(&[100, 200, 200, 300, 400]);

        assert_eq!(cat.range(200, 300).unwrap(), 1..4);
        assert_eq!(cat.range(201, 299).unwrap(), 3..3);
        assert_eq!(cat.range(i64::MIN, i64::MAX).unwrap(), 0..5);
        assert_eq!(cat.range(100, 100).unwrap(), 0..1);
        assert_eq!(cat.range(401, i64::MAX).unwrap(), 5..5);
        assert!(cat.range(300, 200).unwrap().is_empty());

        let events = cat.events_between(150, 300).unwrap();
        let times: Vec<i64> = events.iter().map(|e| e.timestamp).collect();
        assert_eq!(times, [200, 200, 300]);
        assert_eq!(events[0].global_index, 1);
    }

    #[test]
    fn test_rejects_ragged_times() {
        let err = Catalog::<Solar, _>::from_sources(
            MemorySource::new(vec![0u8; 12]),
            MemorySource::new(vec![]),
            MemorySource::new(vec![0u8; SERIES_RECORD_SIZE]),
            1..=1,
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Layout { artifact: Artifact::Times, .. }));
    }

    #[test]
    fn test_rejects_info_count_mismatch() {
        let err = Catalog::<Lunar, _>::from_sources(
            MemorySource::new(times_bytes(&[1, 2])),
            MemorySource::new(vec![0u8; INFO_SIZE]),
            MemorySource::new(vec![0u8; SERIES_RECORD_SIZE]),
            1..=1,
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            Error::CountMismatch {
                artifact: Artifact::Info,
                expected: 2,
                found: 1
            }
        ));
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_rejects_series_table_for_wrong_range() {
        let err = Catalog::<Solar, _>::from_sources(
            MemorySource::new(vec![]),
            MemorySource::new(vec![]),
            MemorySource::new(vec![0u8; SERIES_RECORD_SIZE * 2]),
            110..=173,
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::CountMismatch { artifact: Artifact::Series, .. }));
    }

    #[test]
    fn test_rejects_bad_series_range() {
        for (first, last) in [(0u8, 10u8), (20, 10), (1, 181)] {
            let err = Catalog::<Solar, _>::from_sources(
                MemorySource::new(vec![]),
                MemorySource::new(vec![]),
                MemorySource::new(vec![]),
                first..=last,
            )
            .err()
            .unwrap();
            assert!(matches!(err, Error::SeriesRange { .. }));
        }
    }

    #[test]
    fn test_get_past_end_is_none() {
        let cat = catalog(&[100, 200]);
        assert_eq!(cat.get(1).unwrap().unwrap().timestamp, 200);
        assert!(cat.get(2).unwrap().is_none());
        assert_eq!(cat.time_span().unwrap(), Some((100, 200)));
    }

    #[test]
    fn test_artifact_paths_layout() {
        let paths = ArtifactPaths::new(Path::new("/data"), Kind::Lunar, Slice::All);
        assert_eq!(paths.times, Path::new("/data/lunar/eclipse_times_all.bin"));
        assert_eq!(paths.series, Path::new("/data/lunar/saros_all.bin"));
        assert_eq!(paths.meta, Path::new("/data/lunar/meta_all.json"));
    }

    #[test]
    fn test_open_missing_catalog_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::<Solar, Source>::open(dir.path(), Slice::Modern, Backend::Mapped)
            .err()
            .unwrap();
        assert!(err.is_unavailable());
    }
}
