use super::decode::{encode_info, encode_time};
use super::kind::EclipseKind;
use super::reader::{ArtifactPaths, Catalog, MAX_EVENTS};
use super::types::*;
use crate::storage::MemorySource;
use anyhow::{Context, Result, bail, ensure};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Catalog builder: collects events, then packs the three artifacts
pub struct CatalogWriter {
    kind: Kind,
    series_first: u8,
    series_last: u8,
    events: Vec<(Timestamp, EventInfo)>,
    /// Events skipped because their series is outside the range
    dropped: usize,
}

/// Packed artifacts of one catalog, ready to write or to query in memory
#[derive(Debug, Clone)]
pub struct CatalogImage {
    pub times: Vec<u8>,
    pub info: Vec<u8>,
    pub series: Vec<u8>,
    pub meta: CatalogMeta,
}

impl CatalogWriter {
    /// Create a writer for `kind` covering series `first..=last`
    pub fn new(kind: Kind, first: u8, last: u8) -> Result<Self> {
        ensure!(
            first >= *ALL_SERIES.start() && first <= last && last <= *ALL_SERIES.end(),
            "invalid saros range {}..={}",
            first,
            last
        );

        Ok(Self {
            kind,
            series_first: first,
            series_last: last,
            events: Vec::new(),
            dropped: 0,
        })
    }

    /// Writer for one of the standard slices
    pub fn for_slice(kind: Kind, slice: Slice) -> Result<Self> {
        let range = slice.series_range();
        Self::new(kind, *range.start(), *range.end())
    }

    /// Add an event; its `saros_pos` is recomputed by [`finish`](Self::finish)
    pub fn push(&mut self, timestamp: Timestamp, info: impl Into<EventInfo>) -> Result<()> {
        let info = info.into();
        if info.kind() != self.kind {
            bail!("{} event pushed into a {} catalog", info.kind(), self.kind);
        }

        let saros = info.saros_number();
        if saros < self.series_first || saros > self.series_last {
            self.dropped += 1;
            return Ok(());
        }

        self.events.push((timestamp, info));
        Ok(())
    }

    /// Events accepted so far
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events skipped for falling outside the series range
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Sort, index and pack
    pub fn finish(mut self) -> Result<CatalogImage> {
        ensure!(
            self.events.len() as u64 <= MAX_EVENTS,
            "{} events exceed the {} addressable by a 16-bit index",
            self.events.len(),
            MAX_EVENTS
        );

        // Stable, so same-instant events keep insertion order
        self.events.sort_by_key(|(ts, _)| *ts);

        let series_count = usize::from(self.series_last - self.series_first) + 1;
        let mut members: Vec<Vec<GlobalIndex>> = vec![Vec::new(); series_count];

        for (idx, (_, info)) in self.events.iter_mut().enumerate() {
            let slot = &mut members[usize::from(info.saros_number() - self.series_first)];
            if slot.len() >= SERIES_CAPACITY {
                bail!(
                    "saros {} has more than {} members",
                    info.saros_number(),
                    SERIES_CAPACITY
                );
            }
            info.set_saros_pos(slot.len() as u8);
            slot.push(idx as GlobalIndex);
        }

        let mut times = Vec::with_capacity(self.events.len() * TIME_SIZE);
        let mut info = Vec::with_capacity(self.events.len() * INFO_SIZE);
        for (ts, event) in &self.events {
            times.extend_from_slice(&encode_time(*ts));
            info.extend_from_slice(&encode_info(event));
        }

        let mut series = Vec::with_capacity(series_count * SERIES_RECORD_SIZE);
        for list in &members {
            series.push(list.len() as u8);
            series.push(0);
            for i in 0..SERIES_CAPACITY {
                let idx = list.get(i).copied().unwrap_or(0);
                series.extend_from_slice(&idx.to_le_bytes());
            }
        }

        let meta = CatalogMeta {
            version: CatalogMeta::VERSION,
            kind: self.kind,
            series_first: self.series_first,
            series_last: self.series_last,
            event_count: self.events.len() as u32,
        };

        Ok(CatalogImage {
            times,
            info,
            series,
            meta,
        })
    }
}

impl CatalogImage {
    /// Write the artifacts and meta under `data_dir` for `slice`
    pub fn write_to(&self, data_dir: &Path, slice: Slice) -> Result<ArtifactPaths> {
        let paths = ArtifactPaths::new(data_dir, self.meta.kind, slice);
        if let Some(dir) = paths.times.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }

        write_artifact(&paths.times, &self.times)?;
        write_artifact(&paths.info, &self.info)?;
        write_artifact(&paths.series, &self.series)?;

        let file = File::create(&paths.meta)
            .with_context(|| format!("creating {}", paths.meta.display()))?;
        serde_json::to_writer_pretty(file, &self.meta)?;

        tracing::info!(
            kind = %self.meta.kind,
            events = self.meta.event_count,
            dir = %data_dir.display(),
            "catalog written"
        );

        Ok(paths)
    }

    /// Query the image in place, without touching disk
    pub fn into_catalog<K: EclipseKind>(self) -> Result<Catalog<K, MemorySource<Vec<u8>>>> {
        ensure!(
            K::KIND == self.meta.kind,
            "image holds a {} catalog, not {}",
            self.meta.kind,
            K::KIND
        );

        let range = self.meta.series_first..=self.meta.series_last;
        let catalog = Catalog::from_sources(
            MemorySource::new(self.times),
            MemorySource::new(self.info),
            MemorySource::new(self.series),
            range,
        )?;
        Ok(catalog)
    }
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = BufWriter::new(
        File::create(path).with_context(|| format!("creating {}", path.display()))?,
    );
    file.write_all(bytes)?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::kind::{Lunar, Solar};
    use crate::storage::{Backend, Source};

    fn solar(saros: u8, type_code: u8) -> SolarInfo {
        SolarInfo {
            latitude_deg10: -123,
            longitude_deg10: 456,
            central_duration: 90,
            saros_number: saros,
            saros_pos: 99,
            type_code,
            sun_alt: 45,
        }
    }

    #[test]
    fn test_finish_sorts_and_assigns_positions() {
        let mut writer = CatalogWriter::new(Kind::Solar, 5, 6).unwrap();
        writer.push(300, solar(5, 13)).unwrap();
        writer.push(100, solar(5, 0)).unwrap();
        writer.push(200, solar(6, 10)).unwrap();
        let cat = writer.finish().unwrap().into_catalog::<Solar>().unwrap();

        assert_eq!(cat.len(), 3);
        assert_eq!(cat.time_at(0).unwrap(), 100);
        assert_eq!(cat.time_at(2).unwrap(), 300);

        let e = cat.event_at(2).unwrap();
        assert_eq!(e.saros_number(), 5);
        assert_eq!(e.saros_pos(), 1);
        assert_eq!(cat.event_at(1).unwrap().saros_pos(), 0);

        assert_eq!(cat.load_series(5).unwrap().members(), &[0, 2]);
        assert_eq!(cat.load_series(6).unwrap().members(), &[1]);
    }

    #[test]
    fn test_out_of_slice_series_dropped() {
        let mut writer = CatalogWriter::for_slice(Kind::Solar, Slice::Modern).unwrap();
        writer.push(0, solar(109, 0)).unwrap();
        writer.push(1, solar(110, 0)).unwrap();
        writer.push(2, solar(174, 0)).unwrap();
        assert_eq!(writer.len(), 1);
        assert_eq!(writer.dropped(), 2);

        let image = writer.finish().unwrap();
        assert_eq!(image.series.len(), 64 * SERIES_RECORD_SIZE);
    }

    #[test]
    fn test_series_over_capacity_fails() {
        let mut writer = CatalogWriter::new(Kind::Solar, 1, 1).unwrap();
        for t in 0..=SERIES_CAPACITY as i64 {
            writer.push(t, solar(1, 0)).unwrap();
        }
        assert!(writer.finish().is_err());
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let mut writer = CatalogWriter::new(Kind::Lunar, 1, 10).unwrap();
        assert!(writer.push(0, solar(1, 0)).is_err());
        assert!(CatalogWriter::new(Kind::Lunar, 0, 10).is_err());
        assert!(CatalogWriter::new(Kind::Lunar, 10, 9).is_err());

        let image = CatalogWriter::new(Kind::Lunar, 1, 1).unwrap().finish().unwrap();
        assert!(image.into_catalog::<Solar>().is_err());
    }

    #[test]
    fn test_series_tail_zero_filled() {
        let mut writer = CatalogWriter::new(Kind::Solar, 1, 1).unwrap();
        writer.push(10, solar(1, 0)).unwrap();
        let image = writer.finish().unwrap();
        assert_eq!(image.series[0], 1);
        assert!(image.series[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_then_open_both_backends() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CatalogWriter::new(Kind::Lunar, 120, 121).unwrap();
        writer
            .push(
                -1_000,
                LunarInfo {
                    pen_duration: 100,
                    par_duration: DURATION_NA,
                    total_duration: DURATION_NA,
                    saros_number: 121,
                    saros_pos: 0,
                    type_code: 0,
                    reserved: 7,
                },
            )
            .unwrap();
        let image = writer.finish().unwrap();
        image.write_to(dir.path(), Slice::All).unwrap();

        for backend in [Backend::Mapped, Backend::File] {
            let cat = Catalog::<Lunar, Source>::open(dir.path(), Slice::All, backend).unwrap();
            assert_eq!(cat.series_range(), 120..=121);
            let e = cat.event_at(0).unwrap();
            assert_eq!(e.timestamp, -1_000);
            let info = e.info.as_lunar().unwrap();
            assert_eq!(info.partial_secs(), None);
            assert_eq!(info.reserved, 7);
        }

        // Nothing was written for the other kind
        assert!(Catalog::<Solar, Source>::open(dir.path(), Slice::All, Backend::Mapped).is_err());
    }
}
