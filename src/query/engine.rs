use super::cache::{CacheStats, Direction, IntervalCache};
use crate::catalog::{
    Catalog, EclipseKind, Event, EventResult, GlobalIndex, Kind, Lunar, SeriesWindow, Slice, Solar,
    Timestamp,
};
use crate::error::Result;
use crate::storage::{Backend, ByteSource, Source};
use std::path::Path;
use std::sync::Arc;

/// Query engine over one catalog kind
///
/// The catalog is shared and read-only; the interval cache belongs to this
/// engine alone. Give each worker its own engine with [`Engine::fork`].
pub struct Engine<K, S> {
    catalog: Arc<Catalog<K, S>>,
    cache: IntervalCache,
    use_cache: bool,
}

impl<K: EclipseKind, S: ByteSource> Engine<K, S> {
    /// Engine with a fresh, empty cache
    pub fn new(catalog: Arc<Catalog<K, S>>) -> Self {
        Self {
            catalog,
            cache: IntervalCache::new(),
            use_cache: true,
        }
    }

    /// Enable or disable the interval cache
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        if !enabled {
            self.cache.invalidate();
        }
        self
    }

    /// Another engine over the same catalog, with its own empty cache
    pub fn fork(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            cache: IntervalCache::new(),
            use_cache: self.use_cache,
        }
    }

    pub fn catalog(&self) -> &Catalog<K, S> {
        &self.catalog
    }

    pub fn kind(&self) -> Kind {
        K::KIND
    }

    /// Earliest event at or after `ts`, with its series neighbours
    pub fn find_next(&mut self, ts: Timestamp) -> Result<EventResult> {
        if self.use_cache
            && let Some(hit) = self.cache.lookup(Direction::Next, ts)
        {
            return Ok(hit);
        }

        let idx = self.catalog.lower_bound(ts)?;
        let lo = match idx {
            0 => Some(Timestamp::MIN),
            _ => self.catalog.time_at(idx - 1)?.checked_add(1),
        };
        let (result, hi) = if idx as usize == self.catalog.len() {
            (EventResult::default(), Timestamp::MAX)
        } else {
            let result = self.build(idx)?;
            let hi = result.timestamp().unwrap_or(ts);
            (result, hi)
        };

        if self.use_cache
            && let Some(lo) = lo
        {
            self.cache.store(Direction::Next, lo, hi, result);
        }
        Ok(result)
    }

    /// Latest event at or before `ts`, with its series neighbours
    pub fn find_past(&mut self, ts: Timestamp) -> Result<EventResult> {
        if self.use_cache
            && let Some(hit) = self.cache.lookup(Direction::Past, ts)
        {
            return Ok(hit);
        }

        let idx = self.catalog.upper_bound(ts)?;
        let hi = if idx as usize == self.catalog.len() {
            Some(Timestamp::MAX)
        } else {
            self.catalog.time_at(idx)?.checked_sub(1)
        };
        let (result, lo) = if idx == 0 {
            (EventResult::default(), Timestamp::MIN)
        } else {
            let result = self.build(idx - 1)?;
            let lo = result.timestamp().unwrap_or(ts);
            (result, lo)
        };

        if self.use_cache
            && let Some(hi) = hi
        {
            self.cache.store(Direction::Past, lo, hi, result);
        }
        Ok(result)
    }

    /// Whichever of the next and past events is nearer to `ts`
    ///
    /// An exact tie goes to the next event.
    pub fn find_closest(&mut self, ts: Timestamp) -> Result<EventResult> {
        let next = self.find_next(ts)?;
        let past = self.find_past(ts)?;

        Ok(match (next.eclipse, past.eclipse) {
            (None, _) => past,
            (_, None) => next,
            (Some(n), Some(p)) => {
                if ts.abs_diff(p.timestamp) < n.timestamp.abs_diff(ts) {
                    past
                } else {
                    next
                }
            }
        })
    }

    /// Members of `saros_number` either side of `ts`
    ///
    /// `future` is the earliest member at or after `ts`, `past` the one
    /// before it. Series outside the catalog give an empty window.
    pub fn find_series_window(&self, ts: Timestamp, saros_number: u8) -> Result<SeriesWindow> {
        let series = self.catalog.load_series(saros_number)?;
        if series.is_empty() {
            return Ok(SeriesWindow::empty(saros_number));
        }

        let pos = self.catalog.series_lower_bound(&series, ts)?;
        let future = self.resolve(series.get(pos))?;
        let past = self.resolve(pos.checked_sub(1).and_then(|p| series.get(p)))?;

        Ok(SeriesWindow {
            saros_number,
            past,
            future,
        })
    }

    /// Event by global index, `None` past the end
    pub fn event(&self, index: GlobalIndex) -> Result<Option<Event>> {
        self.catalog.get(index)
    }

    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &IntervalCache {
        &self.cache
    }

    /// Focal event at `idx` plus its series neighbours
    fn build(&self, idx: u32) -> Result<EventResult> {
        let eclipse = self.catalog.event_at(idx)?;
        let (prev, next) = self
            .catalog
            .neighbors(eclipse.saros_number(), eclipse.saros_pos())?;

        Ok(EventResult {
            eclipse: Some(eclipse),
            saros_prev: self.resolve(prev)?,
            saros_next: self.resolve(next)?,
        })
    }

    fn resolve(&self, index: Option<GlobalIndex>) -> Result<Option<Event>> {
        match index {
            Some(i) => self.catalog.get(i),
            None => Ok(None),
        }
    }
}

/// Solar and lunar engines side by side, each with its own cache
pub struct Eclipses<S> {
    pub solar: Engine<Solar, S>,
    pub lunar: Engine<Lunar, S>,
}

impl<S: ByteSource> Eclipses<S> {
    pub fn new(solar: Arc<Catalog<Solar, S>>, lunar: Arc<Catalog<Lunar, S>>) -> Self {
        Self {
            solar: Engine::new(solar),
            lunar: Engine::new(lunar),
        }
    }

    pub fn with_cache(self, enabled: bool) -> Self {
        Self {
            solar: self.solar.with_cache(enabled),
            lunar: self.lunar.with_cache(enabled),
        }
    }

    pub fn find_next(&mut self, kind: Kind, ts: Timestamp) -> Result<EventResult> {
        match kind {
            Kind::Solar => self.solar.find_next(ts),
            Kind::Lunar => self.lunar.find_next(ts),
        }
    }

    pub fn find_past(&mut self, kind: Kind, ts: Timestamp) -> Result<EventResult> {
        match kind {
            Kind::Solar => self.solar.find_past(ts),
            Kind::Lunar => self.lunar.find_past(ts),
        }
    }

    pub fn find_closest(&mut self, kind: Kind, ts: Timestamp) -> Result<EventResult> {
        match kind {
            Kind::Solar => self.solar.find_closest(ts),
            Kind::Lunar => self.lunar.find_closest(ts),
        }
    }

    pub fn find_series_window(&self, kind: Kind, ts: Timestamp, saros_number: u8) -> Result<SeriesWindow> {
        match kind {
            Kind::Solar => self.solar.find_series_window(ts, saros_number),
            Kind::Lunar => self.lunar.find_series_window(ts, saros_number),
        }
    }

    pub fn invalidate_cache(&mut self, kind: Kind) {
        match kind {
            Kind::Solar => self.solar.invalidate_cache(),
            Kind::Lunar => self.lunar.invalidate_cache(),
        }
    }

    pub fn invalidate_caches(&mut self) {
        self.solar.invalidate_cache();
        self.lunar.invalidate_cache();
    }

    /// Both engines forked: same catalogs, fresh caches
    pub fn fork(&self) -> Self {
        Self {
            solar: self.solar.fork(),
            lunar: self.lunar.fork(),
        }
    }
}

impl Eclipses<Source> {
    /// Open both catalogs for `slice` under `data_dir`
    pub fn open(data_dir: &Path, slice: Slice, backend: Backend) -> Result<Self> {
        let (solar, lunar) = rayon::join(
            || Catalog::<Solar, Source>::open(data_dir, slice, backend),
            || Catalog::<Lunar, Source>::open(data_dir, slice, backend),
        );
        Ok(Self::new(Arc::new(solar?), Arc::new(lunar?)))
    }
}
