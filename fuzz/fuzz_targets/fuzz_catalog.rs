#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use saros::catalog::{Catalog, Lunar};
use saros::query::Engine;
use saros::storage::MemorySource;
use std::sync::Arc;

#[derive(Debug, Arbitrary)]
struct Input {
    times: Vec<u8>,
    info: Vec<u8>,
    series: Vec<u8>,
    first: u8,
    last: u8,
    probes: Vec<(i64, u8)>,
}

fuzz_target!(|input: Input| {
    // Arbitrary artifacts either fail validation or answer every query
    // without panicking; unsorted times and bogus series indices included
    let Ok(catalog) = Catalog::<Lunar, _>::from_sources(
        MemorySource::new(input.times),
        MemorySource::new(input.info),
        MemorySource::new(input.series),
        input.first..=input.last,
    ) else {
        return;
    };

    let mut engine = Engine::new(Arc::new(catalog));
    for (ts, saros) in input.probes {
        let _ = engine.find_next(ts);
        let _ = engine.find_past(ts);
        let _ = engine.find_closest(ts);
        let _ = engine.find_series_window(ts, saros);
    }
});
