use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use saros::catalog::{Catalog, EclipseKind, Event, Lunar, Slice, Solar, Timestamp, verify};
use saros::output;
use saros::query::{CacheStats, Engine};
use saros::storage::{Backend, Source};
use saros::utils::{Config, get_config_path};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Timestamps per batch work unit; each unit gets its own engine
const BATCH_CHUNK: usize = 512;

#[derive(Parser)]
#[command(name = "saros")]
#[command(about = "Solar and lunar eclipse lookups by time and Saros series")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the solar/ and lunar/ catalogs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// How catalog artifacts are read
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,

    /// Which series subset to load
    #[arg(long, global = true, value_enum)]
    slice: Option<SliceArg>,

    /// Disable the interval cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log catalog loading to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Earliest eclipse at or after a time
    Next {
        #[arg(value_enum)]
        kind: KindArg,
        /// Unix seconds, YYYY-MM-DD[THH:MM:SS], or "now"
        #[arg(value_parser = parse_timestamp, allow_negative_numbers = true)]
        time: Timestamp,
    },
    /// Latest eclipse at or before a time
    Past {
        #[arg(value_enum)]
        kind: KindArg,
        #[arg(value_parser = parse_timestamp, allow_negative_numbers = true)]
        time: Timestamp,
    },
    /// Nearest eclipse to a time (ties go to the later one)
    Closest {
        #[arg(value_enum)]
        kind: KindArg,
        #[arg(value_parser = parse_timestamp, allow_negative_numbers = true)]
        time: Timestamp,
    },
    /// Members of one Saros series either side of a time
    Window {
        #[arg(value_enum)]
        kind: KindArg,
        #[arg(value_parser = parse_timestamp, allow_negative_numbers = true)]
        time: Timestamp,
        /// Saros series number (1-180)
        saros: u8,
    },
    /// Closest eclipse for every timestamp in a file, one per line
    Batch {
        #[arg(value_enum)]
        kind: KindArg,
        /// Input file, or - for stdin
        file: PathBuf,
    },
    /// Show catalog statistics
    Stats {
        #[arg(value_enum)]
        kind: Option<KindArg>,
    },
    /// Check catalog structure; exits non-zero on issues
    Verify {
        #[arg(value_enum)]
        kind: Option<KindArg>,
        /// Largest allowed time between consecutive series members, years
        #[arg(long, default_value_t = saros::catalog::verify::DEFAULT_MAX_GAP_YEARS)]
        max_gap: f64,
    },
    /// Export solar and lunar eclipses merged by time as CSV
    Export {
        /// First instant to include; a bare date starts at midnight UTC
        #[arg(value_parser = parse_timestamp, allow_negative_numbers = true)]
        start: Option<Timestamp>,
        /// Last instant to include; a bare date covers the whole day
        #[arg(value_parser = parse_end_timestamp, allow_negative_numbers = true)]
        end: Option<Timestamp>,
        /// Output file, stdout when omitted
        file: Option<PathBuf>,
        /// Solar eclipses only
        #[arg(long, conflicts_with = "lunar")]
        solar: bool,
        /// Lunar eclipses only
        #[arg(long)]
        lunar: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write the effective configuration back to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Solar,
    Lunar,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Mapped,
    File,
}

#[derive(Clone, Copy, ValueEnum)]
enum SliceArg {
    Modern,
    All,
}

fn parse_timestamp(s: &str) -> std::result::Result<Timestamp, String> {
    if s == "now" {
        return Ok(chrono::Utc::now().timestamp());
    }
    if let Ok(ts) = s.parse::<Timestamp>() {
        return Ok(ts);
    }
    output::parse_date(s).ok_or_else(|| format!("not a timestamp or date: {}", s))
}

/// Range end: a bare date runs to 23:59:59 that day
fn parse_end_timestamp(s: &str) -> std::result::Result<Timestamp, String> {
    if s == "now" || s.parse::<Timestamp>().is_ok() {
        return parse_timestamp(s);
    }
    output::parse_date_end(s).ok_or_else(|| format!("not a timestamp or date: {}", s))
}

/// Loaded config with command-line overrides applied
struct Settings {
    config: Config,
    data_dir: PathBuf,
    json: bool,
    color: bool,
}

impl Settings {
    fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = Config::load()?;
        if let Some(dir) = &cli.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Some(backend) = cli.backend {
            config.backend = match backend {
                BackendArg::Mapped => Backend::Mapped,
                BackendArg::File => Backend::File,
            };
        }
        if let Some(slice) = cli.slice {
            config.slice = match slice {
                SliceArg::Modern => Slice::Modern,
                SliceArg::All => Slice::All,
            };
        }
        if cli.no_cache {
            config.cache = false;
        }

        let data_dir = config.effective_data_dir()?;
        Ok(Self {
            config,
            data_dir,
            json: cli.json,
            color: !cli.no_color,
        })
    }

    fn open<K: EclipseKind>(&self) -> Result<Engine<K, Source>> {
        let catalog = Catalog::<K, Source>::open(&self.data_dir, self.config.slice, self.config.backend)
            .with_context(|| {
                format!(
                    "Failed to open {} catalog in {}",
                    K::KIND,
                    self.data_dir.display()
                )
            })?;
        Ok(Engine::new(Arc::new(catalog)).with_cache(self.config.cache))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::resolve(&cli)?;

    match cli.command {
        Commands::Next { kind, time } => {
            dispatch(kind, |q| q.run(&settings, Query::Next(time)))?;
        }
        Commands::Past { kind, time } => {
            dispatch(kind, |q| q.run(&settings, Query::Past(time)))?;
        }
        Commands::Closest { kind, time } => {
            dispatch(kind, |q| q.run(&settings, Query::Closest(time)))?;
        }
        Commands::Window { kind, time, saros } => {
            dispatch(kind, |q| q.run(&settings, Query::Window(time, saros)))?;
        }
        Commands::Batch { kind, file } => {
            dispatch(kind, |q| q.batch(&settings, &file))?;
        }
        Commands::Stats { kind } => {
            for kind in kinds(kind) {
                dispatch(kind, |q| q.stats(&settings))?;
            }
        }
        Commands::Verify { kind, max_gap } => {
            let mut clean = true;
            for kind in kinds(kind) {
                clean &= dispatch(kind, |q| q.verify(&settings, max_gap))?;
            }
            if !clean {
                std::process::exit(1);
            }
        }
        Commands::Export {
            start,
            end,
            file,
            solar,
            lunar,
        } => {
            let kind = match (solar, lunar) {
                (true, _) => Some(KindArg::Solar),
                (_, true) => Some(KindArg::Lunar),
                _ => None,
            };
            export(&settings, kind, start, end, file.as_deref())?;
        }
        Commands::Config { save } => {
            show_config(&settings, save)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "saros=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn kinds(kind: Option<KindArg>) -> Vec<KindArg> {
    match kind {
        Some(k) => vec![k],
        None => vec![KindArg::Solar, KindArg::Lunar],
    }
}

#[derive(Clone, Copy)]
enum Query {
    Next(Timestamp),
    Past(Timestamp),
    Closest(Timestamp),
    Window(Timestamp, u8),
}

/// Per-kind command runner; picks the decoder at compile time
struct Runner<K>(std::marker::PhantomData<K>);

fn dispatch<T>(kind: KindArg, f: impl FnOnce(&dyn KindCommands) -> Result<T>) -> Result<T> {
    match kind {
        KindArg::Solar => f(&Runner::<Solar>(std::marker::PhantomData)),
        KindArg::Lunar => f(&Runner::<Lunar>(std::marker::PhantomData)),
    }
}

trait KindCommands {
    fn run(&self, settings: &Settings, query: Query) -> Result<()>;
    fn batch(&self, settings: &Settings, file: &Path) -> Result<()>;
    fn stats(&self, settings: &Settings) -> Result<()>;
    fn verify(&self, settings: &Settings, max_gap: f64) -> Result<bool>;
    fn events_between(&self, settings: &Settings, start: Timestamp, end: Timestamp) -> Result<Vec<Event>>;
}

impl<K: EclipseKind> KindCommands for Runner<K> {
    fn run(&self, settings: &Settings, query: Query) -> Result<()> {
        let mut engine = settings.open::<K>()?;
        let mut out = output::stdout(settings.color);

        match query {
            Query::Next(ts) | Query::Past(ts) | Query::Closest(ts) => {
                let result = match query {
                    Query::Next(_) => engine.find_next(ts)?,
                    Query::Past(_) => engine.find_past(ts)?,
                    _ => engine.find_closest(ts)?,
                };
                if settings.json {
                    output::print_json(&mut out, &result)?;
                } else {
                    output::print_result(&mut out, K::KIND, &result)?;
                }
            }
            Query::Window(ts, saros) => {
                let window = engine.find_series_window(ts, saros)?;
                if settings.json {
                    output::print_json(&mut out, &window)?;
                } else {
                    output::print_window(&mut out, K::KIND, &window)?;
                }
            }
        }
        Ok(())
    }

    fn batch(&self, settings: &Settings, file: &Path) -> Result<()> {
        let engine = settings.open::<K>()?;
        let timestamps = read_timestamps(file)?;

        // Chunks keep neighbouring timestamps on one engine so the cache
        // sees them in order
        let chunks: Vec<_> = timestamps
            .par_chunks(BATCH_CHUNK)
            .map(|chunk| {
                let mut engine = engine.fork();
                let results = chunk
                    .iter()
                    .map(|&ts| engine.find_closest(ts).map(|r| (ts, r)))
                    .collect::<saros::Result<Vec<_>>>();
                results.map(|r| (r, engine.cache_stats()))
            })
            .collect::<saros::Result<Vec<_>>>()?;

        let mut cache = CacheStats::default();
        let stdout = io::stdout();
        let mut out = io::BufWriter::new(stdout.lock());

        if settings.json {
            let rows: Vec<_> = chunks
                .iter()
                .flat_map(|(rows, _)| rows.iter())
                .map(|(ts, result)| serde_json::json!({ "query": ts, "result": result }))
                .collect();
            output::print_json(&mut out, &rows)?;
        } else {
            for (rows, _) in &chunks {
                for (ts, result) in rows {
                    output::print_batch_line(&mut out, *ts, result)?;
                }
            }
        }
        out.flush()?;

        for (_, stats) in &chunks {
            cache.hits += stats.hits;
            cache.misses += stats.misses;
        }
        tracing::info!(
            queries = timestamps.len(),
            hits = cache.hits,
            misses = cache.misses,
            "batch finished"
        );
        Ok(())
    }

    fn stats(&self, settings: &Settings) -> Result<()> {
        let engine = settings.open::<K>()?;
        let stats = engine.catalog().stats()?;
        let mut out = output::stdout(settings.color);

        if settings.json {
            output::print_json(&mut out, &stats)?;
        } else {
            output::print_stats(&mut out, &stats)?;
            writeln!(out)?;
        }
        Ok(())
    }

    fn events_between(&self, settings: &Settings, start: Timestamp, end: Timestamp) -> Result<Vec<Event>> {
        let engine = settings.open::<K>()?;
        let events = engine
            .catalog()
            .events_between(start, end)
            .with_context(|| format!("Failed to read {} events", K::KIND))?;
        Ok(events)
    }

    fn verify(&self, settings: &Settings, max_gap: f64) -> Result<bool> {
        let engine = settings.open::<K>()?;
        let report = verify(engine.catalog(), max_gap)?;
        let mut out = output::stdout(settings.color);

        if settings.json {
            output::print_json(&mut out, &report)?;
        } else {
            output::print_report(&mut out, K::KIND, &report)?;
        }
        Ok(report.is_clean())
    }
}

/// One timestamp per line; blank lines and `#` comments are skipped
fn read_timestamps(file: &Path) -> Result<Vec<Timestamp>> {
    let reader: Box<dyn BufRead> = if file == Path::new("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let f = std::fs::File::open(file)
            .with_context(|| format!("Failed to open {}", file.display()))?;
        Box::new(BufReader::new(f))
    };

    let mut timestamps = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_timestamp(line) {
            Ok(ts) => timestamps.push(ts),
            Err(e) => bail!("{}:{}: {}", file.display(), n + 1, e),
        }
    }
    Ok(timestamps)
}

fn export(
    settings: &Settings,
    kind: Option<KindArg>,
    start: Option<Timestamp>,
    end: Option<Timestamp>,
    path: Option<&Path>,
) -> Result<()> {
    let start = start.unwrap_or(Timestamp::MIN);
    let end = end.unwrap_or(Timestamp::MAX);

    let mut solar = Vec::new();
    let mut lunar = Vec::new();
    for kind in kinds(kind) {
        let events = dispatch(kind, |q| q.events_between(settings, start, end))?;
        match kind {
            KindArg::Solar => solar = events,
            KindArg::Lunar => lunar = events,
        }
    }
    let events = output::merge_by_time(solar, lunar);

    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            output::write_csv(io::BufWriter::new(file), &events)?;
            eprintln!("Wrote {} eclipses to {}", events.len(), path.display());
        }
        None => {
            output::write_csv(io::stdout().lock(), &events)?;
            eprintln!("{} eclipses", events.len());
        }
    }
    Ok(())
}

fn show_config(settings: &Settings, save: bool) -> Result<()> {
    let path = if save {
        settings.config.save()?
    } else {
        get_config_path()?
    };

    let mut out = output::stdout(settings.color);
    if settings.json {
        output::print_json(
            &mut out,
            &serde_json::json!({
                "path": path,
                "config": settings.config,
                "data_dir": settings.data_dir,
            }),
        )?;
    } else {
        writeln!(out, "Config file:  {}", path.display())?;
        writeln!(out, "Data dir:     {}", settings.data_dir.display())?;
        writeln!(out, "Backend:      {}", settings.config.backend.as_str())?;
        writeln!(out, "Slice:        {}", settings.config.slice.as_str())?;
        writeln!(out, "Cache:        {}", settings.config.cache)?;
        if save {
            writeln!(out, "Saved.")?;
        }
    }
    Ok(())
}
