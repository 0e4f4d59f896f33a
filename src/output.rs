//! Terminal and JSON rendering of query results

use crate::catalog::{
    CatalogStats, DURATION_NA, Event, EventInfo, EventResult, Issue, Kind, SeriesWindow, Timestamp,
    VerifyReport,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Open stdout with or without colour
pub fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parse `YYYY-MM-DD` with an optional `THH:MM[:SS]` or ` HH:MM[:SS]`, as UTC
///
/// Proleptic Gregorian; a leading `-` gives an astronomical year before
/// year 0. Impossible dates such as `2023-02-29` are rejected.
pub fn parse_date(s: &str) -> Option<Timestamp> {
    let s = s.strip_suffix('Z').unwrap_or(s);
    if let Some(day) = parse_day(s) {
        return Some(day.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc().timestamp())
}

/// Like [`parse_date`], but a bare date means the last second of that day
pub fn parse_date_end(s: &str) -> Option<Timestamp> {
    match parse_day(s) {
        Some(day) => Some(day.and_hms_opt(23, 59, 59)?.and_utc().timestamp()),
        None => parse_date(s),
    }
}

/// `YYYY-MM-DD HH:MM:SS` in UTC, with a sign for years before year 0
///
/// Instants outside the calendar range print as raw seconds.
pub fn format_timestamp(ts: Timestamp) -> String {
    match DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{}s", ts),
    }
}

/// `4m28s`, or `-` when not applicable
pub fn format_duration(secs: u16) -> String {
    if secs == DURATION_NA {
        return "-".to_string();
    }
    let (h, m, s) = (secs / 3_600, secs % 3_600 / 60, secs % 60);
    if h > 0 {
        format!("{}h{:02}m{:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m{:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// Format byte size to human readable
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

fn details(info: &EventInfo) -> String {
    match info {
        EventInfo::Solar(s) => format!(
            "lat {:>6.1} lon {:>7.1} alt {:>2}  central {}",
            s.latitude_deg(),
            s.longitude_deg(),
            s.sun_alt,
            format_duration(s.central_duration)
        ),
        EventInfo::Lunar(l) => format!(
            "penumbral {}  partial {}  total {}",
            format_duration(l.pen_duration),
            format_duration(l.par_duration),
            format_duration(l.total_duration)
        ),
    }
}

fn type_color(info: &EventInfo) -> Color {
    match info.type_abbrev().chars().next() {
        Some('T') => Color::Red,
        Some('A') | Some('H') => Color::Yellow,
        _ => Color::Cyan,
    }
}

/// One event on one line, prefixed with `label`
pub fn print_event<W: WriteColor>(out: &mut W, label: &str, event: Option<&Event>) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "{:<8}", label)?;
    out.reset()?;

    let Some(e) = event else {
        out.set_color(ColorSpec::new().set_dimmed(true))?;
        writeln!(out, "none")?;
        return out.reset();
    };

    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(out, "{} UTC", format_timestamp(e.timestamp))?;
    out.reset()?;
    write!(out, "  ({:>12})  ", e.timestamp)?;

    out.set_color(ColorSpec::new().set_fg(Some(type_color(&e.info))).set_bold(true))?;
    write!(out, "{:<3}", e.info.type_abbrev())?;
    out.reset()?;

    writeln!(
        out,
        " saros {:>3} #{:<2}  {}",
        e.saros_number(),
        e.saros_pos(),
        details(&e.info)
    )
}

/// Focal event followed by its series neighbours
pub fn print_result<W: WriteColor>(out: &mut W, kind: Kind, result: &EventResult) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
    writeln!(out, "{} eclipse", kind)?;
    out.reset()?;

    print_event(out, "event", result.eclipse.as_ref())?;
    if result.is_found() {
        print_event(out, "prev", result.saros_prev.as_ref())?;
        print_event(out, "next", result.saros_next.as_ref())?;
    }
    Ok(())
}

pub fn print_window<W: WriteColor>(out: &mut W, kind: Kind, window: &SeriesWindow) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
    writeln!(out, "{} saros {}", kind, window.saros_number)?;
    out.reset()?;

    print_event(out, "past", window.past.as_ref())?;
    print_event(out, "future", window.future.as_ref())
}

pub fn print_stats<W: WriteColor>(out: &mut W, stats: &CatalogStats) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
    writeln!(out, "{} catalog", stats.kind)?;
    out.reset()?;

    writeln!(out, "Events:           {}", stats.events)?;
    if let (Some(first), Some(last)) = (stats.first_timestamp, stats.last_timestamp) {
        writeln!(out, "First:            {} UTC", format_timestamp(first))?;
        writeln!(out, "Last:             {} UTC", format_timestamp(last))?;
    }
    writeln!(
        out,
        "Saros range:      {}..={} ({} populated)",
        stats.series_first, stats.series_last, stats.series_populated
    )?;
    if let Some((saros, n)) = stats.largest_series {
        writeln!(out, "Largest series:   {} ({} events)", saros, n)?;
    }
    writeln!(out, "Artifact size:    {}", format_size(stats.bytes))?;

    if !stats.types.is_empty() {
        writeln!(out)?;
        writeln!(out, "Events by type:")?;
        for (label, n) in &stats.types {
            writeln!(out, "  {:4} {}", label, n)?;
        }
    }

    Ok(())
}

pub fn print_report<W: WriteColor>(out: &mut W, kind: Kind, report: &VerifyReport) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
    writeln!(out, "{} catalog", kind)?;
    out.reset()?;

    writeln!(
        out,
        "Checked {} events, {} series, {} members",
        report.events, report.series_checked, report.members_checked
    )?;
    if let Some(saros) = report.max_gap_series {
        writeln!(
            out,
            "Largest gap:      {:.1} years (saros {})",
            report.max_gap_years, saros
        )?;
    }

    if report.is_clean() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        writeln!(out, "OK")?;
        return out.reset();
    }

    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
    writeln!(out, "{} issues", report.issues.len())?;
    out.reset()?;
    for issue in &report.issues {
        print_issue(out, issue)?;
    }
    Ok(())
}

fn print_issue<W: WriteColor>(out: &mut W, issue: &Issue) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
    write!(out, "  - ")?;
    out.reset()?;
    writeln!(out, "{}", issue)
}

/// One `batch` line: query timestamp then the closest event, tab separated
pub fn print_batch_line<W: Write>(out: &mut W, ts: Timestamp, result: &EventResult) -> io::Result<()> {
    match &result.eclipse {
        Some(e) => writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            ts,
            e.timestamp,
            format_timestamp(e.timestamp),
            e.info.type_abbrev(),
            e.saros_number()
        ),
        None => writeln!(out, "{}\t-", ts),
    }
}

/// Solar and lunar events in one time-ordered list
///
/// Stable: at equal timestamps solar events come first.
pub fn merge_by_time(solar: Vec<Event>, lunar: Vec<Event>) -> Vec<Event> {
    let mut merged = solar;
    merged.extend(lunar);
    merged.sort_by_key(|e| e.timestamp);
    merged
}

/// `S [T+]` or `L [Nx]`; unknown codes print as their number
fn csv_type(info: &EventInfo) -> String {
    let (prefix, name) = match info {
        EventInfo::Solar(s) => ('S', s.eclipse_type().map(|t| t.abbrev())),
        EventInfo::Lunar(l) => ('L', l.eclipse_type().map(|t| t.abbrev())),
    };
    match name {
        Some(name) => format!("{} [{}]", prefix, name),
        None => format!("{} [{}]", prefix, info.type_code()),
    }
}

/// Write `saros_number,type,date,time` CSV, header first
///
/// Dates are `DD.MM.YYYY`, times `HH:MM:SS`, both UTC.
pub fn write_csv<W: Write>(out: W, events: &[Event]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["saros_number", "type", "date", "time"])?;
    for e in events {
        let (date, time) = match DateTime::from_timestamp(e.timestamp, 0) {
            Some(dt) => (
                dt.format("%d.%m.%Y").to_string(),
                dt.format("%H:%M:%S").to_string(),
            ),
            None => (e.timestamp.to_string(), String::new()),
        };
        writer.write_record([e.saros_number().to_string(), csv_type(&e.info), date, time])?;
    }
    writer.flush()?;
    Ok(())
}

/// Pretty JSON on its own line
pub fn print_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GlobalIndex, LunarInfo, SolarInfo};
    use termcolor::NoColor;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp(-1), "1969-12-31 23:59:59");
        // 2024-04-08 18:17:16 UTC
        assert_eq!(format_timestamp(1_712_600_236), "2024-04-08 18:17:16");
        // 0000-03-01 is day -719468
        assert_eq!(format_timestamp(-719_468 * 86_400), "0000-03-01 00:00:00");
        assert!(format_timestamp(-719_469 * 86_400 * 2).starts_with('-'));
        assert_eq!(format_timestamp(i64::MAX), format!("{}s", i64::MAX));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("1970-01-01"), Some(0));
        assert_eq!(parse_date("2024-04-08T18:17:16"), Some(1_712_600_236));
        assert_eq!(parse_date("2024-04-08 18:17:16Z"), Some(1_712_600_236));
        assert_eq!(parse_date("1969-12-31T23:59"), Some(-60));
        assert_eq!(parse_date("0000-03-01"), Some(-719_468 * 86_400));
        assert!(parse_date("-0500-01-01").unwrap() < parse_date("0000-01-01").unwrap());
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn test_parse_date_rejects_impossible_days() {
        for s in ["2024-02-31", "2023-02-29", "2024-04-31", "2024-04-31T12:00:00", "2024-01-00"] {
            assert_eq!(parse_date(s), None, "{}", s);
            assert_eq!(parse_date_end(s), None, "{}", s);
        }
        // Leap day exists in 2024 and in 2000, not in 1900
        assert!(parse_date("2024-02-29").is_some());
        assert!(parse_date("2000-02-29").is_some());
        assert_eq!(parse_date("1900-02-29"), None);
    }

    #[test]
    fn test_parse_date_end() {
        assert_eq!(parse_date_end("1970-01-01"), Some(86_399));
        assert_eq!(parse_date_end("1970-01-01T12:00:00"), Some(43_200));
        assert_eq!(parse_date_end("1969-12-31"), Some(-1));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(DURATION_NA), "-");
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(268), "4m28s");
        assert_eq!(format_duration(3_725), "1h02m05s");
    }

    fn event(ts: i64, index: GlobalIndex) -> Event {
        Event {
            timestamp: ts,
            global_index: index,
            info: EventInfo::Solar(SolarInfo {
                saros_number: 139,
                saros_pos: 30,
                type_code: 13,
                central_duration: 268,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_print_result_text() {
        let result = EventResult {
            eclipse: Some(event(1_712_600_236, 1)),
            saros_prev: Some(event(1_144_000_000, 0)),
            saros_next: None,
        };
        let mut out = NoColor::new(Vec::new());
        print_result(&mut out, Kind::Solar, &result).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();

        assert!(text.starts_with("solar eclipse\n"));
        assert!(text.contains("2024-04-08 18:17:16 UTC"));
        assert!(text.contains("T   saros 139 #30"));
        assert!(text.contains("central 4m28s"));
        assert!(text.lines().last().unwrap().ends_with("none"));
    }

    #[test]
    fn test_print_empty_result() {
        let mut out = NoColor::new(Vec::new());
        print_result(&mut out, Kind::Lunar, &EventResult::default()).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_batch_line() {
        let mut out = Vec::new();
        print_batch_line(&mut out, 5, &EventResult::default()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "5\t-\n");
    }

    #[test]
    fn test_json_window() {
        let window = SeriesWindow::empty(42);
        let mut out = Vec::new();
        print_json(&mut out, &window).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["saros_number"], 42);
        assert!(v["past"].is_null());
    }

    fn lunar(ts: i64, saros: u8, type_code: u8) -> Event {
        Event {
            timestamp: ts,
            global_index: 0,
            info: EventInfo::Lunar(LunarInfo {
                saros_number: saros,
                type_code,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_merge_by_time_keeps_solar_first_on_ties() {
        let solar = vec![event(100, 0), event(300, 1)];
        let lunar = vec![lunar(50, 120, 7), lunar(100, 121, 0), lunar(400, 122, 4)];

        let merged = merge_by_time(solar, lunar);
        let order: Vec<(i64, Kind)> = merged.iter().map(|e| (e.timestamp, e.info.kind())).collect();
        assert_eq!(
            order,
            [
                (50, Kind::Lunar),
                (100, Kind::Solar),
                (100, Kind::Lunar),
                (300, Kind::Solar),
                (400, Kind::Lunar),
            ]
        );
    }

    #[test]
    fn test_write_csv() {
        let events = [event(1_712_600_236, 0), lunar(-1, 120, 8), lunar(0, 121, 200)];
        let mut out = Vec::new();
        write_csv(&mut out, &events).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "saros_number,type,date,time",
                "139,S [T],08.04.2024,18:17:16",
                "120,L [T+],31.12.1969,23:59:59",
                "121,L [200],01.01.1970,00:00:00",
            ]
        );
    }

    #[test]
    fn test_write_csv_header_only_when_empty() {
        let mut out = Vec::new();
        write_csv(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "saros_number,type,date,time\n");
    }
}
