//! The collection loop: scan, parse, persist, sleep, until the deadline.
//!
//! Runs on the calling thread. Any fault ends the run; rows appended by
//! earlier cycles stay on disk.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;

use crate::error::IngestError;
use crate::normalize::Fingerprinter;
use crate::parser;
use crate::record::{self, ObservationRecord};
use crate::scanner::ScanSource;
use crate::sink::CsvSink;

/// Longest single sleep while suspended, so an interrupt is noticed quickly.
const SLEEP_SLICE: Duration = Duration::from_secs(1);

/// Configuration for a collection run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Total run time, measured from loop start.
    pub duration: Duration,
    /// CSV file the records are appended to.
    pub output: PathBuf,
    /// Salt mixed into every BSSID fingerprint.
    pub salt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Running,
    Stopped,
}

/// Decide whether another cycle starts. Checked only at loop-top, so the
/// last cycle may finish after the deadline. `None` is a deadline too far
/// away to represent; only an interrupt stops such a run.
fn next_state(now: Instant, deadline: Option<Instant>, interrupted: bool) -> LoopState {
    if interrupted || deadline.is_some_and(|d| now >= d) {
        LoopState::Stopped
    } else {
        LoopState::Running
    }
}

/// Outcome of a single capture cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub rows: usize,
    pub first: Option<ObservationRecord>,
}

/// Totals for a whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub rows: u64,
}

/// One capture → parse → persist pass.
pub fn run_cycle<S: ScanSource + ?Sized>(
    source: &mut S,
    fingerprinter: &Fingerprinter,
    sink: &CsvSink,
) -> Result<CycleReport, IngestError> {
    let text = source.scan()?;
    let records = record::assemble(
        parser::parse_report(&text),
        fingerprinter,
        record::capture_time,
    )?;
    let rows = sink.append(&records)?;
    Ok(CycleReport {
        rows,
        first: records.into_iter().next(),
    })
}

/// Run the collection loop until the deadline passes or `running` is
/// cleared.
pub fn run<S: ScanSource + ?Sized>(
    cfg: &IngestConfig,
    source: &mut S,
    running: Arc<AtomicBool>,
) -> Result<RunSummary, IngestError> {
    let fingerprinter = Fingerprinter::new(cfg.salt.clone());
    let sink = CsvSink::new(cfg.output.clone());
    sink.ensure_header()?;

    println!(
        "\n{}",
        format!(
            "  Collecting for {} min, every {} s, into {}",
            cfg.duration.as_secs() / 60,
            cfg.interval.as_secs(),
            sink.path().display()
        )
        .bold()
    );

    let deadline = Instant::now().checked_add(cfg.duration);
    let mut summary = RunSummary::default();

    while next_state(Instant::now(), deadline, !running.load(Ordering::Relaxed))
        == LoopState::Running
    {
        let report = run_cycle(source, &fingerprinter, &sink)?;
        summary.cycles += 1;
        summary.rows += report.rows as u64;
        log::info!("Cycle {}: appended {} rows", summary.cycles, report.rows);
        print_progress(&report);

        suspend(cfg.interval, &running);
    }

    println!(
        "\n{}",
        format!(
            "  Data ingestion completed: {} cycles, {} rows.",
            summary.cycles, summary.rows
        )
        .bold()
        .cyan()
    );
    Ok(summary)
}

/// Sleep for `interval`, waking early if `running` is cleared.
fn suspend(interval: Duration, running: &AtomicBool) {
    let wake_at = Instant::now().checked_add(interval);
    while running.load(Ordering::Relaxed) {
        let now = Instant::now();
        let slice = match wake_at {
            Some(at) if now >= at => break,
            Some(at) => (at - now).min(SLEEP_SLICE),
            None => SLEEP_SLICE,
        };
        std::thread::sleep(slice);
    }
}

fn print_progress(report: &CycleReport) {
    let Some(r) = &report.first else {
        log::info!("No access points observed this cycle");
        return;
    };
    println!(
        "  {} {} | {} | Sig={}% | Stations={} | Util={}%",
        "SCAN".green().bold(),
        r.ts_utc.to_rfc3339(),
        r.ssid.yellow(),
        display(r.signal_percent),
        display(r.connected_stations),
        display(r.channel_utilization_pct),
    );
}

fn display<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
