//! # wifi-dwell
//!
//! Periodic Wi-Fi visibility collector.
//!
//! Every interval the collector runs `netsh wlan show networks mode=bssid`,
//! parses the per-BSSID report into flat observation rows (signal quality,
//! estimated dBm, channel, band, BSS load) and appends them to a CSV file.
//! BSSIDs are stored only as salted SHA-256 fingerprints. The resulting
//! time series feeds later dwell-time analysis.
//!
//! ## Examples
//!
//! ```text
//! wifi-dwell
//! wifi-dwell --interval-sec 30 --duration-min 240 --output lobby.csv
//! WIFI_DWELL_SALT=rotated-secret wifi-dwell
//! ```

mod error;
mod ingest;
mod normalize;
mod parser;
mod record;
mod scanner;
mod sink;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

#[derive(Parser)]
#[command(name = "wifi-dwell")]
#[command(version, about = "Periodic Wi-Fi BSSID visibility collector for dwell-time analysis")]
struct Cli {
    /// Seconds to wait between capture cycles.
    #[arg(long, default_value_t = 60)]
    interval_sec: u64,

    /// Total run time in minutes.
    #[arg(long, default_value_t = 60)]
    duration_min: u64,

    /// CSV file to append observations to. Created with a header row if
    /// missing.
    #[arg(short, long, env = "WIFI_DWELL_OUTPUT", default_value = "ingested_wifi_scans.csv")]
    output: PathBuf,

    /// Secret salt for BSSID fingerprints.
    #[arg(long, env = "WIFI_DWELL_SALT", default_value = normalize::DEFAULT_SALT, hide_default_value = true)]
    salt: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    // ── Ctrl-C handler ──────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || {
            log::info!("Interrupt received, stopping after the current cycle …");
            running.store(false, Ordering::Relaxed);
        }) {
            log::warn!("Could not install Ctrl-C handler: {e}");
        }
    }

    // ── Collection loop ─────────────────────────────────────────────────
    let cfg = ingest::IngestConfig {
        interval: Duration::from_secs(cli.interval_sec),
        duration: Duration::from_secs(cli.duration_min.saturating_mul(60)),
        output: cli.output,
        salt: cli.salt,
    };
    let mut source = scanner::CommandScanner::netsh();

    if let Err(e) = ingest::run(&cfg, &mut source, Arc::clone(&running)) {
        log::error!("Collection failed: {e}");
        std::process::exit(1);
    }

    log::info!("Done.");
}
