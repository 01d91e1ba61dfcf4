//! # Lightbar Bridge
//!
//! Sniff and replay Xiaomi monitor lightbar remote frames through an
//! nRF24L01+ wired to a Linux single-board computer.
//!
//! # Examples
//!
//! ```bash
//! lightbar-bridge probe
//! lightbar-bridge scan --duration 20
//! lightbar-bridge scan --coverage
//! lightbar-bridge toggle 0x701634
//! lightbar-bridge --config /etc/lightbar.toml monitor
//! ```
//!
//! Responses are printed as JSON on stdout; logs go to stderr (and to a daily
//! rolling file when `logging.file_dir` is configured).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use lightbar_bridge::api::{
    parse_remote_id, ApiError, ProbeResponse, ScanRequest, ScanResponse, StatusResponse, TransmitResponse,
};
use lightbar_bridge::config::{Config, LoggingConfig};
use lightbar_bridge::error::LightbarError;
use lightbar_bridge::link::{RadioSession, ScanMode};
use lightbar_bridge::radio::RppalTransport;

/// Exit status when the SPI bus or CE line failed
const EXIT_TRANSPORT: u8 = 2;

/// Xiaomi lightbar remote bridge for nRF24L01+ transceivers
#[derive(Parser)]
#[command(name = "lightbar-bridge", version, about)]
struct Cli {
    /// TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the transceiver answers on the bus
    Probe,

    /// Listen for a remote and print its identity
    Scan {
        /// Scan length in seconds (clamped to 1-60)
        #[arg(short, long)]
        duration: Option<u64>,

        /// Keep going until every button category has been seen
        #[arg(long)]
        coverage: bool,
    },

    /// Broadcast the power toggle command as the given remote
    Toggle {
        /// 24-bit remote identity in hex, e.g. 0x701634
        #[arg(value_parser = parse_remote_id_arg)]
        remote_id: u32,
    },

    /// Scan repeatedly, printing the published status after each scan,
    /// until Ctrl+C
    Monitor {
        /// Length of each scan in seconds (clamped to 1-60)
        #[arg(short, long)]
        duration: Option<u64>,
    },
}

fn parse_remote_id_arg(s: &str) -> std::result::Result<u32, String> {
    parse_remote_id(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Lightbar Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            let code = exit_code_for(&e);
            if code == EXIT_TRANSPORT {
                warn!("Check the SPI bus, chip select and CE pin in the [radio] configuration");
            }
            let body = ApiError::new(format!("{:#}", e));
            if let Ok(json) = serde_json::to_string(&body) {
                println!("{}", json);
            }
            ExitCode::from(code)
        }
    }
}

fn exit_code_for(e: &anyhow::Error) -> u8 {
    let transport = e
        .chain()
        .filter_map(|cause| cause.downcast_ref::<LightbarError>())
        .any(LightbarError::is_transport);
    if transport {
        EXIT_TRANSPORT
    } else {
        1
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::load(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

/// Install the subscriber; the returned guard flushes the log file on drop
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_ascii_lowercase()))
        .context("Invalid log filter")?;
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match &config.file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "lightbar-bridge.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .context("Failed to install log subscriber")?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init()
                .context("Failed to install log subscriber")?;
            Ok(None)
        }
    }
}

async fn run(command: Command, config: &Config) -> Result<()> {
    let session = RadioSession::new(RppalTransport::new(config.spi_settings()), config.link_timing());
    debug!("Link timing: {:?}", session.timing());

    match command {
        Command::Probe => {
            let report = session.check_connection().await?;
            print_json(&ProbeResponse::from(&report))
        }
        Command::Scan { duration, coverage } => {
            probe_at_startup(&session).await?;

            let request = ScanRequest {
                duration_s: duration,
                mode: coverage.then_some(ScanMode::CommandCoverage),
            };
            let result = session
                .scan(
                    request.effective_duration(config.scan.default_duration_s),
                    request.effective_mode(config.scan.mode),
                )
                .await?;
            print_json(&ScanResponse::from(&result))
        }
        Command::Toggle { remote_id } => {
            probe_at_startup(&session).await?;

            let report = session.transmit_power_toggle(remote_id).await?;
            print_json(&TransmitResponse::from(&report))
        }
        Command::Monitor { duration } => {
            probe_at_startup(&session).await?;

            let request = ScanRequest { duration_s: duration, mode: None };
            let duration = request.effective_duration(config.scan.default_duration_s);
            let mode = request.effective_mode(config.scan.mode);
            info!("Monitoring in {:?} scans, press Ctrl+C to exit", duration);

            let (stop_tx, stop_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, stopping after the current scan...");
                    let _ = stop_tx.send(true);
                }
            });

            repeat_until_stopped(&stop_rx, || async {
                session.scan(duration, mode).await?;
                print_json(&StatusResponse::from(&session.last_scan_result()))
            })
            .await
        }
    }
}

/// Run `step` back to back until `stop` turns true
///
/// A step always runs to completion, so a scan is never dropped with CE high
/// and its snapshot unpublished.
async fn repeat_until_stopped<F, Fut>(stop: &watch::Receiver<bool>, mut step: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    while !*stop.borrow() {
        step().await?;
    }
    info!("Shutting down...");
    Ok(())
}

/// The transceiver must answer before a scan or transmit is attempted
async fn probe_at_startup(session: &RadioSession<RppalTransport>) -> Result<()> {
    let report = session
        .check_connection()
        .await
        .context("nRF24L01+ not detected")?;
    info!(
        "Transceiver detected (status 0x{:02X}, config 0x{:02X})",
        report.status_nop, report.config
    );
    Ok(())
}

fn print_json<T: Serialize>(body: &T) -> Result<()> {
    println!("{}", serde_json::to_string(body)?);
    Ok(())
}
