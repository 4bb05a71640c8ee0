//! DX cluster client CLI - submit spots and stream the live feed.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dxcluster_client::{
    client::{ClusterEvent, ClusterMonitor},
    config::Config,
    parser::{looks_like_spot, parse_dx_line},
    stats::ClusterStats,
    submit::{SpotSubmitter, SubmissionRequest},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// DX cluster client - submit spots and stream the live feed
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream, parse, and tally spots from a cluster feed
    Monitor(MonitorArgs),

    /// Submit a single spot to the cluster
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
struct MonitorArgs {
    /// Callsign to use for feed login
    #[arg(short, long, env = "DXC_CALLSIGN")]
    callsign: Option<String>,

    /// Feed node hostname
    #[arg(long, env = "DXC_FEED_HOST")]
    host: Option<String>,

    /// Feed node port
    #[arg(long, env = "DXC_FEED_PORT")]
    port: Option<u16>,

    /// Print each parsed spot (verbose)
    #[arg(short, long)]
    verbose: bool,

    /// Disable auto-reconnect
    #[arg(long)]
    no_reconnect: bool,

    /// Maximum runtime in seconds (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_runtime: u64,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    /// Spotter callsign
    #[arg(short, long)]
    spotter: String,

    /// DX callsign that was heard
    #[arg(short, long)]
    dx: String,

    /// Frequency in kHz
    #[arg(short, long)]
    freq: String,

    /// Free-text comment
    #[arg(short, long, default_value = "")]
    comment: String,

    /// Use the non-broadcasting test command
    #[arg(long)]
    testing: bool,

    /// Submission node hostname
    #[arg(long, env = "DXC_HOST")]
    host: Option<String>,

    /// Submission node port
    #[arg(long, env = "DXC_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = Config::load()?;
    config.validate()?;

    match cli.command {
        Command::Monitor(args) => run_monitor(config, args).await,
        Command::Submit(args) => run_submit(config, args).await,
    }
}

async fn run_monitor(config: Config, args: MonitorArgs) -> Result<()> {
    let mut monitor_config = config.monitor_config();
    if let Some(callsign) = args.callsign {
        monitor_config.callsign = callsign;
    }
    if let Some(host) = args.host {
        monitor_config.host = host;
    }
    if let Some(port) = args.port {
        monitor_config.port = port;
    }
    if args.no_reconnect {
        monitor_config.auto_reconnect = false;
    }

    info!("DX cluster monitor starting...");
    info!("Callsign: {}", monitor_config.callsign);
    info!("Feed: {}:{}", monitor_config.host, monitor_config.port);

    let stats = Arc::new(ClusterStats::new());

    // Create shutdown signal
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received");
        let _ = shutdown_tx_clone.send(true);
    });

    // Optional max runtime
    if args.max_runtime > 0 {
        let shutdown_tx_clone = shutdown_tx.clone();
        let max_runtime = args.max_runtime;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(max_runtime)).await;
            info!("Max runtime reached");
            let _ = shutdown_tx_clone.send(true);
        });
    }

    // Start stats printer
    let stats_clone = Arc::clone(&stats);
    let stats_interval = config.stats_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(stats_interval));
        loop {
            interval.tick().await;
            println!("\n{}", stats_clone.summary());
        }
    });

    // Optional Prometheus endpoint
    if config.metrics_enabled {
        let stats_clone = Arc::clone(&stats);
        let metrics_port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) =
                dxcluster_client::metrics::start_metrics_server(metrics_port, stats_clone).await
            {
                error!("Metrics server failed: {}", e);
            }
        });
    }

    let monitor = ClusterMonitor::new(monitor_config);
    let mut events = monitor.connect().await?;

    // Main event loop
    loop {
        tokio::select! {
            // Check for shutdown
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }

            // Process feed events
            event = events.recv() => {
                match event {
                    Some(ClusterEvent::Line(line)) => {
                        process_line(&line, &stats, args.verbose);
                    }
                    Some(ClusterEvent::Connected) => {
                        info!("Connected to cluster feed");
                    }
                    Some(ClusterEvent::Disconnected(reason)) => {
                        warn!("Disconnected: {}", reason);
                    }
                    Some(ClusterEvent::Error(e)) => {
                        error!("Error: {}", e);
                    }
                    None => {
                        // Channel closed
                        break;
                    }
                }
            }
        }
    }

    // Print final statistics
    println!("\n\nFINAL STATISTICS");
    println!("{}", stats.summary());

    Ok(())
}

async fn run_submit(config: Config, args: SubmitArgs) -> Result<()> {
    let frequency: f64 = args
        .freq
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid frequency: {}", args.freq))?;

    let request = SubmissionRequest {
        spotter_callsign: args.spotter,
        dx_callsign: args.dx,
        frequency,
        comment: args.comment,
        testing: args.testing,
    };

    let mut connect = config.connect_config();
    if let Some(host) = args.host {
        connect.host = host;
    }
    if let Some(port) = args.port {
        connect.port = port;
    }

    info!("Submitting spot to {}:{}", connect.host, connect.port);

    let submitter = SpotSubmitter::new(connect, config.dialect());
    let result = submitter.submit(&request).await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Process a single line from the cluster feed.
fn process_line(line: &str, stats: &ClusterStats, verbose: bool) {
    stats.record_bytes(line.len() as u64);

    // Quick filter for non-spot lines
    if !looks_like_spot(line) {
        stats.record_non_spot();
        debug!("Non-spot line: {}", line);
        return;
    }

    // Try to parse the spot
    match parse_dx_line(line) {
        Some(spot) => {
            stats.record_spot(&spot);

            if verbose {
                println!("{}", spot);
            }
        }
        None => {
            stats.record_parse_failure();
            warn!("Could not parse spot line: {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_line_valid_spot() {
        let stats = ClusterStats::new();
        let line = "DX de SP3OCC:     3702.0  SP100IARU    95th PZK - 100th IARU SSB    28 1442Z JO92";

        process_line(line, &stats, false);

        assert_eq!(
            stats
                .spots_parsed
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[test]
    fn test_process_line_non_spot() {
        let stats = ClusterStats::new();
        let line = "Welcome to the DXUSA cluster node";

        process_line(line, &stats, false);

        assert_eq!(
            stats
                .non_spot_lines
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[test]
    fn test_process_line_unparseable_spot() {
        let stats = ClusterStats::new();
        let line = "DX de SP3OCC: mangled beyond recognition";

        process_line(line, &stats, false);

        assert_eq!(
            stats
                .parse_failures
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }
}
