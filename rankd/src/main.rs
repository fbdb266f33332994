use anyhow::Result;
use bedrock_probe::{BedrockUdpTransport, ProbeClient, ProbeSettings};
use clap::{Parser, Subcommand, ValueEnum};
use fleet::{FleetAggregator, FleetOptions, RunError, RunSummary};
use log::{error, info, warn};
use records::{DataPaths, SnapshotStore};
use resolve::SystemResolver;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

mod config;

use config::{Config, Settings};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat { Text, Json }

#[derive(Debug, Parser)]
#[command(name = "rankd", version, about = "Bedrock server fleet poller and ranker")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./rankd.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Root directory for snapshots, fleet files and statistics
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// JSON address list, re-read before every run
    #[arg(long, global = true)]
    addresses: Option<PathBuf>,
    /// Seconds between runs under `serve` (default 60)
    #[arg(long, global = true)]
    interval_secs: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Poll the fleet once and exit
    Run {
        /// Summary format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Poll the fleet on a fixed interval until interrupted
    Serve,
}

fn build_fleet(settings: &Settings) -> Result<FleetAggregator> {
    let store = SnapshotStore::open_or_create(DataPaths::under(&settings.data_dir))?;
    let resolver = Arc::new(SystemResolver { timeout: settings.dns_timeout });
    let probe = ProbeSettings {
        ping_attempts: settings.ping_attempts,
        query_attempts: settings.query_attempts,
        timeout: settings.timeout,
    };
    let client = ProbeClient::new(Arc::new(BedrockUdpTransport), probe);
    let options = FleetOptions {
        addresses: settings.addresses.clone(),
        default_port: settings.default_port,
        utc_offset: settings.utc_offset,
    };
    Ok(FleetAggregator::new(resolver, client, store, options))
}

fn report(result: &Result<RunSummary, RunError>) {
    match result {
        Ok(s) => {
            for f in &s.write_failures {
                warn!("not written: {} ({})", f.path.display(), f.error);
            }
        }
        Err(RunError::AlreadyRunning) => warn!("previous run still in progress, skipping this tick"),
        Err(e) => error!("run failed: {}", e),
    }
}

async fn serve(fleet: Arc<FleetAggregator>, every: Duration) {
    info!("polling every {}s", every.as_secs());
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut runs: Vec<JoinHandle<()>> = Vec::new();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                runs.retain(|h| !h.is_finished());
                let f = fleet.clone();
                runs.push(tokio::spawn(async move { report(&f.run().await) }));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }
    if fleet.is_running() {
        info!("waiting for the current run to finish");
    }
    for h in runs {
        let _ = h.await;
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let file = config::load_config(cli.config.as_deref());
    let flags = Config {
        data_dir: cli.data_dir,
        addresses: cli.addresses,
        interval_secs: cli.interval_secs,
        ..Config::default()
    };
    match cli.command {
        Commands::Version => {
            println!("rankd {} (core {})", env!("CARGO_PKG_VERSION"), rank_core::version());
        }
        Commands::Run { format } => {
            let settings = Settings::merge(flags, file)?;
            let rt = tokio::runtime::Runtime::new()?;
            let fleet = build_fleet(&settings)?;
            let result = rt.block_on(async { fleet.run().await });
            report(&result);
            let summary = result?;
            match format {
                OutputFormat::Text => println!(
                    "{} players on {}/{} servers, {} plugins ({} failed writes)",
                    summary.totals.numplayers,
                    summary.totals.online_servers,
                    summary.totals.servers,
                    summary.totals.plugins,
                    summary.write_failures.len()
                ),
                OutputFormat::Json => {
                    let obj = serde_json::json!({
                        "time": summary.time,
                        "totals": summary.totals,
                        "top": summary.online.iter().take(10).map(|s| s.simplify()).collect::<Vec<_>>(),
                        "failed_writes": summary.write_failures.iter().map(|f| f.path.display().to_string()).collect::<Vec<_>>(),
                    });
                    println!("{}", serde_json::to_string(&obj)?);
                }
            }
        }
        Commands::Serve => {
            let settings = Settings::merge(flags, file)?;
            let rt = tokio::runtime::Runtime::new()?;
            let fleet = Arc::new(build_fleet(&settings)?);
            rt.block_on(serve(fleet, settings.interval));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_flag_is_accepted_anywhere() {
        let before = Cli::try_parse_from(["rankd", "--interval-secs", "30", "serve"]).unwrap();
        assert_eq!(before.interval_secs, Some(30));
        assert!(matches!(before.command, Commands::Serve));
        let after = Cli::try_parse_from(["rankd", "serve", "--interval-secs", "45", "--data-dir", "/srv/rank"]).unwrap();
        assert_eq!(after.interval_secs, Some(45));
        assert_eq!(after.data_dir, Some(PathBuf::from("/srv/rank")));
        let run = Cli::try_parse_from(["rankd", "run", "--format", "json"]).unwrap();
        assert!(matches!(run.command, Commands::Run { format: OutputFormat::Json }));
        assert_eq!(run.interval_secs, None);
    }
}
