//! ODDSIQ: value pick and accumulator engine for football betting markets
//!
//! Entry point. Loads configuration, initialises structured logging, then
//! either evaluates one snapshot (`evaluate`) or serves the HTTP API
//! (`serve`) until Ctrl+C.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use oddsiq::api::{self, ApiState};
use oddsiq::config::AppConfig;
use oddsiq::data::FileSnapshotSource;
use oddsiq::storage;
use oddsiq::strategy::{Engine, EvaluationReport};

#[derive(Debug, clap::Parser)]
#[clap(name = "oddsiq", version, about = "Value pick and accumulator engine")]
struct Args {
    /// config file (defaults to $ODDSIQ_CONFIG, then config.toml)
    #[clap(short = 'c', long)]
    config: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Evaluate one snapshot and print the report as JSON
    Evaluate {
        /// snapshot file (defaults to [snapshot].path)
        #[clap(short = 's', long)]
        snapshot: Option<PathBuf>,

        /// bankroll override
        #[clap(short = 'b', long)]
        bankroll: Option<f64>,

        /// write the report here instead of stdout
        #[clap(short = 'o', long)]
        output: Option<PathBuf>,
    },
    /// Serve the HTTP API
    Serve {
        #[clap(short = 'p', long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(AppConfig::resolve_path);
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    info!(
        name = %cfg.app.name,
        config = %config_path,
        default_bankroll = cfg.app.default_bankroll,
        currency = %cfg.app.currency,
        "ODDSIQ starting up"
    );

    let engine = Engine::new(cfg.staking.clone(), cfg.limits.clone())
        .context("Invalid staking configuration")?;

    // Ctrl+C cancels whatever is running
    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received.");
            signal.cancel();
        }
    });

    match args.command {
        Command::Evaluate {
            snapshot,
            bankroll,
            output,
        } => {
            let path = snapshot.unwrap_or_else(|| PathBuf::from(&cfg.snapshot.path));
            let report = evaluate(engine, &cfg, &path, bankroll, shutdown).await?;
            match output {
                Some(out) => storage::save_report(&report, &out)?,
                None => println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                ),
            }
        }
        Command::Serve { port } => {
            let state = Arc::new(ApiState {
                engine: Arc::new(engine),
                source: Arc::new(FileSnapshotSource::new(&cfg.snapshot.path)),
                default_bankroll: cfg.app.default_bankroll,
                lookahead: chrono::Duration::days(cfg.snapshot.lookahead_days),
                evaluation_timeout: std::time::Duration::from_millis(cfg.server.evaluation_timeout_ms),
            });
            api::serve(state, port.unwrap_or(cfg.server.port), shutdown).await?;
            info!("ODDSIQ shut down cleanly.");
        }
    }

    Ok(())
}

/// Load a snapshot and run the full evaluation off the async runtime.
async fn evaluate(
    engine: Engine,
    cfg: &AppConfig,
    path: &std::path::Path,
    bankroll: Option<f64>,
    cancel: CancellationToken,
) -> Result<EvaluationReport> {
    let snapshot = storage::load_snapshot(path)?;
    let bankroll = bankroll
        .or(snapshot.bankroll)
        .unwrap_or(cfg.app.default_bankroll);
    let as_of = snapshot.as_of.unwrap_or_else(Utc::now);
    if snapshot.as_of.is_none() {
        warn!("Snapshot has no as_of, using current time");
    }
    let input = snapshot.into_input(bankroll, as_of, chrono::Duration::days(cfg.snapshot.lookahead_days));

    let report = tokio::task::spawn_blocking(move || engine.evaluate(&input, &cancel))
        .await
        .context("Evaluation task failed")?
        .context("Evaluation failed")?;

    log_report(&report);
    Ok(report)
}

/// Log a human-readable evaluation summary.
fn log_report(report: &EvaluationReport) {
    let picks = &report.picks.summary;
    let accs = &report.accumulators.summary;
    info!(
        picks = picks.total_picks,
        value_bets = picks.total_value_bets,
        pick_stake = format!("{:.2}", picks.total_suggested_stake),
        expected_value = format!("{:.2}", picks.total_expected_value),
        accumulators = accs.total_accumulators,
        doubles = accs.total_doubles,
        trebles = accs.total_trebles,
        accumulator_stake = format!("{:.2}", accs.total_suggested_stake),
        best_accumulator_ev = format!("{:+.1}%", accs.best_ev * 100.0),
        rejected = report.rejections.len(),
        "Evaluation summary"
    );
}

/// Initialise the `tracing` subscriber. Logs go to stderr so reports can
/// be piped from stdout.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("oddsiq=info"));

    let json_logging = std::env::var("ODDSIQ_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
