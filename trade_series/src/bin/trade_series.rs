use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trade_series::{
    config::{EngineConfig, load_config_from_env, load_config_path},
    rpc::{self, RpcError, order_history},
    sources::{
        chain::{ChainLedgerSource, MemoryChain},
        history::{HistoricTransaction, HistoryLiveSource, MemoryHistory},
    },
    SeriesEngine,
};

#[derive(Parser)]
#[command(version, about = "Trade series CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run a command against fixture sources.
    Call {
        /// JSON array of ledger blocks.
        #[arg(long, value_name = "FILE")]
        ledger: PathBuf,
        /// JSON array of live transactions.
        #[arg(long, value_name = "FILE")]
        live: Option<PathBuf>,
        /// TOML engine config; falls back to TRADE_SERIES_CONFIG.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        method: String,
        #[arg(allow_hyphen_values = true)]
        params: Vec<String>,
    },
    /// Print the typed parameters of a command.
    Convert {
        method: String,
        #[arg(allow_hyphen_values = true)]
        params: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Convert { method, params } => {
            let values = convert_or_exit(&method, &params);
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        Cmd::Call {
            ledger,
            live,
            config,
            method,
            params,
        } => {
            let values = convert_or_exit(&method, &params);
            if method != order_history::METHOD {
                println!("{}", serde_json::to_string_pretty(&values)?);
                return Ok(());
            }

            // 1) Config
            let cfg = match config {
                Some(path) => load_config_path(&path)?,
                None => load_config_from_env()?,
            };

            // 2) Fixture sources
            let engine = build_engine(&ledger, live.as_deref(), cfg)?;

            // 3) Query
            let query = match order_history::query_from_params(&values, &engine.config().query) {
                Ok(q) => q,
                Err(err) => fail(&err),
            };
            let candles = engine.get_aggregate_series(&query)?;
            info!(candles = candles.len(), "query answered");
            println!("{}", serde_json::to_string_pretty(&candles)?);
        }
    }

    Ok(())
}

fn build_engine(
    ledger: &std::path::Path,
    live: Option<&std::path::Path>,
    cfg: EngineConfig,
) -> Result<SeriesEngine> {
    let raw = std::fs::read_to_string(ledger)
        .with_context(|| format!("reading ledger fixture {}", ledger.display()))?;
    let chain: MemoryChain = serde_json::from_str(&raw)
        .with_context(|| format!("parsing ledger fixture {}", ledger.display()))?;
    info!(blocks = chain.len(), "ledger fixture loaded");

    let txs: Vec<HistoricTransaction> = match live {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading live fixture {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing live fixture {}", path.display()))?
        }
        None => Vec::new(),
    };

    Ok(SeriesEngine::with_config(
        Arc::new(ChainLedgerSource::new(chain)),
        Arc::new(HistoryLiveSource::new(MemoryHistory::from_transactions(txs))),
        cfg,
    ))
}

fn convert_or_exit(method: &str, params: &[String]) -> Vec<serde_json::Value> {
    match rpc::convert_values(method, params) {
        Ok(values) => values,
        Err(err) => fail(&err),
    }
}

fn fail(err: &RpcError) -> ! {
    eprintln!("{}", err.render());
    std::process::exit(1)
}
