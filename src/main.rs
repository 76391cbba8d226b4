//! CLI entry point: offline backtests, node ranking, and the API server.

use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use bess_backtest::analysis::rank_by_oracle_profit;
use bess_backtest::api::{self, AppState};
use bess_backtest::config::RunConfig;
use bess_backtest::data::{self, GridStatusClient, ResponseCache};
use bess_backtest::io::export::export_csv;
use bess_backtest::model::PricedInterval;
use bess_backtest::sim;

#[derive(Parser)]
#[command(
    name = "bess-backtest",
    version,
    about = "Battery arbitrage backtester over nodal LMP data"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a backtest over a saved Grid Status JSON response.
    Backtest {
        /// Saved Grid Status JSON response.
        #[arg(long)]
        data: PathBuf,
        /// TOML run config (battery + strategy).
        #[arg(long)]
        config: PathBuf,
        /// Ledger CSV output path.
        #[arg(long, default_value = "results/dispatch.csv")]
        out: PathBuf,
        /// Limit to the first N intervals (0 = all).
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
    /// Score saved datasets by arbitrage potential.
    Rank {
        /// Saved Grid Status JSON responses, one or more.
        #[arg(long, required = true, num_args = 1..)]
        data: Vec<PathBuf>,
    },
    /// Serve the HTTP API.
    Serve {
        #[arg(long, default_value_t = 3000)]
        port: u16,
        /// Grid Status API key used for every upstream fetch.
        #[arg(long, env = "GRIDSTATUS_API_KEY", hide_env_values = true)]
        api_key: String,
        /// Directory holding battery preset TOML files.
        #[arg(long, default_value = "batteries")]
        battery_dir: PathBuf,
        /// Enable the development response cache with this TTL in seconds.
        #[arg(long)]
        cache_ttl_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Backtest {
            data,
            config,
            out,
            limit,
        } => cmd_backtest(&data, &config, &out, limit),
        Command::Rank { data } => cmd_rank(&data),
        Command::Serve {
            port,
            api_key,
            battery_dir,
            cache_ttl_secs,
        } => cmd_serve(port, api_key, battery_dir, cache_ttl_secs).await,
    }
}

fn cmd_backtest(data: &Path, config: &Path, out: &Path, limit: usize) -> anyhow::Result<()> {
    let response = data::load_gridstatus_json(data)
        .with_context(|| format!("loading market data from {}", data.display()))?;
    let mut intervals = response.data;
    if limit > 0 && limit < intervals.len() {
        intervals.truncate(limit);
    }

    let cfg = RunConfig::from_toml_file(config)
        .with_context(|| format!("loading config from {}", config.display()))?;
    let (params, initial_soc) = cfg.battery.resolve()?;
    let spec = cfg.strategy.to_spec()?;

    let outcome = sim::run_backtest(&intervals, params, initial_soc, &spec)?;

    if let Some(dir) = out.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating output directory {}", dir.display()))?;
        }
    }
    export_csv(&outcome.result.ledger, out)
        .with_context(|| format!("writing ledger to {}", out.display()))?;

    println!(
        "Wrote {} rows to {}",
        outcome.result.ledger.len(),
        out.display()
    );
    println!(
        "Total PnL=${:.2} Final SOC={:.3}",
        outcome.summary.total_pnl, outcome.summary.final_soc
    );
    Ok(())
}

fn cmd_rank(paths: &[PathBuf]) -> anyhow::Result<()> {
    let mut by_location: HashMap<String, Vec<PricedInterval>> = HashMap::new();
    for path in paths {
        let response = data::load_gridstatus_json(path)
            .with_context(|| format!("loading market data from {}", path.display()))?;
        for it in response.data {
            by_location.entry(it.location.clone()).or_default().push(it);
        }
    }

    let ranked = rank_by_oracle_profit(&by_location);
    println!(
        "{:<4} {:<20} {:<8} {:>8} {:>12} {:>10} {:>10} {:>14}",
        "rank", "location", "market", "count", "spread", "min_lmp", "max_lmp", "oracle_profit"
    );
    for (i, p) in ranked.iter().enumerate() {
        println!(
            "{:<4} {:<20} {:<8} {:>8} {:>12.2} {:>10.2} {:>10.2} {:>14.2}",
            i + 1,
            p.location,
            p.market,
            p.count,
            p.spread_p95_p05,
            p.min_lmp,
            p.max_lmp,
            p.oracle_profit
        );
    }
    Ok(())
}

async fn cmd_serve(
    port: u16,
    api_key: String,
    battery_dir: PathBuf,
    cache_ttl_secs: Option<u64>,
) -> anyhow::Result<()> {
    let cache = cache_ttl_secs.map(|secs| {
        let cache = ResponseCache::new(Duration::from_secs(secs));
        cache.spawn_janitor(Duration::from_secs(60));
        tracing::info!(ttl_secs = secs, "response cache enabled (development use)");
        cache
    });

    let client = GridStatusClient::new(api_key, None, cache);
    let state = Arc::new(AppState {
        client,
        battery_dir,
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    api::serve(state, addr).await.context("server failed")?;
    Ok(())
}
