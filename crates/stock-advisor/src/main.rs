//! stock-advisor: risk, advice and similar-stock reports from daily price history.
//!
//! Usage:
//!   cargo run -p stock-advisor -- build-matrix --out similarity.json
//!   cargo run -p stock-advisor -- build-matrix --symbols AAPL MSFT GOOGL --period 1y --out sim.json
//!   cargo run -p stock-advisor -- analyze AAPL --period 5y
//!   cargo run -p stock-advisor -- analyze AAPL --compare

use std::path::PathBuf;
use std::sync::Arc;

use analysis_core::{HistorySource, Period};
use analysis_orchestrator::{
    compare_peers, default_universe, normalize_symbol, normalize_symbols, AdvisorConfig, HistoryCache,
    StockAdvisor,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use peer_similarity::build_similarity;

/// Exit code for "no analysis available" outcomes (unknown symbol, short or flat history).
const EXIT_NO_ANALYSIS: i32 = 2;

#[derive(Parser)]
#[command(name = "stock-advisor")]
#[command(about = "Equity risk, advice and similar-stock reports", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the universe and write its similarity matrix as JSON
    BuildMatrix {
        /// Symbols to include (defaults to the built-in universe)
        #[arg(long, num_args = 1..)]
        symbols: Vec<String>,

        /// History window: 1y, 5y or 10y
        #[arg(long, default_value = "10y")]
        period: Period,

        /// Scaler JSON (defaults to ADVICE_SCALER_PATH; one of the two is required)
        #[arg(long)]
        scaler: Option<PathBuf>,

        /// Output path for the matrix
        #[arg(long)]
        out: PathBuf,
    },

    /// Analyse one symbol and print the report as JSON
    Analyze {
        symbol: String,

        /// History window: 1y, 5y or 10y (defaults to ANALYSIS_PERIOD)
        #[arg(long)]
        period: Option<Period>,

        /// Also fetch the recommended peers and print a comparison
        #[arg(long)]
        compare: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stock_advisor=info,peer_similarity=info,polygon_client=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AdvisorConfig::from_env();

    match cli.command {
        Commands::BuildMatrix {
            symbols,
            period,
            scaler,
            out,
        } => build_matrix(&config, symbols, period, scaler, out).await,
        Commands::Analyze {
            symbol,
            period,
            compare,
        } => analyze(&config, &symbol, period.unwrap_or(config.period), compare).await,
    }
}

async fn build_matrix(
    config: &AdvisorConfig,
    symbols: Vec<String>,
    period: Period,
    scaler_path: Option<PathBuf>,
    out: PathBuf,
) -> anyhow::Result<()> {
    let symbols = if symbols.is_empty() {
        default_universe()
    } else {
        normalize_symbols(&symbols)
    };
    let scaler = config.similarity_scaler(scaler_path.as_deref())?;

    let polygon: Arc<dyn HistorySource> = Arc::new(config.polygon_client()?);
    tracing::info!(
        "build-matrix: {} symbols, period={}, concurrency={}",
        symbols.len(),
        period,
        config.fetch_concurrency
    );

    let cache = HistoryCache::new();
    let loaded = cache
        .prefetch(polygon, &symbols, period, config.fetch_concurrency)
        .await;
    tracing::info!("Fetched history for {}/{} symbols", loaded, symbols.len());

    let matrix = tokio::task::spawn_blocking(move || build_similarity(symbols.as_slice(), &cache, period, &scaler))
        .await
        .context("similarity build task failed")?;

    matrix
        .to_json_file(&out)
        .with_context(|| format!("writing similarity matrix to {}", out.display()))?;
    tracing::info!("Wrote {}x{} matrix to {}", matrix.len(), matrix.len(), out.display());
    Ok(())
}

async fn analyze(config: &AdvisorConfig, symbol: &str, period: Period, compare: bool) -> anyhow::Result<()> {
    let advisor = StockAdvisor::from_config(config)?;
    let polygon = Arc::new(config.polygon_client()?);
    let symbol = normalize_symbol(symbol);

    let report = match advisor.analyze_symbol(polygon.as_ref(), &symbol, period).await {
        Ok(report) => report,
        Err(e) if e.is_data_condition() => {
            tracing::error!("No analysis available for {} ({}): {}", symbol, period, e);
            std::process::exit(EXIT_NO_ANALYSIS);
        }
        Err(e) => return Err(e).with_context(|| format!("fetching history for {symbol}")),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    tracing::info!(
        "{}: {} {}, advice {}, ${:.0} -> ${:.2}",
        report.symbol,
        report.safety_meter,
        report.risk.trust_score.stars(),
        report.prediction,
        analysis_orchestrator::PROJECTION_NOTIONAL,
        report.projected_returns
    );

    if compare && !report.recommendations.is_empty() {
        let cache = HistoryCache::new();
        cache
            .prefetch(polygon, &report.recommendations, period, config.fetch_concurrency)
            .await;
        let peers = compare_peers(&cache, report.recommendations.as_slice(), period);
        println!("{}", serde_json::to_string_pretty(&peers)?);
    }

    Ok(())
}
