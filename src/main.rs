mod analyzer;
mod config;
mod dataset;
mod error;
mod exchange;
mod indicator;
mod model;
mod notifier;
mod plan;
mod predictor;
mod prepare;
mod scheduler;
mod snapshot;
mod storage;
mod store;
mod strategy;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use analyzer::{Analysis, Analyzer, AnalyzerSettings};
use config::AppConfig;
use exchange::CandleSource;
use exchange::binance::BinanceExchange;
use model::{ExchangeKind, TimeFrame};
use notifier::terminal::TerminalNotifier;
use notifier::{Notifier, ReportKind};
use predictor::artifact::ArtifactPredictor;
use predictor::fixed::StaticPredictor;
use predictor::{ConfidencePredictor, PredictorKind};
use prepare::PrepareOptions;
use scheduler::{ScheduleSettings, Scheduler};
use storage::Storage;
use storage::sqlite::SqliteStorage;
use store::json::JsonModelStore;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("storage error")]
    Storage,
    #[display("exchange error")]
    Exchange,
    #[display("analysis error")]
    Analyze,
    #[display("runtime error")]
    Runtime,
}

#[derive(Parser)]
#[command(name = "coin-analyzer", about = "Technical-analysis trade signals for crypto pairs")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one symbol and print the decision and trade plan
    Analyze {
        symbol: String,
        /// Defaults to `general.timeframe`
        #[arg(short, long, value_parser = parse_timeframe)]
        timeframe: Option<TimeFrame>,
        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Analyze every configured coin and print a digest
    AnalyzeAll {
        #[arg(short, long, value_parser = parse_timeframe)]
        timeframe: Option<TimeFrame>,
    },
    /// Run the digest and urgent scans until ctrl+c
    Watch,
    /// Build a training dataset and model artifact for one symbol
    Prepare {
        symbol: String,
        #[arg(short, long, value_parser = parse_timeframe)]
        timeframe: Option<TimeFrame>,
        /// Candles of history to use
        #[arg(long, default_value_t = 1000)]
        limit: usize,
        /// Dataset output path; defaults to `<data_dir>/datasets/<symbol>_<tf>.json`
        #[arg(long)]
        out: Option<PathBuf>,
        /// Use cached candles instead of fetching
        #[arg(long)]
        cached: bool,
    },
}

fn parse_timeframe(value: &str) -> Result<TimeFrame, String> {
    TimeFrame::from_str(value).ok_or_else(|| format!("unknown timeframe \"{value}\""))
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::load(Path::new(&cli.config)).change_context(AppError::Config)?;

    init_tracing(&config);

    let source = build_source(&config)?;
    let predictor = build_predictor(&config);
    let analyzer = Arc::new(Analyzer::new(
        source,
        predictor,
        AnalyzerSettings::from_config(&config),
    ));

    match cli.command {
        Command::Analyze {
            symbol,
            timeframe,
            json,
        } => {
            let timeframe = timeframe.unwrap_or(config.general.timeframe);
            analyze_one(&config, &analyzer, &symbol, timeframe, json).await
        }
        Command::AnalyzeAll { timeframe } => {
            let timeframe = timeframe.unwrap_or(config.general.timeframe);
            analyze_all(&config, &analyzer, timeframe).await
        }
        Command::Watch => watch(config, analyzer).await,
        Command::Prepare {
            symbol,
            timeframe,
            limit,
            out,
            cached,
        } => {
            let timeframe = timeframe.unwrap_or(config.general.timeframe);
            let options = PrepareOptions { limit, cached };
            prepare_one(&config, &analyzer, &symbol, timeframe, options, out).await
        }
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

fn build_source(config: &AppConfig) -> Result<Arc<dyn CandleSource>, Report<AppError>> {
    match config.exchange.kind {
        ExchangeKind::Binance => {
            let exchange = BinanceExchange::new(&config.exchange).change_context(AppError::Exchange)?;
            Ok(Arc::new(exchange))
        }
    }
}

fn build_predictor(config: &AppConfig) -> Arc<dyn ConfidencePredictor> {
    match config.predictor.kind {
        PredictorKind::Static => Arc::new(StaticPredictor::new(config.predictor.static_confidence)),
        PredictorKind::Artifact => Arc::new(ArtifactPredictor::new(
            Arc::new(JsonModelStore),
            config.predictor.models_dir.clone(),
        )),
    }
}

async fn open_storage(config: &AppConfig) -> Result<Arc<dyn Storage>, Report<AppError>> {
    let storage = SqliteStorage::open(&config.database_path())
        .await
        .change_context(AppError::Storage)?;
    Ok(Arc::new(storage))
}

async fn analyze_one(
    config: &AppConfig,
    analyzer: &Analyzer,
    symbol: &str,
    timeframe: TimeFrame,
    json: bool,
) -> Result<(), Report<AppError>> {
    let symbol = symbol.to_ascii_uppercase();
    let name = config
        .coin(&symbol)
        .map_or(symbol.as_str(), |coin| coin.display_name());

    let analysis = analyzer
        .analyze(&symbol, name, timeframe)
        .await
        .change_context(AppError::Analyze)?;

    if json {
        let body = serde_json::to_string_pretty(&analysis).change_context(AppError::Runtime)?;
        println!("{body}");
    } else {
        println!("{}", notifier::format_analysis(&analysis));
    }
    Ok(())
}

async fn analyze_all(
    config: &AppConfig,
    analyzer: &Analyzer,
    timeframe: TimeFrame,
) -> Result<(), Report<AppError>> {
    if config.coins.is_empty() {
        warn!("no coins configured; nothing to do");
        return Ok(());
    }

    let outcomes = analyzer.analyze_all(&config.coins, timeframe).await;
    let mut failed = Vec::new();
    let mut analyses = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(analysis) => analyses.push(analysis),
            Err(_) => failed.push(outcome.symbol),
        }
    }

    let reported: Vec<&Analysis> = analyses.iter().collect();
    println!("{}", notifier::format_report(ReportKind::Digest, &reported));
    if !failed.is_empty() {
        println!("failed: {}", failed.join(", "));
    }
    Ok(())
}

async fn watch(config: AppConfig, analyzer: Arc<Analyzer>) -> Result<(), Report<AppError>> {
    if config.coins.is_empty() {
        warn!("no coins configured; nothing to watch");
        return Ok(());
    }

    let storage = open_storage(&config).await?;
    let notifier: Arc<dyn Notifier> = Arc::new(TerminalNotifier);
    let scheduler = Scheduler::new(
        analyzer,
        storage,
        notifier,
        config.coins.clone(),
        ScheduleSettings::from_config(&config.schedule),
    );

    scheduler
        .run_until(tokio::signal::ctrl_c(), Duration::from_secs(5))
        .await
        .change_context(AppError::Runtime)?;

    info!("shutdown complete");
    Ok(())
}

async fn prepare_one(
    config: &AppConfig,
    analyzer: &Analyzer,
    symbol: &str,
    timeframe: TimeFrame,
    options: PrepareOptions,
    out: Option<PathBuf>,
) -> Result<(), Report<AppError>> {
    let symbol = symbol.to_ascii_uppercase();
    let storage = open_storage(config).await?;

    let prepared = prepare::prepare(
        analyzer,
        storage.as_ref(),
        &config.dataset,
        &symbol,
        timeframe,
        options,
    )
    .await
    .change_context(AppError::Analyze)?;

    let dataset_path = out.unwrap_or_else(|| {
        Path::new(&config.general.data_dir)
            .join("datasets")
            .join(format!("{}_{}.json", symbol.to_lowercase(), timeframe.as_str()))
    });
    let artifact_path = prepare::save(
        &prepared,
        &dataset_path,
        &JsonModelStore,
        Path::new(&config.predictor.models_dir),
    )
    .await
    .change_context(AppError::Analyze)?;

    let artifact = &prepared.artifact;
    println!(
        "{symbol} {timeframe}: {} train / {} validation samples",
        artifact.train_samples, artifact.validation_samples
    );
    match artifact.baseline_direction_accuracy {
        Some(accuracy) => println!("persistence baseline direction accuracy: {accuracy:.1}%"),
        None => println!("persistence baseline direction accuracy: n/a"),
    }
    println!("dataset:  {}", dataset_path.display());
    println!("artifact: {}", artifact_path.display());
    Ok(())
}
