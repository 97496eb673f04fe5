//! Training-data preparation for the `prepare` command.

use std::path::{Path, PathBuf};

use chrono::Utc;
use error_stack::{Report, ResultExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analyzer::Analyzer;
use crate::dataset::metrics::{direction_accuracy, persistence_baseline};
use crate::dataset::{self, Dataset, DatasetConfig, FEATURE_COUNT, LabelVector};
use crate::error::{AnalyzeError, ExchangeError};
use crate::model::{CandleSeries, TimeFrame};
use crate::storage::Storage;
use crate::store::{ModelArtifact, ModelStore, artifact_path};

#[derive(Debug, Clone, Copy)]
pub struct PrepareOptions {
    /// Candles to fetch (or read from the cache).
    pub limit: usize,
    /// Build from cached candles only, without touching the exchange.
    pub cached: bool,
}

#[derive(Debug)]
pub struct Prepared {
    pub dataset: Dataset,
    pub artifact: ModelArtifact,
}

/// Gather history for `symbol` and turn it into a dataset plus the artifact
/// metadata describing it.
///
/// Fresh candles are written through to `storage`; a failed write is logged
/// and does not abort the run.
pub async fn prepare(
    analyzer: &Analyzer,
    storage: &dyn Storage,
    config: &DatasetConfig,
    symbol: &str,
    timeframe: TimeFrame,
    options: PrepareOptions,
) -> Result<Prepared, Report<AnalyzeError>> {
    let series = load_series(analyzer, storage, symbol, timeframe, options).await?;

    let dataset = dataset::build(&series, config)
        .change_context(AnalyzeError::Dataset)
        .attach_with(|| format!("symbol: {symbol}, timeframe: {timeframe}"))?;

    let labels: Vec<LabelVector> = dataset.validation.iter().map(|s| s.label.clone()).collect();
    let predictions = persistence_baseline(&labels, &config.horizons);
    let baseline = direction_accuracy(&predictions, &labels);

    let artifact = ModelArtifact {
        id: Uuid::new_v4(),
        symbol: symbol.to_owned(),
        timeframe,
        created_at: Utc::now(),
        time_steps: config.time_steps,
        feature_count: FEATURE_COUNT,
        horizons: config.horizons.clone(),
        train_samples: dataset.train.len(),
        validation_samples: dataset.validation.len(),
        baseline_direction_accuracy: baseline,
        // the persistence baseline is the only model there is
        confidence: baseline,
    };

    info!(
        symbol,
        %timeframe,
        candles = series.len(),
        train = artifact.train_samples,
        validation = artifact.validation_samples,
        baseline_accuracy = ?baseline,
        "dataset prepared"
    );

    Ok(Prepared { dataset, artifact })
}

async fn load_series(
    analyzer: &Analyzer,
    storage: &dyn Storage,
    symbol: &str,
    timeframe: TimeFrame,
    options: PrepareOptions,
) -> Result<CandleSeries, Report<AnalyzeError>> {
    if !timeframe.is_supported() {
        return Err(Report::new(ExchangeError::UnsupportedTimeframe {
            timeframe: timeframe.to_string(),
        })
        .change_context(AnalyzeError::Fetch));
    }

    let exchange = analyzer.exchange();
    if options.cached {
        return storage
            .get_recent_candles(exchange, symbol, timeframe, options.limit)
            .await
            .change_context(AnalyzeError::Cache);
    }

    let series = analyzer
        .fetch_with_retry(symbol, timeframe, options.limit)
        .await
        .change_context(AnalyzeError::Fetch)?;

    if let Err(report) = storage.upsert_candles(exchange, &series).await {
        warn!(symbol, %timeframe, error = ?report, "failed to cache candles");
    }

    Ok(series)
}

/// Write the dataset as JSON to `dataset_path` and the artifact into
/// `models_dir`. Returns the artifact path.
pub async fn save(
    prepared: &Prepared,
    dataset_path: &Path,
    store: &dyn ModelStore,
    models_dir: &Path,
) -> Result<PathBuf, Report<AnalyzeError>> {
    if let Some(parent) = dataset_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .change_context(AnalyzeError::Output)
            .attach_with(|| format!("cannot create directory: {}", parent.display()))?;
    }
    let body = serde_json::to_vec(&prepared.dataset).change_context(AnalyzeError::Output)?;
    tokio::fs::write(dataset_path, body)
        .await
        .change_context(AnalyzeError::Output)
        .attach_with(|| format!("path: {}", dataset_path.display()))?;

    let artifact = &prepared.artifact;
    let path = artifact_path(models_dir, &artifact.symbol, artifact.timeframe);
    store
        .save(artifact, &path)
        .await
        .change_context(AnalyzeError::Output)?;

    info!(
        dataset = %dataset_path.display(),
        artifact = %path.display(),
        "dataset and artifact written"
    );
    Ok(path)
}
