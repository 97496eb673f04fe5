//! Turns candle history into fixed-width training samples.

pub mod features;
pub mod metrics;
pub mod split;
pub mod window;

use error_stack::{Report, bail};
use serde::{Deserialize, Serialize};

use crate::error::DatasetError;
use crate::model::CandleSeries;

/// Number of values in one [`FeatureRow`].
pub const FEATURE_COUNT: usize = 13;

/// Normalized per-candle features, in this order:
/// open, high, low and close over close, volume ratio, SMA9, SMA20, EMA9
/// (all over close), RSI14 / 100, MACD / close * 100, Bollinger width over
/// close, ATR14 over close, stochastic %K / 100.
pub type FeatureRow = [f64; FEATURE_COUNT];

/// Forward relative returns, one per configured horizon.
pub type LabelVector = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceSample {
    /// `time_steps` consecutive feature rows, oldest first.
    pub window: Vec<FeatureRow>,
    pub label: LabelVector,
}

/// Temporally ordered split: every validation sample follows every train
/// sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub train: Vec<SequenceSample>,
    pub validation: Vec<SequenceSample>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn default_time_steps() -> usize {
    30
}

fn default_horizons() -> Vec<usize> {
    vec![1, 3, 6, 12, 24]
}

fn default_validation_fraction() -> f64 {
    0.2
}

fn default_min_candles() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetConfig {
    /// Rows per sequence window; also the first candle index that gets a row.
    #[serde(default = "default_time_steps")]
    pub time_steps: usize,
    /// Label horizons, in candles.
    #[serde(default = "default_horizons")]
    pub horizons: Vec<usize>,
    #[serde(default = "default_validation_fraction")]
    pub validation_fraction: f64,
    #[serde(default = "default_min_candles")]
    pub min_candles: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            time_steps: default_time_steps(),
            horizons: default_horizons(),
            validation_fraction: default_validation_fraction(),
            min_candles: default_min_candles(),
        }
    }
}

/// Features, windows and split in one pass.
///
/// A series long enough for feature rows but too short for a single window
/// is `InsufficientData`.
pub fn build(series: &CandleSeries, config: &DatasetConfig) -> Result<Dataset, Report<DatasetError>> {
    let (rows, labels) = features::build_features(series, config)?;
    let samples = window::window(&rows, &labels, config.time_steps);
    let dataset = split::split(samples, config.validation_fraction)?;
    if dataset.is_empty() {
        bail!(DatasetError::InsufficientData {
            required: 2 * config.time_steps + 1,
            available: series.len(),
        });
    }
    Ok(dataset)
}
