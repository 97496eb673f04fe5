use error_stack::{Report, ResultExt, bail};

use crate::dataset::{DatasetConfig, FeatureRow, LabelVector};
use crate::error::{DatasetError, IndicatorError};
use crate::indicator::atr::Atr;
use crate::indicator::bollinger::BollingerBands;
use crate::indicator::ma::{Ema, Sma};
use crate::indicator::macd::Macd;
use crate::indicator::rsi::Rsi;
use crate::indicator::stochastic::Stochastic;
use crate::indicator::{Indicator, is_insufficient, pad_front};
use crate::model::{Candle, CandleSeries};

/// Neutral fill for oscillators bounded to [0, 100].
const OSCILLATOR_DEFAULT: f64 = 50.0;
/// Neutral fill for price-scaled indicators.
const PRICE_DEFAULT: f64 = 0.0;

/// Indicator outputs padded to the length of the series.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumns {
    pub sma9: Vec<f64>,
    pub sma20: Vec<f64>,
    pub sma50: Vec<f64>,
    pub sma200: Vec<f64>,
    pub ema9: Vec<f64>,
    pub ema20: Vec<f64>,
    pub rsi14: Vec<f64>,
    /// MACD line only.
    pub macd: Vec<f64>,
    pub bollinger_width: Vec<f64>,
    pub atr14: Vec<f64>,
    pub stochastic_k: Vec<f64>,
}

impl FeatureColumns {
    pub fn compute(candles: &[Candle]) -> Result<Self, Report<IndicatorError>> {
        let len = candles.len();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let bollinger_width = padded(
            BollingerBands::new(20, 2.0)?
                .calculate_prices(&closes)
                .map(|bands| bands.iter().map(|b| b.width()).collect()),
            len,
            PRICE_DEFAULT,
        )?;

        Ok(Self {
            sma9: column(&Sma::new(9)?, candles, PRICE_DEFAULT)?,
            sma20: column(&Sma::new(20)?, candles, PRICE_DEFAULT)?,
            sma50: column(&Sma::new(50)?, candles, PRICE_DEFAULT)?,
            sma200: column(&Sma::new(200)?, candles, PRICE_DEFAULT)?,
            ema9: column(&Ema::new(9)?, candles, PRICE_DEFAULT)?,
            ema20: column(&Ema::new(20)?, candles, PRICE_DEFAULT)?,
            rsi14: column(&Rsi::new(14)?, candles, OSCILLATOR_DEFAULT)?,
            macd: padded(Macd::new(12, 26, 9)?.line(&closes), len, PRICE_DEFAULT)?,
            bollinger_width,
            atr14: column(&Atr::new(14)?, candles, PRICE_DEFAULT)?,
            stochastic_k: column(&Stochastic::new(14, 3)?, candles, OSCILLATOR_DEFAULT)?,
        })
    }
}

fn column(
    indicator: &dyn Indicator,
    candles: &[Candle],
    default: f64,
) -> Result<Vec<f64>, Report<IndicatorError>> {
    padded(indicator.calculate(candles), candles.len(), default)
        .attach_with(|| format!("indicator: {}", indicator.name()))
}

/// A warm-up longer than the series leaves the whole column at `default`.
fn padded(
    values: Result<Vec<f64>, Report<IndicatorError>>,
    len: usize,
    default: f64,
) -> Result<Vec<f64>, Report<IndicatorError>> {
    match values {
        Ok(values) => Ok(pad_front(&values, len, default)),
        Err(report) if is_insufficient(&report) => Ok(vec![default; len]),
        Err(report) => Err(report),
    }
}

/// One feature row and one label vector for every candle index from
/// `config.time_steps` on.
pub fn build_features(
    series: &CandleSeries,
    config: &DatasetConfig,
) -> Result<(Vec<FeatureRow>, Vec<LabelVector>), Report<DatasetError>> {
    if series.len() < config.min_candles {
        bail!(DatasetError::InsufficientData {
            required: config.min_candles,
            available: series.len(),
        });
    }
    if config.time_steps == 0 {
        bail!(DatasetError::InvalidParameter {
            name: "time_steps must be > 0".into(),
        });
    }

    let candles = series.candles();
    if let Some(index) = candles.iter().position(|c| c.close <= 0.0) {
        bail!(DatasetError::InvalidParameter {
            name: format!("close at index {index} must be > 0"),
        });
    }

    let columns = FeatureColumns::compute(candles).change_context(DatasetError::Indicator)?;
    let closes = series.closes();

    let mut rows = Vec::with_capacity(candles.len().saturating_sub(config.time_steps));
    let mut labels = Vec::with_capacity(rows.capacity());

    for i in config.time_steps..candles.len() {
        let candle = &candles[i];
        let price = candle.close;

        let row: FeatureRow = [
            candle.open / price,
            candle.high / price,
            candle.low / price,
            1.0,
            volume_ratio(candles[i - 1].volume, candle.volume),
            columns.sma9[i] / price,
            columns.sma20[i] / price,
            columns.ema9[i] / price,
            columns.rsi14[i] / 100.0,
            columns.macd[i] / price * 100.0,
            columns.bollinger_width[i] / price,
            columns.atr14[i] / price,
            columns.stochastic_k[i] / 100.0,
        ];
        rows.push(row);
        labels.push(forward_returns(&closes, i, &config.horizons));
    }

    Ok((rows, labels))
}

/// `(close[i + h] - close[i]) / close[i]` per horizon, or exactly 0 past the
/// end of the series.
pub fn forward_returns(closes: &[f64], index: usize, horizons: &[usize]) -> LabelVector {
    let base = closes[index];
    horizons
        .iter()
        .map(|&h| match closes.get(index + h) {
            Some(&future) if base != 0.0 => (future - base) / base,
            _ => 0.0,
        })
        .collect()
}

fn volume_ratio(previous: f64, current: f64) -> f64 {
    if previous == 0.0 { 1.0 } else { current / previous }
}
