//! Point-in-time indicator readings for the live decision path.

use error_stack::{Report, bail};
use serde::Serialize;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, is_insufficient};
use crate::indicator::atr::Atr;
use crate::indicator::bollinger::{Bands, BollingerBands};
use crate::indicator::ma::Sma;
use crate::indicator::macd::{Macd, MacdValue};
use crate::indicator::obv::Obv;
use crate::indicator::rsi::Rsi;
use crate::indicator::stochastic::{Stochastic, StochasticValue};
use crate::model::CandleSeries;

/// Fewest candles [`compute`] accepts.
pub const MIN_CANDLES: usize = 30;

/// How many candles back the "24h" price change looks.
pub const PRICE_CHANGE_LOOKBACK: usize = 24;

/// Indicator values at the last candle of a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub sma10: f64,
    pub sma20: f64,
    /// `None` until 50 candles are available.
    pub sma50: Option<f64>,
    pub rsi14: f64,
    /// `None` until the signal line exists (34 candles).
    pub macd: Option<MacdValue>,
    pub bollinger: Bands,
    pub stochastic: StochasticValue,
    pub atr14: f64,
    pub obv: f64,
    pub current_price: f64,
    /// Percent change against the close 24 candles earlier.
    pub price_change_24h: Option<f64>,
}

/// Compute a fresh snapshot from the trailing end of `series`.
pub fn compute(series: &CandleSeries) -> Result<IndicatorSnapshot, Report<IndicatorError>> {
    if series.len() < MIN_CANDLES {
        bail!(IndicatorError::InsufficientData {
            required: MIN_CANDLES,
            available: series.len(),
        });
    }

    let candles = series.candles();
    let closes = series.closes();

    let sma10 = trailing(Sma::new(10)?.last(&closes), "sma10")?;
    let sma20 = trailing(Sma::new(20)?.last(&closes), "sma20")?;
    let sma50 = Sma::new(50)?.last(&closes);

    let rsi14 = trailing(Rsi::new(14)?.calculate_prices(&closes)?.last().copied(), "rsi14")?;

    let macd = match Macd::new(12, 26, 9)?.calculate_prices(&closes) {
        Ok(points) => points.last().copied(),
        Err(report) if is_insufficient(&report) => None,
        Err(report) => return Err(report),
    };

    let bollinger = trailing(
        BollingerBands::new(20, 2.0)?
            .calculate_prices(&closes)?
            .last()
            .copied(),
        "bollinger",
    )?;
    let stochastic = trailing(
        Stochastic::new(14, 3)?.calculate_full(candles)?.last().copied(),
        "stochastic",
    )?;
    let atr14 = trailing(Atr::new(14)?.calculate(candles)?.last().copied(), "atr14")?;
    let obv = Obv.calculate(candles)?.last().copied().unwrap_or(0.0);

    let current_price = trailing(series.last_close(), "close")?;

    Ok(IndicatorSnapshot {
        sma10,
        sma20,
        sma50,
        rsi14,
        macd,
        bollinger,
        stochastic,
        atr14,
        obv,
        current_price,
        price_change_24h: price_change(&closes, PRICE_CHANGE_LOOKBACK),
    })
}

/// Percent change between the last close and the close `lookback` candles
/// before it; `None` without enough history or with a zero base price.
pub fn price_change(closes: &[f64], lookback: usize) -> Option<f64> {
    let last = *closes.last()?;
    let base_index = closes.len().checked_sub(lookback + 1)?;
    let base = closes[base_index];
    if base == 0.0 {
        return None;
    }
    Some((last - base) / base * 100.0)
}

fn trailing<T>(value: Option<T>, name: &str) -> Result<T, Report<IndicatorError>> {
    value.ok_or_else(|| {
        Report::new(IndicatorError::InvalidSeries {
            reason: format!("{name} produced no output"),
        })
    })
}
