use error_stack::{Report, bail};
use serde::Serialize;

use crate::error::IndicatorError;
use crate::indicator::ma::Ema;
use crate::indicator::{Indicator, close_prices};
use crate::model::Candle;

/// One MACD output point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdValue {
    /// Fast EMA minus slow EMA.
    pub value: f64,
    /// EMA of the MACD line.
    pub signal: f64,
    pub histogram: f64,
}

pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    ) -> Result<Self, Report<IndicatorError>> {
        if fast_period == 0 || slow_period == 0 || signal_period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "all periods must be > 0".into(),
            });
        }
        if fast_period >= slow_period {
            bail!(IndicatorError::InvalidParameter {
                name: "fast_period must be < slow_period".into(),
            });
        }
        Ok(Self {
            fast_period,
            slow_period,
            signal_period,
        })
    }

    /// Calculate the raw MACD line (fast EMA - slow EMA).
    ///
    /// Output starts at the candle where the slow EMA first exists.
    pub fn line(&self, prices: &[f64]) -> Result<Vec<f64>, Report<IndicatorError>> {
        let fast_ema = Ema::new(self.fast_period)?.calculate_prices(prices)?;
        let slow_ema = Ema::new(self.slow_period)?.calculate_prices(prices)?;

        // Align: slow_ema is shorter by (slow_period - fast_period) elements
        let offset = self.slow_period - self.fast_period;
        Ok(fast_ema[offset..]
            .iter()
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect())
    }

    /// Calculate full MACD points, starting where the signal line first exists.
    pub fn calculate_prices(
        &self,
        prices: &[f64],
    ) -> Result<Vec<MacdValue>, Report<IndicatorError>> {
        if prices.len() < self.required_candles() {
            bail!(IndicatorError::InsufficientData {
                required: self.required_candles(),
                available: prices.len(),
            });
        }

        let macd_line = self.line(prices)?;
        let signal_line = Ema::new(self.signal_period)?.calculate_prices(&macd_line)?;
        // Signal is shorter by (signal_period - 1)
        let signal_offset = self.signal_period - 1;

        Ok(macd_line[signal_offset..]
            .iter()
            .zip(signal_line.iter())
            .map(|(&value, &signal)| MacdValue {
                value,
                signal,
                histogram: value - signal,
            })
            .collect())
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        "macd"
    }

    fn required_candles(&self) -> usize {
        self.slow_period + self.signal_period - 1
    }

    /// Returns MACD line values only.
    fn calculate(&self, candles: &[Candle]) -> Result<Vec<f64>, Report<IndicatorError>> {
        Ok(self
            .calculate_prices(&close_prices(candles))?
            .into_iter()
            .map(|m| m.value)
            .collect())
    }
}
