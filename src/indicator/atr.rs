use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::model::Candle;

/// Average True Range with Wilder smoothing.
///
/// True range needs the previous close, so the first candle only contributes
/// its close. The first ATR value is the plain mean of `period` true ranges.
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }
}

/// `max(high - low, |high - prev_close|, |low - prev_close|)`
pub fn true_range(candle: &Candle, prev_close: f64) -> f64 {
    let high_low = candle.high - candle.low;
    let high_prev = (candle.high - prev_close).abs();
    let low_prev = (candle.low - prev_close).abs();
    high_low.max(high_prev).max(low_prev)
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        "atr"
    }

    fn required_candles(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, candles: &[Candle]) -> Result<Vec<f64>, Report<IndicatorError>> {
        if candles.len() < self.required_candles() {
            bail!(IndicatorError::InsufficientData {
                required: self.required_candles(),
                available: candles.len(),
            });
        }

        let ranges: Vec<f64> = candles
            .windows(2)
            .map(|w| true_range(&w[1], w[0].close))
            .collect();

        let period = self.period as f64;
        let mut atr = ranges[..self.period].iter().sum::<f64>() / period;
        let mut results = vec![atr];

        for &tr in &ranges[self.period..] {
            atr = (atr * (period - 1.0) + tr) / period;
            results.push(atr);
        }

        Ok(results)
    }
}
