use error_stack::{Report, bail};
use serde::Serialize;

use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::indicator::ma::Sma;
use crate::model::Candle;

/// %K of a window whose high equals its low.
const FLAT_RANGE_K: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StochasticValue {
    pub k: f64,
    pub d: f64,
}

/// Stochastic oscillator: %K over `k_period` candles, %D as an SMA of %K.
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Stochastic {
    pub fn new(k_period: usize, d_period: usize) -> Result<Self, Report<IndicatorError>> {
        if k_period == 0 || d_period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "all periods must be > 0".into(),
            });
        }
        Ok(Self { k_period, d_period })
    }

    /// Raw %K series, one value per full `k_period` window.
    pub fn percent_k(&self, candles: &[Candle]) -> Result<Vec<f64>, Report<IndicatorError>> {
        if candles.len() < self.k_period {
            bail!(IndicatorError::InsufficientData {
                required: self.k_period,
                available: candles.len(),
            });
        }

        Ok(candles
            .windows(self.k_period)
            .map(|window| {
                let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
                let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
                let close = window[window.len() - 1].close;
                let range = high - low;
                if range > 0.0 {
                    100.0 * (close - low) / range
                } else {
                    FLAT_RANGE_K
                }
            })
            .collect())
    }

    /// %K/%D pairs, starting where %D first exists.
    pub fn calculate_full(
        &self,
        candles: &[Candle],
    ) -> Result<Vec<StochasticValue>, Report<IndicatorError>> {
        if candles.len() < self.required_candles() {
            bail!(IndicatorError::InsufficientData {
                required: self.required_candles(),
                available: candles.len(),
            });
        }

        let k = self.percent_k(candles)?;
        let d = Sma::new(self.d_period)?.calculate_prices(&k)?;
        let offset = self.d_period - 1;

        Ok(k[offset..]
            .iter()
            .zip(d.iter())
            .map(|(&k, &d)| StochasticValue { k, d })
            .collect())
    }
}

impl Indicator for Stochastic {
    fn name(&self) -> &str {
        "stochastic"
    }

    fn required_candles(&self) -> usize {
        self.k_period + self.d_period - 1
    }

    /// Returns %K values only.
    fn calculate(&self, candles: &[Candle]) -> Result<Vec<f64>, Report<IndicatorError>> {
        self.percent_k(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{candles_from_closes, candles_with_range};

    #[test]
    fn stochastic_period_zero_invalid() {
        assert!(Stochastic::new(0, 3).is_err());
        assert!(Stochastic::new(14, 0).is_err());
    }

    #[test]
    fn stochastic_insufficient_data() {
        let stoch = Stochastic::new(14, 3).unwrap();
        assert!(stoch.calculate_full(&candles_from_closes(&[1.0; 15])).is_err());
        assert_eq!(stoch.calculate_full(&candles_from_closes(&[1.0; 16])).unwrap().len(), 1);
    }

    #[test]
    fn close_at_window_high_is_100() {
        let stoch = Stochastic::new(3, 1).unwrap();
        let k = stoch.percent_k(&candles_from_closes(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(k, vec![100.0]);
    }

    #[test]
    fn close_at_window_low_is_0() {
        let stoch = Stochastic::new(3, 1).unwrap();
        let k = stoch.percent_k(&candles_from_closes(&[3.0, 2.0, 1.0])).unwrap();
        assert_eq!(k, vec![0.0]);
    }

    #[test]
    fn flat_range_is_neutral() {
        let stoch = Stochastic::new(3, 2).unwrap();
        let values = stoch.calculate_full(&candles_from_closes(&[5.0; 6])).unwrap();
        for v in &values {
            assert_eq!(v.k, 50.0);
            assert_eq!(v.d, 50.0);
        }
    }

    #[test]
    fn d_is_mean_of_last_k_values() {
        let stoch = Stochastic::new(3, 3).unwrap();
        let closes = [10.0, 12.0, 11.0, 13.0, 12.5, 14.0, 13.0];
        let candles = candles_with_range(&closes);
        let k = stoch.percent_k(&candles).unwrap();
        let full = stoch.calculate_full(&candles).unwrap();
        let last = full.last().unwrap();
        let n = k.len();
        let expected_d = (k[n - 1] + k[n - 2] + k[n - 3]) / 3.0;
        assert_eq!(last.k, k[n - 1]);
        assert!((last.d - expected_d).abs() < 1e-9);
    }
}
