use error_stack::{Report, bail};
use serde::Serialize;

use crate::error::IndicatorError;
use crate::indicator::ma::Sma;
use crate::indicator::{Indicator, close_prices};
use crate::model::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bands {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Bollinger Bands over the sample standard deviation (n - 1 denominator).
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    pub fn new(period: usize, std_dev_multiplier: f64) -> Result<Self, Report<IndicatorError>> {
        if period < 2 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be >= 2".into(),
            });
        }
        if std_dev_multiplier <= 0.0 {
            bail!(IndicatorError::InvalidParameter {
                name: "std_dev_multiplier must be > 0".into(),
            });
        }
        Ok(Self {
            period,
            std_dev_multiplier,
        })
    }

    pub fn calculate_prices(&self, prices: &[f64]) -> Result<Vec<Bands>, Report<IndicatorError>> {
        if prices.len() < self.period {
            bail!(IndicatorError::InsufficientData {
                required: self.period,
                available: prices.len(),
            });
        }

        let sma = Sma::new(self.period)?.calculate_prices(prices)?;

        let bands = prices
            .windows(self.period)
            .zip(sma.iter())
            .map(|(window, &middle)| {
                let variance = window.iter().map(|&p| (p - middle).powi(2)).sum::<f64>()
                    / (self.period - 1) as f64;
                let std_dev = variance.sqrt();
                Bands {
                    upper: middle + self.std_dev_multiplier * std_dev,
                    middle,
                    lower: middle - self.std_dev_multiplier * std_dev,
                }
            })
            .collect();

        Ok(bands)
    }
}

impl Indicator for BollingerBands {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    /// Returns middle band (SMA) values only.
    fn calculate(&self, candles: &[Candle]) -> Result<Vec<f64>, Report<IndicatorError>> {
        Ok(self
            .calculate_prices(&close_prices(candles))?
            .into_iter()
            .map(|b| b.middle)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_period_too_small_invalid() {
        assert!(BollingerBands::new(0, 2.0).is_err());
        assert!(BollingerBands::new(1, 2.0).is_err());
    }

    #[test]
    fn bollinger_negative_multiplier_invalid() {
        assert!(BollingerBands::new(20, -1.0).is_err());
    }

    #[test]
    fn bollinger_insufficient_data() {
        let bb = BollingerBands::new(5, 2.0).unwrap();
        assert!(bb.calculate_prices(&[1.0; 4]).is_err());
    }

    #[test]
    fn bollinger_flat_prices_zero_width() {
        let bb = BollingerBands::new(3, 2.0).unwrap();
        let bands = bb.calculate_prices(&[10.0_f64; 5]).unwrap();
        for b in &bands {
            assert_eq!(b.upper, 10.0);
            assert_eq!(b.middle, 10.0);
            assert_eq!(b.lower, 10.0);
        }
    }

    #[test]
    fn bollinger_uses_sample_std_dev() {
        let bb = BollingerBands::new(3, 2.0).unwrap();
        // mean 2, squared deviations 1+0+1 = 2, sample variance 2/2 = 1
        let bands = bb.calculate_prices(&[1.0, 2.0, 3.0]).unwrap();
        assert!((bands[0].upper - 4.0).abs() < 1e-9);
        assert!((bands[0].lower - 0.0).abs() < 1e-9);
        assert!((bands[0].width() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn bollinger_bands_symmetry() {
        let bb = BollingerBands::new(3, 2.0).unwrap();
        let bands = bb.calculate_prices(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        for b in &bands {
            assert!((b.upper - b.middle - (b.middle - b.lower)).abs() < 1e-9);
        }
    }
}
