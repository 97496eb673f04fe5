pub mod atr;
pub mod bollinger;
pub mod ma;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod stochastic;

use error_stack::Report;

use crate::error::IndicatorError;
use crate::model::Candle;

/// A technical analysis indicator that operates on a slice of candles.
///
/// Candles must be in ascending chronological order (oldest first).
pub trait Indicator: Send + Sync {
    /// Unique name of this indicator (e.g., "rsi", "sma").
    fn name(&self) -> &str;

    /// Minimum number of candles required to produce at least one output value.
    fn required_candles(&self) -> usize;

    /// Calculate indicator values from candles.
    ///
    /// Returns one value per output point, aligned to the end of the input:
    /// the last value always belongs to the last candle. Use [`pad_front`] to
    /// stretch the output back to the input length.
    fn calculate(&self, candles: &[Candle]) -> Result<Vec<f64>, Report<IndicatorError>>;
}

/// Extract close prices from a slice of candles.
pub fn close_prices(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Whether a failed calculation only lacked history.
pub fn is_insufficient(report: &Report<IndicatorError>) -> bool {
    matches!(
        report.current_context(),
        IndicatorError::InsufficientData { .. }
    )
}

/// Left-pad a trailing indicator output with `default` up to `len` entries.
///
/// Outputs longer than `len` keep only their last `len` values.
pub fn pad_front(values: &[f64], len: usize, default: f64) -> Vec<f64> {
    if values.len() >= len {
        return values[values.len() - len..].to_vec();
    }
    let mut output = vec![default; len - values.len()];
    output.extend_from_slice(values);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_front_fills_warm_up_with_default() {
        assert_eq!(pad_front(&[1.0, 2.0], 4, 50.0), vec![50.0, 50.0, 1.0, 2.0]);
    }

    #[test]
    fn pad_front_empty_values() {
        assert_eq!(pad_front(&[], 3, 0.0), vec![0.0; 3]);
    }

    #[test]
    fn insufficient_data_is_recognised() {
        let short = Report::new(IndicatorError::InsufficientData {
            required: 14,
            available: 3,
        });
        let invalid = Report::new(IndicatorError::InvalidParameter {
            name: "period".into(),
        });
        assert!(is_insufficient(&short));
        assert!(!is_insufficient(&invalid));
    }

    #[test]
    fn pad_front_truncates_from_the_left() {
        assert_eq!(pad_front(&[1.0, 2.0, 3.0], 2, 0.0), vec![2.0, 3.0]);
    }
}
