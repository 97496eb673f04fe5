use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::model::Candle;

/// On-Balance Volume: running total of signed volume, starting at 0.
pub struct Obv;

impl Indicator for Obv {
    fn name(&self) -> &str {
        "obv"
    }

    fn required_candles(&self) -> usize {
        1
    }

    /// Returns one value per candle; the first is always 0.
    fn calculate(&self, candles: &[Candle]) -> Result<Vec<f64>, Report<IndicatorError>> {
        let mut total = 0.0;
        let mut results = Vec::with_capacity(candles.len());
        if !candles.is_empty() {
            results.push(total);
        }
        for w in candles.windows(2) {
            if w[1].close > w[0].close {
                total += w[1].volume;
            } else if w[1].close < w[0].close {
                total -= w[1].volume;
            }
            results.push(total);
        }
        Ok(results)
    }
}
