pub mod binance;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::ExchangeError;
use crate::model::{CandleSeries, ExchangeKind, TimeFrame};

/// Where candle history comes from.
///
/// Uses `BoxFuture` (from `futures` crate) instead of `async fn` in trait
/// to keep the trait object-safe (`dyn CandleSource`).
pub trait CandleSource: Send + Sync {
    fn kind(&self) -> ExchangeKind;

    /// Fetch up to `limit` most recent candles, oldest first.
    ///
    /// Fails with `Network` (retryable) or `UnsupportedSymbol` (permanent).
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> BoxFuture<'_, Result<CandleSeries, Report<ExchangeError>>>;
}
