pub mod sqlite;

use chrono::{DateTime, Utc};
use error_stack::Report;
use futures::future::BoxFuture;

use crate::analyzer::Analysis;
use crate::error::StorageError;
use crate::model::{CandleSeries, ExchangeKind, TimeFrame};
use crate::notifier::ReportKind;

pub trait Storage: Send + Sync {
    /// Insert or replace every candle of `series`, keyed by open time.
    fn upsert_candles<'a>(
        &'a self,
        exchange: ExchangeKind,
        series: &'a CandleSeries,
    ) -> BoxFuture<'a, Result<(), Report<StorageError>>>;

    /// Up to `limit` most recent cached candles, oldest first.
    fn get_recent_candles(
        &self,
        exchange: ExchangeKind,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> BoxFuture<'_, Result<CandleSeries, Report<StorageError>>>;

    fn log_signal<'a>(
        &'a self,
        kind: ReportKind,
        analysis: &'a Analysis,
    ) -> BoxFuture<'a, Result<(), Report<StorageError>>>;

    /// When a `kind` report last logged `symbol` on `timeframe`.
    fn last_signal_time(
        &self,
        kind: ReportKind,
        symbol: &str,
        timeframe: TimeFrame,
    ) -> BoxFuture<'_, Result<Option<DateTime<Utc>>, Report<StorageError>>>;
}
