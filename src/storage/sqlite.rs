use chrono::{DateTime, Utc};
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
};
use std::path::Path;
use std::str::FromStr;

use crate::analyzer::Analysis;
use crate::error::StorageError;
use crate::model::{Candle, CandleSeries, ExchangeKind, TimeFrame};
use crate::notifier::ReportKind;
use crate::storage::Storage;

type CandleRow = (String, f64, f64, f64, f64, f64);

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a SQLite database at `path` and run migrations.
    pub async fn open(path: &Path) -> Result<Self, Report<StorageError>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .change_context(StorageError::Migration)
                .attach_with(|| format!("cannot create data directory: {}", parent.display()))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .change_context(StorageError::Migration)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(opts)
            .await
            .change_context(StorageError::Migration)
            .attach_with(|| format!("database path: {}", path.display()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .change_context(StorageError::Migration)?;

        Ok(Self { pool })
    }
}

impl Storage for SqliteStorage {
    fn upsert_candles<'a>(
        &'a self,
        exchange: ExchangeKind,
        series: &'a CandleSeries,
    ) -> BoxFuture<'a, Result<(), Report<StorageError>>> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .change_context(StorageError::Insert)?;

            for c in series.candles() {
                sqlx::query(
                    "INSERT OR REPLACE INTO candles \
                     (exchange, symbol, timeframe, open_time, open, high, low, close, volume) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(exchange.to_string())
                .bind(series.symbol())
                .bind(series.timeframe().as_str())
                .bind(c.open_time.to_rfc3339())
                .bind(c.open)
                .bind(c.high)
                .bind(c.low)
                .bind(c.close)
                .bind(c.volume)
                .execute(&mut *tx)
                .await
                .change_context(StorageError::Insert)?;
            }

            tx.commit().await.change_context(StorageError::Insert)?;
            Ok(())
        })
    }

    fn get_recent_candles(
        &self,
        exchange: ExchangeKind,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> BoxFuture<'_, Result<CandleSeries, Report<StorageError>>> {
        let symbol = symbol.to_string();
        Box::pin(async move {
            let rows: Vec<CandleRow> = sqlx::query_as(
                "SELECT open_time, open, high, low, close, volume \
                 FROM candles \
                 WHERE exchange = ? AND symbol = ? AND timeframe = ? \
                 ORDER BY open_time DESC \
                 LIMIT ?",
            )
            .bind(exchange.to_string())
            .bind(&symbol)
            .bind(timeframe.as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .change_context(StorageError::Query)?;

            let mut candles = rows
                .into_iter()
                .map(|(open_time, open, high, low, close, volume)| {
                    Ok(Candle {
                        open_time: parse_time_utc(&open_time)?,
                        open,
                        high,
                        low,
                        close,
                        volume,
                    })
                })
                .collect::<Result<Vec<_>, Report<StorageError>>>()?;

            // Return in ascending chronological order (oldest first)
            candles.reverse();
            CandleSeries::new(symbol, timeframe, candles).change_context(StorageError::Query)
        })
    }

    fn log_signal<'a>(
        &'a self,
        kind: ReportKind,
        analysis: &'a Analysis,
    ) -> BoxFuture<'a, Result<(), Report<StorageError>>> {
        Box::pin(async move {
            let plan = &analysis.plan;
            sqlx::query(
                "INSERT INTO signals_log \
                 (symbol, timeframe, report_kind, label, action, score, confidence, price, \
                  stop_loss, take_profit1, take_profit2, logged_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&analysis.symbol)
            .bind(analysis.timeframe.as_str())
            .bind(kind.as_str())
            .bind(analysis.decision.label.as_str())
            .bind(plan.action.as_str())
            .bind(analysis.decision.score)
            .bind(plan.confidence)
            .bind(analysis.price)
            .bind(plan.stop_loss)
            .bind(plan.take_profit1)
            .bind(plan.take_profit2)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .change_context(StorageError::Insert)?;
            Ok(())
        })
    }

    fn last_signal_time(
        &self,
        kind: ReportKind,
        symbol: &str,
        timeframe: TimeFrame,
    ) -> BoxFuture<'_, Result<Option<DateTime<Utc>>, Report<StorageError>>> {
        let symbol = symbol.to_string();
        Box::pin(async move {
            let row: Option<(String,)> = sqlx::query_as(
                "SELECT logged_at FROM signals_log \
                 WHERE symbol = ? AND timeframe = ? AND report_kind = ? \
                 ORDER BY logged_at DESC \
                 LIMIT 1",
            )
            .bind(&symbol)
            .bind(timeframe.as_str())
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await
            .change_context(StorageError::Query)?;

            row.map(|(ts,)| parse_time_utc(&ts)).transpose()
        })
    }
}

fn parse_time_utc(value: &str) -> Result<DateTime<Utc>, Report<StorageError>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .change_context(StorageError::Query)
        .attach_with(|| format!("bad timestamp: {value}"))
}
