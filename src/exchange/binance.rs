use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ExchangeConfig;
use crate::error::ExchangeError;
use crate::exchange::CandleSource;
use crate::model::{Candle, CandleSeries, ExchangeKind, TimeFrame};

const EXCHANGE_NAME: &str = "binance";
const MAX_CANDLES_PER_REQUEST: usize = 1000;
/// Binance error code for an unknown trading pair.
const INVALID_SYMBOL_CODE: i64 = -1121;
/// Binance error code for an unknown kline interval.
const INVALID_INTERVAL_CODE: i64 = -1120;

pub struct BinanceExchange {
    client: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl BinanceExchange {
    pub fn new(config: &ExchangeConfig) -> Result<Self, Report<ExchangeError>> {
        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .change_context(network_error())?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        })
    }

    /// One `/api/v3/klines` request, oldest candle first.
    async fn fetch_page(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
        end_time: Option<i64>,
    ) -> Result<Vec<Candle>, Report<ExchangeError>> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/api/v3/klines", self.base_url);
        let mut params = vec![
            ("symbol", symbol.to_owned()),
            ("interval", timeframe.binance_interval().to_owned()),
            ("limit", limit.to_string()),
        ];
        if let Some(end_time) = end_time {
            params.push(("endTime", end_time.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .change_context(network_error())
            .attach_with(|| format!("symbol: {symbol}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body, symbol, timeframe));
        }

        let rows: Vec<BinanceKlineRow> = response
            .json()
            .await
            .change_context(parse_error())
            .attach_with(|| format!("symbol: {symbol}"))?;

        rows.into_iter().map(BinanceKlineRow::into_candle).collect()
    }
}

impl CandleSource for BinanceExchange {
    fn kind(&self) -> ExchangeKind {
        ExchangeKind::Binance
    }

    /// Requests above 1000 candles are paged backwards with `endTime`.
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> BoxFuture<'_, Result<CandleSeries, Report<ExchangeError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let mut candles: Vec<Candle> = Vec::with_capacity(limit);
            let mut end_time = None;

            while candles.len() < limit {
                let wanted = (limit - candles.len()).min(MAX_CANDLES_PER_REQUEST);
                let mut page = self.fetch_page(&symbol, timeframe, wanted, end_time).await?;
                let received = page.len();
                let Some(oldest) = page.first() else {
                    break;
                };
                end_time = Some(oldest.open_time.timestamp_millis() - 1);

                debug!(symbol = %symbol, timeframe = %timeframe, received, "binance page fetched");
                page.append(&mut candles);
                candles = page;

                if received < wanted {
                    break;
                }
            }

            info!(
                symbol = %symbol,
                timeframe = %timeframe,
                fetched = candles.len(),
                "binance candle fetch complete"
            );

            CandleSeries::new(symbol, timeframe, candles).change_context(parse_error())
        })
    }
}

fn network_error() -> ExchangeError {
    ExchangeError::Network {
        exchange: EXCHANGE_NAME.into(),
    }
}

fn parse_error() -> ExchangeError {
    ExchangeError::ResponseParse {
        exchange: EXCHANGE_NAME.into(),
    }
}

/// Binance error payload: `{"code": -1121, "msg": "Invalid symbol."}`
#[derive(Debug, Deserialize)]
struct BinanceErrorBody {
    code: i64,
    msg: String,
}

/// Map a non-success response to an error.
///
/// Server errors and rate limiting are retryable `Network` failures; unknown
/// symbols and intervals are permanent.
fn classify_failure(
    status: StatusCode,
    body: &str,
    symbol: &str,
    timeframe: TimeFrame,
) -> Report<ExchangeError> {
    let detail = serde_json::from_str::<BinanceErrorBody>(body).ok();

    let context = match detail.as_ref().map(|d| d.code) {
        Some(INVALID_SYMBOL_CODE) => ExchangeError::UnsupportedSymbol {
            symbol: symbol.to_owned(),
        },
        Some(INVALID_INTERVAL_CODE) => ExchangeError::UnsupportedTimeframe {
            timeframe: timeframe.to_string(),
        },
        _ if status.is_server_error()
            || status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::IM_A_TEAPOT =>
        {
            network_error()
        }
        _ => parse_error(),
    };

    let report = Report::new(context).attach(format!("HTTP status: {status}"));
    match detail {
        Some(d) => report.attach(format!("binance error {}: {}", d.code, d.msg)),
        None => report,
    }
}

// ── REST response types ───────────────────────────────────────────────────────

/// Binance kline row: 12-element array
/// [open_time, open, high, low, close, volume, close_time, ...]
#[derive(Debug, Deserialize)]
struct BinanceKlineRow(
    i64,                        // 0: open_time (ms)
    String,                     // 1: open
    String,                     // 2: high
    String,                     // 3: low
    String,                     // 4: close
    String,                     // 5: volume
    #[allow(dead_code)] i64,    // 6: close_time
    #[allow(dead_code)] String, // 7: quote asset volume
    #[allow(dead_code)] i64,    // 8: number of trades
    #[allow(dead_code)] String, // 9: taker buy base volume
    #[allow(dead_code)] String, // 10: taker buy quote volume
    #[allow(dead_code)] String, // 11: ignore
);

impl BinanceKlineRow {
    fn into_candle(self) -> Result<Candle, Report<ExchangeError>> {
        let parse_f64 = |s: &str| -> Result<f64, Report<ExchangeError>> {
            s.parse::<f64>()
                .change_context(parse_error())
                .attach_with(|| format!("not a number: {s}"))
        };

        let open_time = DateTime::from_timestamp_millis(self.0).ok_or_else(|| {
            Report::new(parse_error()).attach(format!("open time out of range: {}", self.0))
        })?;

        Ok(Candle {
            open_time,
            open: parse_f64(&self.1)?,
            high: parse_f64(&self.2)?,
            low: parse_f64(&self.3)?,
            close: parse_f64(&self.4)?,
            volume: parse_f64(&self.5)?,
        })
    }
}
