use std::fmt;

use chrono::{DateTime, Utc};
use error_stack::{Report, bail};
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    #[default]
    Binance,
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binance => write!(f, "binance"),
        }
    }
}

/// Candle timeframe supported by the application.
///
/// String representations match the config file format (e.g. `"1m"`, `"1h"`),
/// and are also what gets serialized into model artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrame {
    #[serde(rename = "1m")]
    Min1,
    #[serde(rename = "3m")]
    Min3,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
}

/// Timeframes the analyzer accepts for live analysis.
pub const SUPPORTED_TIMEFRAMES: &[TimeFrame] = &[
    TimeFrame::Min15,
    TimeFrame::Hour1,
    TimeFrame::Hour4,
    TimeFrame::Day1,
];

impl TimeFrame {
    /// Parse a config-format string into a `TimeFrame`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(Self::Min1),
            "3m" => Some(Self::Min3),
            "5m" => Some(Self::Min5),
            "15m" => Some(Self::Min15),
            "30m" => Some(Self::Min30),
            "1h" => Some(Self::Hour1),
            "4h" => Some(Self::Hour4),
            "1d" => Some(Self::Day1),
            _ => None,
        }
    }

    /// Return the config-format string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Min1 => "1m",
            Self::Min3 => "3m",
            Self::Min5 => "5m",
            Self::Min15 => "15m",
            Self::Min30 => "30m",
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Day1 => "1d",
        }
    }

    /// Return the Binance kline interval string for this timeframe.
    pub fn binance_interval(self) -> &'static str {
        // Binance uses the same notation as the config file.
        self.as_str()
    }

    pub fn is_supported(self) -> bool {
        SUPPORTED_TIMEFRAMES.contains(&self)
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One OHLCV interval.
///
/// Callers are trusted to supply `high >= max(open, close)` and
/// `low <= min(open, close)`; nothing here re-checks it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Ordered, immutable candle history for one symbol and timeframe.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    symbol: String,
    timeframe: TimeFrame,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Build a series, rejecting timestamps that are not strictly increasing.
    pub fn new(
        symbol: impl Into<String>,
        timeframe: TimeFrame,
        candles: Vec<Candle>,
    ) -> Result<Self, Report<IndicatorError>> {
        if let Some(index) = candles
            .windows(2)
            .position(|w| w[1].open_time <= w[0].open_time)
        {
            bail!(IndicatorError::InvalidSeries {
                reason: format!("timestamp at index {} is not after its predecessor", index + 1),
            });
        }
        Ok(Self {
            symbol: symbol.into(),
            timeframe,
            candles,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> TimeFrame {
        self.timeframe
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}
