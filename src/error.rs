use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum ExchangeError {
    #[display("network failure talking to {exchange}")]
    Network { exchange: String },
    #[display("failed to parse response from {exchange}")]
    ResponseParse { exchange: String },
    #[display("symbol {symbol} is not supported")]
    UnsupportedSymbol { symbol: String },
    #[display("timeframe {timeframe} is not supported")]
    UnsupportedTimeframe { timeframe: String },
}

impl ExchangeError {
    /// Whether the caller may retry the same request with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

#[derive(Debug, Display, Error)]
pub enum StorageError {
    #[display("database migration failed")]
    Migration,
    #[display("failed to insert data")]
    Insert,
    #[display("failed to query data")]
    Query,
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("insufficient data: need {required}, got {available}")]
    InsufficientData { required: usize, available: usize },
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
    #[display("invalid candle series: {reason}")]
    InvalidSeries { reason: String },
}

#[derive(Debug, Display, Error)]
pub enum DatasetError {
    #[display("insufficient data: need {required}, got {available}")]
    InsufficientData { required: usize, available: usize },
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
    #[display("indicator computation failed")]
    Indicator,
}

#[derive(Debug, Display, Error)]
pub enum PredictorError {
    #[display("model unavailable for {symbol} {timeframe}")]
    ModelUnavailable { symbol: String, timeframe: String },
}

#[derive(Debug, Display, Error)]
pub enum ModelStoreError {
    #[display("failed to save model artifact")]
    Save,
    #[display("failed to load model artifact")]
    Load,
}

#[derive(Debug, Display, Error)]
pub enum AnalyzeError {
    #[display("failed to fetch candles")]
    Fetch,
    #[display("failed to compute indicators")]
    Indicator,
    #[display("failed to build dataset")]
    Dataset,
    #[display("candle cache unavailable")]
    Cache,
    #[display("failed to write dataset output")]
    Output,
}
