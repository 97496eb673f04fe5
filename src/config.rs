use std::collections::HashSet;
use std::path::{Path, PathBuf};

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::dataset::DatasetConfig;
use crate::error::ConfigError;
use crate::model::{ExchangeKind, SUPPORTED_TIMEFRAMES, TimeFrame};
use crate::predictor::PredictorKind;
use crate::snapshot;
use crate::strategy::rule::RuleThresholds;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_data_dir() -> String {
    "./data".into()
}

fn default_historical_candles() -> usize {
    200
}

fn default_timeframe() -> TimeFrame {
    TimeFrame::Hour1
}

fn default_concurrency() -> usize {
    4
}

fn default_base_url() -> String {
    "https://api.binance.com".into()
}

fn default_requests_per_second() -> u32 {
    // kline weight is 2 against a 6000/min budget; stay well below it
    20
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_confidence() -> f64 {
    50.0
}

fn default_models_dir() -> String {
    "./data/models".into()
}

fn default_digest_interval_minutes() -> u64 {
    24 * 60
}

fn default_urgent_interval_minutes() -> u64 {
    60
}

fn default_urgent_confidence() -> f64 {
    90.0
}

fn default_cooldown_minutes() -> u64 {
    60
}

fn default_digest_timeframe() -> TimeFrame {
    TimeFrame::Day1
}

fn default_urgent_timeframe() -> TimeFrame {
    TimeFrame::Hour1
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub coins: Vec<CoinConfig>,
    #[serde(default)]
    pub rules: RuleThresholds,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Candles fetched per live analysis.
    #[serde(default = "default_historical_candles")]
    pub historical_candles: usize,
    /// Timeframe used when the command line does not name one.
    #[serde(default = "default_timeframe")]
    pub timeframe: TimeFrame,
    /// Upper bound on symbols analyzed at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            data_dir: default_data_dir(),
            historical_candles: default_historical_candles(),
            timeframe: default_timeframe(),
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default)]
    pub kind: ExchangeKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts after a retryable fetch failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            kind: ExchangeKind::default(),
            base_url: default_base_url(),
            requests_per_second: default_requests_per_second(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinConfig {
    pub symbol: String,
    /// Human readable name used in reports; defaults to the symbol.
    pub name: Option<String>,
}

impl CoinConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.symbol)
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictorConfig {
    #[serde(default = "default_predictor_kind")]
    pub kind: PredictorKind,
    /// Answer of the `static` predictor.
    #[serde(default = "default_confidence")]
    pub static_confidence: f64,
    /// Used whenever the predictor cannot answer.
    #[serde(default = "default_confidence")]
    pub neutral_confidence: f64,
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
}

fn default_predictor_kind() -> PredictorKind {
    PredictorKind::Static
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            kind: default_predictor_kind(),
            static_confidence: default_confidence(),
            neutral_confidence: default_confidence(),
            models_dir: default_models_dir(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleConfig {
    /// Full report of every tracked coin.
    #[serde(default = "default_digest_interval_minutes")]
    pub digest_interval_minutes: u64,
    #[serde(default = "default_digest_timeframe")]
    pub digest_timeframe: TimeFrame,
    /// Scan that only reports high-confidence directional plans.
    #[serde(default = "default_urgent_interval_minutes")]
    pub urgent_interval_minutes: u64,
    #[serde(default = "default_urgent_timeframe")]
    pub urgent_timeframe: TimeFrame,
    #[serde(default = "default_urgent_confidence")]
    pub urgent_confidence: f64,
    /// Minimum gap between two urgent reports for the same coin.
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            digest_interval_minutes: default_digest_interval_minutes(),
            digest_timeframe: default_digest_timeframe(),
            urgent_interval_minutes: default_urgent_interval_minutes(),
            urgent_timeframe: default_urgent_timeframe(),
            urgent_confidence: default_urgent_confidence(),
            cooldown_minutes: default_cooldown_minutes(),
        }
    }
}

impl AppConfig {
    pub fn database_path(&self) -> PathBuf {
        Path::new(&self.general.data_dir).join("coin-analyzer.db")
    }

    pub fn coin(&self, symbol: &str) -> Option<&CoinConfig> {
        self.coins
            .iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(symbol))
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(config)?;
    validate_exchange(config)?;
    validate_coins(config)?;
    validate_dataset(config)?;
    validate_confidences(config)?;
    validate_schedule(config)?;
    Ok(())
}

fn invalid(field: String) -> Report<ConfigError> {
    Report::new(ConfigError::Validation { field })
}

fn validate_general(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let general = &config.general;
    if !matches!(general.log_format.as_str(), "text" | "json") {
        return Err(invalid(format!(
            "general.log_format \"{}\" must be \"text\" or \"json\"",
            general.log_format
        )));
    }
    check_timeframe("general.timeframe", general.timeframe)?;
    if general.historical_candles < snapshot::MIN_CANDLES {
        return Err(invalid(format!(
            "general.historical_candles must be at least {}",
            snapshot::MIN_CANDLES
        )));
    }
    if general.concurrency == 0 {
        return Err(invalid("general.concurrency must be > 0".into()));
    }
    Ok(())
}

fn validate_exchange(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.exchange.requests_per_second == 0 {
        return Err(invalid("exchange.requests_per_second must be > 0".into()));
    }
    if config.exchange.timeout_secs == 0 {
        return Err(invalid("exchange.timeout_secs must be > 0".into()));
    }
    Ok(())
}

fn validate_coins(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let mut seen = HashSet::new();
    for coin in &config.coins {
        if coin.symbol.trim().is_empty() {
            return Err(invalid("coins: empty symbol".into()));
        }
        if !seen.insert(coin.symbol.to_ascii_uppercase()) {
            return Err(invalid(format!("coins: duplicate symbol \"{}\"", coin.symbol)));
        }
    }
    Ok(())
}

fn validate_dataset(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let dataset = &config.dataset;
    if dataset.time_steps == 0 {
        return Err(invalid("dataset.time_steps must be > 0".into()));
    }
    if dataset.horizons.is_empty() {
        return Err(invalid("dataset.horizons must not be empty".into()));
    }
    if dataset.horizons.contains(&0) {
        return Err(invalid("dataset.horizons must all be > 0".into()));
    }
    if !(dataset.validation_fraction > 0.0 && dataset.validation_fraction < 1.0) {
        return Err(invalid(format!(
            "dataset.validation_fraction {} must be within (0, 1)",
            dataset.validation_fraction
        )));
    }
    if dataset.min_candles <= dataset.time_steps {
        return Err(invalid(
            "dataset.min_candles must be greater than dataset.time_steps".into(),
        ));
    }
    Ok(())
}

fn validate_confidences(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let values = [
        ("predictor.static_confidence", config.predictor.static_confidence),
        ("predictor.neutral_confidence", config.predictor.neutral_confidence),
        ("schedule.urgent_confidence", config.schedule.urgent_confidence),
    ];
    for (field, value) in values {
        if !(0.0..=100.0).contains(&value) {
            return Err(invalid(format!("{field} {value} must be within [0, 100]")));
        }
    }
    Ok(())
}

fn check_timeframe(field: &str, timeframe: TimeFrame) -> Result<(), Report<ConfigError>> {
    if timeframe.is_supported() {
        return Ok(());
    }
    let supported: Vec<&str> = SUPPORTED_TIMEFRAMES.iter().map(|tf| tf.as_str()).collect();
    Err(invalid(format!(
        "{field} \"{timeframe}\" is not one of {}",
        supported.join(", ")
    )))
}

fn validate_schedule(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let schedule = &config.schedule;
    if schedule.digest_interval_minutes == 0 || schedule.urgent_interval_minutes == 0 {
        return Err(invalid("schedule intervals must be > 0".into()));
    }
    check_timeframe("schedule.digest_timeframe", schedule.digest_timeframe)?;
    check_timeframe("schedule.urgent_timeframe", schedule.urgent_timeframe)?;
    Ok(())
}
