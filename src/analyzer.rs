//! Runs the live decision path for one or many symbols.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use error_stack::{Report, ResultExt};
use futures::{FutureExt, StreamExt};
use futures::stream;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, CoinConfig};
use crate::error::{AnalyzeError, ExchangeError};
use crate::exchange::CandleSource;
use crate::model::{CandleSeries, ExchangeKind, TimeFrame};
use crate::plan::{self, TradePlan};
use crate::predictor::ConfidencePredictor;
use crate::snapshot::{self, IndicatorSnapshot};
use crate::strategy::rule::RuleThresholds;
use crate::strategy::{self, Decision};

#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub historical_candles: usize,
    pub rules: RuleThresholds,
    pub neutral_confidence: f64,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub concurrency: usize,
}

impl AnalyzerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            historical_candles: config.general.historical_candles,
            rules: config.rules,
            neutral_confidence: config.predictor.neutral_confidence,
            max_retries: config.exchange.max_retries,
            retry_backoff: Duration::from_millis(config.exchange.retry_backoff_ms),
            concurrency: config.general.concurrency,
        }
    }
}

/// Everything the decision path produced for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub symbol: String,
    pub name: String,
    pub timeframe: TimeFrame,
    pub price: f64,
    pub price_change_24h: Option<f64>,
    pub indicators: IndicatorSnapshot,
    pub decision: Decision,
    pub plan: TradePlan,
    pub analyzed_at: DateTime<Utc>,
}

/// Result for one tracked coin of an [`Analyzer::analyze_all`] run.
#[derive(Debug)]
pub struct CoinOutcome {
    pub symbol: String,
    pub result: Result<Analysis, Report<AnalyzeError>>,
}

pub struct Analyzer {
    source: Arc<dyn CandleSource>,
    predictor: Arc<dyn ConfidencePredictor>,
    settings: AnalyzerSettings,
}

impl Analyzer {
    pub fn new(
        source: Arc<dyn CandleSource>,
        predictor: Arc<dyn ConfidencePredictor>,
        settings: AnalyzerSettings,
    ) -> Self {
        Self {
            source,
            predictor,
            settings,
        }
    }

    pub fn exchange(&self) -> ExchangeKind {
        self.source.kind()
    }

    /// Fetch, compute indicators, decide and attach a trade plan.
    pub async fn analyze(
        &self,
        symbol: &str,
        name: &str,
        timeframe: TimeFrame,
    ) -> Result<Analysis, Report<AnalyzeError>> {
        if !timeframe.is_supported() {
            return Err(Report::new(ExchangeError::UnsupportedTimeframe {
                timeframe: timeframe.to_string(),
            })
            .change_context(AnalyzeError::Fetch));
        }

        let series = self
            .fetch_with_retry(symbol, timeframe, self.settings.historical_candles)
            .await
            .change_context(AnalyzeError::Fetch)?;

        let indicators = snapshot::compute(&series)
            .change_context(AnalyzeError::Indicator)
            .attach_with(|| format!("symbol: {symbol}, timeframe: {timeframe}"))?;
        let decision = strategy::decide_with(&indicators, &self.settings.rules);

        let confidence = match self.predictor.confidence(symbol, timeframe).await {
            Ok(confidence) => confidence,
            Err(report) => {
                warn!(
                    symbol,
                    %timeframe,
                    predictor = self.predictor.name(),
                    error = ?report,
                    "predictor unavailable, using neutral confidence"
                );
                self.settings.neutral_confidence
            }
        };

        let plan = plan::synthesize(&decision, indicators.current_price, confidence);

        debug!(
            symbol,
            %timeframe,
            label = decision.label.as_str(),
            score = decision.score,
            confidence = plan.confidence,
            "analysis complete"
        );

        Ok(Analysis {
            symbol: symbol.to_owned(),
            name: name.to_owned(),
            timeframe,
            price: indicators.current_price,
            price_change_24h: indicators.price_change_24h,
            indicators,
            decision,
            plan,
            analyzed_at: Utc::now(),
        })
    }

    /// Analyze every coin as an independent task, at most
    /// `settings.concurrency` at a time. Outcomes come back in `coins` order;
    /// one coin failing never affects the others.
    pub async fn analyze_all(&self, coins: &[CoinConfig], timeframe: TimeFrame) -> Vec<CoinOutcome> {
        let mut outcomes: Vec<(usize, CoinOutcome)> = stream::iter(coins.iter().cloned().enumerate())
            .map(|(index, coin)| {
                async move {
                    let result = self
                        .analyze(&coin.symbol, coin.display_name(), timeframe)
                        .await;
                    if let Err(report) = &result {
                        warn!(symbol = %coin.symbol, %timeframe, error = ?report, "analysis failed");
                    }
                    (
                        index,
                        CoinOutcome {
                            symbol: coin.symbol,
                            result,
                        },
                    )
                }
                .boxed()
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        outcomes.sort_by_key(|(index, _)| *index);

        let failed = outcomes.iter().filter(|(_, o)| o.result.is_err()).count();
        info!(
            coins = coins.len(),
            failed,
            %timeframe,
            "analysis round complete"
        );

        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    /// Retry retryable failures with doubling backoff.
    pub async fn fetch_with_retry(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<CandleSeries, Report<ExchangeError>> {
        let mut attempt = 0;
        loop {
            match self.source.fetch_candles(symbol, timeframe, limit).await {
                Ok(series) => return Ok(series),
                Err(report)
                    if report.current_context().is_retryable()
                        && attempt < self.settings.max_retries =>
                {
                    let delay = self
                        .settings
                        .retry_backoff
                        .saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    warn!(
                        symbol,
                        %timeframe,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %report.current_context(),
                        "candle fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(report) => return Err(report),
            }
        }
    }
}

/// Directional plans whose confidence is strictly above `min_confidence`.
pub fn urgent(analyses: &[Analysis], min_confidence: f64) -> Vec<&Analysis> {
    analyses
        .iter()
        .filter(|a| a.plan.is_actionable() && a.plan.confidence > min_confidence)
        .collect()
}
