//! Periodic digest and urgent scans for the `watch` command.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analyzer::{self, Analysis, Analyzer};
use crate::config::{CoinConfig, ScheduleConfig};
use crate::model::TimeFrame;
use crate::notifier::{Notifier, ReportKind};
use crate::storage::Storage;

#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub digest_every: Duration,
    pub digest_timeframe: TimeFrame,
    pub urgent_every: Duration,
    pub urgent_timeframe: TimeFrame,
    /// Urgent reports need a confidence strictly above this.
    pub urgent_confidence: f64,
    pub cooldown: chrono::Duration,
}

impl ScheduleSettings {
    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self {
            digest_every: Duration::from_secs(config.digest_interval_minutes.saturating_mul(60)),
            digest_timeframe: config.digest_timeframe,
            urgent_every: Duration::from_secs(config.urgent_interval_minutes.saturating_mul(60)),
            urgent_timeframe: config.urgent_timeframe,
            urgent_confidence: config.urgent_confidence,
            cooldown: i64::try_from(config.cooldown_minutes)
                .ok()
                .and_then(chrono::Duration::try_minutes)
                .unwrap_or(chrono::Duration::MAX),
        }
    }
}

pub struct Scheduler {
    analyzer: Arc<Analyzer>,
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    coins: Vec<CoinConfig>,
    settings: ScheduleSettings,
}

impl Scheduler {
    pub fn new(
        analyzer: Arc<Analyzer>,
        storage: Arc<dyn Storage>,
        notifier: Arc<dyn Notifier>,
        coins: Vec<CoinConfig>,
        settings: ScheduleSettings,
    ) -> Self {
        Self {
            analyzer,
            storage,
            notifier,
            coins,
            settings,
        }
    }

    /// Run on a background task until `shutdown` resolves, then cancel it and
    /// wait up to `grace` for the scan in progress. The scheduler is stopped
    /// whether `shutdown` succeeds or fails; its result is returned.
    pub async fn run_until<F>(self, shutdown: F, grace: Duration) -> io::Result<()>
    where
        F: Future<Output = io::Result<()>>,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { self.run(token).await });

        let signal = shutdown.await;
        match &signal {
            Ok(()) => info!("shutdown requested"),
            Err(error) => warn!(%error, "shutdown listener failed, stopping scheduler"),
        }
        cancel.cancel();

        if tokio::time::timeout(grace, handle).await.is_err() {
            warn!(grace_ms = grace.as_millis() as u64, "scheduler did not stop in time");
        }
        signal
    }

    /// Both scans fire once at start, then on their own interval, until
    /// `cancel` is triggered. A scan in progress finishes before shutdown.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut digest = tokio::time::interval(self.settings.digest_every);
        let mut urgent = tokio::time::interval(self.settings.urgent_every);
        digest.set_missed_tick_behavior(MissedTickBehavior::Skip);
        urgent.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            coins = self.coins.len(),
            digest_timeframe = %self.settings.digest_timeframe,
            urgent_timeframe = %self.settings.urgent_timeframe,
            "scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = digest.tick() => {
                    self.run_digest().await;
                }
                _ = urgent.tick() => {
                    self.run_urgent().await;
                }
            }
        }

        info!("scheduler stopped");
    }

    /// Report every coin that analyzed successfully. Returns how many were
    /// reported.
    pub async fn run_digest(&self) -> usize {
        let outcomes = self
            .analyzer
            .analyze_all(&self.coins, self.settings.digest_timeframe)
            .await;
        let analyses: Vec<Analysis> = outcomes.into_iter().filter_map(|o| o.result.ok()).collect();

        self.publish(ReportKind::Digest, &analyses).await;
        analyses.len()
    }

    /// Report confident directional plans whose coin is out of cooldown.
    /// Returns how many were reported.
    pub async fn run_urgent(&self) -> usize {
        let outcomes = self
            .analyzer
            .analyze_all(&self.coins, self.settings.urgent_timeframe)
            .await;
        let analyses: Vec<Analysis> = outcomes.into_iter().filter_map(|o| o.result.ok()).collect();

        let candidates: Vec<Analysis> = analyzer::urgent(&analyses, self.settings.urgent_confidence)
            .into_iter()
            .cloned()
            .collect();

        let mut reported = Vec::new();
        for analysis in candidates {
            if self.cooling_down(&analysis).await {
                debug!(symbol = %analysis.symbol, "urgent report suppressed by cooldown");
                continue;
            }
            reported.push(analysis);
        }

        self.publish(ReportKind::Urgent, &reported).await;
        reported.len()
    }

    async fn cooling_down(&self, analysis: &Analysis) -> bool {
        match self
            .storage
            .last_signal_time(ReportKind::Urgent, &analysis.symbol, analysis.timeframe)
            .await
        {
            Ok(Some(last)) => Utc::now() - last < self.settings.cooldown,
            Ok(None) => false,
            Err(report) => {
                warn!(symbol = %analysis.symbol, error = ?report, "cooldown check failed, reporting anyway");
                false
            }
        }
    }

    async fn publish(&self, kind: ReportKind, analyses: &[Analysis]) {
        if analyses.is_empty() {
            debug!(kind = kind.as_str(), "nothing to report");
            return;
        }

        self.notifier.notify(kind, &analyses.iter().collect::<Vec<_>>());

        for analysis in analyses {
            if let Err(report) = self.storage.log_signal(kind, analysis).await {
                warn!(symbol = %analysis.symbol, error = ?report, "failed to log signal");
            }
        }

        info!(kind = kind.as_str(), reported = analyses.len(), "report published");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::analyzer::AnalyzerSettings;
    use crate::analyzer::tests::{Feed, FakePredictor, FakeSource, settings};
    use crate::model::fixtures::wave;
    use crate::storage::sqlite::tests::in_memory_storage;
    use crate::strategy::rule::RuleThresholds;

    #[derive(Default)]
    struct RecordingNotifier {
        reports: Mutex<Vec<(ReportKind, Vec<String>)>>,
    }

    impl RecordingNotifier {
        fn reports(&self) -> Vec<(ReportKind, Vec<String>)> {
            self.reports.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, kind: ReportKind, analyses: &[&Analysis]) {
            let symbols = analyses.iter().map(|a| a.symbol.clone()).collect();
            self.reports.lock().unwrap().push((kind, symbols));
        }
    }

    fn coin(symbol: &str) -> CoinConfig {
        CoinConfig {
            symbol: symbol.into(),
            name: None,
        }
    }

    /// Compounding growth: trend and MACD vote BUY.
    fn compounding() -> Vec<f64> {
        (0..120).map(|i| 100.0 * 1.01f64.powi(i)).collect()
    }

    /// Oscillator thresholds nothing can cross, so only trend, MACD and band
    /// vote.
    fn quiet_oscillators() -> AnalyzerSettings {
        AnalyzerSettings {
            rules: RuleThresholds {
                rsi_oversold: -1.0,
                rsi_overbought: 101.0,
                stochastic_oversold: -1.0,
                stochastic_overbought: 101.0,
            },
            ..settings()
        }
    }

    fn schedule(cooldown_minutes: i64) -> ScheduleSettings {
        ScheduleSettings {
            digest_every: Duration::from_secs(3600),
            digest_timeframe: TimeFrame::Day1,
            urgent_every: Duration::from_secs(600),
            urgent_timeframe: TimeFrame::Hour1,
            urgent_confidence: 90.0,
            cooldown: chrono::Duration::minutes(cooldown_minutes),
        }
    }

    async fn scheduler(
        feeds: Vec<(&str, Feed)>,
        confidence: f64,
        cooldown_minutes: i64,
    ) -> (Scheduler, Arc<RecordingNotifier>) {
        let coins = feeds.iter().map(|(symbol, _)| coin(symbol)).collect();
        let analyzer = Analyzer::new(
            Arc::new(FakeSource::new(feeds)),
            Arc::new(FakePredictor(Some(confidence))),
            quiet_oscillators(),
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = Scheduler::new(
            Arc::new(analyzer),
            Arc::new(in_memory_storage().await),
            notifier.clone(),
            coins,
            schedule(cooldown_minutes),
        );
        (scheduler, notifier)
    }

    #[tokio::test]
    async fn digest_reports_every_successful_coin() {
        let (scheduler, notifier) = scheduler(
            vec![
                ("BTCUSDT", Feed::Closes(compounding())),
                ("FOOUSDT", Feed::Unknown),
                ("ETHUSDT", Feed::Closes(wave(120, 50.0))),
            ],
            50.0,
            60,
        )
        .await;

        assert_eq!(scheduler.run_digest().await, 2);
        let reports = notifier.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, ReportKind::Digest);
        assert_eq!(reports[0].1, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[tokio::test]
    async fn urgent_respects_cooldown() {
        let (scheduler, notifier) =
            scheduler(vec![("BTCUSDT", Feed::Closes(compounding()))], 95.0, 60).await;

        assert_eq!(scheduler.run_urgent().await, 1);
        assert_eq!(scheduler.run_urgent().await, 0);

        let reports = notifier.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0], (ReportKind::Urgent, vec!["BTCUSDT".to_owned()]));
    }

    #[tokio::test]
    async fn digest_does_not_start_urgent_cooldown() {
        let (scheduler, _) =
            scheduler(vec![("BTCUSDT", Feed::Closes(compounding()))], 95.0, 60).await;
        scheduler.run_digest().await;
        assert_eq!(scheduler.run_urgent().await, 1);
    }

    #[tokio::test]
    async fn zero_cooldown_reports_every_scan() {
        let (scheduler, _) =
            scheduler(vec![("BTCUSDT", Feed::Closes(compounding()))], 95.0, 0).await;
        assert_eq!(scheduler.run_urgent().await, 1);
        assert_eq!(scheduler.run_urgent().await, 1);
    }

    #[tokio::test]
    async fn urgent_skips_low_confidence() {
        let (scheduler, notifier) =
            scheduler(vec![("BTCUSDT", Feed::Closes(compounding()))], 90.0, 60).await;
        assert_eq!(scheduler.run_urgent().await, 0);
        assert!(notifier.reports().is_empty());
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let (scheduler, notifier) =
            scheduler(vec![("BTCUSDT", Feed::Closes(compounding()))], 95.0, 60).await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        scheduler.run(cancel).await;
        assert!(notifier.reports().is_empty());
    }

    #[tokio::test]
    async fn runs_on_a_spawned_task() {
        let (scheduler, notifier) =
            scheduler(vec![("BTCUSDT", Feed::Closes(compounding()))], 95.0, 60).await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let handle = tokio::spawn(async move { scheduler.run(cancel).await });
        handle.await.unwrap();
        assert!(notifier.reports().is_empty());
    }

    #[tokio::test]
    async fn run_until_stops_after_shutdown() {
        let (scheduler, notifier) =
            scheduler(vec![("BTCUSDT", Feed::Closes(compounding()))], 95.0, 60).await;
        scheduler
            .run_until(async { Ok(()) }, Duration::from_secs(5))
            .await
            .unwrap();
        // the task dropped the scheduler, and its notifier handle with it
        assert_eq!(Arc::strong_count(&notifier), 1);
    }

    #[tokio::test]
    async fn run_until_stops_when_shutdown_listener_fails() {
        let (scheduler, notifier) =
            scheduler(vec![("BTCUSDT", Feed::Closes(compounding()))], 95.0, 60).await;
        let err = scheduler
            .run_until(
                async { Err(io::Error::other("no signal handler")) },
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no signal handler");
        assert_eq!(Arc::strong_count(&notifier), 1);
    }
}
