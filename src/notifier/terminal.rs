use crate::analyzer::Analysis;
use crate::notifier::{Notifier, ReportKind, format_report};

/// Writes reports to the log.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, kind: ReportKind, analyses: &[&Analysis]) {
        if analyses.is_empty() {
            return;
        }
        tracing::warn!(
            report = kind.as_str(),
            coins = analyses.len(),
            "\n{}",
            format_report(kind, analyses)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::tests::sample_analysis;

    #[test]
    fn terminal_notifier_does_not_panic() {
        let analysis = sample_analysis("BTCUSDT", 92.0);
        // Should not panic
        TerminalNotifier.notify(ReportKind::Urgent, &[&analysis]);
        TerminalNotifier.notify(ReportKind::Digest, &[]);
    }
}
