pub mod terminal;

use std::fmt::Write;

use crate::analyzer::Analysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Every tracked coin, on the digest schedule.
    Digest,
    /// High-confidence directional plans only.
    Urgent,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Digest => "digest",
            Self::Urgent => "urgent",
        }
    }
}

/// Sink for analysis reports.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: ReportKind, analyses: &[&Analysis]);
}

/// Plain-text rendering of one analysis.
pub fn format_analysis(analysis: &Analysis) -> String {
    let mut out = String::new();
    let plan = &analysis.plan;
    let decision = &analysis.decision;

    let _ = writeln!(
        out,
        "{} ({}) {}",
        analysis.name, analysis.symbol, analysis.timeframe
    );
    let change = match analysis.price_change_24h {
        Some(change) => format!("{change:+.2}%"),
        None => "n/a".into(),
    };
    let _ = writeln!(out, "  price      {:.4} ({change} 24h)", analysis.price);
    let _ = writeln!(
        out,
        "  decision   {} (score {:+.0}, {} buy / {} sell)",
        decision.label.as_str(),
        decision.score,
        decision.buy_votes,
        decision.sell_votes
    );

    let votes: Vec<String> = decision
        .signals
        .iter()
        .map(|s| format!("{} {}", s.rule.name(), s.vote.as_str()))
        .collect();
    let _ = writeln!(out, "  votes      {}", votes.join(", "));

    let indicators = &analysis.indicators;
    let _ = writeln!(
        out,
        "  rsi14 {:.1}  stoch {:.1}/{:.1}  atr14 {:.4}",
        indicators.rsi14, indicators.stochastic.k, indicators.stochastic.d, indicators.atr14
    );

    let _ = write!(out, "  plan       {}", plan.action.as_str());
    if let (Some(stop), Some(tp1), Some(tp2)) = (plan.stop_loss, plan.take_profit1, plan.take_profit2)
    {
        let _ = write!(
            out,
            " @ {:.4}  stop {stop:.4}  tp1 {tp1:.4}  tp2 {tp2:.4}",
            plan.entry
        );
    }
    let _ = write!(out, "  confidence {:.1}%", plan.confidence);
    out
}

/// Header line plus one block per analysis.
pub fn format_report(kind: ReportKind, analyses: &[&Analysis]) -> String {
    let header = match kind {
        ReportKind::Digest => format!("Market digest: {} coins", analyses.len()),
        ReportKind::Urgent => format!("Urgent signals: {} high-confidence plans", analyses.len()),
    };
    let mut out = header;
    for analysis in analyses {
        out.push_str("\n\n");
        out.push_str(&format_analysis(analysis));
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::TimeFrame;
    use crate::plan::synthesize;
    use crate::strategy::decide;
    use crate::strategy::rule::tests::neutral_snapshot;

    /// Trend and MACD vote BUY: score +40, label BUY.
    pub fn sample_analysis(symbol: &str, confidence: f64) -> Analysis {
        let indicators = neutral_snapshot();
        let decision = decide(&indicators);
        let plan = synthesize(&decision, indicators.current_price, confidence);
        Analysis {
            symbol: symbol.into(),
            name: "Bitcoin".into(),
            timeframe: TimeFrame::Hour1,
            price: indicators.current_price,
            price_change_24h: indicators.price_change_24h,
            indicators,
            decision,
            plan,
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn analysis_block_lists_plan_targets() {
        let text = format_analysis(&sample_analysis("BTCUSDT", 75.0));
        assert!(text.starts_with("Bitcoin (BTCUSDT) 1h"));
        assert!(text.contains("decision   BUY (score +40, 2 buy / 0 sell)"));
        assert!(text.contains("votes      trend buy, momentum -, macd buy, band -, oscillator -"));
        assert!(text.contains("stop 95.0000"));
        assert!(text.contains("tp2 107.0000"));
        assert!(text.contains("confidence 75.0%"));
        assert!(text.contains("+0.00% 24h"));
    }

    #[test]
    fn missing_price_change_is_marked() {
        let mut analysis = sample_analysis("BTCUSDT", 50.0);
        analysis.price_change_24h = None;
        assert!(format_analysis(&analysis).contains("(n/a 24h)"));
    }

    #[test]
    fn report_has_header_and_one_block_per_coin() {
        let a = sample_analysis("BTCUSDT", 95.0);
        let b = sample_analysis("ETHUSDT", 96.0);
        let text = format_report(ReportKind::Urgent, &[&a, &b]);
        assert!(text.starts_with("Urgent signals: 2 high-confidence plans"));
        assert!(text.contains("(BTCUSDT)"));
        assert!(text.contains("(ETHUSDT)"));
    }
}
