pub mod rule;

use serde::Serialize;

use crate::snapshot::IndicatorSnapshot;
use rule::{Rule, RuleThresholds};

/// Fixed denominator of the strength score: every rule counts, even when it
/// abstains.
pub const RULE_COUNT: usize = Rule::ALL.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Vote {
    Buy,
    Sell,
    Abstain,
}

impl Vote {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Abstain => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Signal {
    pub rule: Rule,
    pub vote: Vote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionLabel {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl DecisionLabel {
    /// Map a signed score in [-100, 100] to a label.
    ///
    /// `score > 60` is strong buy and `score <= -60` strong sell. A score of
    /// exactly 20 already counts as a buy, and -20 as a sell.
    pub fn from_score(score: f64) -> Self {
        if score > 60.0 {
            Self::StrongBuy
        } else if score >= 20.0 {
            Self::Buy
        } else if score > -20.0 {
            Self::Neutral
        } else if score > -60.0 {
            Self::Sell
        } else {
            Self::StrongSell
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::Buy => "BUY",
            Self::Neutral => "NEUTRAL",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG_SELL",
        }
    }

    pub fn is_buy(self) -> bool {
        matches!(self, Self::StrongBuy | Self::Buy)
    }

    pub fn is_sell(self) -> bool {
        matches!(self, Self::StrongSell | Self::Sell)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub label: DecisionLabel,
    /// Signed score: `(buy_votes - sell_votes) / 5 * 100`.
    pub score: f64,
    /// Magnitude of `score`, in [0, 100].
    pub strength: f64,
    pub buy_votes: usize,
    pub sell_votes: usize,
    /// One entry per rule, in evaluation order.
    pub signals: Vec<Signal>,
}

/// Run all rules with the default thresholds.
pub fn decide(snapshot: &IndicatorSnapshot) -> Decision {
    decide_with(snapshot, &RuleThresholds::default())
}

pub fn decide_with(snapshot: &IndicatorSnapshot, thresholds: &RuleThresholds) -> Decision {
    let signals: Vec<Signal> = Rule::ALL
        .iter()
        .map(|&rule| Signal {
            rule,
            vote: rule::evaluate(rule, snapshot, thresholds),
        })
        .collect();

    let buy_votes = signals.iter().filter(|s| s.vote == Vote::Buy).count();
    let sell_votes = signals.iter().filter(|s| s.vote == Vote::Sell).count();
    let score = (buy_votes as f64 - sell_votes as f64) * 100.0 / RULE_COUNT as f64;

    Decision {
        label: DecisionLabel::from_score(score),
        score,
        strength: score.abs(),
        buy_votes,
        sell_votes,
        signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::macd::MacdValue;
    use crate::indicator::stochastic::StochasticValue;
    use crate::snapshot::compute;
    use crate::model::fixtures::series_from_closes;
    use crate::strategy::rule::tests::neutral_snapshot;

    #[test]
    fn label_boundaries() {
        assert_eq!(DecisionLabel::from_score(100.0), DecisionLabel::StrongBuy);
        assert_eq!(DecisionLabel::from_score(60.1), DecisionLabel::StrongBuy);
        assert_eq!(DecisionLabel::from_score(60.0), DecisionLabel::Buy);
        assert_eq!(DecisionLabel::from_score(59.9), DecisionLabel::Buy);
        assert_eq!(DecisionLabel::from_score(20.0), DecisionLabel::Buy);
        assert_eq!(DecisionLabel::from_score(19.9), DecisionLabel::Neutral);
        assert_eq!(DecisionLabel::from_score(0.0), DecisionLabel::Neutral);
        assert_eq!(DecisionLabel::from_score(-19.9), DecisionLabel::Neutral);
        assert_eq!(DecisionLabel::from_score(-20.0), DecisionLabel::Sell);
        assert_eq!(DecisionLabel::from_score(-60.0), DecisionLabel::StrongSell);
        assert_eq!(DecisionLabel::from_score(-100.0), DecisionLabel::StrongSell);
    }

    #[test]
    fn signals_follow_rule_order() {
        let decision = decide(&neutral_snapshot());
        let rules: Vec<Rule> = decision.signals.iter().map(|s| s.rule).collect();
        assert_eq!(rules, Rule::ALL.to_vec());
    }

    #[test]
    fn abstentions_still_count_in_denominator() {
        // trend BUY, macd BUY, momentum SELL, band + oscillator abstain
        let mut s = neutral_snapshot();
        s.rsi14 = 75.0;
        let decision = decide(&s);
        assert_eq!(decision.buy_votes, 2);
        assert_eq!(decision.sell_votes, 1);
        // (2 - 1) / 5, not (2 - 1) / 3
        assert_eq!(decision.score, 20.0);
        assert_eq!(decision.label, DecisionLabel::Buy);
    }

    #[test]
    fn two_buy_one_sell_two_abstain_scores_twenty() {
        // trend BUY, momentum BUY, macd SELL, band + oscillator abstain
        let mut s = neutral_snapshot();
        s.rsi14 = 25.0;
        s.macd = Some(MacdValue {
            value: -1.0,
            signal: 0.0,
            histogram: -1.0,
        });
        let decision = decide(&s);
        assert_eq!((decision.buy_votes, decision.sell_votes), (2, 1));
        assert_eq!(decision.score, 20.0);
        assert_eq!(decision.strength, 20.0);
        assert_eq!(decision.label, DecisionLabel::Buy);
    }

    #[test]
    fn three_buy_two_abstain_is_only_buy() {
        // trend BUY, momentum BUY, macd BUY, band + oscillator abstain
        let mut s = neutral_snapshot();
        s.rsi14 = 25.0;
        let decision = decide(&s);
        assert_eq!((decision.buy_votes, decision.sell_votes), (3, 0));
        assert_eq!(decision.score, 60.0);
        assert_eq!(decision.label, DecisionLabel::Buy);
    }

    #[test]
    fn unanimous_buy_is_strong_buy() {
        let mut s = neutral_snapshot();
        s.rsi14 = 20.0;
        s.current_price = 85.0;
        s.stochastic = StochasticValue { k: 10.0, d: 5.0 };
        let decision = decide(&s);
        assert_eq!(decision.buy_votes, 5);
        assert_eq!(decision.score, 100.0);
        assert_eq!(decision.label, DecisionLabel::StrongBuy);
    }

    #[test]
    fn unanimous_sell_is_strong_sell() {
        let mut s = neutral_snapshot();
        s.sma10 = 95.0;
        s.rsi14 = 80.0;
        s.macd = None;
        s.current_price = 115.0;
        s.stochastic = StochasticValue { k: 90.0, d: 95.0 };
        let decision = decide(&s);
        assert_eq!(decision.sell_votes, 5);
        assert_eq!(decision.score, -100.0);
        assert_eq!(decision.strength, 100.0);
        assert_eq!(decision.label, DecisionLabel::StrongSell);
    }

    #[test]
    fn full_vote_scores_land_on_fixed_grid() {
        let mut s = neutral_snapshot();
        // trend BUY, macd BUY, the other three SELL -> (2 - 3) / 5
        s.rsi14 = 80.0;
        s.current_price = 115.0;
        s.stochastic = StochasticValue { k: 90.0, d: 95.0 };
        let decision = decide(&s);
        assert_eq!(decision.buy_votes + decision.sell_votes, 5);
        assert_eq!(decision.score, -20.0);
        assert_eq!(decision.label, DecisionLabel::Sell);
    }

    #[test]
    fn flat_market_decision() {
        // flat: sma10 == sma20 -> SELL, macd equal -> SELL, rest abstain
        let snapshot = compute(&series_from_closes(&[100.0; 60])).unwrap();
        let decision = decide(&snapshot);
        assert_eq!(decision.sell_votes, 2);
        assert_eq!(decision.buy_votes, 0);
        assert_eq!(decision.score, -40.0);
        assert_eq!(decision.label, DecisionLabel::Sell);
    }
}
