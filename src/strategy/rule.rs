use serde::{Deserialize, Serialize};

use crate::snapshot::IndicatorSnapshot;
use crate::strategy::Vote;

/// The five voting rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rule {
    /// SMA10 against SMA20.
    Trend,
    /// RSI14 oversold / overbought.
    Momentum,
    /// MACD line against its signal line.
    Macd,
    /// Price outside the Bollinger envelope.
    Band,
    /// Stochastic %K extremes confirmed by the %K/%D cross.
    Oscillator,
}

impl Rule {
    pub const ALL: [Rule; 5] = [
        Rule::Trend,
        Rule::Momentum,
        Rule::Macd,
        Rule::Band,
        Rule::Oscillator,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Trend => "trend",
            Self::Momentum => "momentum",
            Self::Macd => "macd",
            Self::Band => "band",
            Self::Oscillator => "oscillator",
        }
    }
}

/// Oscillator levels used by the momentum and oscillator rules.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RuleThresholds {
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,
    #[serde(default = "default_stochastic_oversold")]
    pub stochastic_oversold: f64,
    #[serde(default = "default_stochastic_overbought")]
    pub stochastic_overbought: f64,
}

fn default_rsi_oversold() -> f64 {
    30.0
}

fn default_rsi_overbought() -> f64 {
    70.0
}

fn default_stochastic_oversold() -> f64 {
    20.0
}

fn default_stochastic_overbought() -> f64 {
    80.0
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            rsi_oversold: default_rsi_oversold(),
            rsi_overbought: default_rsi_overbought(),
            stochastic_oversold: default_stochastic_oversold(),
            stochastic_overbought: default_stochastic_overbought(),
        }
    }
}

/// Evaluate a single rule against a snapshot.
pub fn evaluate(rule: Rule, snapshot: &IndicatorSnapshot, thresholds: &RuleThresholds) -> Vote {
    match rule {
        Rule::Trend => {
            if snapshot.sma10 > snapshot.sma20 {
                Vote::Buy
            } else {
                Vote::Sell
            }
        }
        Rule::Momentum => {
            if snapshot.rsi14 < thresholds.rsi_oversold {
                Vote::Buy
            } else if snapshot.rsi14 > thresholds.rsi_overbought {
                Vote::Sell
            } else {
                Vote::Abstain
            }
        }
        // Without a signal line the bullish comparison cannot hold.
        Rule::Macd => match snapshot.macd {
            Some(macd) if macd.value > macd.signal => Vote::Buy,
            _ => Vote::Sell,
        },
        Rule::Band => {
            if snapshot.current_price < snapshot.bollinger.lower {
                Vote::Buy
            } else if snapshot.current_price > snapshot.bollinger.upper {
                Vote::Sell
            } else {
                Vote::Abstain
            }
        }
        Rule::Oscillator => {
            let stoch = snapshot.stochastic;
            if stoch.k < thresholds.stochastic_oversold && stoch.k > stoch.d {
                Vote::Buy
            } else if stoch.k > thresholds.stochastic_overbought && stoch.k < stoch.d {
                Vote::Sell
            } else {
                Vote::Abstain
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::indicator::bollinger::Bands;
    use crate::indicator::macd::MacdValue;
    use crate::indicator::stochastic::StochasticValue;

    /// A snapshot on which trend and MACD vote BUY and everything else abstains.
    pub fn neutral_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            sma10: 101.0,
            sma20: 100.0,
            sma50: Some(99.0),
            rsi14: 50.0,
            macd: Some(MacdValue {
                value: 1.0,
                signal: 0.5,
                histogram: 0.5,
            }),
            bollinger: Bands {
                upper: 110.0,
                middle: 100.0,
                lower: 90.0,
            },
            stochastic: StochasticValue { k: 50.0, d: 50.0 },
            atr14: 2.0,
            obv: 0.0,
            current_price: 100.0,
            price_change_24h: Some(0.0),
        }
    }

    fn vote(rule: Rule, snapshot: &IndicatorSnapshot) -> Vote {
        evaluate(rule, snapshot, &RuleThresholds::default())
    }

    #[test]
    fn trend_never_abstains() {
        let mut s = neutral_snapshot();
        assert_eq!(vote(Rule::Trend, &s), Vote::Buy);
        s.sma10 = s.sma20;
        assert_eq!(vote(Rule::Trend, &s), Vote::Sell);
        s.sma10 = 90.0;
        assert_eq!(vote(Rule::Trend, &s), Vote::Sell);
    }

    #[test]
    fn momentum_thresholds_are_exclusive() {
        let mut s = neutral_snapshot();
        s.rsi14 = 29.9;
        assert_eq!(vote(Rule::Momentum, &s), Vote::Buy);
        s.rsi14 = 30.0;
        assert_eq!(vote(Rule::Momentum, &s), Vote::Abstain);
        s.rsi14 = 70.0;
        assert_eq!(vote(Rule::Momentum, &s), Vote::Abstain);
        s.rsi14 = 70.1;
        assert_eq!(vote(Rule::Momentum, &s), Vote::Sell);
    }

    #[test]
    fn macd_votes_sell_when_equal_or_missing() {
        let mut s = neutral_snapshot();
        assert_eq!(vote(Rule::Macd, &s), Vote::Buy);
        s.macd = Some(MacdValue {
            value: 0.5,
            signal: 0.5,
            histogram: 0.0,
        });
        assert_eq!(vote(Rule::Macd, &s), Vote::Sell);
        s.macd = None;
        assert_eq!(vote(Rule::Macd, &s), Vote::Sell);
    }

    #[test]
    fn band_votes_outside_envelope_only() {
        let mut s = neutral_snapshot();
        assert_eq!(vote(Rule::Band, &s), Vote::Abstain);
        s.current_price = 89.0;
        assert_eq!(vote(Rule::Band, &s), Vote::Buy);
        s.current_price = 111.0;
        assert_eq!(vote(Rule::Band, &s), Vote::Sell);
        s.current_price = 110.0;
        assert_eq!(vote(Rule::Band, &s), Vote::Abstain);
    }

    #[test]
    fn oscillator_needs_extreme_and_cross() {
        let mut s = neutral_snapshot();
        s.stochastic = StochasticValue { k: 15.0, d: 10.0 };
        assert_eq!(vote(Rule::Oscillator, &s), Vote::Buy);
        s.stochastic = StochasticValue { k: 15.0, d: 18.0 };
        assert_eq!(vote(Rule::Oscillator, &s), Vote::Abstain);
        s.stochastic = StochasticValue { k: 85.0, d: 90.0 };
        assert_eq!(vote(Rule::Oscillator, &s), Vote::Sell);
        s.stochastic = StochasticValue { k: 85.0, d: 80.0 };
        assert_eq!(vote(Rule::Oscillator, &s), Vote::Abstain);
    }

    #[test]
    fn custom_thresholds_apply() {
        let mut s = neutral_snapshot();
        s.rsi14 = 35.0;
        let thresholds = RuleThresholds {
            rsi_oversold: 40.0,
            ..RuleThresholds::default()
        };
        assert_eq!(evaluate(Rule::Momentum, &s, &thresholds), Vote::Buy);
    }
}
