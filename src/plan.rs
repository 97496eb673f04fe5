//! Turns a decision plus an externally supplied confidence into price targets.

use serde::Serialize;

use crate::strategy::{Decision, DecisionLabel};

/// Confidence used when the supplied value is not a number.
pub const NEUTRAL_CONFIDENCE: f64 = 50.0;

const BUY_STOP_LOSS: f64 = 0.95;
const BUY_TAKE_PROFIT_1: f64 = 1.03;
const BUY_TAKE_PROFIT_2: f64 = 1.07;

const SELL_STOP_LOSS: f64 = 1.05;
const SELL_TAKE_PROFIT_1: f64 = 0.97;
const SELL_TAKE_PROFIT_2: f64 = 0.93;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanAction {
    Buy,
    Sell,
    Neutral,
}

impl PlanAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Neutral => "NEUTRAL",
        }
    }
}

impl From<DecisionLabel> for PlanAction {
    fn from(label: DecisionLabel) -> Self {
        if label.is_buy() {
            Self::Buy
        } else if label.is_sell() {
            Self::Sell
        } else {
            Self::Neutral
        }
    }
}

/// Entry, exit targets and confidence for one symbol.
///
/// Targets are only present for directional plans.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradePlan {
    pub action: PlanAction,
    pub entry: f64,
    pub stop_loss: Option<f64>,
    pub take_profit1: Option<f64>,
    pub take_profit2: Option<f64>,
    /// In [0, 100].
    pub confidence: f64,
}

impl TradePlan {
    pub fn is_actionable(&self) -> bool {
        self.action != PlanAction::Neutral
    }
}

pub fn synthesize(decision: &Decision, price: f64, confidence: f64) -> TradePlan {
    let action = PlanAction::from(decision.label);
    let (stop_loss, take_profit1, take_profit2) = match action {
        PlanAction::Buy => (
            Some(price * BUY_STOP_LOSS),
            Some(price * BUY_TAKE_PROFIT_1),
            Some(price * BUY_TAKE_PROFIT_2),
        ),
        PlanAction::Sell => (
            Some(price * SELL_STOP_LOSS),
            Some(price * SELL_TAKE_PROFIT_1),
            Some(price * SELL_TAKE_PROFIT_2),
        ),
        PlanAction::Neutral => (None, None, None),
    };

    TradePlan {
        action,
        entry: price,
        stop_loss,
        take_profit1,
        take_profit2,
        confidence: clamp_confidence(confidence),
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        NEUTRAL_CONFIDENCE
    } else {
        confidence.clamp(0.0, 100.0)
    }
}
