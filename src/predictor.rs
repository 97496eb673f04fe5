pub mod artifact;
pub mod fixed;

use error_stack::Report;
use futures::future::BoxFuture;
use serde::Deserialize;

use crate::error::PredictorError;
use crate::model::TimeFrame;

/// Source of the confidence attached to a trade plan.
pub trait ConfidencePredictor: Send + Sync {
    fn name(&self) -> &str;

    /// Confidence in [0, 100] for the next move of `symbol`.
    fn confidence<'a>(
        &'a self,
        symbol: &'a str,
        timeframe: TimeFrame,
    ) -> BoxFuture<'a, Result<f64, Report<PredictorError>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictorKind {
    /// Always answers with `static_confidence`.
    Static,
    /// Reads the confidence recorded in the symbol's model artifact.
    Artifact,
}
