use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::PredictorError;
use crate::model::TimeFrame;
use crate::predictor::ConfidencePredictor;

/// Returns the same confidence for every symbol.
pub struct StaticPredictor {
    confidence: f64,
}

impl StaticPredictor {
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }
}

impl ConfidencePredictor for StaticPredictor {
    fn name(&self) -> &str {
        "static"
    }

    fn confidence<'a>(
        &'a self,
        _symbol: &'a str,
        _timeframe: TimeFrame,
    ) -> BoxFuture<'a, Result<f64, Report<PredictorError>>> {
        let confidence = self.confidence;
        Box::pin(async move { Ok(confidence) })
    }
}
