use std::path::PathBuf;
use std::sync::Arc;

use error_stack::Report;
use futures::future::BoxFuture;
use tracing::debug;

use crate::error::PredictorError;
use crate::model::TimeFrame;
use crate::predictor::ConfidencePredictor;
use crate::store::{ModelStore, artifact_path};

/// Reads the confidence recorded in a symbol's [`ModelArtifact`].
///
/// [`ModelArtifact`]: crate::store::ModelArtifact
pub struct ArtifactPredictor {
    store: Arc<dyn ModelStore>,
    models_dir: PathBuf,
}

impl ArtifactPredictor {
    pub fn new(store: Arc<dyn ModelStore>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            models_dir: models_dir.into(),
        }
    }
}

impl ConfidencePredictor for ArtifactPredictor {
    fn name(&self) -> &str {
        "artifact"
    }

    fn confidence<'a>(
        &'a self,
        symbol: &'a str,
        timeframe: TimeFrame,
    ) -> BoxFuture<'a, Result<f64, Report<PredictorError>>> {
        Box::pin(async move {
            let unavailable = || PredictorError::ModelUnavailable {
                symbol: symbol.to_owned(),
                timeframe: timeframe.to_string(),
            };

            let path = artifact_path(&self.models_dir, symbol, timeframe);
            let artifact = self
                .store
                .load(&path)
                .await
                .map_err(|report| report.change_context(unavailable()))?;

            if artifact.symbol != symbol || artifact.timeframe != timeframe {
                return Err(Report::new(unavailable()).attach(format!(
                    "artifact at {} belongs to {} {}",
                    path.display(),
                    artifact.symbol,
                    artifact.timeframe
                )));
            }

            let confidence = artifact.confidence.ok_or_else(|| {
                Report::new(unavailable()).attach("artifact carries no confidence")
            })?;

            debug!(symbol, %timeframe, confidence, model_id = %artifact.id, "loaded model confidence");
            Ok(confidence)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::json::JsonModelStore;
    use crate::store::json::tests::{artifact, temp_dir};

    fn predictor(dir: &std::path::Path) -> ArtifactPredictor {
        ArtifactPredictor::new(Arc::new(JsonModelStore), dir)
    }

    #[tokio::test]
    async fn returns_recorded_confidence() {
        let dir = temp_dir();
        let path = artifact_path(&dir, "BTCUSDT", TimeFrame::Hour1);
        JsonModelStore
            .save(&artifact("BTCUSDT", Some(88.0)), &path)
            .await
            .unwrap();

        let value = predictor(&dir)
            .confidence("BTCUSDT", TimeFrame::Hour1)
            .await
            .unwrap();
        assert_eq!(value, 88.0);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn missing_artifact_is_unavailable() {
        let err = predictor(&temp_dir())
            .confidence("BTCUSDT", TimeFrame::Hour1)
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            PredictorError::ModelUnavailable { .. }
        ));
    }

    #[tokio::test]
    async fn artifact_without_confidence_is_unavailable() {
        let dir = temp_dir();
        let path = artifact_path(&dir, "ETHUSDT", TimeFrame::Hour1);
        JsonModelStore
            .save(&artifact("ETHUSDT", None), &path)
            .await
            .unwrap();

        let err = predictor(&dir)
            .confidence("ETHUSDT", TimeFrame::Hour1)
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            PredictorError::ModelUnavailable { .. }
        ));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
