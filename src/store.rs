pub mod json;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use error_stack::Report;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelStoreError;
use crate::model::TimeFrame;

/// Metadata describing a prepared (and possibly trained) model for one
/// symbol and timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub id: Uuid,
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub created_at: DateTime<Utc>,
    pub time_steps: usize,
    pub feature_count: usize,
    pub horizons: Vec<usize>,
    pub train_samples: usize,
    pub validation_samples: usize,
    /// Direction accuracy (%) of the persistence baseline on the validation
    /// split.
    #[serde(default)]
    pub baseline_direction_accuracy: Option<f64>,
    /// Confidence in [0, 100] recorded by whatever trained the model.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Persistence for [`ModelArtifact`]s.
pub trait ModelStore: Send + Sync {
    fn save<'a>(
        &'a self,
        artifact: &'a ModelArtifact,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<(), Report<ModelStoreError>>>;

    fn load<'a>(
        &'a self,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<ModelArtifact, Report<ModelStoreError>>>;
}

/// `<dir>/<symbol lowercase>_<timeframe>.json`
pub fn artifact_path(dir: &Path, symbol: &str, timeframe: TimeFrame) -> PathBuf {
    dir.join(format!("{}_{}.json", symbol.to_lowercase(), timeframe.as_str()))
}
