use std::path::Path;

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;

use crate::error::ModelStoreError;
use crate::store::{ModelArtifact, ModelStore};

/// Stores artifacts as pretty-printed JSON files.
pub struct JsonModelStore;

impl ModelStore for JsonModelStore {
    fn save<'a>(
        &'a self,
        artifact: &'a ModelArtifact,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<(), Report<ModelStoreError>>> {
        Box::pin(async move {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .change_context(ModelStoreError::Save)
                    .attach_with(|| format!("cannot create directory: {}", parent.display()))?;
            }

            let body = serde_json::to_vec_pretty(artifact).change_context(ModelStoreError::Save)?;
            tokio::fs::write(path, body)
                .await
                .change_context(ModelStoreError::Save)
                .attach_with(|| format!("path: {}", path.display()))?;
            Ok(())
        })
    }

    fn load<'a>(
        &'a self,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<ModelArtifact, Report<ModelStoreError>>> {
        Box::pin(async move {
            let body = tokio::fs::read(path)
                .await
                .change_context(ModelStoreError::Load)
                .attach_with(|| format!("path: {}", path.display()))?;
            serde_json::from_slice(&body)
                .change_context(ModelStoreError::Load)
                .attach_with(|| format!("malformed artifact: {}", path.display()))
        })
    }
}
