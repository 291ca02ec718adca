use async_trait::async_trait;
use std::path::PathBuf;

use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::PoseModel;

const PROTOTXT_FILE: &str = "pose_deploy_linevec.prototxt";

/// Comprueba que los pesos del modelo están instalados bajo `{models_dir}/pose/`.
pub struct OpenPoseModelCatalog {
    models_dir: PathBuf,
}

impl OpenPoseModelCatalog {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self { models_dir: models_dir.into() }
    }

    pub fn model_dir(&self, model: PoseModel) -> PathBuf {
        self.models_dir.join("pose").join(model.asset_dir())
    }
}

#[async_trait]
impl ModelCatalogPort for OpenPoseModelCatalog {
    async fn validate_model(&self, model: PoseModel) -> DomainResult<()> {
        let dir = self.model_dir(model);
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            return Err(DomainError::NotFound(format!("Model directory not found: {}", dir.display())));
        }
        if model.prototxt().is_some() && !tokio::fs::try_exists(dir.join(PROTOTXT_FILE)).await.unwrap_or(false) {
            return Err(DomainError::NotFound(format!(
                "Required prototxt file for {model} not found: {}",
                dir.join(PROTOTXT_FILE).display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn body25_only_needs_its_directory() {
        let root = tempfile::tempdir().unwrap();
        let catalog = OpenPoseModelCatalog::new(root.path());

        let err = catalog.validate_model(PoseModel::Body25).await.unwrap_err();
        assert!(err.to_string().starts_with("Model directory not found"));

        std::fs::create_dir_all(root.path().join("pose/body_25")).unwrap();
        assert!(catalog.validate_model(PoseModel::Body25).await.is_ok());
    }

    #[tokio::test]
    async fn coco_and_mpi_also_need_the_prototxt() {
        let root = tempfile::tempdir().unwrap();
        let catalog = OpenPoseModelCatalog::new(root.path());
        std::fs::create_dir_all(catalog.model_dir(PoseModel::Coco)).unwrap();

        let err = catalog.validate_model(PoseModel::Coco).await.unwrap_err();
        assert!(err.to_string().starts_with("Required prototxt file for COCO not found"));

        std::fs::write(catalog.model_dir(PoseModel::Coco).join(PROTOTXT_FILE), "").unwrap();
        assert!(catalog.validate_model(PoseModel::Coco).await.is_ok());
        assert!(catalog.validate_model(PoseModel::Mpi).await.is_err());
    }
}
