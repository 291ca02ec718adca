use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::application::ports::ArtifactPort;
use crate::domain::{
    errors::{DomainError, DomainResult},
    keypoints::{summarize, KeypointDocument, KeypointStats},
    outputs::{image_stem, OutputLayout, OutputSet},
};

/// Artefactos de OpenPose en el sistema de ficheros local.
pub struct FsArtifacts;

impl FsArtifacts {
    pub fn new() -> Self {
        Self
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn existing(candidates: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for path in candidates {
        if is_file(&path).await {
            found.push(path);
        }
    }
    found
}

#[async_trait]
impl ArtifactPort for FsArtifacts {
    async fn image_exists(&self, image: &Path) -> bool {
        is_file(image).await
    }

    async fn prepare(&self, layout: &OutputLayout) -> DomainResult<()> {
        for dir in layout.dirs() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                DomainError::OperationFailed(format!("Cannot create output directory {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }

    async fn discover(&self, layout: &OutputLayout, image: &Path) -> OutputSet {
        let Some(stem) = image_stem(image) else {
            return OutputSet::default();
        };

        let set = OutputSet {
            rendered_on_black: existing(OutputLayout::rendered_candidates(&layout.black_bg, &stem)).await,
            rendered_on_image: existing(OutputLayout::rendered_candidates(&layout.on_image, &stem)).await,
            json: existing(vec![layout.keypoints_file(&stem)]).await,
        };
        debug!(stem, found = !set.is_empty(), "output discovery");
        set
    }

    async fn summarize(&self, json: &Path) -> DomainResult<KeypointStats> {
        let raw = tokio::fs::read(json)
            .await
            .map_err(|e| DomainError::Discovery(format!("Cannot read {}: {e}", json.display())))?;
        let doc: KeypointDocument = serde_json::from_slice(&raw)
            .map_err(|e| DomainError::Discovery(format!("Invalid keypoints JSON {}: {e}", json.display())))?;
        summarize(&doc)
    }
}
