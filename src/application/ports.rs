use async_trait::async_trait;
use std::path::Path;
use tokio::sync::{mpsc, oneshot};

use crate::application::status_store::StatusStore;
use crate::domain::{
    errors::{DomainError, DomainResult},
    invocation::Invocation,
    keypoints::KeypointStats,
    model::PoseModel,
    outputs::{OutputLayout, OutputSet},
};

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: PoseModel) -> DomainResult<()>;
}

/// Petición de parada enviada al supervisor. La respuesta lleva el resultado de
/// la terminación del proceso (`Err` con el texto del fallo).
#[derive(Debug)]
pub struct StopRequest {
    pub reply: oneshot::Sender<Result<(), String>>,
}

#[derive(Debug)]
pub enum PassOutcome {
    Succeeded,
    Failed(DomainError),
    Stopped {
        request: StopRequest,
        termination: Result<(), String>,
    },
}

#[async_trait]
pub trait PoseRunnerPort: Send + Sync {
    /// Lanza una pasada y espera a que termine o a que llegue una parada por `stop`.
    /// El proceso hijo nunca sale de esta llamada.
    async fn run_pass(
        &self,
        invocation: &Invocation,
        status: &StatusStore,
        stop: &mut mpsc::Receiver<StopRequest>,
    ) -> PassOutcome;
}

#[async_trait]
pub trait ArtifactPort: Send + Sync {
    async fn image_exists(&self, image: &Path) -> bool;
    async fn prepare(&self, layout: &OutputLayout) -> DomainResult<()>;
    /// Nunca falla: lo que no existe simplemente no aparece.
    async fn discover(&self, layout: &OutputLayout, image: &Path) -> OutputSet;
    async fn summarize(&self, json: &Path) -> DomainResult<KeypointStats>;
}

#[async_trait]
pub trait ProcessProbePort: Send + Sync {
    async fn is_alive(&self, process_name: &str) -> DomainResult<bool>;
}
