use std::sync::Arc;
use crate::application::services::JobService;

/// Estado compartido para los manejadores HTTP de Axum.
/// Siguiendo la Arquitectura Hexagonal, el estado contiene los servicios (Casos de Uso).
#[derive(Clone)]
pub struct HttpState {
    /// Supervisor de trabajos de OpenPose: admisión, estado y parada.
    pub jobs: Arc<JobService>,
}
