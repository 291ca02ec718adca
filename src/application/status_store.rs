use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::domain::{
    errors::{DomainError, DomainResult},
    job::{JobStatus, StatusPatch},
};

/// Único `JobStatus` del proceso. Toda lectura y escritura pasa por este candado;
/// ningún método lo mantiene a través de un `.await`.
#[derive(Clone, Default)]
pub struct StatusStore {
    inner: Arc<Mutex<JobStatus>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JobStatus> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> JobStatus {
        self.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Aplica solo los campos presentes. Mientras hay un trabajo en marcha el
    /// progreso no retrocede; un parche terminal lo fija a 100. Fuera de
    /// ejecución solo se aceptan parches que fijan `running`.
    pub fn update(&self, patch: StatusPatch) -> JobStatus {
        let mut status = self.lock();
        if !status.running && patch.running.is_none() {
            debug!("dropping status update for a job that is no longer running");
            return status.clone();
        }
        apply(&mut status, patch);
        status.clone()
    }

    /// Admisión atómica: comprueba y marca `running` bajo el mismo candado.
    pub fn try_begin(&self, image: &Path, output_dir: &Path) -> DomainResult<JobStatus> {
        let mut status = self.lock();
        if status.running {
            return Err(DomainError::AlreadyRunning);
        }
        *status = JobStatus {
            running: true,
            current_image: Some(image.to_path_buf()),
            message: format!("Starting to process image: {}", image.display()),
            progress: 0,
            output_dir: Some(output_dir.to_path_buf()),
        };
        debug!(image = %image.display(), "status: job admitted");
        Ok(status.clone())
    }

    /// Línea de log del proceso. Se ignora si el trabajo ya terminó, para que
    /// una línea rezagada no pise el estado terminal.
    pub fn record_line(&self, line: &str, progress: Option<u8>) {
        let mut status = self.lock();
        if !status.running {
            return;
        }
        apply(
            &mut status,
            StatusPatch { message: Some(line.to_string()), progress, ..Default::default() },
        );
    }
}

fn apply(status: &mut JobStatus, patch: StatusPatch) {
    let terminal = patch.running == Some(false);

    if let Some(message) = patch.message {
        debug!(%message, "status update");
        status.message = message;
    }
    if let Some(progress) = patch.progress {
        status.progress = if status.running && !terminal {
            status.progress.max(progress)
        } else {
            progress
        };
        debug!(progress = status.progress, "progress update");
    }
    if let Some(running) = patch.running {
        debug!(running, "processing state");
        status.running = running;
    }
    if let Some(image) = patch.current_image {
        status.current_image = Some(image);
    }
}
