use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    application::{
        dto::{Admission, ProcessOptions, StatusReport},
        ports::{ArtifactPort, ModelCatalogPort, PassOutcome, PoseRunnerPort, ProcessProbePort, StopRequest},
        status_store::StatusStore,
    },
    domain::{
        errors::{DomainError, DomainResult},
        invocation::Invocation,
        job::{JobStatus, StatusPatch},
        model::JobRequest,
        outputs::{image_stem, OutputLayout, OutputSet},
        progress::{PASS_COMMAND_PROGRESS, PASS_LAUNCH_PROGRESS},
    },
};

pub const COMPLETED_MESSAGE: &str = "Processing completed successfully";
pub const STOPPED_MESSAGE: &str = "Processing stopped by user";
pub const STOPPING_MESSAGE: &str = "Stopping process...";
pub const CRASHED_MESSAGE: &str = "Process may have crashed or completed without updating status";

/// Parámetros del supervisor que vienen de la configuración.
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub openpose_bin: PathBuf,
    pub default_output_dir: PathBuf,
    /// Tiempo máximo que `stop` espera la respuesta del supervisor.
    pub stop_reply_timeout: Duration,
}

impl JobSettings {
    /// Nombre que busca la sonda de vida en la tabla de procesos.
    pub fn process_name(&self) -> String {
        Invocation::new(&self.openpose_bin, Vec::new())
            .process_name()
            .unwrap_or_else(|| self.openpose_bin.to_string_lossy().into_owned())
    }
}

/// Ranura del trabajo activo. Se bloquea siempre antes que el `StatusStore`.
struct ActiveJob {
    id: Uuid,
    stop_tx: mpsc::Sender<StopRequest>,
    /// Pasada con proceso vivo; `None` entre pasadas.
    pass: Option<usize>,
    /// La sonda de vida ya publicó el estado terminal de este trabajo.
    repaired: bool,
}

/// Qué debería encontrar la sonda de vida en la tabla de procesos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Liveness {
    /// `running` sin supervisor detrás.
    Stale,
    InPass { id: Uuid, pass: usize },
    /// Entre pasadas no hay proceso que buscar.
    BetweenPasses,
}

enum JobEnd {
    Completed,
    /// La sonda de vida ya lo dio por caído.
    Abandoned,
    Failed(DomainError),
    Stopped(StopRequest, Result<(), String>),
}

/// Supervisor de trabajos: admisión, ejecución en segundo plano y parada.
#[derive(Clone)]
pub struct JobService {
    status: StatusStore,
    runner: Arc<dyn PoseRunnerPort>,
    models: Arc<dyn ModelCatalogPort>,
    artifacts: Arc<dyn ArtifactPort>,
    probe: Arc<dyn ProcessProbePort>,
    settings: Arc<JobSettings>,
    active: Arc<Mutex<Option<ActiveJob>>>,
}

impl JobService {
    pub fn new(
        status: StatusStore,
        runner: Arc<dyn PoseRunnerPort>,
        models: Arc<dyn ModelCatalogPort>,
        artifacts: Arc<dyn ArtifactPort>,
        probe: Arc<dyn ProcessProbePort>,
        settings: JobSettings,
    ) -> Self {
        Self {
            status,
            runner,
            models,
            artifacts,
            probe,
            settings: Arc::new(settings),
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> JobStatus {
        self.status.snapshot()
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveJob>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_busy(&self) -> bool {
        self.active().is_some() || self.status.is_running()
    }

    /// Valida y admite un trabajo. Devuelve en cuanto arranca la tarea de fondo.
    pub async fn submit(&self, request: JobRequest) -> DomainResult<Admission> {
        if self.is_busy() {
            return Err(DomainError::AlreadyRunning);
        }

        request.validate()?;
        self.models.validate_model(request.model).await?;
        if !self.artifacts.image_exists(&request.image_path).await {
            return Err(DomainError::NotFound(format!(
                "Image not found: {}",
                request.image_path.display()
            )));
        }

        // Se reserva la ranura antes de tocar el disco: una admisión rechazada
        // no crea directorios.
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let id = Uuid::new_v4();
        {
            let mut active = self.active();
            if active.is_some() || self.status.is_running() {
                return Err(DomainError::AlreadyRunning);
            }
            *active = Some(ActiveJob { id, stop_tx, pass: None, repaired: false });
        }

        let layout = OutputLayout::new(&request.output_dir);
        if let Err(e) = self.artifacts.prepare(&layout).await {
            self.release(id);
            return Err(e);
        }

        let begun = {
            let _slot = self.active();
            self.status.try_begin(&request.image_path, &request.output_dir)
        };
        let status = match begun {
            Ok(status) => status,
            Err(e) => {
                self.release(id);
                return Err(e);
            }
        };

        let warnings = request.warnings();
        for w in &warnings {
            warn!("{w}");
        }

        info!(
            job_id = %id,
            image = %request.image_path.display(),
            model = %request.model,
            "📥 job admitted"
        );

        let options = ProcessOptions::from(&request);
        self.spawn_job(id, request, stop_rx);

        Ok(Admission { status, options, warnings })
    }

    /// Tarea del supervisor más una tarea vigía: si el supervisor entra en pánico
    /// el trabajo se cierra igualmente con un estado terminal.
    fn spawn_job(&self, id: Uuid, request: JobRequest, stop_rx: mpsc::Receiver<StopRequest>) {
        let supervisor = self.clone();
        let handle = tokio::spawn(async move { supervisor.run(id, request, stop_rx).await });

        let watcher = self.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                error!(job_id = %id, "supervisor task died: {e}");
                watcher.conclude(id, StatusPatch::terminal(format!("Exception during processing: {e}")));
            }
        });
    }

    async fn run(&self, id: Uuid, request: JobRequest, mut stop_rx: mpsc::Receiver<StopRequest>) {
        let layout = OutputLayout::new(&request.output_dir);
        let stem = image_stem(&request.image_path);
        let mut outputs = OutputSet::default();
        let mut end = JobEnd::Completed;

        for (index, pass) in request.render_passes(&layout).into_iter().enumerate() {
            if self.was_repaired(id) {
                end = JobEnd::Abandoned;
                break;
            }
            // Una parada que llega entre pasadas no tiene proceso que matar.
            if let Ok(stop) = stop_rx.try_recv() {
                end = JobEnd::Stopped(stop, Ok(()));
                break;
            }

            let invocation = Invocation::for_pass(&self.settings.openpose_bin, &request, &pass, &layout);
            self.status.update(
                StatusPatch::message(format!("Running OpenPose for {} rendering...", pass.label()))
                    .with_progress(PASS_LAUNCH_PROGRESS),
            );
            self.status.update(
                StatusPatch::message(format!("Command: {invocation}")).with_progress(PASS_COMMAND_PROGRESS),
            );
            if request.feet_enabled() {
                self.status.update(StatusPatch::message(format!(
                    "Feet detection enabled with threshold: {}",
                    request.thresholds.feet
                )));
            }

            info!(job_id = %id, pass = pass.label(), "🚀 launching OpenPose");
            self.set_pass(id, Some(index));
            let outcome = self.runner.run_pass(&invocation, &self.status, &mut stop_rx).await;
            self.set_pass(id, None);

            match outcome {
                PassOutcome::Succeeded => {
                    if stem.is_some() {
                        let found = self.artifacts.discover(&layout, &request.image_path).await;
                        let found = found.for_pass(pass.style);
                        info!(
                            job_id = %id,
                            pass = pass.label(),
                            rendered = found.rendered_on_black.len() + found.rendered_on_image.len(),
                            json = found.json.len(),
                            "pass finished"
                        );
                        outputs.merge(found);
                    }
                }
                PassOutcome::Failed(err) => {
                    error!(job_id = %id, pass = pass.label(), model = %request.model, "❌ {err}");
                    end = JobEnd::Failed(err);
                    break;
                }
                PassOutcome::Stopped { request: stop, termination } => {
                    end = JobEnd::Stopped(stop, termination);
                    break;
                }
            }
        }

        match end {
            JobEnd::Completed => {
                info!(job_id = %id, json = outputs.json.len(), "✅ {COMPLETED_MESSAGE}");
                self.conclude(id, StatusPatch::terminal(COMPLETED_MESSAGE));
            }
            JobEnd::Abandoned => {
                warn!(job_id = %id, "skipping remaining passes of a job marked as crashed");
                self.conclude(id, StatusPatch::terminal(CRASHED_MESSAGE));
            }
            JobEnd::Failed(err) => {
                self.conclude(id, StatusPatch::terminal(err.to_string()));
            }
            JobEnd::Stopped(stop, termination) => {
                if let Err(e) = &termination {
                    warn!(job_id = %id, "error while stopping OpenPose: {e}");
                }
                info!(job_id = %id, "🛑 {STOPPED_MESSAGE}");
                self.conclude(id, StatusPatch::terminal(STOPPED_MESSAGE));
                let _ = stop.reply.send(termination);
            }
        }
        // Las paradas que queden en el canal reciben `RecvError` al soltar `stop_rx`.
    }

    /// Publica el estado terminal y libera la ranura bajo el mismo candado,
    /// así ninguna admisión nueva se cuela entre ambos pasos. Si la sonda de
    /// vida ya cerró el trabajo, su estado terminal se mantiene.
    fn conclude(&self, id: Uuid, patch: StatusPatch) {
        let mut active = self.active();
        match active.as_ref() {
            Some(job) if job.id == id => {
                if job.repaired {
                    debug!(job_id = %id, "keeping the terminal status published by the liveness probe");
                } else {
                    self.status.update(patch);
                }
                *active = None;
            }
            _ => warn!(job_id = %id, "ignoring terminal status for a job that is no longer active"),
        }
    }

    /// Libera la ranura de una admisión que no llegó a arrancar.
    fn release(&self, id: Uuid) {
        let mut active = self.active();
        if active.as_ref().map(|job| job.id) == Some(id) {
            *active = None;
        }
    }

    fn set_pass(&self, id: Uuid, pass: Option<usize>) {
        if let Some(job) = self.active().as_mut().filter(|job| job.id == id) {
            job.pass = pass;
        }
    }

    fn was_repaired(&self, id: Uuid) -> bool {
        self.active().as_ref().is_some_and(|job| job.id == id && job.repaired)
    }

    fn liveness(&self) -> Liveness {
        match self.active().as_ref() {
            None => Liveness::Stale,
            Some(ActiveJob { id, pass: Some(pass), .. }) => Liveness::InPass { id: *id, pass: *pass },
            Some(_) => Liveness::BetweenPasses,
        }
    }

    /// Cierra como caído un trabajo cuyo proceso ya no existe. Solo actúa si el
    /// supervisor sigue en la misma pasada que se consultó; en ese caso además
    /// le pide que pare, para que no lance las pasadas que quedan.
    fn repair(&self, target: Liveness) -> Option<JobStatus> {
        let mut active = self.active();
        match (target, active.as_mut()) {
            (Liveness::Stale, None) if self.status.is_running() => {}
            (Liveness::InPass { id, pass }, Some(job)) if job.id == id && job.pass == Some(pass) => {
                job.repaired = true;
                let (reply, _) = oneshot::channel();
                if job.stop_tx.try_send(StopRequest { reply }).is_err() {
                    debug!(job_id = %id, "a stop is already on its way to the supervisor");
                }
            }
            _ => return None,
        }
        warn!("no OpenPose process found while a job is marked running");
        Some(self.status.update(StatusPatch::terminal(CRASHED_MESSAGE)))
    }

    /// Pide al supervisor que pare el proceso en curso y espera su respuesta.
    pub async fn stop(&self) -> DomainResult<JobStatus> {
        let stop_tx = match self.active().as_ref() {
            Some(job) => job.stop_tx.clone(),
            None => return Err(DomainError::NotRunning),
        };

        info!("🛑 stop requested");
        let (reply, reply_rx) = oneshot::channel();
        match stop_tx.try_send(StopRequest { reply }) {
            // No pisa un estado terminal que ya se haya publicado.
            Ok(()) => self.status.record_line(STOPPING_MESSAGE, None),
            Err(mpsc::error::TrySendError::Full(_)) => {
                return Err(DomainError::Cancellation("a stop request is already in progress".into()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => return Err(DomainError::AlreadyFinished),
        }

        match tokio::time::timeout(self.settings.stop_reply_timeout, reply_rx).await {
            Ok(Ok(Ok(()))) => Ok(self.status.snapshot()),
            Ok(Ok(Err(e))) => Err(DomainError::Cancellation(e)),
            // El supervisor terminó por su cuenta antes de atender la parada.
            Ok(Err(_)) => Err(DomainError::AlreadyFinished),
            Err(_) => Err(DomainError::Cancellation(
                "timed out waiting for the job to stop".into(),
            )),
        }
    }

    /// Estado + salidas en disco + estadísticas de keypoints.
    pub async fn status(&self, check_process: bool) -> StatusReport {
        let mut snapshot = self.status.snapshot();
        let mut status_error = None;

        if check_process && snapshot.running {
            match self.liveness() {
                Liveness::BetweenPasses => debug!("no OpenPose process expected between passes, skipping probe"),
                target => {
                    let name = self.settings.process_name();
                    match self.probe.is_alive(&name).await {
                        Ok(true) => {}
                        Ok(false) => {
                            if let Some(repaired) = self.repair(target) {
                                snapshot = repaired;
                            }
                        }
                        Err(e) => status_error = Some(e.to_string()),
                    }
                }
            }
        }

        let mut report = StatusReport {
            status: snapshot.clone(),
            status_error,
            outputs: None,
            keypoint_stats: None,
            keypoint_stats_error: None,
            estimated_completion: None,
        };

        if let Some(image) = snapshot.current_image.as_ref() {
            let root = snapshot
                .output_dir
                .clone()
                .unwrap_or_else(|| self.settings.default_output_dir.clone());
            let layout = OutputLayout::new(root);
            let outputs = self.artifacts.discover(&layout, image).await;

            if let Some(json) = outputs.json.first() {
                match self.artifacts.summarize(json).await {
                    Ok(stats) => report.keypoint_stats = Some(stats),
                    Err(e) => report.keypoint_stats_error = Some(e.to_string()),
                }
            }
            report.outputs = Some(outputs);
        }

        if snapshot.running {
            report.estimated_completion = Some(estimated_completion(report.outputs.as_ref()).into());
        }

        report
    }
}

fn estimated_completion(outputs: Option<&OutputSet>) -> &'static str {
    match outputs {
        None => "Checking for output files...",
        Some(o) if !o.json.is_empty() => "JSON output complete, finalizing processing...",
        Some(o) if o.has_renderings() => "Renderings complete, generating JSON output...",
        Some(_) => "Processing image, no outputs yet...",
    }
}
