//! Puertos falsos para probar el supervisor sin OpenPose ni disco.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

use crate::application::{
    ports::{ArtifactPort, ModelCatalogPort, PassOutcome, PoseRunnerPort, ProcessProbePort, StopRequest},
    services::{JobService, JobSettings},
    status_store::StatusStore,
};
use crate::domain::{
    errors::{DomainError, DomainResult},
    invocation::Invocation,
    keypoints::KeypointStats,
    model::PoseModel,
    outputs::{OutputLayout, OutputSet},
    progress::infer_progress,
};

/// Guion de una pasada del runner falso.
#[derive(Debug, Clone)]
pub enum ScriptedPass {
    Succeed(Vec<String>),
    Fail(DomainError),
    BlockUntilStopped,
    /// Atiende la parada pero la terminación falla.
    StopFails(String),
    /// El proceso termina solo justo cuando llega la parada.
    ExitWhenStopArrives,
    /// Sigue "vivo" hasta que el test lo libera; no atiende paradas.
    WaitFor(Arc<Notify>),
}

impl ScriptedPass {
    pub fn succeed_with_lines(lines: &[&str]) -> Self {
        ScriptedPass::Succeed(lines.iter().map(|l| l.to_string()).collect())
    }
}

#[derive(Default)]
pub struct FakeRunner {
    script: Mutex<VecDeque<ScriptedPass>>,
    seen: Mutex<Vec<Invocation>>,
}

impl FakeRunner {
    pub fn push(&self, pass: ScriptedPass) {
        self.script.lock().unwrap().push_back(pass);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PoseRunnerPort for FakeRunner {
    async fn run_pass(
        &self,
        invocation: &Invocation,
        status: &StatusStore,
        stop: &mut mpsc::Receiver<StopRequest>,
    ) -> PassOutcome {
        self.seen.lock().unwrap().push(invocation.clone());
        let step = self.script.lock().unwrap().pop_front();

        match step.unwrap_or(ScriptedPass::Succeed(Vec::new())) {
            ScriptedPass::Succeed(lines) => {
                for line in lines {
                    status.record_line(&line, infer_progress(&line));
                }
                PassOutcome::Succeeded
            }
            ScriptedPass::Fail(err) => PassOutcome::Failed(err),
            ScriptedPass::BlockUntilStopped => match stop.recv().await {
                Some(request) => PassOutcome::Stopped { request, termination: Ok(()) },
                None => PassOutcome::Failed(DomainError::Launch("stop channel closed".into())),
            },
            ScriptedPass::StopFails(reason) => match stop.recv().await {
                Some(request) => PassOutcome::Stopped { request, termination: Err(reason) },
                None => PassOutcome::Failed(DomainError::Launch("stop channel closed".into())),
            },
            ScriptedPass::ExitWhenStopArrives => {
                drop(stop.recv().await);
                PassOutcome::Succeeded
            }
            ScriptedPass::WaitFor(gate) => {
                gate.notified().await;
                PassOutcome::Succeeded
            }
        }
    }
}

#[derive(Default)]
pub struct FakeModelCatalog {
    error: Mutex<Option<DomainError>>,
}

impl FakeModelCatalog {
    pub fn reject_with(&self, err: DomainError) {
        *self.error.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl ModelCatalogPort for FakeModelCatalog {
    async fn validate_model(&self, _model: PoseModel) -> DomainResult<()> {
        match self.error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub struct FakeArtifacts {
    image_exists: AtomicBool,
    outputs: Mutex<Vec<PathBuf>>,
    prepared: Mutex<Vec<PathBuf>>,
    prepare_error: Mutex<Option<String>>,
    summary_error: Mutex<Option<String>>,
}

impl Default for FakeArtifacts {
    fn default() -> Self {
        Self {
            image_exists: AtomicBool::new(true),
            outputs: Mutex::default(),
            prepared: Mutex::default(),
            prepare_error: Mutex::default(),
            summary_error: Mutex::default(),
        }
    }
}

impl FakeArtifacts {
    pub fn set_image_exists(&self, exists: bool) {
        self.image_exists.store(exists, Ordering::SeqCst);
    }

    /// Registra un fichero "en disco"; se clasifica por su carpeta.
    pub fn add_output(&self, path: impl Into<PathBuf>) {
        self.outputs.lock().unwrap().push(path.into());
    }

    pub fn prepared(&self) -> Vec<PathBuf> {
        self.prepared.lock().unwrap().clone()
    }

    /// `prepare` falla mientras haya un motivo puesto; `None` lo restablece.
    pub fn fail_prepare(&self, reason: Option<&str>) {
        *self.prepare_error.lock().unwrap() = reason.map(str::to_string);
    }

    pub fn fail_summaries(&self, reason: &str) {
        *self.summary_error.lock().unwrap() = Some(reason.to_string());
    }
}

#[async_trait]
impl ArtifactPort for FakeArtifacts {
    async fn image_exists(&self, _image: &Path) -> bool {
        self.image_exists.load(Ordering::SeqCst)
    }

    async fn prepare(&self, layout: &OutputLayout) -> DomainResult<()> {
        self.prepared.lock().unwrap().push(layout.root.clone());
        match self.prepare_error.lock().unwrap().clone() {
            Some(reason) => Err(DomainError::OperationFailed(reason)),
            None => Ok(()),
        }
    }

    async fn discover(&self, layout: &OutputLayout, _image: &Path) -> OutputSet {
        let mut set = OutputSet::default();
        for path in self.outputs.lock().unwrap().iter() {
            let parent = path.parent();
            if parent == Some(layout.black_bg.as_path()) {
                set.rendered_on_black.push(path.clone());
            } else if parent == Some(layout.on_image.as_path()) {
                set.rendered_on_image.push(path.clone());
            } else if parent == Some(layout.json.as_path()) {
                set.json.push(path.clone());
            }
        }
        set
    }

    async fn summarize(&self, _json: &Path) -> DomainResult<KeypointStats> {
        if let Some(reason) = self.summary_error.lock().unwrap().clone() {
            return Err(DomainError::Discovery(reason));
        }
        Ok(KeypointStats {
            num_people_detected: 1,
            has_face_keypoints: false,
            has_hand_keypoints: false,
            has_feet_keypoints: true,
            model_used: PoseModel::Body25.to_string(),
            coco_specific_info: None,
            mpi_specific_info: None,
        })
    }
}

pub struct FakeProbe {
    alive: AtomicBool,
    queries: Mutex<Vec<String>>,
}

impl Default for FakeProbe {
    fn default() -> Self {
        Self { alive: AtomicBool::new(true), queries: Mutex::default() }
    }
}

impl FakeProbe {
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessProbePort for FakeProbe {
    async fn is_alive(&self, process_name: &str) -> DomainResult<bool> {
        self.queries.lock().unwrap().push(process_name.to_string());
        Ok(self.alive.load(Ordering::SeqCst))
    }
}

/// Conjunto de fakes con acceso a cada uno después de montar el servicio.
#[derive(Default)]
pub struct Fakes {
    pub runner: Arc<FakeRunner>,
    pub models: Arc<FakeModelCatalog>,
    pub artifacts: Arc<FakeArtifacts>,
    pub probe: Arc<FakeProbe>,
}

impl Fakes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings() -> JobSettings {
        JobSettings {
            openpose_bin: PathBuf::from("./build/examples/openpose/openpose.bin"),
            default_output_dir: PathBuf::from("/images/output"),
            stop_reply_timeout: Duration::from_secs(5),
        }
    }

    pub fn service(&self) -> JobService {
        JobService::new(
            StatusStore::new(),
            self.runner.clone(),
            self.models.clone(),
            self.artifacts.clone(),
            self.probe.clone(),
            Self::settings(),
        )
    }
}
