use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::adapters::openpose::monitor::spawn_monitor;
use crate::application::{
    ports::{PassOutcome, PoseRunnerPort, StopRequest},
    status_store::StatusStore,
};
use crate::domain::{errors::DomainError, invocation::Invocation};

const NO_ERROR_OUTPUT: &str = "No error output";

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Directorio de trabajo de OpenPose (las rutas de prototxt son relativas a él).
    pub workdir: Option<PathBuf>,
    pub monitor_join_timeout: Duration,
    /// Margen entre SIGTERM y SIGKILL.
    pub stop_grace: Duration,
}

/// Lanza `openpose.bin` como proceso hijo y es su único dueño.
pub struct OpenPoseRunner {
    settings: RunnerSettings,
}

enum Event {
    Exited(std::io::Result<ExitStatus>),
    Stop(StopRequest),
}

impl OpenPoseRunner {
    pub fn new(settings: RunnerSettings) -> Self {
        Self { settings }
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.settings.workdir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// SIGTERM, espera `stop_grace` y después SIGKILL.
    async fn terminate(&self, child: &mut Child) -> Result<(), String> {
        if let Some(pid) = child.id() {
            if send_sigterm(pid) {
                match timeout(self.settings.stop_grace, child.wait()).await {
                    Ok(exit) => return exit.map(|_| ()).map_err(|e| e.to_string()),
                    Err(_) => warn!(pid, "OpenPose ignored SIGTERM, sending SIGKILL"),
                }
            }
        }
        child.kill().await.map_err(|e| e.to_string())
    }

    async fn join_monitors(
        &self,
        stdout: Option<JoinHandle<Vec<String>>>,
        stderr: Option<JoinHandle<Vec<String>>>,
        limit: Duration,
    ) -> Vec<String> {
        let (_, stderr_tail) = tokio::join!(join_monitor(stdout, limit, "stdout"), join_monitor(stderr, limit, "stderr"));
        stderr_tail
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => true,
        Err(e) => {
            warn!(pid, "SIGTERM failed: {e}");
            false
        }
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) -> bool {
    false
}

async fn join_monitor(handle: Option<JoinHandle<Vec<String>>>, limit: Duration, name: &'static str) -> Vec<String> {
    let Some(mut handle) = handle else {
        return Vec::new();
    };
    match timeout(limit, &mut handle).await {
        Ok(Ok(tail)) => tail,
        Ok(Err(e)) => {
            warn!(stream = name, "monitor task failed: {e}");
            Vec::new()
        }
        Err(_) => {
            warn!(stream = name, "monitor still reading after {limit:?}, aborting");
            handle.abort();
            Vec::new()
        }
    }
}

fn exit_outcome(exit: ExitStatus, stderr_tail: Vec<String>) -> PassOutcome {
    if exit.success() {
        return PassOutcome::Succeeded;
    }
    let stderr = if stderr_tail.is_empty() {
        NO_ERROR_OUTPUT.to_string()
    } else {
        stderr_tail.join("\n")
    };
    PassOutcome::Failed(DomainError::ToolFailed { code: exit.code(), stderr })
}

#[async_trait]
impl PoseRunnerPort for OpenPoseRunner {
    async fn run_pass(
        &self,
        invocation: &Invocation,
        status: &StatusStore,
        stop: &mut mpsc::Receiver<StopRequest>,
    ) -> PassOutcome {
        let mut child = match self.command(invocation).spawn() {
            Ok(child) => child,
            Err(e) => return PassOutcome::Failed(DomainError::Launch(e.to_string())),
        };
        let pid = child.id();
        info!(?pid, program = %invocation.program.display(), "OpenPose started");

        let stdout = child.stdout.take().map(|s| spawn_monitor(s, status.clone(), "stdout"));
        let stderr = child.stderr.take().map(|s| spawn_monitor(s, status.clone(), "stderr"));

        let event = tokio::select! {
            biased;
            exit = child.wait() => Event::Exited(exit),
            Some(request) = stop.recv() => Event::Stop(request),
        };

        match event {
            Event::Exited(Err(e)) => {
                self.join_monitors(stdout, stderr, self.settings.monitor_join_timeout).await;
                PassOutcome::Failed(DomainError::Launch(e.to_string()))
            }
            Event::Exited(Ok(exit)) => {
                info!(?pid, code = ?exit.code(), "OpenPose exited");
                let tail = self.join_monitors(stdout, stderr, self.settings.monitor_join_timeout).await;
                exit_outcome(exit, tail)
            }
            Event::Stop(request) => {
                // Si ya salió por su cuenta no se vuelve a señalizar; la parada
                // se descarta y quien la pidió recibe "ya terminado".
                if let Ok(Some(exit)) = child.try_wait() {
                    drop(request);
                    let tail = self.join_monitors(stdout, stderr, self.settings.monitor_join_timeout).await;
                    return exit_outcome(exit, tail);
                }

                info!(?pid, "stopping OpenPose");
                let termination = self.terminate(&mut child).await;
                self.join_monitors(stdout, stderr, self.settings.stop_grace).await;
                PassOutcome::Stopped { request, termination }
            }
        }
    }
}
