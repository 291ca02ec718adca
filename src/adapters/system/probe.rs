use async_trait::async_trait;
use std::path::Path;
use sysinfo::System;
use tracing::debug;

use crate::application::ports::ProcessProbePort;
use crate::domain::errors::{DomainError, DomainResult};

/// Sonda de vida sobre la tabla de procesos del sistema operativo.
pub struct SysinfoProbe;

impl SysinfoProbe {
    pub fn new() -> Self {
        Self
    }
}

// El nombre del proceso puede venir truncado por el kernel; el primer argumento
// de la línea de comandos conserva la ruta completa.
fn matches(name: &str, cmd: &[String], wanted: &str) -> bool {
    name == wanted
        || cmd
            .first()
            .and_then(|arg0| Path::new(arg0).file_name())
            .is_some_and(|file| file == wanted)
}

fn scan(wanted: &str) -> bool {
    let mut sys = System::new();
    sys.refresh_processes();
    sys.processes().values().any(|p| matches(p.name(), p.cmd(), wanted))
}

#[async_trait]
impl ProcessProbePort for SysinfoProbe {
    async fn is_alive(&self, process_name: &str) -> DomainResult<bool> {
        let wanted = process_name.to_string();
        let alive = tokio::task::spawn_blocking(move || scan(&wanted))
            .await
            .map_err(|e| DomainError::OperationFailed(format!("Error checking process: {e}")))?;
        debug!(process = process_name, alive, "liveness probe");
        Ok(alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_by_name_or_argv0() {
        assert!(matches("openpose.bin", &[], "openpose.bin"));
        let cmd = vec!["./build/examples/openpose/openpose.bin".to_string(), "--display".into()];
        assert!(matches("openpose.b", &cmd, "openpose.bin"));
        assert!(!matches("python3", &["server.py".to_string()], "openpose.bin"));
    }

    #[tokio::test]
    async fn unknown_process_is_not_alive() {
        let probe = SysinfoProbe::new();
        assert!(!probe.is_alive("no-such-openpose-binary").await.unwrap());
    }
}
