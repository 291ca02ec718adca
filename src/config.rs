//! Configuración del servidor: flags de línea de comandos con respaldo en variables de entorno.

use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use tracing::level_filters::LevelFilter;

use crate::adapters::openpose::runner::RunnerSettings;
use crate::application::services::JobSettings;

// Margen extra de `stop` sobre la secuencia SIGTERM -> SIGKILL.
const STOP_REPLY_SLACK: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Parser)]
#[command(name = "openpose-job-server", version, about = "HTTP job server for the OpenPose CLI")]
pub struct Settings {
    /// Dirección de escucha.
    #[arg(long, env = "OPENPOSE_API_BIND", default_value = "0.0.0.0:2500")]
    pub bind: SocketAddr,

    /// Ejecutable de OpenPose.
    #[arg(long, env = "OPENPOSE_API_BIN", default_value = "./build/examples/openpose/openpose.bin")]
    pub openpose_bin: PathBuf,

    /// Directorio de trabajo para lanzar OpenPose.
    #[arg(long, env = "OPENPOSE_API_WORKDIR")]
    pub openpose_dir: Option<PathBuf>,

    #[arg(long, env = "OPENPOSE_API_MODELS_DIR", default_value = "/openpose/models")]
    pub models_dir: PathBuf,

    /// Raíz de salida cuando la petición no trae `output_dir`.
    #[arg(long, env = "OPENPOSE_API_OUTPUT_DIR", default_value = "/images/output")]
    pub output_dir: PathBuf,

    #[arg(long, env = "OPENPOSE_API_MONITOR_JOIN_TIMEOUT_SECS", default_value_t = 60)]
    pub monitor_join_timeout_secs: u64,

    /// Espera entre SIGTERM y SIGKILL al parar un trabajo.
    #[arg(long, env = "OPENPOSE_API_STOP_GRACE_MS", default_value_t = 1000)]
    pub stop_grace_ms: u64,

    /// Nivel por defecto si `RUST_LOG` no está definido.
    #[arg(long, env = "OPENPOSE_API_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

impl Settings {
    pub fn runner(&self) -> RunnerSettings {
        RunnerSettings {
            workdir: self.openpose_dir.clone(),
            monitor_join_timeout: Duration::from_secs(self.monitor_join_timeout_secs),
            stop_grace: Duration::from_millis(self.stop_grace_ms),
        }
    }

    pub fn jobs(&self) -> JobSettings {
        JobSettings {
            openpose_bin: self.openpose_bin.clone(),
            default_output_dir: self.output_dir.clone(),
            // Parada: SIGTERM, gracia, SIGKILL y cierre de los monitores.
            stop_reply_timeout: Duration::from_millis(self.stop_grace_ms) * 2 + STOP_REPLY_SLACK,
        }
    }
}
