mod domain;
mod application;
mod adapters;
mod config;

use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use crate::application::{services::JobService, status_store::StatusStore};
use crate::adapters::{
    fs::artifacts::FsArtifacts,
    http::{router, state::HttpState},
    openpose::{model_catalog::OpenPoseModelCatalog, runner::OpenPoseRunner},
    system::probe::SysinfoProbe,
};
use crate::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();

    // 1. Inicializar logs (RUST_LOG tiene prioridad sobre --log-level)
    let filter = EnvFilter::builder()
        .with_default_directive(settings.log_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("🔧 Inicializando adaptadores de infraestructura...");

    // 2. Instanciar Adaptadores (Capa de Infraestructura)
    let runner = Arc::new(OpenPoseRunner::new(settings.runner()));
    let models = Arc::new(OpenPoseModelCatalog::new(&settings.models_dir));
    let artifacts = Arc::new(FsArtifacts::new());
    let probe = Arc::new(SysinfoProbe::new());

    // 3. Instanciar Servicios (Capa de Aplicación - Casos de Uso)
    let jobs = Arc::new(JobService::new(
        StatusStore::new(),
        runner,
        models,
        artifacts,
        probe,
        settings.jobs(),
    ));

    // 4. Configurar el Estado de la API y el Router
    let app = router(HttpState { jobs });

    // 5. Lanzar el Servidor
    tracing::info!("🚀 Servidor OpenPose iniciado en http://{}", settings.bind);
    tracing::info!("🦴 Ejecutable: {}", settings.openpose_bin.display());
    tracing::info!("📂 Salida por defecto: {}", settings.output_dir.display());

    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Servidor detenido");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("no se pudo escuchar Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
