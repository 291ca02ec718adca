use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::outputs::OutputLayout;

pub const IDLE_MESSAGE: &str = "Idle";
pub const PROGRESS_DONE: u8 = 100;

/// Estado del único trabajo activo. Los nombres JSON son los que ya usan los clientes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(rename = "is_processing")]
    pub running: bool,
    pub current_image: Option<PathBuf>,
    #[serde(rename = "status_message")]
    pub message: String,
    pub progress: u8,
    /// Raíz de salida del trabajo en curso o del último.
    pub output_dir: Option<PathBuf>,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self {
            running: false,
            current_image: None,
            message: IDLE_MESSAGE.to_string(),
            progress: 0,
            output_dir: None,
        }
    }
}

/// Cambios parciales sobre `JobStatus`; `None` deja el campo como está.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPatch {
    pub message: Option<String>,
    pub progress: Option<u8>,
    pub running: Option<bool>,
    pub current_image: Option<PathBuf>,
}

impl StatusPatch {
    pub fn message(message: impl Into<String>) -> Self {
        Self { message: Some(message.into()), ..Default::default() }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(PROGRESS_DONE));
        self
    }

    /// Estado terminal: fuera de ejecución y progreso al 100, siempre juntos.
    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            progress: Some(PROGRESS_DONE),
            running: Some(false),
            current_image: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStyle {
    BlackBackground,
    OnImage,
}

/// Una invocación de OpenPose con un estilo de visualización.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPass {
    pub style: PassStyle,
    pub output_dir: PathBuf,
}

impl RenderPass {
    pub fn new(style: PassStyle, layout: &OutputLayout) -> Self {
        let output_dir = match style {
            PassStyle::BlackBackground => layout.black_bg.clone(),
            PassStyle::OnImage => layout.on_image.clone(),
        };
        Self { style, output_dir }
    }

    pub fn label(&self) -> &'static str {
        match self.style {
            PassStyle::BlackBackground => "black_bg",
            PassStyle::OnImage => "on_image",
        }
    }

    pub fn disable_blending(&self) -> bool {
        self.style == PassStyle::BlackBackground
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_with_wire_names() {
        let status = JobStatus {
            running: true,
            current_image: Some(PathBuf::from("/images/in/a.png")),
            message: "Processing".into(),
            progress: 50,
            output_dir: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["is_processing"], true);
        assert_eq!(json["status_message"], "Processing");
        assert_eq!(json["current_image"], "/images/in/a.png");
        assert_eq!(json["progress"], 50);
    }

    #[test]
    fn terminal_patch_sets_running_and_progress_together() {
        let patch = StatusPatch::terminal("done");
        assert_eq!(patch.running, Some(false));
        assert_eq!(patch.progress, Some(PROGRESS_DONE));
    }

    #[test]
    fn black_background_pass_disables_blending() {
        let layout = OutputLayout::new("/out");
        let pass = RenderPass::new(PassStyle::BlackBackground, &layout);
        assert!(pass.disable_blending());
        assert_eq!(pass.output_dir(), Path::new("/out/black_bg"));
    }
}
