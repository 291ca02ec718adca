use std::fmt;
use std::path::{Path, PathBuf};

use super::job::RenderPass;
use super::model::JobRequest;
use super::outputs::OutputLayout;

/// Línea de comandos completa de una pasada de OpenPose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    pub fn for_pass(program: &Path, request: &JobRequest, pass: &RenderPass, layout: &OutputLayout) -> Self {
        let mut args: Vec<String> = vec![
            "--image_dir".into(),
            path_arg(request.image_dir()),
            "--model_pose".into(),
            request.model.as_str().into(),
            "--write_images".into(),
            path_arg(pass.output_dir()),
        ];

        if request.render.write_json {
            args.extend(["--write_json".into(), path_arg(&layout.json)]);
        }

        args.extend([
            "--display".into(),
            "0".into(),
            "--render_threshold".into(),
            request.effective_render_threshold().to_string(),
            "--render_pose".into(),
            "1".into(),
            "--part_to_show".into(),
            "0".into(),
        ]);

        if let Some(prototxt) = request.model.prototxt() {
            args.extend(["--prototxt_path".to_string(), prototxt.to_string()]);
        }

        if pass.disable_blending() {
            args.push("--disable_blending".into());
        }

        if request.detect.face {
            args.extend([
                "--face".into(),
                "--face_render_threshold".into(),
                request.thresholds.face.to_string(),
            ]);
        }

        if request.detect.hands {
            args.extend([
                "--hand".into(),
                "--hand_render_threshold".into(),
                request.thresholds.hand.to_string(),
            ]);
        }

        // Ayuda con los puntos difíciles (pies).
        if request.feet_enabled() {
            args.push("--maximize_positives".into());
        }

        args.extend(["--keypoint_scale".into(), request.keypoint_scale.to_string()]);

        Self { program: program.to_path_buf(), args }
    }

    /// Nombre del ejecutable tal y como aparece en la tabla de procesos.
    pub fn process_name(&self) -> Option<String> {
        self.program.file_name().map(|n| n.to_string_lossy().into_owned())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
