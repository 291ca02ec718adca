use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::errors::{DomainError, DomainResult};
use super::job::{PassStyle, RenderPass};
use super::outputs::OutputLayout;

/// Modelos de pose soportados por OpenPose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoseModel {
    #[default]
    #[serde(rename = "BODY_25")]
    Body25,
    #[serde(rename = "COCO")]
    Coco,
    #[serde(rename = "MPI")]
    Mpi,
}

impl PoseModel {
    pub const ALL: [PoseModel; 3] = [PoseModel::Body25, PoseModel::Coco, PoseModel::Mpi];

    pub fn as_str(&self) -> &'static str {
        match self {
            PoseModel::Body25 => "BODY_25",
            PoseModel::Coco => "COCO",
            PoseModel::Mpi => "MPI",
        }
    }

    /// Subdirectorio bajo `models/pose/` con los pesos del modelo.
    pub fn asset_dir(&self) -> &'static str {
        match self {
            PoseModel::Body25 => "body_25",
            PoseModel::Coco => "coco",
            PoseModel::Mpi => "mpi",
        }
    }

    /// Prototxt explícito que hay que pasar a OpenPose (BODY_25 usa el de por defecto).
    pub fn prototxt(&self) -> Option<&'static str> {
        match self {
            PoseModel::Body25 => None,
            PoseModel::Coco => Some("pose/coco/pose_deploy_linevec.prototxt"),
            PoseModel::Mpi => Some("pose/mpi/pose_deploy_linevec.prototxt"),
        }
    }

    /// Solo BODY_25 tiene los puntos 19-24 de los pies.
    pub fn supports_feet(&self) -> bool {
        matches!(self, PoseModel::Body25)
    }

    /// Variante deducida del número de tripletas del cuerpo en el JSON.
    pub fn from_keypoint_count(count: usize) -> Option<Self> {
        match count {
            25 => Some(PoseModel::Body25),
            18 => Some(PoseModel::Coco),
            15 => Some(PoseModel::Mpi),
            _ => None,
        }
    }
}

impl fmt::Display for PoseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoseModel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PoseModel::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                DomainError::InvalidInput(format!(
                    "Invalid model: {s}. Must be one of: BODY_25, COCO, MPI"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFlags {
    pub face: bool,
    pub hands: bool,
    pub feet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderFlags {
    pub on_black: bool,
    pub on_image: bool,
    pub write_json: bool,
}

impl Default for RenderFlags {
    fn default() -> Self {
        Self { on_black: true, on_image: true, write_json: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub render: f64, // 0..1
    pub face: f64,
    pub hand: f64,
    pub feet: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            render: 0.05,
            face: 0.4,
            hand: 0.2,
            feet: 0.03,
        }
    }
}

pub const MAX_KEYPOINT_SCALE: i32 = 4;

/// Petición de procesamiento ya parseada. Inmutable durante la ejecución.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub image_path: PathBuf,
    pub output_dir: PathBuf,
    pub model: PoseModel,
    pub detect: DetectionFlags,
    pub render: RenderFlags,
    pub thresholds: Thresholds,
    pub keypoint_scale: i32,
}

impl JobRequest {
    pub fn new(image_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            output_dir: output_dir.into(),
            model: PoseModel::default(),
            detect: DetectionFlags::default(),
            render: RenderFlags::default(),
            thresholds: Thresholds::default(),
            keypoint_scale: 0,
        }
    }

    /// Invariantes que no dependen del sistema de ficheros.
    pub fn validate(&self) -> DomainResult<()> {
        if self.detect.feet && !self.model.supports_feet() {
            return Err(DomainError::FeetRequiresBody25);
        }
        let named = [
            ("render_threshold", self.thresholds.render),
            ("face_render_threshold", self.thresholds.face),
            ("hand_render_threshold", self.thresholds.hand),
            ("feet_render_threshold", self.thresholds.feet),
        ];
        for (name, value) in named {
            if !(0.0..=1.0).contains(&value) {
                return Err(DomainError::InvalidInput(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        if !(0..=MAX_KEYPOINT_SCALE).contains(&self.keypoint_scale) {
            return Err(DomainError::InvalidInput(format!(
                "keypoint_scale must be between 0 and {MAX_KEYPOINT_SCALE}, got {}",
                self.keypoint_scale
            )));
        }
        Ok(())
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.model != PoseModel::Body25 && (self.detect.face || self.detect.hands) {
            out.push(format!(
                "Face and hand detection with {} model may be unstable. For best results, use BODY_25 model.",
                self.model
            ));
        }
        out
    }

    pub fn feet_enabled(&self) -> bool {
        self.detect.feet && self.model.supports_feet()
    }

    /// Umbral de render efectivo. Con pies activados se baja al umbral de pies
    /// y se aplica a todas las pasadas, no solo a una pasada de pies.
    pub fn effective_render_threshold(&self) -> f64 {
        if self.feet_enabled() {
            self.thresholds.render.min(self.thresholds.feet)
        } else {
            self.thresholds.render
        }
    }

    /// Pasadas en orden de ejecución: primero fondo negro, luego sobre la imagen.
    pub fn render_passes(&self, layout: &OutputLayout) -> Vec<RenderPass> {
        let mut passes = Vec::with_capacity(2);
        if self.render.on_black {
            passes.push(RenderPass::new(PassStyle::BlackBackground, layout));
        }
        if self.render.on_image {
            passes.push(RenderPass::new(PassStyle::OnImage, layout));
        }
        passes
    }

    /// OpenPose procesa directorios, no ficheros sueltos.
    pub fn image_dir(&self) -> &Path {
        self.image_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}
