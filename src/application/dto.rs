use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::{
    errors::{DomainError, DomainResult},
    job::JobStatus,
    keypoints::KeypointStats,
    model::{DetectionFlags, JobRequest, PoseModel, RenderFlags, Thresholds},
    outputs::OutputSet,
};

/// Número que el cliente puede mandar como número JSON o como texto ("0.1").
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberField {
    Number(f64),
    Text(String),
}

impl NumberField {
    fn as_f64(&self, name: &str) -> DomainResult<f64> {
        let value = match self {
            NumberField::Number(n) => Some(*n),
            NumberField::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value
            .filter(|v| v.is_finite())
            .ok_or_else(|| DomainError::InvalidInput(format!("Invalid value for {name}: {self}")))
    }

    fn as_i32(&self, name: &str) -> DomainResult<i32> {
        let value = match self {
            NumberField::Number(n) if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 => Some(*n as i32),
            NumberField::Number(_) => None,
            NumberField::Text(s) => s.trim().parse::<i32>().ok(),
        };
        value.ok_or_else(|| DomainError::InvalidInput(format!("Invalid value for {name}: {self}")))
    }
}

impl std::fmt::Display for NumberField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumberField::Number(n) => write!(f, "{n}"),
            NumberField::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Cuerpo de `POST /process`. Todo es opcional para poder responder con un
/// mensaje propio cuando falta `image_path`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessRequest {
    pub image_path: Option<String>,
    pub output_dir: Option<String>,
    pub model: Option<String>,

    pub detect_face: Option<bool>,
    pub detect_hands: Option<bool>,
    pub detect_feet: Option<bool>,

    pub render_on_black: Option<bool>,
    pub render_on_image: Option<bool>,
    pub write_json: Option<bool>,

    pub render_threshold: Option<NumberField>,
    pub face_render_threshold: Option<NumberField>,
    pub hand_render_threshold: Option<NumberField>,
    pub feet_render_threshold: Option<NumberField>,
    pub keypoint_scale: Option<NumberField>,
}

fn threshold(field: &Option<NumberField>, name: &str, default: f64) -> DomainResult<f64> {
    field.as_ref().map_or(Ok(default), |f| f.as_f64(name))
}

impl ProcessRequest {
    /// Parseo sin efectos: no toca disco ni estado compartido.
    pub fn into_job(self, default_output_dir: &Path) -> DomainResult<JobRequest> {
        let image_path = self
            .image_path
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| DomainError::InvalidInput("Image path not provided".into()))?;

        let model = match self.model.as_deref() {
            Some(name) => name.parse::<PoseModel>()?,
            None => PoseModel::default(),
        };

        let defaults = Thresholds::default();
        let thresholds = Thresholds {
            render: threshold(&self.render_threshold, "render_threshold", defaults.render)?,
            face: threshold(&self.face_render_threshold, "face_render_threshold", defaults.face)?,
            hand: threshold(&self.hand_render_threshold, "hand_render_threshold", defaults.hand)?,
            feet: threshold(&self.feet_render_threshold, "feet_render_threshold", defaults.feet)?,
        };

        let keypoint_scale = match &self.keypoint_scale {
            Some(field) => field.as_i32("keypoint_scale")?,
            None => 0,
        };

        let render_defaults = RenderFlags::default();
        Ok(JobRequest {
            image_path: PathBuf::from(image_path),
            output_dir: self
                .output_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| default_output_dir.to_path_buf()),
            model,
            detect: DetectionFlags {
                face: self.detect_face.unwrap_or(false),
                hands: self.detect_hands.unwrap_or(false),
                feet: self.detect_feet.unwrap_or(false),
            },
            render: RenderFlags {
                on_black: self.render_on_black.unwrap_or(render_defaults.on_black),
                on_image: self.render_on_image.unwrap_or(render_defaults.on_image),
                write_json: self.write_json.unwrap_or(render_defaults.write_json),
            },
            thresholds,
            keypoint_scale,
        })
    }
}

/// Opciones efectivas que se devuelven al aceptar un trabajo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessOptions {
    pub model: PoseModel,
    pub detect_face: bool,
    pub detect_hands: bool,
    pub detect_feet: bool,
    pub render_on_black: bool,
    pub render_on_image: bool,
    pub write_json: bool,
    pub render_threshold: f64,
    pub face_render_threshold: f64,
    pub hand_render_threshold: f64,
    pub feet_render_threshold: f64,
    pub keypoint_scale: i32,
}

impl From<&JobRequest> for ProcessOptions {
    fn from(r: &JobRequest) -> Self {
        Self {
            model: r.model,
            detect_face: r.detect.face,
            detect_hands: r.detect.hands,
            detect_feet: r.detect.feet,
            render_on_black: r.render.on_black,
            render_on_image: r.render.on_image,
            write_json: r.render.write_json,
            render_threshold: r.thresholds.render,
            face_render_threshold: r.thresholds.face,
            hand_render_threshold: r.thresholds.hand,
            feet_render_threshold: r.thresholds.feet,
            keypoint_scale: r.keypoint_scale,
        }
    }
}

/// Resultado de una admisión correcta.
#[derive(Debug, Clone)]
pub struct Admission {
    pub status: JobStatus,
    pub options: ProcessOptions,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ProcessOptions>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ProcessResponse {
    pub fn accepted(admission: Admission) -> Self {
        Self {
            success: true,
            message: "Image processing started".into(),
            status: Some(admission.status),
            options: Some(admission.options),
            warnings: admission.warnings,
        }
    }

    pub fn rejected(message: impl Into<String>, status: Option<JobStatus>) -> Self {
        Self {
            success: false,
            message: message.into(),
            status,
            options: None,
            warnings: Vec::new(),
        }
    }
}

/// Respuesta de `GET /status`: instantánea más lo que haya en disco.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<OutputSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keypoint_stats: Option<KeypointStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keypoint_stats_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}
