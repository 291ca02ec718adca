use serde::{Deserialize, Serialize};

use super::errors::{DomainError, DomainResult};
use super::model::PoseModel;

/// Umbral de confianza para considerar presentes cara y manos.
pub const PRESENCE_THRESHOLD: f64 = 0.1;
/// Umbral para los puntos de los pies (mismo valor por defecto que `feet_render_threshold`).
pub const FEET_THRESHOLD: f64 = 0.03;
/// Índices de los pies en BODY_25 (tobillos y dedos).
pub const BODY25_FOOT_INDICES: [usize; 6] = [19, 20, 21, 22, 23, 24];
const BODY25_KEYPOINTS: usize = 25;

/// Fichero `{stem}_keypoints.json` tal y como lo escribe OpenPose.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeypointDocument {
    #[serde(default)]
    pub people: Vec<PersonKeypoints>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonKeypoints {
    pub pose_keypoints_2d: Option<Vec<f64>>,
    pub face_keypoints_2d: Option<Vec<f64>>,
    pub hand_left_keypoints_2d: Option<Vec<f64>>,
    pub hand_right_keypoints_2d: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeypointStats {
    pub num_people_detected: usize,
    pub has_face_keypoints: bool,
    pub has_hand_keypoints: bool,
    pub has_feet_keypoints: bool,
    pub model_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coco_specific_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpi_specific_info: Option<String>,
}

impl KeypointStats {
    fn empty(people: usize) -> Self {
        Self {
            num_people_detected: people,
            has_face_keypoints: false,
            has_hand_keypoints: false,
            has_feet_keypoints: false,
            model_used: "unknown".to_string(),
            coco_specific_info: None,
            mpi_specific_info: None,
        }
    }
}

/// Agrupa un array plano en tripletas (x, y, confianza).
fn triples(values: &[f64]) -> DomainResult<std::slice::ChunksExact<'_, f64>> {
    if values.len() % 3 != 0 {
        return Err(DomainError::Discovery(format!(
            "keypoint array of length {} is not a list of (x, y, confidence) triples",
            values.len()
        )));
    }
    Ok(values.chunks_exact(3))
}

fn any_above(values: Option<&[f64]>, threshold: f64) -> DomainResult<bool> {
    match values {
        None => Ok(false),
        Some(values) => Ok(triples(values)?.any(|t| t[2] > threshold)),
    }
}

/// Resume solo la primera persona; el recuento sí incluye a todas.
pub fn summarize(doc: &KeypointDocument) -> DomainResult<KeypointStats> {
    let mut stats = KeypointStats::empty(doc.people.len());
    let Some(person) = doc.people.first() else {
        return Ok(stats);
    };

    stats.has_face_keypoints = any_above(person.face_keypoints_2d.as_deref(), PRESENCE_THRESHOLD)?;
    stats.has_hand_keypoints = any_above(person.hand_left_keypoints_2d.as_deref(), PRESENCE_THRESHOLD)?
        || any_above(person.hand_right_keypoints_2d.as_deref(), PRESENCE_THRESHOLD)?;

    let body: Vec<&[f64]> = match person.pose_keypoints_2d.as_deref() {
        Some(values) => triples(values)?.collect(),
        None => Vec::new(),
    };

    if body.len() >= BODY25_KEYPOINTS {
        stats.has_feet_keypoints = BODY25_FOOT_INDICES.iter().any(|&i| body[i][2] > FEET_THRESHOLD);
    }

    match PoseModel::from_keypoint_count(body.len()) {
        Some(model) => {
            stats.model_used = model.to_string();
            match model {
                PoseModel::Coco => stats.coco_specific_info = Some("COCO model has 18 keypoints".into()),
                PoseModel::Mpi => stats.mpi_specific_info = Some("MPI model has 15 keypoints".into()),
                PoseModel::Body25 => {}
            }
        }
        None => stats.model_used = "unknown".into(),
    }

    Ok(stats)
}
