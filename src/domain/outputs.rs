use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::job::PassStyle;

pub const BLACK_BG_DIR: &str = "black_bg";
pub const ON_IMAGE_DIR: &str = "on_image";
pub const JSON_DIR: &str = "json";

pub const RENDERED_SUFFIX: &str = "_rendered";
pub const KEYPOINTS_SUFFIX: &str = "_keypoints.json";
pub const RENDERED_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// Directorios de salida de un trabajo, derivados de `output_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub black_bg: PathBuf,
    pub on_image: PathBuf,
    pub json: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            black_bg: root.join(BLACK_BG_DIR),
            on_image: root.join(ON_IMAGE_DIR),
            json: root.join(JSON_DIR),
            root,
        }
    }

    pub fn dirs(&self) -> [&Path; 3] {
        [&self.black_bg, &self.on_image, &self.json]
    }

    /// Candidatos `{stem}_rendered.{jpg,png}` dentro de `dir`, en orden fijo.
    pub fn rendered_candidates(dir: &Path, stem: &str) -> Vec<PathBuf> {
        RENDERED_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{stem}{RENDERED_SUFFIX}.{ext}")))
            .collect()
    }

    pub fn keypoints_file(&self, stem: &str) -> PathBuf {
        self.json.join(format!("{stem}{KEYPOINTS_SUFFIX}"))
    }
}

/// Nombre base de la imagen sin directorio ni extensión.
pub fn image_stem(image: &Path) -> Option<String> {
    image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSet {
    pub rendered_on_black: Vec<PathBuf>,
    pub rendered_on_image: Vec<PathBuf>,
    pub json: Vec<PathBuf>,
}

impl OutputSet {
    pub fn is_empty(&self) -> bool {
        self.rendered_on_black.is_empty() && self.rendered_on_image.is_empty() && self.json.is_empty()
    }

    pub fn has_renderings(&self) -> bool {
        !self.rendered_on_black.is_empty() || !self.rendered_on_image.is_empty()
    }

    /// Lo que produce una pasada concreta: su carpeta de render y el JSON compartido.
    pub fn for_pass(self, style: PassStyle) -> Self {
        match style {
            PassStyle::BlackBackground => Self { rendered_on_image: Vec::new(), ..self },
            PassStyle::OnImage => Self { rendered_on_black: Vec::new(), ..self },
        }
    }

    /// Une sin duplicar rutas (las dos pasadas escriben el mismo JSON).
    pub fn merge(&mut self, other: OutputSet) {
        fn extend(into: &mut Vec<PathBuf>, from: Vec<PathBuf>) {
            for path in from {
                if !into.contains(&path) {
                    into.push(path);
                }
            }
        }
        extend(&mut self.rendered_on_black, other.rendered_on_black);
        extend(&mut self.rendered_on_image, other.rendered_on_image);
        extend(&mut self.json, other.json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_and_file_names_follow_openpose_conventions() {
        let layout = OutputLayout::new("/images/output");
        assert_eq!(layout.black_bg, PathBuf::from("/images/output/black_bg"));
        assert_eq!(
            layout.keypoints_file("a"),
            PathBuf::from("/images/output/json/a_keypoints.json")
        );
        assert_eq!(
            OutputLayout::rendered_candidates(&layout.on_image, "a"),
            vec![
                PathBuf::from("/images/output/on_image/a_rendered.jpg"),
                PathBuf::from("/images/output/on_image/a_rendered.png"),
            ]
        );
    }

    #[test]
    fn stem_strips_directory_and_extension() {
        assert_eq!(image_stem(Path::new("/images/in/person.01.png")).as_deref(), Some("person.01"));
        assert_eq!(image_stem(Path::new("/")), None);
    }

    #[test]
    fn merge_skips_duplicate_json() {
        let json = PathBuf::from("/o/json/a_keypoints.json");
        let mut set = OutputSet { json: vec![json.clone()], ..Default::default() };
        set.merge(OutputSet {
            rendered_on_image: vec![PathBuf::from("/o/on_image/a_rendered.png")],
            json: vec![json],
            ..Default::default()
        });
        assert_eq!(set.json.len(), 1);
        assert!(set.has_renderings());

        let black_only = set.clone().for_pass(PassStyle::BlackBackground);
        assert!(black_only.rendered_on_image.is_empty());
        assert_eq!(black_only.json, set.json);
    }
}
