use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

mod tesseract;

pub use tesseract::TesseractSource;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// A located text fragment. The quadrilateral corners are ordered top-left,
/// top-right, bottom-right, bottom-left; downstream consumers read corners
/// positionally (0 and 2), not geometrically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub quad: [Point; 4],
    pub text: String,
    /// Recognition confidence in [0, 1].
    pub confidence: f32,
}

impl Detection {
    pub fn from_rect(
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        text: impl Into<String>,
        confidence: f32,
    ) -> Self {
        let (x, y) = (x as f32, y as f32);
        let (w, h) = (width as f32, height as f32);
        Self {
            quad: [
                Point { x, y },
                Point { x: x + w, y },
                Point { x: x + w, y: y + h },
                Point { x, y: y + h },
            ],
            text: text.into(),
            confidence,
        }
    }
}

pub trait DetectionSource {
    /// Locate text fragments in reading order. Must not mutate the image;
    /// may return an empty list.
    fn detect(&self, image: &image::DynamicImage) -> Result<Vec<Detection>>;
}

/// Output locations for `--debug-detections`, derived from the input path.
#[derive(Debug, Clone)]
pub struct DetectionDump {
    json: PathBuf,
    image: PathBuf,
}

impl DetectionDump {
    pub fn for_input(image_path: &Path) -> Self {
        let stem = image_path
            .file_stem()
            .and_then(|value| value.to_str())
            .unwrap_or("input");
        Self {
            json: image_path.with_file_name(format!("{stem}_detections.json")),
            image: image_path.with_file_name(format!("{stem}_detections.png")),
        }
    }

    pub fn json_path(&self) -> &Path {
        &self.json
    }

    pub fn image_path(&self) -> &Path {
        &self.image
    }

    pub fn write_json(&self, detections: &[Detection]) -> Result<()> {
        let json = serde_json::to_vec_pretty(detections)?;
        std::fs::write(&self.json, json)
            .with_context(|| format!("failed to write detection json: {}", self.json.display()))
    }
}
