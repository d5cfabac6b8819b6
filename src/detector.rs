//! Boundary to the external detection model.
//!
//! The core never runs inference itself. It hands a resized RGB buffer and a
//! confidence threshold to a [`Detector`] and gets back an immutable
//! [`DetectionSet`]; filtering by confidence is the detector's job.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buffer::{ChannelOrder, PixelBuffer};
use crate::error::{Error, Result};

/// Axis-aligned box in pixel coordinates of the image given to the detector.
/// Corners are reordered on construction so `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn x1(&self) -> f32 {
        self.x1
    }

    pub fn y1(&self) -> f32 {
        self.y1
    }

    pub fn x2(&self) -> f32 {
        self.x2
    }

    pub fn y2(&self) -> f32 {
        self.y2
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Integer pixel rectangle clamped into `[0, width) x [0, height)`.
    /// `None` only for an empty image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<PixelRect> {
        if width == 0 || height == 0 {
            return None;
        }
        let clamp = |v: f32, len: u32| (v.floor() as i64).clamp(0, len as i64 - 1) as u32;
        Some(PixelRect {
            left: clamp(self.x1, width),
            top: clamp(self.y1, height),
            right: clamp(self.x2, width),
            bottom: clamp(self.y2, height),
        })
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Inclusive pixel rectangle, always inside the image it was clamped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// One model output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_id: u32, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }
}

/// Ordered detections from a single inference call; read-only once built
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
    detections: Vec<Detection>,
}

impl DetectionSet {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }

    pub fn as_slice(&self) -> &[Detection] {
        &self.detections
    }
}

impl FromIterator<Detection> for DetectionSet {
    fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}

/// Anything that turns an RGB image into detections.
///
/// Implementations return `ModelUnavailable` when the model cannot be used
/// at all and `InferenceFailed` for input they cannot process. They must
/// only return detections with `confidence >= confidence_threshold`.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &PixelBuffer, confidence_threshold: f32) -> Result<DetectionSet>;
}

impl<F> Detector for F
where
    F: Fn(&PixelBuffer, f32) -> Result<DetectionSet> + Send + Sync,
{
    fn detect(&self, image: &PixelBuffer, confidence_threshold: f32) -> Result<DetectionSet> {
        self(image, confidence_threshold)
    }
}

/// Reject input no model could run on: empty, or not 3-channel RGB
pub fn check_input(image: &PixelBuffer) -> Result<()> {
    if image.is_empty() {
        return Err(Error::InferenceFailed(format!(
            "input has zero size ({}x{})",
            image.width(),
            image.height()
        )));
    }
    if image.channels() != 3 {
        return Err(Error::InferenceFailed(format!(
            "input has {} channels, expected 3",
            image.channels()
        )));
    }
    if image.order() != ChannelOrder::Rgb {
        return Err(Error::InferenceFailed("input must be in RGB order".to_string()));
    }
    Ok(())
}

/// Plays back detections recorded earlier (e.g. exported from a model run)
/// as if a model had produced them for whatever image is passed in.
#[derive(Debug, Clone, Default)]
pub struct ReplayDetector {
    detections: Vec<Detection>,
}

impl ReplayDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// Parse a JSON array of `{"class_id", "confidence", "bbox": [x1, y1, x2, y2]}`
    pub fn from_json(json: &str) -> Result<Self> {
        let detections: Vec<Detection> = serde_json::from_str(json)
            .map_err(|e| Error::ModelUnavailable(format!("invalid detections JSON: {}", e)))?;
        Ok(Self::new(detections))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::ModelUnavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}

impl Detector for ReplayDetector {
    fn detect(&self, image: &PixelBuffer, confidence_threshold: f32) -> Result<DetectionSet> {
        check_input(image)?;
        Ok(self
            .detections
            .iter()
            .filter(|d| d.confidence >= confidence_threshold)
            .copied()
            .collect())
    }
}
