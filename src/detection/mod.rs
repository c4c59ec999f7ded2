//! Auto-detection plumbing: the task handed to a detector, the detector
//! boundary itself, and the completion that comes back.

pub mod contours;
pub mod queue;

use image::RgbImage;
use uuid::Uuid;

use crate::{error::DetectorError, geometry::Point, models::Contour};

pub use queue::DetectionQueue;

/// A cropped region of one image waiting for detection.
#[derive(Debug, Clone)]
pub struct DetectionTask {
    pub id: Uuid,
    /// Pixels of the crop only.
    pub image: RgbImage,
    pub image_id: usize,
    /// Top-left of the crop within the full image.
    pub offset: Point,
    /// Base class name that detected polygons are named after.
    pub label_name: String,
    pub label_name_id: usize,
    pub confidence_threshold: f64,
}

impl DetectionTask {
    pub fn new(
        image: RgbImage,
        image_id: usize,
        offset: Point,
        label_name: impl Into<String>,
        label_name_id: usize,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            image,
            image_id,
            offset,
            label_name: label_name.into(),
            label_name_id,
            confidence_threshold,
        }
    }
}

/// The external model. Receives the crop and the task's threshold and returns
/// contours in crop coordinates.
pub trait Detector: Send + 'static {
    fn detect(&mut self, image: &RgbImage, confidence_threshold: f64) -> Result<Vec<Contour>, DetectorError>;
}

impl<F> Detector for F
where
    F: FnMut(&RgbImage, f64) -> Result<Vec<Contour>, DetectorError> + Send + 'static,
{
    fn detect(&mut self, image: &RgbImage, confidence_threshold: f64) -> Result<Vec<Contour>, DetectorError> {
        self(image, confidence_threshold)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetectionStatus {
    Completed,
    /// The model could not be loaded; `contours` is empty for this reason and
    /// not because nothing was found.
    ModelUnavailable(String),
    Failed(String),
}

impl From<DetectorError> for DetectionStatus {
    fn from(err: DetectorError) -> Self {
        match err {
            DetectorError::ModelUnavailable(msg) => DetectionStatus::ModelUnavailable(msg),
            DetectorError::Failed(msg) => DetectionStatus::Failed(msg),
        }
    }
}

/// Result of one task, in full-image coordinates, merged and simplified.
#[derive(Debug, Clone)]
pub struct DetectionCompletion {
    pub task: DetectionTask,
    pub contours: Vec<Contour>,
    pub status: DetectionStatus,
}

impl DetectionCompletion {
    pub fn is_completed(&self) -> bool {
        self.status == DetectionStatus::Completed
    }
}
