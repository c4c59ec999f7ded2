pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod models;

pub use config::AnnotatorConfig;
pub use crate::core::{
    DatasetType, Label, LabelCollection, LabelImage, Mode, PolygonLabel, Project, RectangleLabel, Session,
};
pub use detection::{DetectionCompletion, DetectionQueue, DetectionStatus, DetectionTask, Detector};
pub use error::{ClassError, DetectorError, ExportError, LoadError, MalformedRecordError};
pub use geometry::{Point, Rect, Size};
pub use loader::ImageLoader;
pub use models::Contour;
