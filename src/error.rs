use std::path::PathBuf;

use thiserror::Error;

/// A persisted label record that cannot be turned back into a label.
#[derive(Debug, Error)]
pub enum MalformedRecordError {
    #[error("label record has missing or mistyped fields: {0}")]
    Fields(#[from] serde_json::Error),

    #[error("polygon record has {0} points, at least 3 are required")]
    TooFewPoints(usize),

    #[error("rectangle record has zero area")]
    ZeroArea,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("label {label_name:?} on image {image:?} refers to class id {class_id}, which has no class name")]
    UnknownClass {
        image: String,
        label_name: String,
        class_id: usize,
    },

    #[error("failed to write {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize COCO document")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassError {
    #[error("class {0:?} already exists")]
    Duplicate(String),

    #[error("no class named {0:?}")]
    Unknown(String),
}

/// Failure reported by a detection backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DetectorError {
    #[error("detection model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("detection failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("an image is already loading")]
    Busy,

    #[error("failed to decode image {path:?}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image loading task did not finish")]
    Join(#[from] tokio::task::JoinError),
}
