//! A project: the class list plus the labelled images it covers.

mod export;
mod store;

use std::{
    collections::HashSet,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::{
    core::collection::LabelCollection,
    detection::DetectionCompletion,
    error::ClassError,
    geometry::Size,
};

pub use export::{ExportOptions, ExportSummary};
pub use store::LoadReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatasetType {
    #[default]
    Yolo,
    Coco,
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetType::Yolo => write!(f, "YOLO"),
            DatasetType::Coco => write!(f, "COCO"),
        }
    }
}

impl FromStr for DatasetType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yolo" => Ok(DatasetType::Yolo),
            "coco" => Ok(DatasetType::Coco),
            other => anyhow::bail!("Unknown dataset type: {other}"),
        }
    }
}

/// One image of a project and its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelImage {
    pub image_id: usize,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub labels: LabelCollection,
}

impl LabelImage {
    pub fn new(image_id: usize, path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            image_id,
            path: path.into(),
            width,
            height,
            labels: LabelCollection::new(),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without its extension; YOLO label files are named after it.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn size(&self) -> Size {
        Size::from((self.width, self.height))
    }
}

#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    class_names: Vec<String>,
    pub dataset_type: DatasetType,
    pub created_at: OffsetDateTime,
    images: Vec<LabelImage>,
    current: Option<usize>,
    last_saved: Option<serde_json::Value>,
}

impl Project {
    pub fn new(name: impl Into<String>, class_names: Vec<String>, dataset_type: DatasetType) -> Self {
        Self {
            name: name.into(),
            class_names,
            dataset_type,
            created_at: OffsetDateTime::now_utc(),
            images: Vec::new(),
            current: None,
            last_saved: None,
        }
    }

    /// Build a project over image files, reading only their headers for the
    /// pixel size. Image ids follow the order of `paths`, starting at 0.
    pub fn create<P: AsRef<Path>>(
        name: impl Into<String>,
        paths: &[P],
        class_names: Vec<String>,
        dataset_type: DatasetType,
    ) -> anyhow::Result<Self> {
        let mut project = Self::new(name, class_names, dataset_type);
        for path in paths {
            project.add_image(path)?;
        }
        info!(name = %project.name, images = project.images.len(), "created project");
        Ok(project)
    }

    pub fn add_image<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<usize> {
        let path = path.as_ref();
        let (width, height) = image::image_dimensions(path)
            .with_context(|| format!("Failed to read image dimensions of {:?}", path))?;
        let image_id = self.images.iter().map(|i| i.image_id + 1).max().unwrap_or(0);
        self.images.push(LabelImage::new(image_id, path, width, height));
        debug!(image_id, ?path, width, height, "added image");
        Ok(image_id)
    }

    pub(crate) fn from_parts(
        name: String,
        class_names: Vec<String>,
        dataset_type: DatasetType,
        created_at: OffsetDateTime,
        images: Vec<LabelImage>,
    ) -> Self {
        Self {
            name,
            class_names,
            dataset_type,
            created_at,
            images,
            current: None,
            last_saved: None,
        }
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Append a class unless one with that name exists; returns its id.
    pub fn add_class(&mut self, name: impl Into<String>) -> usize {
        let name = name.into();
        if let Some(id) = self.class_names.iter().position(|c| *c == name) {
            return id;
        }
        self.class_names.push(name);
        self.class_names.len() - 1
    }

    /// Rename a class and every label of it; returns the number of labels renamed.
    /// Renaming onto another existing class is refused so label names stay unique.
    pub fn rename_class(&mut self, old_name: &str, new_name: &str) -> Result<usize, ClassError> {
        let id = self
            .class_names
            .iter()
            .position(|c| c == old_name)
            .ok_or_else(|| ClassError::Unknown(old_name.to_string()))?;
        if old_name == new_name {
            return Ok(0);
        }
        if self.class_names.iter().any(|c| c == new_name) {
            return Err(ClassError::Duplicate(new_name.to_string()));
        }
        self.class_names[id] = new_name.to_string();
        let renamed = self
            .images
            .iter_mut()
            .map(|img| img.labels.rename_class(old_name, new_name))
            .sum();
        info!(old_name, new_name, renamed, "renamed class");
        Ok(renamed)
    }

    /// Replace the class list, then rename labels from it by class id. A list
    /// with a repeated name is refused and the current one kept.
    pub fn set_class_names(&mut self, class_names: Vec<String>) -> Result<(), ClassError> {
        let mut seen = HashSet::new();
        if let Some(dup) = class_names.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(ClassError::Duplicate(dup.clone()));
        }
        self.class_names = class_names;
        for img in &mut self.images {
            img.labels.sync_names(&self.class_names);
        }
        Ok(())
    }

    pub fn images(&self) -> &[LabelImage] {
        &self.images
    }

    pub fn image(&self, image_id: usize) -> Option<&LabelImage> {
        self.images.iter().find(|i| i.image_id == image_id)
    }

    pub fn image_mut(&mut self, image_id: usize) -> Option<&mut LabelImage> {
        self.images.iter_mut().find(|i| i.image_id == image_id)
    }

    /// The class list and one image's labels, borrowed together for a session.
    pub fn edit_parts(&mut self, image_id: usize) -> Option<(&mut Vec<String>, &mut LabelImage)> {
        let image = self.images.iter_mut().find(|i| i.image_id == image_id)?;
        Some((&mut self.class_names, image))
    }

    pub fn remove_images(&mut self, image_ids: &HashSet<usize>) -> usize {
        let current_id = self.current_image().map(|i| i.image_id);
        let before = self.images.len();
        self.images.retain(|i| !image_ids.contains(&i.image_id));
        self.current = current_id.and_then(|id| self.images.iter().position(|i| i.image_id == id));
        before - self.images.len()
    }

    pub fn set_current_image(&mut self, image_id: usize) -> bool {
        match self.images.iter().position(|i| i.image_id == image_id) {
            Some(index) => {
                self.current = Some(index);
                true
            }
            None => false,
        }
    }

    pub fn current_image(&self) -> Option<&LabelImage> {
        self.images.get(self.current?)
    }

    pub fn current_image_mut(&mut self) -> Option<&mut LabelImage> {
        self.images.get_mut(self.current?)
    }

    /// Advance to the following image; stays on the last one.
    pub fn next_image(&mut self) -> Option<&LabelImage> {
        let next = match self.current {
            Some(i) => (i + 1).min(self.images.len().checked_sub(1)?),
            None => 0,
        };
        self.current = (next < self.images.len()).then_some(next);
        self.current_image()
    }

    /// Step back to the preceding image; stays on the first one.
    pub fn previous_image(&mut self) -> Option<&LabelImage> {
        let previous = match self.current {
            Some(i) => i.saturating_sub(1),
            None => self.images.len().checked_sub(1)?,
        };
        self.current = (previous < self.images.len()).then_some(previous);
        self.current_image()
    }

    /// `(class name, label count)` for every class in class order.
    pub fn label_counts(&self) -> Vec<(String, usize)> {
        let mut counts = vec![0usize; self.class_names.len()];
        for label in self.images.iter().flat_map(|i| i.labels.iter()) {
            if let Some(count) = counts.get_mut(label.label_name_id()) {
                *count += 1;
            }
        }
        self.class_names.iter().cloned().zip(counts).collect()
    }

    /// Add the polygons of a finished detection to the image it came from.
    pub fn apply_detection(&mut self, completion: &DetectionCompletion) -> usize {
        match self.image_mut(completion.task.image_id) {
            Some(image) => image.labels.add_detected(completion),
            None => {
                debug!(image_id = completion.task.image_id, "detection result for removed image");
                0
            }
        }
    }

    /// True when nothing changed in value since the last save or load.
    pub fn is_saved(&self) -> bool {
        self.last_saved.as_ref() == Some(&self.to_value())
    }

    pub(crate) fn mark_saved(&mut self, state: serde_json::Value) {
        self.last_saved = Some(state);
    }
}
