use std::{fs, path::Path};

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, info};

use crate::{
    config::ExportConfig,
    core::label::{CocoAnnotation, Label},
    error::ExportError,
};

use super::{DatasetType, Project};

/// Export switches; the `[export]` config section.
pub type ExportOptions = ExportConfig;

const CLASSES_FILE_NAME: &str = "classes.txt";
const COCO_FILE_NAME: &str = "annotations.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub files_written: usize,
    pub annotations: usize,
    /// Images without labels that got no YOLO file.
    pub skipped_empty: usize,
    /// Polygons left out because `ignore_polygons` was set.
    pub ignored_polygons: usize,
}

#[derive(Serialize)]
struct CocoDocument<'a> {
    info: CocoInfo<'a>,
    images: Vec<CocoImage>,
    annotations: Vec<CocoAnnotation>,
    categories: Vec<CocoCategory<'a>>,
}

#[derive(Serialize)]
struct CocoInfo<'a> {
    description: &'a str,
    date_created: String,
}

#[derive(Serialize)]
struct CocoImage {
    id: usize,
    file_name: String,
    height: u32,
    width: u32,
}

#[derive(Serialize)]
struct CocoCategory<'a> {
    id: usize,
    name: &'a str,
}

impl Project {
    pub fn export<P: AsRef<Path>>(
        &self,
        dataset_type: DatasetType,
        options: ExportOptions,
        dir: P,
    ) -> Result<ExportSummary, ExportError> {
        match dataset_type {
            DatasetType::Yolo => self.export_to_yolo(dir, options),
            DatasetType::Coco => self.export_to_coco(dir),
        }
    }

    /// Every label must reference an existing class; the first one that does
    /// not (image order, then label order) fails the export.
    pub fn check_class_ids(&self) -> Result<(), ExportError> {
        for image in &self.images {
            for label in &image.labels {
                if label.label_name_id() >= self.class_names.len() {
                    return Err(ExportError::UnknownClass {
                        image: image.file_name(),
                        label_name: label.label_name().to_string(),
                        class_id: label.label_name_id(),
                    });
                }
            }
        }
        Ok(())
    }

    /// One `<stem>.txt` per image plus `classes.txt`. Polygons are exported as
    /// their bounding box unless `ignore_polygons` drops them.
    pub fn export_to_yolo<P: AsRef<Path>>(&self, dir: P, options: ExportOptions) -> Result<ExportSummary, ExportError> {
        let dir = dir.as_ref();
        self.check_class_ids()?;
        create_dir(dir)?;

        let mut summary = ExportSummary::default();
        for image in &self.images {
            let (width, height) = (image.width as f64, image.height as f64);
            let mut lines = Vec::with_capacity(image.labels.len());
            for label in &image.labels {
                let rect = match label {
                    Label::Rectangle(r) => r.clone(),
                    Label::Polygon(_) if options.ignore_polygons => {
                        summary.ignored_polygons += 1;
                        continue;
                    }
                    Label::Polygon(p) => match p.to_rectangle() {
                        Some(r) => r,
                        None => continue,
                    },
                };
                lines.push(rect.to_yolo_line(width, height));
            }

            if lines.is_empty() && !options.save_empty_files {
                debug!(image = %image.file_name(), "no labels, skipping");
                summary.skipped_empty += 1;
                continue;
            }
            summary.annotations += lines.len();
            write_file(&dir.join(format!("{}.txt", image.stem())), lines.join("\n"))?;
            summary.files_written += 1;
        }

        write_file(&dir.join(CLASSES_FILE_NAME), self.class_names.join("\n"))?;
        summary.files_written += 1;

        info!(?dir, files = summary.files_written, annotations = summary.annotations, "exported YOLO dataset");
        Ok(summary)
    }

    /// A single `annotations.json`. Category ids are class indices; annotation
    /// ids run from 1 across all images.
    pub fn export_to_coco<P: AsRef<Path>>(&self, dir: P) -> Result<ExportSummary, ExportError> {
        let dir = dir.as_ref();
        self.check_class_ids()?;
        create_dir(dir)?;

        let document = self.coco_document();
        let summary = ExportSummary {
            files_written: 1,
            annotations: document.annotations.len(),
            ..ExportSummary::default()
        };
        let json = serde_json::to_string_pretty(&document)?;
        write_file(&dir.join(COCO_FILE_NAME), json)?;

        info!(?dir, annotations = summary.annotations, "exported COCO dataset");
        Ok(summary)
    }

    fn coco_document(&self) -> CocoDocument<'_> {
        let mut annotations = Vec::new();
        for image in &self.images {
            for label in &image.labels {
                let mut annotation = label.to_coco_annotation();
                annotation.id = annotations.len() as u64 + 1;
                annotation.image_id = image.image_id;
                annotations.push(annotation);
            }
        }

        CocoDocument {
            info: CocoInfo {
                description: &self.name,
                date_created: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            },
            images: self
                .images
                .iter()
                .map(|image| CocoImage {
                    id: image.image_id,
                    file_name: image.file_name(),
                    height: image.height,
                    width: image.width,
                })
                .collect(),
            annotations,
            categories: self
                .class_names
                .iter()
                .enumerate()
                .map(|(id, name)| CocoCategory { id, name })
                .collect(),
        }
    }
}

fn create_dir(dir: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: String) -> Result<(), ExportError> {
    fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
