use std::{
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tar::{Archive, Builder, Header};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{info, warn};
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

use crate::core::{collection::LabelCollection, label::Label};

use super::{DatasetType, LabelImage, Project};

const PROJECT_FILE_NAME: &str = "project.json";
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

#[derive(Debug, Serialize, Deserialize)]
struct ProjectFile {
    name: String,
    class_names: Vec<String>,
    #[serde(default)]
    dataset_type: DatasetType,
    #[serde(default)]
    created_at: Option<String>,
    images: Vec<ImageEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ImageEntry {
    image_id: usize,
    path: PathBuf,
    // absent in plain JSON projects, read from the image header on load
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    labels: Vec<serde_json::Value>,
}

/// What [`Project::load`] had to leave out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Label records that could not be turned into labels.
    pub dropped_records: usize,
}

impl Project {
    /// The persisted form of the whole project, labels in current order.
    pub fn to_value(&self) -> serde_json::Value {
        let file = ProjectFile {
            name: self.name.clone(),
            class_names: self.class_names.clone(),
            dataset_type: self.dataset_type,
            created_at: self.created_at.format(&Rfc3339).ok(),
            images: self
                .images
                .iter()
                .map(|img| ImageEntry {
                    image_id: img.image_id,
                    path: img.path.clone(),
                    width: Some(img.width),
                    height: Some(img.height),
                    labels: img.labels.to_records(),
                })
                .collect(),
        };
        serde_json::to_value(file).unwrap_or(serde_json::Value::Null)
    }

    /// Write the project as a zstd-compressed tar archive holding `project.json`.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let state = self.to_value();
        let json = serde_json::to_vec_pretty(&state).context("Failed to serialize project")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        let out = File::create(path)
            .with_context(|| format!("Failed to create project archive {:?}", path))?;
        let encoder = ZstdEncoder::new(out, 3)
            .with_context(|| format!("Failed to create zstd encoder for {:?}", path))?;
        let mut tar = Builder::new(encoder);

        let mut header = Header::new_gnu();
        header.set_size(json.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(OffsetDateTime::now_utc().unix_timestamp().max(0) as u64);
        header.set_cksum();
        tar.append_data(&mut header, PROJECT_FILE_NAME, json.as_slice())
            .with_context(|| format!("Failed to add {PROJECT_FILE_NAME} to {:?}", path))?;

        let encoder = tar
            .into_inner()
            .with_context(|| format!("Failed to finalize tar for {:?}", path))?;
        encoder
            .finish()
            .with_context(|| format!("Failed to finalize zstd stream for {:?}", path))?;

        info!(?path, images = self.images.len(), "saved project");
        self.mark_saved(state);
        Ok(())
    }

    /// Read a project archive, or a plain JSON project file without the archive
    /// wrapper. Label records that fail to parse are skipped and counted in the
    /// report; everything else loads.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<(Self, LoadReport)> {
        let path = path.as_ref();
        let json = read_project_json(path)?;
        let raw: serde_json::Value = serde_json::from_slice(&json)
            .with_context(|| format!("Invalid {PROJECT_FILE_NAME} in {:?}", path))?;
        let file = ProjectFile::deserialize(&raw)
            .with_context(|| format!("Unexpected project layout in {:?}", path))?;

        let created_at = match file.created_at.as_deref() {
            Some(ts) => OffsetDateTime::parse(ts, &Rfc3339)
                .with_context(|| format!("Invalid created_at {ts:?} in {:?}", path))?,
            None => OffsetDateTime::UNIX_EPOCH,
        };

        let mut report = LoadReport::default();
        let base_dir = path.parent().unwrap_or(Path::new(""));
        let images = file
            .images
            .into_iter()
            .map(|entry| {
                let (width, height) = match (entry.width, entry.height) {
                    (Some(w), Some(h)) => (w, h),
                    _ => {
                        let image_path = base_dir.join(&entry.path);
                        image::image_dimensions(&image_path)
                            .with_context(|| format!("Failed to read size of image {:?}", image_path))?
                    }
                };
                let labels: LabelCollection = entry
                    .labels
                    .iter()
                    .filter_map(|record| match Label::from_record(record) {
                        Ok(label) => Some(label),
                        Err(err) => {
                            warn!(image_id = entry.image_id, "dropping label record: {err}");
                            report.dropped_records += 1;
                            None
                        }
                    })
                    .collect();
                Ok(LabelImage {
                    image_id: entry.image_id,
                    path: entry.path,
                    width,
                    height,
                    labels,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut project = Project::from_parts(file.name, file.class_names, file.dataset_type, created_at, images);
        // dropped records count as unsaved changes
        if report.dropped_records == 0 {
            let state = project.to_value();
            project.mark_saved(state);
        }
        info!(?path, images = project.images.len(), dropped = report.dropped_records, "loaded project");
        Ok((project, report))
    }
}

fn read_project_json(path: &Path) -> anyhow::Result<Vec<u8>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to open project file {:?}", path))?;
    if !bytes.starts_with(&ZSTD_MAGIC) {
        return Ok(bytes);
    }
    let decoder =
        ZstdDecoder::new(bytes.as_slice()).with_context(|| format!("Invalid zstd stream in {:?}", path))?;
    let mut archive = Archive::new(decoder);

    let entries = archive
        .entries()
        .with_context(|| format!("Failed to read archive {:?}", path))?;
    for entry in entries {
        let mut entry = entry.with_context(|| format!("Corrupt entry in {:?}", path))?;
        if entry.path()?.as_ref() != Path::new(PROJECT_FILE_NAME) {
            continue;
        }
        let mut json = Vec::new();
        entry
            .read_to_end(&mut json)
            .with_context(|| format!("Failed to read {PROJECT_FILE_NAME} from {:?}", path))?;
        return Ok(json);
    }
    anyhow::bail!("Corrupt project: {PROJECT_FILE_NAME} missing from {:?}", path)
}
