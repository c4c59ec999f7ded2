mod polygon;
mod rectangle;

use serde::{Deserialize, Serialize};

use crate::{
    error::MalformedRecordError,
    geometry::{Point, Rect, Size},
};

pub use polygon::{MIN_POLYGON_POINTS, PolygonLabel, coalesce_points};
pub use rectangle::{RectangleLabel, ResizeHandle};

/// Persisted form of a label, one per entry of an image's `labels` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LabelRecord {
    #[serde(alias = "RectangleItem")]
    Rectangle {
        start_point: Point,
        end_point: Point,
        label_name: String,
        label_name_id: usize,
    },
    #[serde(alias = "PolygonItem")]
    Polygon {
        polygon: Vec<Point>,
        label_name: String,
        label_name_id: usize,
    },
}

/// One COCO `annotations` entry. `id` and `image_id` are assigned by the exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: usize,
    pub category_id: usize,
    pub segmentation: Vec<Vec<f64>>,
    pub bbox: [f64; 4],
    pub area: f64,
    pub iscrowd: u8,
}

impl CocoAnnotation {
    pub fn new(category_id: usize, segmentation: Vec<Vec<f64>>, bbox: [f64; 4], area: f64) -> Self {
        Self {
            id: 0,
            image_id: 0,
            category_id,
            segmentation,
            bbox,
            area,
            iscrowd: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Rectangle(RectangleLabel),
    Polygon(PolygonLabel),
}

impl From<RectangleLabel> for Label {
    fn from(value: RectangleLabel) -> Self {
        Label::Rectangle(value)
    }
}

impl From<PolygonLabel> for Label {
    fn from(value: PolygonLabel) -> Self {
        Label::Polygon(value)
    }
}

impl Label {
    pub fn label_name(&self) -> &str {
        match self {
            Label::Rectangle(r) => &r.label_name,
            Label::Polygon(p) => &p.label_name,
        }
    }

    pub fn set_label_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            Label::Rectangle(r) => r.label_name = name,
            Label::Polygon(p) => p.label_name = name,
        }
    }

    pub fn label_name_id(&self) -> usize {
        match self {
            Label::Rectangle(r) => r.label_name_id,
            Label::Polygon(p) => p.label_name_id,
        }
    }

    pub fn is_selected(&self) -> bool {
        match self {
            Label::Rectangle(r) => r.selected,
            Label::Polygon(p) => p.selected,
        }
    }

    pub fn set_selected(&mut self, selected: bool) {
        match self {
            Label::Rectangle(r) => r.selected = selected,
            Label::Polygon(p) => p.selected = selected,
        }
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        match self {
            Label::Rectangle(r) => Some(r.rect()),
            Label::Polygon(p) => p.bounding_rect(),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        match self {
            Label::Rectangle(r) => r.rect().contains(point),
            Label::Polygon(p) => p.contains(point),
        }
    }

    pub fn move_by(&mut self, delta: Point, bounds: Size) -> Point {
        match self {
            Label::Rectangle(r) => r.move_by(delta, bounds),
            Label::Polygon(p) => p.move_by(delta, bounds),
        }
    }

    pub fn to_coco_annotation(&self) -> CocoAnnotation {
        match self {
            Label::Rectangle(r) => r.to_coco_annotation(),
            Label::Polygon(p) => p.to_coco_annotation(),
        }
    }

    pub fn record(&self) -> LabelRecord {
        match self {
            Label::Rectangle(r) => LabelRecord::Rectangle {
                start_point: r.start_point(),
                end_point: r.end_point(),
                label_name: r.label_name.clone(),
                label_name_id: r.label_name_id,
            },
            Label::Polygon(p) => LabelRecord::Polygon {
                polygon: p.points().to_vec(),
                label_name: p.label_name.clone(),
                label_name_id: p.label_name_id,
            },
        }
    }

    pub fn to_record(&self) -> serde_json::Value {
        // a record holds only strings, integers and finite-or-null floats
        serde_json::to_value(self.record()).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_record(record: &serde_json::Value) -> Result<Label, MalformedRecordError> {
        let record = LabelRecord::deserialize(record)?;
        Label::try_from(record)
    }
}

impl TryFrom<LabelRecord> for Label {
    type Error = MalformedRecordError;

    fn try_from(record: LabelRecord) -> Result<Self, Self::Error> {
        match record {
            LabelRecord::Rectangle {
                start_point,
                end_point,
                label_name,
                label_name_id,
            } => {
                let rect = RectangleLabel::new(start_point, end_point, label_name, label_name_id);
                if !(rect.rect().area() > 0.0) {
                    return Err(MalformedRecordError::ZeroArea);
                }
                Ok(Label::Rectangle(rect))
            }
            LabelRecord::Polygon {
                polygon,
                label_name,
                label_name_id,
            } => {
                if polygon.len() < MIN_POLYGON_POINTS {
                    return Err(MalformedRecordError::TooFewPoints(polygon.len()));
                }
                Ok(Label::Polygon(PolygonLabel::new(polygon, label_name, label_name_id)))
            }
        }
    }
}
