use crate::geometry::{self, Point, Rect, Size};

use super::{CocoAnnotation, RectangleLabel};

/// Smallest vertex count of a finished polygon.
pub const MIN_POLYGON_POINTS: usize = 3;

#[derive(Debug, Clone)]
pub struct PolygonLabel {
    points: Vec<Point>,
    pub label_name: String,
    pub label_name_id: usize,
    pub selected: bool,
}

impl PartialEq for PolygonLabel {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
            && self.label_name == other.label_name
            && self.label_name_id == other.label_name_id
    }
}

impl PolygonLabel {
    pub fn new(points: Vec<Point>, label_name: impl Into<String>, label_name_id: usize) -> Self {
        Self {
            points,
            label_name: label_name.into(),
            label_name_id,
            selected: false,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() >= MIN_POLYGON_POINTS
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        geometry::bounding_rect(&self.points)
    }

    pub fn contains(&self, p: Point) -> bool {
        geometry::point_in_polygon(p, &self.points)
    }

    /// Replace one vertex in place. The new point is clamped into `bounds`;
    /// the polygon is not checked for self-intersection.
    pub fn edit_vertex(&mut self, index: usize, new_point: Point, bounds: Size) -> bool {
        match self.points.get_mut(index) {
            Some(vertex) => {
                *vertex = new_point.clamp_to(bounds);
                true
            }
            None => false,
        }
    }

    /// Translate every vertex, limiting the offset so the bounding box stays
    /// inside `bounds`.
    pub fn move_by(&mut self, delta: Point, bounds: Size) -> Point {
        let Some(bbox) = self.bounding_rect() else {
            return Point::default();
        };
        let mut probe = RectangleLabel::new(bbox.top_left, bbox.bottom_right, "", 0);
        let applied = probe.move_by(delta, bounds);
        for p in &mut self.points {
            *p += applied;
        }
        applied
    }

    /// Bounding box as a rectangle label, for formats without polygon support.
    pub fn to_rectangle(&self) -> Option<RectangleLabel> {
        let bbox = self.bounding_rect()?;
        Some(RectangleLabel::new(
            bbox.top_left,
            bbox.bottom_right,
            self.label_name.clone(),
            self.label_name_id,
        ))
    }

    pub fn to_coco_annotation(&self) -> CocoAnnotation {
        let segmentation = self.points.iter().flat_map(|p| [p.x, p.y]).collect();
        let bbox = self
            .bounding_rect()
            .map(|r| [r.x(), r.y(), r.width(), r.height()])
            .unwrap_or_default();
        CocoAnnotation::new(
            self.label_name_id,
            vec![segmentation],
            bbox,
            geometry::polygon_area(&self.points),
        )
    }
}

/// Drop every point that lies within `threshold` (Manhattan) of the point
/// accepted before it.
pub fn coalesce_points(points: &[Point], threshold: f64) -> Vec<Point> {
    let mut accepted: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        match accepted.last() {
            Some(&last) if geometry::points_close(last, p, threshold) => {}
            _ => accepted.push(p),
        }
    }
    accepted
}
