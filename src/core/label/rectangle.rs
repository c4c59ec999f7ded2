use crate::geometry::{Point, Rect, Size, normalize_rect};

use super::CocoAnnotation;

/// One of the four corner handles of a rectangle label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 4] = [
        ResizeHandle::TopLeft,
        ResizeHandle::TopRight,
        ResizeHandle::BottomLeft,
        ResizeHandle::BottomRight,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn corner(self, rect: &Rect) -> Point {
        match self {
            ResizeHandle::TopLeft => rect.top_left,
            ResizeHandle::TopRight => Point::new(rect.bottom_right.x, rect.top_left.y),
            ResizeHandle::BottomLeft => Point::new(rect.top_left.x, rect.bottom_right.y),
            ResizeHandle::BottomRight => rect.bottom_right,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            ResizeHandle::TopLeft => ResizeHandle::BottomRight,
            ResizeHandle::TopRight => ResizeHandle::BottomLeft,
            ResizeHandle::BottomLeft => ResizeHandle::TopRight,
            ResizeHandle::BottomRight => ResizeHandle::TopLeft,
        }
    }

    fn of_corner(corner: Point, anchor: Point) -> Self {
        match (corner.x > anchor.x, corner.y > anchor.y) {
            (false, false) => ResizeHandle::TopLeft,
            (true, false) => ResizeHandle::TopRight,
            (false, true) => ResizeHandle::BottomLeft,
            (true, true) => ResizeHandle::BottomRight,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RectangleLabel {
    start_point: Point,
    end_point: Point,
    pub label_name: String,
    pub label_name_id: usize,
    /// Set only on the live drag preview; such a label is never persisted.
    pub temporary: bool,
    pub selected: bool,
}

// selection and preview state are view concerns and take no part in equality
impl PartialEq for RectangleLabel {
    fn eq(&self, other: &Self) -> bool {
        self.start_point == other.start_point
            && self.end_point == other.end_point
            && self.label_name == other.label_name
            && self.label_name_id == other.label_name_id
    }
}

impl RectangleLabel {
    pub fn new(p1: Point, p2: Point, label_name: impl Into<String>, label_name_id: usize) -> Self {
        let rect = normalize_rect(p1, p2);
        Self {
            start_point: rect.top_left,
            end_point: rect.bottom_right,
            label_name: label_name.into(),
            label_name_id,
            temporary: false,
            selected: false,
        }
    }

    pub fn preview(p1: Point, p2: Point, label_name: impl Into<String>, label_name_id: usize) -> Self {
        Self {
            temporary: true,
            ..Self::new(p1, p2, label_name, label_name_id)
        }
    }

    pub fn start_point(&self) -> Point {
        self.start_point
    }

    pub fn end_point(&self) -> Point {
        self.end_point
    }

    pub fn rect(&self) -> Rect {
        Rect {
            top_left: self.start_point,
            bottom_right: self.end_point,
        }
    }

    fn set_rect(&mut self, rect: Rect) {
        self.start_point = rect.top_left;
        self.end_point = rect.bottom_right;
    }

    pub fn clamp_to(&mut self, bounds: Size) {
        let clamped = self.rect().clamp_to(bounds);
        self.set_rect(clamped);
    }

    /// Translate without changing size. The offset is limited so the box stays
    /// inside `bounds`; the offset actually applied is returned.
    pub fn move_by(&mut self, delta: Point, bounds: Size) -> Point {
        let rect = self.rect();
        let applied = Point::new(
            clamp_offset(delta.x, rect.top_left.x, rect.bottom_right.x, bounds.width),
            clamp_offset(delta.y, rect.top_left.y, rect.bottom_right.y, bounds.height),
        );
        self.start_point += applied;
        self.end_point += applied;
        applied
    }

    /// Drag one corner by `delta` while the opposite corner stays put. Returns
    /// the handle that sits on the dragged corner afterwards, which differs from
    /// `handle` when the drag crossed the opposite corner.
    pub fn resize(&mut self, handle: ResizeHandle, delta: Point, bounds: Size) -> ResizeHandle {
        let rect = self.rect();
        let moving = (handle.corner(&rect) + delta).clamp_to(bounds);
        let anchor = handle.opposite().corner(&rect).clamp_to(bounds);
        self.set_rect(normalize_rect(moving, anchor));
        ResizeHandle::of_corner(moving, anchor)
    }

    /// `"<class_id> <cx> <cy> <w> <h>"`, normalized by the image size.
    pub fn to_yolo_line(&self, image_width: f64, image_height: f64) -> String {
        let rect = self.rect();
        let center = rect.center();
        format!(
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.label_name_id,
            center.x / image_width,
            center.y / image_height,
            rect.width() / image_width,
            rect.height() / image_height,
        )
    }

    pub fn to_coco_annotation(&self) -> CocoAnnotation {
        let rect = self.rect();
        let segmentation = rect.corners().iter().flat_map(|p| [p.x, p.y]).collect();
        CocoAnnotation::new(
            self.label_name_id,
            vec![segmentation],
            [rect.x(), rect.y(), rect.width(), rect.height()],
            rect.area(),
        )
    }
}

fn clamp_offset(delta: f64, min: f64, max: f64, limit: f64) -> f64 {
    let lowest = -min;
    let highest = (limit - max).max(lowest);
    delta.clamp(lowest, highest)
}
