use crate::geometry::{self, Point, Rect};

/// A scored object boundary proposed by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point>,
    pub confidence: f64,
}

impl Contour {
    pub fn new(points: Vec<Point>, confidence: f64) -> Self {
        Self { points, confidence }
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        geometry::bounding_rect(&self.points)
    }

    pub fn overlaps(&self, other: &Contour) -> bool {
        geometry::contours_overlap(&self.points, &other.points)
    }

    pub fn translated(mut self, offset: Point) -> Self {
        for p in &mut self.points {
            *p += offset;
        }
        self
    }

    pub fn simplified(self, epsilon_factor: f64) -> Self {
        Self {
            points: geometry::simplify_contour(&self.points, epsilon_factor),
            confidence: self.confidence,
        }
    }
}
