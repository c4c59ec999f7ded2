//! Point and rectangle primitives shared by the label model, the session and
//! the detection post-processing.

use std::ops::{Add, AddAssign, Sub};

use imageproc::geometry::{approximate_polygon_dp, arc_length};
use serde::{Deserialize, Serialize};

/// Manhattan distance below which two polygon vertices count as the same point.
pub const CLOSE_POINTS_THRESHOLD: f64 = 5.0;

/// A position in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn manhattan_length(self) -> f64 {
        self.x.abs() + self.y.abs()
    }

    /// Clamp into `[0, width] x [0, height]`.
    pub fn clamp_to(self, bounds: Size) -> Self {
        Self {
            x: self.x.clamp(0.0, bounds.width.max(0.0)),
            y: self.y.clamp(0.0, bounds.height.max(0.0)),
        }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, p: Point) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
    }
}

impl From<(u32, u32)> for Size {
    fn from((w, h): (u32, u32)) -> Self {
        Self::new(w as f64, h as f64)
    }
}

/// Axis-aligned rectangle, always stored with `top_left <= bottom_right`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl Rect {
    pub fn x(&self) -> f64 {
        self.top_left.x
    }

    pub fn y(&self) -> f64 {
        self.top_left.y
    }

    pub fn width(&self) -> f64 {
        self.bottom_right.x - self.top_left.x
    }

    pub fn height(&self) -> f64 {
        self.bottom_right.y - self.top_left.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.top_left.x + self.bottom_right.x) / 2.0,
            (self.top_left.y + self.bottom_right.y) / 2.0,
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.top_left.x
            && p.x <= self.bottom_right.x
            && p.y >= self.top_left.y
            && p.y <= self.bottom_right.y
    }

    /// Corners clockwise from the top-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            Point::new(self.bottom_right.x, self.top_left.y),
            self.bottom_right,
            Point::new(self.top_left.x, self.bottom_right.y),
        ]
    }

    /// Open-interval intersection on both axes; touching edges do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.top_left.x < other.bottom_right.x
            && other.top_left.x < self.bottom_right.x
            && self.top_left.y < other.bottom_right.y
            && other.top_left.y < self.bottom_right.y
    }

    pub fn clamp_to(&self, bounds: Size) -> Rect {
        normalize_rect(self.top_left.clamp_to(bounds), self.bottom_right.clamp_to(bounds))
    }
}

/// Rectangle spanned by two opposite corners given in any order.
pub fn normalize_rect(p1: Point, p2: Point) -> Rect {
    Rect {
        top_left: Point::new(p1.x.min(p2.x), p1.y.min(p2.y)),
        bottom_right: Point::new(p1.x.max(p2.x), p1.y.max(p2.y)),
    }
}

/// True iff the Manhattan distance between the points is below `threshold`.
pub fn points_close(p1: Point, p2: Point, threshold: f64) -> bool {
    (p1 - p2).manhattan_length() < threshold
}

/// Handle radius in image coordinates that keeps handles the same size on
/// screen at any zoom level.
pub fn handle_size(
    image_width: f64,
    image_height: f64,
    scale_factor: f64,
    min_size: f64,
    max_size: f64,
) -> f64 {
    let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
    let average_dim = (image_width + image_height) / 2.0;
    (0.01 * average_dim / scale).clamp(min_size, max_size.max(min_size))
}

/// Smallest rectangle containing every point, `None` for an empty slice.
pub fn bounding_rect(points: &[Point]) -> Option<Rect> {
    let first = *points.first()?;
    let rect = points.iter().skip(1).fold(
        Rect {
            top_left: first,
            bottom_right: first,
        },
        |acc, p| Rect {
            top_left: Point::new(acc.top_left.x.min(p.x), acc.top_left.y.min(p.y)),
            bottom_right: Point::new(acc.bottom_right.x.max(p.x), acc.bottom_right.y.max(p.y)),
        },
    );
    Some(rect)
}

/// True iff the bounding boxes of both contours intersect.
pub fn contours_overlap(c1: &[Point], c2: &[Point]) -> bool {
    match (bounding_rect(c1), bounding_rect(c2)) {
        (Some(a), Some(b)) => a.overlaps(&b),
        _ => false,
    }
}

/// Shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice.abs() / 2.0
}

/// Even-odd ray casting test; points on an edge may land either way.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Douglas-Peucker simplification of a closed contour, with the tolerance set
/// to `epsilon_factor` times the contour perimeter.
///
/// The ring is cut at the vertex farthest from the first one and each half is
/// simplified as an open curve, so both cut vertices always survive. A result
/// with fewer than three vertices falls back to the input.
pub fn simplify_contour(points: &[Point], epsilon_factor: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let curve: Vec<imageproc::point::Point<f64>> = points
        .iter()
        .map(|p| imageproc::point::Point::new(p.x, p.y))
        .collect();
    let epsilon = epsilon_factor * arc_length(&curve, true);
    // approximate_polygon_dp rejects a non-positive tolerance
    if !(epsilon > 0.0) {
        return points.to_vec();
    }

    let first = points[0];
    let (split, farthest) = points
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, p)| (i, (p.x - first.x).hypot(p.y - first.y)))
        .fold((0, 0.0), |best, (i, d)| if d > best.1 { (i, d) } else { best });
    if !(farthest > 0.0) {
        return points.to_vec();
    }

    let mut closing: Vec<_> = curve[split..].to_vec();
    closing.push(curve[0]);
    let mut simplified: Vec<Point> = approximate_polygon_dp(&curve[..=split], epsilon, false)
        .into_iter()
        .chain(
            approximate_polygon_dp(&closing, epsilon, false)
                .into_iter()
                .skip(1),
        )
        .map(|p| Point::new(p.x, p.y))
        .collect();
    // the second half ends where the first began
    if simplified.len() > 1 && simplified.first() == simplified.last() {
        simplified.pop();
    }

    if simplified.len() < 3 {
        return points.to_vec();
    }
    simplified
}
