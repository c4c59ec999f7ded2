use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};

use crate::{geometry::Point, models::Contour};

/// Keep contours scoring strictly above `threshold`.
pub fn filter_by_confidence(contours: Vec<Contour>, threshold: f64) -> Vec<Contour> {
    contours.into_iter().filter(|c| c.confidence > threshold).collect()
}

/// Resolve overlapping proposals: whenever two bounding boxes overlap the
/// lower-confidence contour is dropped. Survivors come back highest
/// confidence first; equal scores keep their input order.
pub fn merge_overlapping(mut contours: Vec<Contour>) -> Vec<Contour> {
    contours.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Contour> = Vec::with_capacity(contours.len());
    'outer: for candidate in contours {
        for existing in &kept {
            if existing.overlaps(&candidate) {
                continue 'outer;
            }
        }
        kept.push(candidate);
    }
    kept
}

/// Full post-processing of raw detector output for a crop at `offset`.
pub fn process_contours(raw: Vec<Contour>, threshold: f64, offset: Point, epsilon_factor: f64) -> Vec<Contour> {
    let translated = filter_by_confidence(raw, threshold)
        .into_iter()
        .map(|c| c.translated(offset))
        .collect();
    merge_overlapping(translated)
        .into_iter()
        .map(|c| c.simplified(epsilon_factor))
        .collect()
}

/// Outer boundaries of the foreground (non-zero) regions of a binary mask,
/// each scored with `confidence`. Holes and regions nested inside holes are
/// not reported.
pub fn contours_from_mask(mask: &GrayImage, confidence: f64) -> Vec<Contour> {
    find_contours::<u32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            let points = c
                .points
                .iter()
                .map(|p| Point::new(p.x as f64, p.y as f64))
                .collect();
            Contour::new(points, confidence)
        })
        .collect()
}
