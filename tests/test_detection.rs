mod common;
use common::*;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use annoimg::config::DetectionConfig;
use annoimg::detection::{DetectionQueue, DetectionStatus, contours::merge_overlapping};
use annoimg::{Contour, DetectorError};
use image::RgbImage;

const WAIT: Duration = Duration::from_secs(5);

fn square(x: f64, y: f64, side: f64, confidence: f64) -> Contour {
    Contour::new(
        vec![
            Point::new(x, y),
            Point::new(x + side, y),
            Point::new(x + side, y + side),
            Point::new(x, y + side),
        ],
        confidence,
    )
}

fn task(name: &str, offset: Point) -> DetectionTask {
    DetectionTask::new(RgbImage::new(50, 50), 0, offset, name, 0, 0.1)
}

#[test]
fn merge_keeps_the_more_confident_of_an_overlapping_pair() {
    let merged = merge_overlapping(vec![square(0.0, 0.0, 20.0, 0.4), square(10.0, 10.0, 20.0, 0.9)]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].confidence, 0.9);

    let apart = vec![square(0.0, 0.0, 20.0, 0.9), square(100.0, 100.0, 20.0, 0.4)];
    assert_eq!(merge_overlapping(apart.clone()), apart);
}

#[test]
fn completions_arrive_in_submission_order() -> anyhow::Result<()> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let detector = {
        let seen = Arc::clone(&seen);
        move |image: &RgbImage, _: f64| -> Result<Vec<Contour>, DetectorError> {
            seen.lock().unwrap().push(image.dimensions());
            Ok(Vec::new())
        }
    };
    let (queue, completions) = DetectionQueue::start(detector, DetectionConfig::default());

    for name in ["A", "B", "C"] {
        queue.submit(task(name, Point::default()));
    }
    let order: Vec<String> = (0..3)
        .map(|_| completions.recv_timeout(WAIT).map(|c| c.task.label_name))
        .collect::<Result<_, _>>()?;
    assert_eq!(order, vec!["A", "B", "C"]);
    assert_eq!(seen.lock().unwrap().len(), 3);
    assert_eq!(queue.pending(), 0);
    Ok(())
}

#[test]
fn results_are_filtered_translated_and_merged() -> anyhow::Result<()> {
    let detector = |_: &RgbImage, _: f64| -> Result<Vec<Contour>, DetectorError> {
        Ok(vec![
            square(0.0, 0.0, 20.0, 0.4),
            square(10.0, 10.0, 20.0, 0.9),
            square(30.0, 30.0, 10.0, 0.05),
        ])
    };
    let (queue, completions) = DetectionQueue::start(detector, DetectionConfig::default());
    queue.submit(task("cat", Point::new(100.0, 50.0)));

    let done = completions.recv_timeout(WAIT)?;
    assert!(done.is_completed());
    assert_eq!(done.contours.len(), 1);
    assert_eq!(done.contours[0].confidence, 0.9);
    assert_eq!(done.contours[0].points[0], Point::new(110.0, 60.0));

    let mut labels = LabelCollection::new();
    labels.add(PolygonLabel::new(
        vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(0.0, 5.0)],
        "cat 0",
        0,
    ));
    assert_eq!(labels.add_detected(&done), 1);
    assert!(labels.find_by_name("cat 1").is_some());

    // results for an image that is not in the project are ignored
    let mut project = Project::new("det", class_list(&["cat"]), DatasetType::Yolo);
    assert_eq!(project.apply_detection(&done), 0);
    Ok(())
}

#[test]
fn detected_triangle_becomes_a_polygon_label() -> anyhow::Result<()> {
    let detector = |_: &RgbImage, _: f64| -> Result<Vec<Contour>, DetectorError> {
        Ok(vec![Contour::new(
            vec![Point::new(0.0, 0.0), Point::new(24.0, 0.0), Point::new(12.0, 18.0)],
            0.7,
        )])
    };
    let (queue, completions) = DetectionQueue::start(detector, DetectionConfig::default());
    queue.submit(task("sign", Point::new(5.0, 5.0)));

    let done = completions.recv_timeout(WAIT)?;
    assert_eq!(done.contours.len(), 1);
    assert_eq!(done.contours[0].points.len(), 3);

    let mut labels = LabelCollection::new();
    assert_eq!(labels.add_detected(&done), 1);
    let Some(Label::Polygon(poly)) = labels.find_by_name("sign 0") else {
        anyhow::bail!("expected a detected polygon");
    };
    assert_eq!(poly.points().len(), 3);
    assert_eq!(poly.points()[2], Point::new(17.0, 23.0));
    Ok(())
}

#[test]
fn unavailable_model_is_reported_distinctly() -> anyhow::Result<()> {
    let detector = |_: &RgbImage, _: f64| -> Result<Vec<Contour>, DetectorError> {
        Err(DetectorError::ModelUnavailable("no weights".into()))
    };
    let (queue, completions) = DetectionQueue::start(detector, DetectionConfig::default());
    queue.submit(task("cat", Point::default()));
    queue.submit(task("dog", Point::default()));

    for expected in ["cat", "dog"] {
        let done = completions.recv_timeout(WAIT)?;
        assert_eq!(done.task.label_name, expected);
        assert!(done.contours.is_empty());
        assert!(matches!(done.status, DetectionStatus::ModelUnavailable(_)));
    }
    Ok(())
}

#[test]
fn session_crop_flows_through_queue_into_project() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = write_test_image(dir.path(), "scene.png", 400, 300);
    let mut project = Project::create("scene", &[path], class_list(&["cat"]), DatasetType::Yolo)?;

    let detector = |image: &RgbImage, _: f64| -> Result<Vec<Contour>, DetectorError> {
        let (w, h) = image.dimensions();
        Ok(vec![square(2.0, 2.0, (w.min(h) - 4) as f64, 0.8)])
    };
    let (queue, completions) = DetectionQueue::start(detector, DetectionConfig::default());

    let image = RgbImage::new(400, 300);
    let mut session = Session::default();
    session.set_mode(Mode::AutoDetect);
    {
        let (classes, label_image) = project.edit_parts(0).expect("image 0");
        let mut prompt = || None::<String>;
        let mut ctx = SessionContext {
            image_id: label_image.image_id,
            image: &image,
            class_names: classes,
            labels: &mut label_image.labels,
            prompt: &mut prompt,
            tasks: &queue,
        };
        session.press(PointerEvent::new(50.0, 40.0, Duration::ZERO), &mut ctx);
        let outcome = session.release(PointerEvent::new(150.0, 140.0, Duration::from_millis(30)), &mut ctx);
        assert!(matches!(outcome, Outcome::DetectionSubmitted(_)));
    }

    let done = completions.recv_timeout(WAIT)?;
    assert_eq!(project.apply_detection(&done), 1);
    let labels = &project.image(0).expect("image 0").labels;
    let Some(Label::Polygon(poly)) = labels.find_by_name("cat 0") else {
        anyhow::bail!("expected a detected polygon");
    };
    assert_eq!(poly.bounding_rect().map(|r| r.top_left), Some(Point::new(52.0, 42.0)));
    Ok(())
}
