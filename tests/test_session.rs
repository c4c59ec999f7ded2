mod common;
use common::*;

use annoimg::core::Preview;

#[test]
fn rectangle_drag_yields_expected_yolo_line() -> anyhow::Result<()> {
    let mut canvas = Canvas::new(800, 600, &["cat"]);
    let mut session = Session::default();
    session.set_mode(Mode::DrawRectangle);

    let outcome = drag(&mut session, &mut canvas, (100.0, 100.0), (300.0, 400.0), 0);
    assert_eq!(outcome, Outcome::Committed("cat 0".to_string()));

    let Some(Label::Rectangle(rect)) = canvas.labels.get(0) else {
        anyhow::bail!("expected a rectangle label");
    };
    assert_eq!(rect.to_yolo_line(800.0, 600.0), "0 0.250000 0.416667 0.250000 0.500000");
    assert_eq!(session.mode(), Mode::DrawRectangle);
    Ok(())
}

#[test]
fn reversed_drag_is_normalized() {
    let mut canvas = Canvas::new(800, 600, &["cat"]);
    let mut session = Session::default();
    session.set_mode(Mode::DrawRectangle);

    drag(&mut session, &mut canvas, (300.0, 400.0), (100.0, 100.0), 0);
    let Some(Label::Rectangle(rect)) = canvas.labels.get(0) else {
        panic!("expected a rectangle label");
    };
    assert_eq!(rect.start_point(), Point::new(100.0, 100.0));
    assert_eq!(rect.end_point(), Point::new(300.0, 400.0));
}

#[test]
fn tiny_rectangle_is_discarded() {
    let mut canvas = Canvas::new(800, 600, &["cat"]);
    let mut session = Session::default();
    session.set_mode(Mode::DrawRectangle);

    let outcome = drag(&mut session, &mut canvas, (100.0, 100.0), (103.0, 300.0), 0);
    assert_eq!(outcome, Outcome::Discarded);
    assert!(canvas.labels.is_empty());
}

#[test]
fn press_outside_image_is_ignored_and_drag_is_clamped() {
    let mut canvas = Canvas::new(800, 600, &["cat"]);
    let mut session = Session::default();
    session.set_mode(Mode::DrawRectangle);

    assert_eq!(press(&mut session, &mut canvas, -10.0, 50.0, 0), Outcome::Ignored);
    assert_eq!(session.release(at(200.0, 200.0, 10), &mut canvas.ctx()), Outcome::Ignored);

    drag(&mut session, &mut canvas, (700.0, 500.0), (950.0, 900.0), 100);
    let Some(Label::Rectangle(rect)) = canvas.labels.get(0) else {
        panic!("expected a rectangle label");
    };
    assert_eq!(rect.end_point(), Point::new(800.0, 600.0));
}

#[test]
fn rectangle_preview_is_temporary() {
    let mut canvas = Canvas::new(800, 600, &["cat"]);
    let mut session = Session::default();
    session.set_mode(Mode::DrawRectangle);

    press(&mut session, &mut canvas, 10.0, 10.0, 0);
    session.drag_to(at(60.0, 80.0, 5), &mut canvas.ctx());
    match session.preview() {
        Some(Preview::Rectangle(r)) => {
            assert!(r.temporary);
            assert_eq!(r.end_point(), Point::new(60.0, 80.0));
        }
        other => panic!("unexpected preview {other:?}"),
    }
    assert!(canvas.labels.is_empty());
}

#[test]
fn double_click_on_third_vertex_finishes_polygon() {
    let mut canvas = Canvas::new(800, 600, &["cat", "dog"]);
    let mut session = Session::default();
    session.set_active_class(1);
    session.set_mode(Mode::DrawPolygon);

    press(&mut session, &mut canvas, 100.0, 100.0, 0);
    press(&mut session, &mut canvas, 200.0, 100.0, 1000);
    press(&mut session, &mut canvas, 200.0, 200.0, 2000);
    let outcome = press(&mut session, &mut canvas, 200.0, 200.0, 2100);

    assert_eq!(outcome, Outcome::Committed("dog 0".to_string()));
    let Some(Label::Polygon(poly)) = canvas.labels.get(0) else {
        panic!("expected a polygon label");
    };
    assert_eq!(
        poly.points(),
        &[Point::new(100.0, 100.0), Point::new(200.0, 100.0), Point::new(200.0, 200.0)]
    );
    assert_eq!(poly.label_name_id, 1);
    assert_eq!(session.mode(), Mode::DrawPolygon);
    assert!(session.preview().is_none());
}

#[test]
fn polygon_with_two_distinct_points_is_not_persisted() {
    let mut canvas = Canvas::new(800, 600, &["cat"]);
    let mut session = Session::default();
    session.set_mode(Mode::DrawPolygon);

    press(&mut session, &mut canvas, 100.0, 100.0, 0);
    press(&mut session, &mut canvas, 200.0, 100.0, 1000);
    // close to the previous vertex and inside the double-click window
    let outcome = press(&mut session, &mut canvas, 202.0, 101.0, 1100);

    assert_eq!(outcome, Outcome::DraftUpdated);
    assert!(canvas.labels.is_empty());
}

#[test]
fn slow_clicks_never_finish_polygon() {
    let mut canvas = Canvas::new(800, 600, &["cat"]);
    let mut session = Session::default();
    session.set_mode(Mode::DrawPolygon);

    for (i, (x, y)) in [(10.0, 10.0), (90.0, 10.0), (90.0, 90.0), (10.0, 90.0)].into_iter().enumerate() {
        press(&mut session, &mut canvas, x, y, i as u64 * 500);
    }
    assert!(canvas.labels.is_empty());
    match session.preview() {
        Some(Preview::Polygon { vertices, .. }) => assert_eq!(vertices.len(), 4),
        other => panic!("unexpected preview {other:?}"),
    }
}

#[test]
fn leaving_polygon_mode_discards_draft() {
    let mut canvas = Canvas::new(800, 600, &["cat"]);
    let mut session = Session::default();
    session.set_mode(Mode::DrawPolygon);
    press(&mut session, &mut canvas, 10.0, 10.0, 0);
    press(&mut session, &mut canvas, 90.0, 10.0, 1000);

    session.set_mode(Mode::Select);
    session.set_mode(Mode::DrawPolygon);
    assert!(session.preview().is_none());

    // the earlier vertices are gone, so this pair cannot finish anything
    press(&mut session, &mut canvas, 50.0, 50.0, 5000);
    assert_eq!(press(&mut session, &mut canvas, 50.0, 50.0, 5050), Outcome::DraftUpdated);
    assert!(canvas.labels.is_empty());
}

#[test]
fn empty_class_list_prompts_for_a_name() {
    let mut canvas = Canvas::new(800, 600, &[]).with_prompt_answer(Some("bird"));
    let mut session = Session::default();
    session.set_mode(Mode::DrawRectangle);

    let outcome = drag(&mut session, &mut canvas, (10.0, 10.0), (100.0, 100.0), 0);
    assert_eq!(outcome, Outcome::Committed("bird 0".to_string()));
    assert_eq!(canvas.classes, vec!["bird".to_string()]);
}

#[test]
fn declined_prompt_discards_shape() {
    let mut canvas = Canvas::new(800, 600, &[]).with_prompt_answer(None);
    let mut session = Session::default();
    session.set_mode(Mode::DrawRectangle);

    let outcome = drag(&mut session, &mut canvas, (10.0, 10.0), (100.0, 100.0), 0);
    assert_eq!(outcome, Outcome::Cancelled);
    assert!(canvas.labels.is_empty());
    assert!(canvas.classes.is_empty());
}

#[test]
fn select_move_and_deselect() {
    let mut canvas = Canvas::new(800, 600, &["cat"]);
    canvas
        .labels
        .add(RectangleLabel::new(Point::new(100.0, 100.0), Point::new(300.0, 400.0), "cat 0", 0));
    let mut session = Session::default();

    let outcome = press(&mut session, &mut canvas, 150.0, 150.0, 0);
    assert_eq!(outcome, Outcome::SelectionChanged(Some("cat 0".to_string())));
    session.drag_to(at(0.0, 150.0, 10), &mut canvas.ctx());
    assert_eq!(session.release(at(0.0, 150.0, 20), &mut canvas.ctx()), Outcome::Edited);

    let Some(Label::Rectangle(rect)) = canvas.labels.get(0) else {
        panic!("expected a rectangle label");
    };
    // the move stops at the left edge and keeps the size
    assert_eq!(rect.start_point(), Point::new(0.0, 100.0));
    assert_eq!(rect.end_point(), Point::new(200.0, 400.0));
    assert!(rect.selected);

    assert_eq!(press(&mut session, &mut canvas, 700.0, 550.0, 100), Outcome::SelectionChanged(None));
    assert!(canvas.labels.selected().next().is_none());
}

#[test]
fn corner_handle_resizes_selected_rectangle() {
    let mut canvas = Canvas::new(800, 600, &["cat"]);
    canvas
        .labels
        .add(RectangleLabel::new(Point::new(100.0, 100.0), Point::new(300.0, 400.0), "cat 0", 0));
    let mut session = Session::default();

    press(&mut session, &mut canvas, 150.0, 150.0, 0);
    session.release(at(150.0, 150.0, 10), &mut canvas.ctx());

    drag(&mut session, &mut canvas, (301.0, 398.0), (351.0, 448.0), 100);
    let Some(Label::Rectangle(rect)) = canvas.labels.get(0) else {
        panic!("expected a rectangle label");
    };
    assert_eq!(rect.start_point(), Point::new(100.0, 100.0));
    assert_eq!(rect.end_point(), Point::new(350.0, 450.0));
}

#[test]
fn vertex_handle_drags_polygon_vertex() {
    let mut canvas = Canvas::new(800, 600, &["cat"]);
    canvas.labels.add(PolygonLabel::new(
        vec![Point::new(100.0, 100.0), Point::new(200.0, 100.0), Point::new(150.0, 200.0)],
        "cat 0",
        0,
    ));
    let mut session = Session::default();

    press(&mut session, &mut canvas, 150.0, 130.0, 0);
    session.release(at(150.0, 130.0, 10), &mut canvas.ctx());
    drag(&mut session, &mut canvas, (150.0, 200.0), (150.0, 900.0), 100);

    let Some(Label::Polygon(poly)) = canvas.labels.get(0) else {
        panic!("expected a polygon label");
    };
    assert_eq!(poly.points()[2], Point::new(150.0, 600.0));
}

#[test]
fn auto_detect_submits_crop_without_adding_labels() -> anyhow::Result<()> {
    let mut canvas = Canvas::new(800, 600, &["cat"]);
    let mut session = Session::default();
    session.set_mode(Mode::AutoDetect);

    let outcome = drag(&mut session, &mut canvas, (100.4, 50.2), (300.0, 250.0), 0);
    let task = canvas.submitted.try_recv()?;
    assert_eq!(outcome, Outcome::DetectionSubmitted(task.id));
    assert_eq!(task.offset, Point::new(100.0, 50.0));
    assert_eq!(task.image.dimensions(), (200, 200));
    assert_eq!(task.label_name, "cat");
    assert_eq!(task.confidence_threshold, 0.1);
    assert!(canvas.labels.is_empty());
    Ok(())
}

#[test]
fn pan_suspends_input_and_restores_mode() {
    let mut canvas = Canvas::new(800, 600, &["cat"]);
    let mut session = Session::default();
    session.set_mode(Mode::DrawRectangle);

    session.begin_pan();
    assert!(session.is_panning());
    assert_eq!(drag(&mut session, &mut canvas, (10.0, 10.0), (100.0, 100.0), 0), Outcome::Ignored);
    session.end_pan();

    assert_eq!(session.mode(), Mode::DrawRectangle);
    assert!(matches!(
        drag(&mut session, &mut canvas, (10.0, 10.0), (100.0, 100.0), 100),
        Outcome::Committed(_)
    ));
}
