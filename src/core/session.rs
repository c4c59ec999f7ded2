//! Interaction state machine that turns pointer input into label mutations.
//!
//! The session owns only transient gesture state (drafts, drags, the
//! double-click timer). Everything persistent is reached through the
//! [`SessionContext`] handed to each event, so a view layer can forward raw
//! input here and redraw from the returned [`Outcome`].

use std::{sync::mpsc::Sender, time::Duration};

use image::RgbImage;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::{AnnotatorConfig, DetectionConfig, SessionConfig},
    core::{
        collection::LabelCollection,
        label::{Label, MIN_POLYGON_POINTS, PolygonLabel, RectangleLabel, ResizeHandle, coalesce_points},
    },
    detection::{DetectionQueue, DetectionTask},
    geometry::{self, Point, Rect, Size, normalize_rect},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Select,
    DrawRectangle,
    DrawPolygon,
    AutoDetect,
}

/// A pointer press, move or release in image coordinates. `timestamp` is any
/// monotonic clock reading; only differences between presses are used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
    pub timestamp: Duration,
}

impl PointerEvent {
    pub fn new(x: f64, y: f64, timestamp: Duration) -> Self {
        Self {
            position: Point::new(x, y),
            timestamp,
        }
    }
}

/// Asked for a first class name when a shape is committed to a project
/// without any classes. `None` means the user declined.
pub trait ClassNamePrompt {
    fn request_class_name(&mut self) -> Option<String>;
}

impl<F> ClassNamePrompt for F
where
    F: FnMut() -> Option<String>,
{
    fn request_class_name(&mut self) -> Option<String> {
        self()
    }
}

/// Receiver for detection crops produced in [`Mode::AutoDetect`].
pub trait TaskSink {
    fn submit(&self, task: DetectionTask);
}

impl TaskSink for DetectionQueue {
    fn submit(&self, task: DetectionTask) {
        DetectionQueue::submit(self, task);
    }
}

impl TaskSink for Sender<DetectionTask> {
    fn submit(&self, task: DetectionTask) {
        // a dropped receiver means nobody is waiting for the result
        let _ = self.send(task);
    }
}

/// Everything an event may touch outside the session itself.
pub struct SessionContext<'a> {
    pub image_id: usize,
    pub image: &'a RgbImage,
    pub class_names: &'a mut Vec<String>,
    pub labels: &'a mut LabelCollection,
    pub prompt: &'a mut dyn ClassNamePrompt,
    pub tasks: &'a dyn TaskSink,
}

impl SessionContext<'_> {
    fn bounds(&self) -> Size {
        Size::from(self.image.dimensions())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ignored,
    /// Selection was reassigned; carries the newly selected label's name.
    SelectionChanged(Option<String>),
    /// A label was moved, resized or had a vertex dragged.
    Edited,
    /// The in-progress shape changed.
    DraftUpdated,
    /// A new label with this name was added.
    Committed(String),
    /// The gesture produced a degenerate shape.
    Discarded,
    /// The class-name prompt was declined and the pending shape dropped.
    Cancelled,
    DetectionSubmitted(Uuid),
}

/// In-progress shape, for drawing a live preview.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview<'s> {
    Rectangle(RectangleLabel),
    Polygon {
        vertices: &'s [Point],
        cursor: Option<Point>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Drag {
    Move { index: usize, last: Point },
    Resize { index: usize, handle: ResizeHandle, last: Point },
    Vertex { index: usize, vertex: usize },
}

#[derive(Debug, Clone)]
pub struct Session {
    config: SessionConfig,
    confidence_threshold: f64,
    mode: Mode,
    pan_return: Option<Mode>,
    scale_factor: f64,
    active_class: usize,
    rect_draft: Option<(Point, Point)>,
    polygon: Vec<Point>,
    cursor: Option<Point>,
    last_press: Option<Duration>,
    drag: Option<Drag>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            confidence_threshold: DetectionConfig::default().confidence_threshold,
            mode: Mode::Select,
            pan_return: None,
            scale_factor: 1.0,
            active_class: 0,
            rect_draft: None,
            polygon: Vec::new(),
            cursor: None,
            last_press: None,
            drag: None,
        }
    }

    pub fn from_config(config: &AnnotatorConfig) -> Self {
        Self {
            confidence_threshold: config.detection.confidence_threshold,
            ..Self::new(config.session.clone())
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_panning(&self) -> bool {
        self.pan_return.is_some()
    }

    /// Switch tools. Leaving a mode discards its in-progress shape.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.pan_return.is_some() {
            self.pan_return = Some(mode);
        }
        if mode == self.mode {
            return;
        }
        debug!(from = ?self.mode, to = ?mode, "switching mode");
        self.clear_transient();
        self.mode = mode;
    }

    /// Drop any draft or drag without leaving the current mode.
    pub fn cancel(&mut self) {
        self.clear_transient();
    }

    fn clear_transient(&mut self) {
        self.rect_draft = None;
        self.polygon.clear();
        self.cursor = None;
        self.last_press = None;
        self.drag = None;
    }

    /// Pan modifier pressed: pointer events are ignored until [`Session::end_pan`].
    pub fn begin_pan(&mut self) {
        if self.pan_return.is_none() {
            self.pan_return = Some(self.mode);
            self.drag = None;
        }
    }

    pub fn end_pan(&mut self) {
        if let Some(mode) = self.pan_return.take() {
            self.set_mode(mode);
        }
    }

    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
    }

    pub fn active_class(&self) -> usize {
        self.active_class
    }

    pub fn set_active_class(&mut self, class_id: usize) {
        self.active_class = class_id;
    }

    pub fn handle_size(&self, bounds: Size) -> f64 {
        geometry::handle_size(
            bounds.width,
            bounds.height,
            self.scale_factor,
            self.config.min_handle_size,
            self.config.max_handle_size,
        )
    }

    pub fn preview(&self) -> Option<Preview<'_>> {
        match self.mode {
            Mode::DrawRectangle | Mode::AutoDetect => self.rect_draft.map(|(anchor, current)| {
                Preview::Rectangle(RectangleLabel::preview(anchor, current, String::new(), self.active_class))
            }),
            Mode::DrawPolygon if !self.polygon.is_empty() => Some(Preview::Polygon {
                vertices: &self.polygon,
                cursor: self.cursor,
            }),
            _ => None,
        }
    }

    pub fn press(&mut self, event: PointerEvent, ctx: &mut SessionContext<'_>) -> Outcome {
        if self.is_panning() {
            return Outcome::Ignored;
        }
        match self.mode {
            Mode::Select => self.select_press(event.position, ctx),
            Mode::DrawRectangle | Mode::AutoDetect => {
                if !ctx.bounds().contains(event.position) {
                    return Outcome::Ignored;
                }
                self.rect_draft = Some((event.position, event.position));
                Outcome::DraftUpdated
            }
            Mode::DrawPolygon => self.polygon_press(event, ctx),
        }
    }

    pub fn drag_to(&mut self, event: PointerEvent, ctx: &mut SessionContext<'_>) -> Outcome {
        if self.is_panning() {
            return Outcome::Ignored;
        }
        let bounds = ctx.bounds();
        match self.mode {
            Mode::Select => self.select_drag(event.position, ctx),
            Mode::DrawRectangle | Mode::AutoDetect => match self.rect_draft.as_mut() {
                Some((_, current)) => {
                    *current = event.position.clamp_to(bounds);
                    Outcome::DraftUpdated
                }
                None => Outcome::Ignored,
            },
            Mode::DrawPolygon if !self.polygon.is_empty() => {
                self.cursor = Some(event.position.clamp_to(bounds));
                Outcome::DraftUpdated
            }
            Mode::DrawPolygon => Outcome::Ignored,
        }
    }

    pub fn release(&mut self, event: PointerEvent, ctx: &mut SessionContext<'_>) -> Outcome {
        if self.is_panning() {
            return Outcome::Ignored;
        }
        match self.mode {
            Mode::Select => match self.drag.take() {
                Some(_) => Outcome::Edited,
                None => Outcome::Ignored,
            },
            Mode::DrawRectangle | Mode::AutoDetect => {
                let Some((anchor, _)) = self.rect_draft.take() else {
                    return Outcome::Ignored;
                };
                let rect = normalize_rect(anchor, event.position.clamp_to(ctx.bounds()));
                if rect.width() < self.config.min_box_size || rect.height() < self.config.min_box_size {
                    debug!(width = rect.width(), height = rect.height(), "discarding small rectangle");
                    return Outcome::Discarded;
                }
                if self.mode == Mode::AutoDetect {
                    self.submit_detection(rect, ctx)
                } else {
                    self.commit_rectangle(rect, ctx)
                }
            }
            Mode::DrawPolygon => Outcome::Ignored,
        }
    }

    fn select_press(&mut self, point: Point, ctx: &mut SessionContext<'_>) -> Outcome {
        if let Some(drag) = self.handle_at(point, ctx) {
            self.drag = Some(drag);
            return Outcome::DraftUpdated;
        }
        match ctx.labels.hit_test(point) {
            Some(index) => {
                ctx.labels.select_only(Some(index));
                self.drag = Some(Drag::Move { index, last: point });
                let name = ctx.labels.get(index).map(|l| l.label_name().to_string());
                Outcome::SelectionChanged(name)
            }
            None => {
                ctx.labels.select_only(None);
                self.drag = None;
                Outcome::SelectionChanged(None)
            }
        }
    }

    /// Resize or vertex handle of a selected label under `point`.
    fn handle_at(&self, point: Point, ctx: &SessionContext<'_>) -> Option<Drag> {
        let radius = self.handle_size(ctx.bounds());
        let near = |corner: Point| (corner.x - point.x).abs() <= radius && (corner.y - point.y).abs() <= radius;
        for (index, label) in ctx.labels.iter().enumerate().rev() {
            if !label.is_selected() {
                continue;
            }
            match label {
                Label::Rectangle(r) => {
                    let rect = r.rect();
                    if let Some(handle) = ResizeHandle::ALL.into_iter().find(|h| near(h.corner(&rect))) {
                        return Some(Drag::Resize {
                            index,
                            handle,
                            last: point,
                        });
                    }
                }
                Label::Polygon(p) => {
                    if let Some(vertex) = p.points().iter().position(|&v| near(v)) {
                        return Some(Drag::Vertex { index, vertex });
                    }
                }
            }
        }
        None
    }

    fn select_drag(&mut self, point: Point, ctx: &mut SessionContext<'_>) -> Outcome {
        let bounds = ctx.bounds();
        let Some(drag) = self.drag.as_mut() else {
            return Outcome::Ignored;
        };
        match drag {
            Drag::Move { index, last } => {
                if let Some(label) = ctx.labels.get_mut(*index) {
                    label.move_by(point - *last, bounds);
                }
                *last = point;
            }
            Drag::Resize { index, handle, last } => {
                if let Some(Label::Rectangle(r)) = ctx.labels.get_mut(*index) {
                    *handle = r.resize(*handle, point - *last, bounds);
                }
                *last = point;
            }
            Drag::Vertex { index, vertex } => {
                if let Some(Label::Polygon(p)) = ctx.labels.get_mut(*index) {
                    p.edit_vertex(*vertex, point, bounds);
                }
            }
        }
        Outcome::Edited
    }

    fn polygon_press(&mut self, event: PointerEvent, ctx: &mut SessionContext<'_>) -> Outcome {
        let double_click = self.register_press(event.timestamp);
        let point = event.position.clamp_to(ctx.bounds());
        let threshold = self.config.vertex_merge_threshold;

        let repeated = self
            .polygon
            .last()
            .is_some_and(|&last| geometry::points_close(last, point, threshold));
        if !repeated {
            self.polygon.push(point);
        }
        self.cursor = None;

        if !double_click || self.polygon.len() < MIN_POLYGON_POINTS {
            return Outcome::DraftUpdated;
        }

        let vertices = coalesce_points(&std::mem::take(&mut self.polygon), threshold);
        if vertices.len() < MIN_POLYGON_POINTS {
            self.polygon = vertices;
            return Outcome::DraftUpdated;
        }
        let Some((base, class_id)) = self.resolve_class(ctx) else {
            info!("class name prompt declined, dropping polygon");
            return Outcome::Cancelled;
        };
        let name = ctx.labels.generate_label_name(&base);
        info!(%name, vertices = vertices.len(), "polygon committed");
        ctx.labels.add(PolygonLabel::new(vertices, name.clone(), class_id));
        Outcome::Committed(name)
    }

    /// True when this press completes a double-click. The timer restarts after
    /// a detected double-click so a third press opens a new pair.
    fn register_press(&mut self, timestamp: Duration) -> bool {
        let window = self.config.double_click_window();
        let double_click = matches!(self.last_press, Some(prev) if timestamp.saturating_sub(prev) <= window);
        self.last_press = if double_click { None } else { Some(timestamp) };
        double_click
    }

    fn commit_rectangle(&mut self, rect: Rect, ctx: &mut SessionContext<'_>) -> Outcome {
        let Some((base, class_id)) = self.resolve_class(ctx) else {
            info!("class name prompt declined, dropping rectangle");
            return Outcome::Cancelled;
        };
        let name = ctx.labels.generate_label_name(&base);
        info!(%name, width = rect.width(), height = rect.height(), "rectangle committed");
        ctx.labels
            .add(RectangleLabel::new(rect.top_left, rect.bottom_right, name.clone(), class_id));
        Outcome::Committed(name)
    }

    fn submit_detection(&mut self, rect: Rect, ctx: &mut SessionContext<'_>) -> Outcome {
        let Some((base, class_id)) = self.resolve_class(ctx) else {
            return Outcome::Cancelled;
        };
        let (img_w, img_h) = ctx.image.dimensions();
        let x = (rect.x().floor().max(0.0) as u32).min(img_w);
        let y = (rect.y().floor().max(0.0) as u32).min(img_h);
        let right = (rect.bottom_right.x.ceil() as u32).min(img_w);
        let bottom = (rect.bottom_right.y.ceil() as u32).min(img_h);
        let crop = image::imageops::crop_imm(ctx.image, x, y, right - x, bottom - y).to_image();

        let task = DetectionTask::new(
            crop,
            ctx.image_id,
            Point::new(x as f64, y as f64),
            base,
            class_id,
            self.confidence_threshold,
        );
        let id = task.id;
        info!(task = %id, x, y, width = right - x, height = bottom - y, "detection task submitted");
        ctx.tasks.submit(task);
        Outcome::DetectionSubmitted(id)
    }

    /// Base name and id of the class new labels get. With no classes at all
    /// the prompt is asked for one, which becomes class 0.
    fn resolve_class(&mut self, ctx: &mut SessionContext<'_>) -> Option<(String, usize)> {
        if ctx.class_names.is_empty() {
            let name = ctx.prompt.request_class_name()?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            ctx.class_names.push(name.to_string());
            self.active_class = 0;
        }
        let class_id = if self.active_class < ctx.class_names.len() {
            self.active_class
        } else {
            0
        };
        Some((ctx.class_names[class_id].clone(), class_id))
    }
}
