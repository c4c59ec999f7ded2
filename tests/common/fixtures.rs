use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use annoimg::core::{ClassNamePrompt, LabelCollection, Outcome, PointerEvent, Session, SessionContext};
use annoimg::detection::DetectionTask;
use image::{ImageBuffer, Rgb, RgbImage};

/// Writes a solid red PNG of the given size as `dir/name`.
pub fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img = ImageBuffer::from_fn(width, height, |_, _| Rgb([255u8, 0u8, 0u8]));
    let path = dir.join(name);
    img.save_with_format(&path, image::ImageFormat::Png)
        .expect("Failed to save test image");
    path
}

pub fn class_list(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Everything a session event needs, owned in one place.
pub struct Canvas {
    pub image: RgbImage,
    pub classes: Vec<String>,
    pub labels: LabelCollection,
    pub prompt: Box<dyn ClassNamePrompt>,
    pub tasks: Sender<DetectionTask>,
    pub submitted: Receiver<DetectionTask>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, classes: &[&str]) -> Self {
        let (tasks, submitted) = mpsc::channel();
        Self {
            image: RgbImage::new(width, height),
            classes: class_list(classes),
            labels: LabelCollection::new(),
            prompt: Box::new(|| None::<String>),
            tasks,
            submitted,
        }
    }

    /// Answer every class-name request with `answer`.
    pub fn with_prompt_answer(mut self, answer: Option<&str>) -> Self {
        let answer = answer.map(str::to_string);
        self.prompt = Box::new(move || answer.clone());
        self
    }

    pub fn ctx(&mut self) -> SessionContext<'_> {
        SessionContext {
            image_id: 0,
            image: &self.image,
            class_names: &mut self.classes,
            labels: &mut self.labels,
            prompt: self.prompt.as_mut(),
            tasks: &self.tasks,
        }
    }
}

pub fn at(x: f64, y: f64, ms: u64) -> PointerEvent {
    PointerEvent::new(x, y, Duration::from_millis(ms))
}

/// Press at `from`, move to `to`, release at `to`; returns the release outcome.
pub fn drag(session: &mut Session, canvas: &mut Canvas, from: (f64, f64), to: (f64, f64), ms: u64) -> Outcome {
    session.press(at(from.0, from.1, ms), &mut canvas.ctx());
    session.drag_to(at(to.0, to.1, ms + 10), &mut canvas.ctx());
    session.release(at(to.0, to.1, ms + 20), &mut canvas.ctx())
}

/// A single press, as used for polygon vertices.
pub fn press(session: &mut Session, canvas: &mut Canvas, x: f64, y: f64, ms: u64) -> Outcome {
    session.press(at(x, y, ms), &mut canvas.ctx())
}
