pub mod collection;
pub mod label;
pub mod project;
pub mod session;

pub use collection::{LabelCollection, generate_label_name};
pub use label::{Label, LabelRecord, PolygonLabel, RectangleLabel, ResizeHandle};
pub use project::{DatasetType, ExportOptions, ExportSummary, LabelImage, LoadReport, Project};
pub use session::{ClassNamePrompt, Mode, Outcome, PointerEvent, Preview, Session, SessionContext, TaskSink};
