mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from annoimg for tests
pub use annoimg::core::{
    ClassNamePrompt, DatasetType, Label, LabelCollection, Mode, Outcome, PointerEvent, PolygonLabel, Project,
    RectangleLabel, Session, SessionContext,
};
pub use annoimg::detection::DetectionTask;
pub use annoimg::geometry::Point;
