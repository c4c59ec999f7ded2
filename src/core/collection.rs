use std::collections::HashSet;

use tracing::debug;

use crate::{
    core::label::{Label, MIN_POLYGON_POINTS, PolygonLabel},
    detection::DetectionCompletion,
    geometry::Point,
};

/// `"<base> <i>"` for the smallest `i >= 0` that no name in `existing` uses.
pub fn generate_label_name<'a, I>(base: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<&str> = existing.into_iter().collect();
    (0usize..)
        .map(|i| format!("{base} {i}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}

/// Split `"Cat 3"` into `("Cat", Some("3"))`; names without a space have no suffix.
fn split_suffix(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once(' ') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (name, None),
    }
}

/// The labels of one image, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelCollection {
    labels: Vec<Label>,
}

impl LabelCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.labels.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Label> {
        self.labels.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Label> {
        self.labels.get_mut(index)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(Label::label_name)
    }

    pub fn generate_label_name(&self, base: &str) -> String {
        generate_label_name(base, self.names())
    }

    /// Append a label whose name was already made unique with
    /// [`LabelCollection::generate_label_name`].
    pub fn add(&mut self, label: impl Into<Label>) {
        self.labels.push(label.into());
    }

    /// Remove every label whose name is in `names`; unknown names are ignored.
    pub fn remove(&mut self, names: &HashSet<String>) -> usize {
        let before = self.labels.len();
        self.labels.retain(|l| !names.contains(l.label_name()));
        before - self.labels.len()
    }

    pub fn remove_selected(&mut self) -> usize {
        let before = self.labels.len();
        self.labels.retain(|l| !l.is_selected());
        before - self.labels.len()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Label> {
        self.labels.iter().find(|l| l.label_name() == name)
    }

    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.labels.iter().position(|l| l.label_name() == name)
    }

    /// Select exactly the labels named in `names`, deselecting the rest.
    pub fn select(&mut self, names: &HashSet<String>) {
        for label in &mut self.labels {
            let selected = names.contains(label.label_name());
            label.set_selected(selected);
        }
    }

    pub fn select_only(&mut self, index: Option<usize>) {
        for (i, label) in self.labels.iter_mut().enumerate() {
            label.set_selected(Some(i) == index);
        }
    }

    pub fn selected(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter().filter(|l| l.is_selected())
    }

    /// Topmost label under `point`; later labels are drawn above earlier ones.
    pub fn hit_test(&self, point: Point) -> Option<usize> {
        self.labels.iter().rposition(|l| l.contains(point))
    }

    /// Rename every label of class `old_name`, keeping its numeric suffix.
    pub fn rename_class(&mut self, old_name: &str, new_name: &str) -> usize {
        let mut renamed = 0;
        for label in &mut self.labels {
            let (base, suffix) = split_suffix(label.label_name());
            if base != old_name {
                continue;
            }
            let name = match suffix {
                Some(suffix) => format!("{new_name} {suffix}"),
                None => new_name.to_string(),
            };
            label.set_label_name(name);
            renamed += 1;
        }
        renamed
    }

    /// Rewrite each label's base token from the class list by id, keeping the
    /// suffix. Labels whose id has no class are left untouched.
    pub fn sync_names(&mut self, class_names: &[String]) {
        for label in &mut self.labels {
            let Some(class_name) = class_names.get(label.label_name_id()) else {
                continue;
            };
            let (_, suffix) = split_suffix(label.label_name());
            let name = match suffix {
                Some(suffix) => format!("{class_name} {suffix}"),
                None => class_name.clone(),
            };
            label.set_label_name(name);
        }
    }

    /// Turn each contour of a finished detection into a named polygon label.
    /// Contours with fewer than three points are skipped.
    pub fn add_detected(&mut self, completion: &DetectionCompletion) -> usize {
        let task = &completion.task;
        let mut added = 0;
        for contour in &completion.contours {
            if contour.points.len() < MIN_POLYGON_POINTS {
                continue;
            }
            let name = self.generate_label_name(&task.label_name);
            debug!(%name, confidence = contour.confidence, "adding detected polygon");
            self.add(PolygonLabel::new(contour.points.clone(), name, task.label_name_id));
            added += 1;
        }
        added
    }

    pub fn to_records(&self) -> Vec<serde_json::Value> {
        self.labels.iter().map(Label::to_record).collect()
    }
}

impl<'a> IntoIterator for &'a LabelCollection {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

impl FromIterator<Label> for LabelCollection {
    fn from_iter<T: IntoIterator<Item = Label>>(iter: T) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}
