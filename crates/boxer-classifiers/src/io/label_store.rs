//! Labels kept apart from the examples, joined on the point name.
//!
//! Format: `name<TAB>discrimination<TAB>class`, one label per line. An empty
//! discrimination column selects the suite's single explicit
//! discrimination.
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::data_point::DataPoint;
use crate::session::RawLabel;
use crate::suite::Suite;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelStore {
    labels: HashMap<String, Vec<RawLabel>>,
}

impl LabelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, label: RawLabel) {
        self.labels.entry(name.to_string()).or_default().push(label);
    }

    pub fn labels_for(&self, name: &str) -> &[RawLabel] {
        self.labels.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn read<R: Read>(input: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(false)
            .comment(Some(b'#'))
            .from_reader(input);
        let mut store = LabelStore::new();
        for result in reader.records() {
            let record = result.context("Failed to read label row")?;
            let line = record.position().map_or(0, |p| p.line());
            let name = record
                .get(0)
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| anyhow!("Missing point name at line {}", line))?;
            let discr = record.get(1).map(str::trim).filter(|d| !d.is_empty());
            let class = record
                .get(2)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| anyhow!("Missing class at line {}", line))?;
            store.insert(name, RawLabel::new(discr, class));
        }
        Ok(store)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open label file: {}", path.as_ref().display()))?;
        Self::read(file).with_context(|| format!("While reading {}", path.as_ref().display()))
    }

    /// Attach the stored labels of `point`, replacing labels it already has
    /// for the same discriminations.
    ///
    /// Returns how many labels were applied. A label on the fallback
    /// discrimination is rejected.
    pub fn apply(&self, point: &mut DataPoint, suite: &mut Suite, definitional: bool) -> Result<usize> {
        let mut classes = Vec::new();
        for label in self.labels_for(point.name()) {
            let cref = suite
                .get_cla_always(label.discrimination.as_deref(), &label.class, definitional)
                .with_context(|| format!("Label '{}' for point '{}'", label, point.name()))?;
            classes.extend(cref);
        }
        point.set_classes(&classes, suite)?;
        Ok(classes.len())
    }
}

/// Write the explicit labels of `points` in label-store format.
pub fn write_labels<W: Write>(output: W, points: &[DataPoint], suite: &Suite) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(output);
    for point in points {
        for cref in point.classes() {
            let discr = suite.discrimination(cref.discr)?;
            let class = discr.class_at(cref.pos)?;
            writer.write_record([point.name(), discr.name(), class.name()])?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassifierError;

    #[test]
    fn joins_labels_by_name() {
        let store = LabelStore::read("d1\ttopic\tA\nd1\tregion\teast\nd2\t\tB\n".as_bytes()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.labels_for("d1").len(), 2);
        assert_eq!(store.labels_for("missing").len(), 0);
        assert_eq!(store.labels_for("d2")[0], RawLabel::new(None, "B"));

        let mut suite = Suite::new("s");
        let mut p = DataPoint::new("d1", vec![(0, 1.0)]).unwrap();
        assert_eq!(store.apply(&mut p, &mut suite, true).unwrap(), 2);
        assert_eq!(suite.discrimination_count(), 2);
    }

    #[test]
    fn fallback_labels_are_rejected() {
        let store = LabelStore::read("d1\tother\tnone\n".as_bytes()).unwrap();
        let mut suite = Suite::new("s");
        suite.add_fallback_discrimination("other", "none").unwrap();
        let mut p = DataPoint::new("d1", vec![]).unwrap();
        let err = store.apply(&mut p, &mut suite, true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClassifierError>(),
            Some(ClassifierError::SchemaViolation(_))
        ));
    }
}
