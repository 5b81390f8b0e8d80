//! Sparse labelled examples.
//!
//! A `DataPoint` is an ordered list of `(feature id, value)` pairs drawn from
//! one suite's dictionary, plus at most one explicit class per
//! discrimination. Defaults are not stored on the point: "no explicit label"
//! is resolved to the discrimination's default class at training and scoring
//! time.
use std::collections::HashSet;
use std::fmt::Write;

use crate::error::{ClassifierError, Result};
use crate::suite::{ClassRef, DiscrId, Discrimination, Suite};

#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    name: String,
    features: Vec<(usize, f64)>,
    classes: Vec<ClassRef>,
}

impl DataPoint {
    /// Build a point from unordered features.
    ///
    /// Features are sorted by id, zero values are dropped and a repeated
    /// feature id is rejected.
    pub fn new(name: impl Into<String>, mut features: Vec<(usize, f64)>) -> Result<Self> {
        let name = name.into();
        features.retain(|&(_, v)| v != 0.0);
        features.sort_by_key(|&(id, _)| id);
        if let Some(w) = features.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(ClassifierError::schema(format!(
                "feature id {} appears more than once in data point '{}'",
                w[0].0, name
            )));
        }
        Ok(DataPoint {
            name,
            features,
            classes: Vec::new(),
        })
    }

    /// Point with no features and no labels.
    pub fn empty(name: impl Into<String>) -> Self {
        DataPoint {
            name: name.into(),
            features: Vec::new(),
            classes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &[(usize, f64)] {
        &self.features
    }

    /// Number of non-zero features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn max_feature_id(&self) -> Option<usize> {
        self.features.last().map(|&(id, _)| id)
    }

    pub fn value_of(&self, id: usize) -> f64 {
        self.features
            .binary_search_by_key(&id, |&(fid, _)| fid)
            .map(|i| self.features[i].1)
            .unwrap_or(0.0)
    }

    pub fn norm2(&self) -> f64 {
        self.features.iter().map(|&(_, v)| v * v).sum::<f64>().sqrt()
    }

    /// Inner product with another point from the same dictionary.
    pub fn dot(&self, other: &DataPoint) -> f64 {
        let (mut i, mut j, mut acc) = (0, 0, 0.0);
        while i < self.features.len() && j < other.features.len() {
            let (a, b) = (self.features[i], other.features[j]);
            match a.0.cmp(&b.0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += a.1 * b.1;
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

    /// Vector sum. The result keeps this point's name and carries no labels.
    pub fn sum(&self, other: &DataPoint) -> DataPoint {
        let mut features = Vec::with_capacity(self.features.len() + other.features.len());
        let (mut i, mut j) = (0, 0);
        while i < self.features.len() || j < other.features.len() {
            let a = self.features.get(i).copied();
            let b = other.features.get(j).copied();
            let next = match (a, b) {
                (Some(a), Some(b)) if a.0 == b.0 => {
                    i += 1;
                    j += 1;
                    (a.0, a.1 + b.1)
                }
                (Some(a), Some(b)) if a.0 < b.0 => {
                    i += 1;
                    a
                }
                (Some(_), Some(b)) => {
                    j += 1;
                    b
                }
                (Some(a), None) => {
                    i += 1;
                    a
                }
                (None, Some(b)) => {
                    j += 1;
                    b
                }
                (None, None) => break,
            };
            if next.1 != 0.0 {
                features.push(next);
            }
        }
        DataPoint {
            name: self.name.clone(),
            features,
            classes: Vec::new(),
        }
    }

    /// Scalar multiple. Labels are kept.
    pub fn scale(&self, factor: f64) -> DataPoint {
        let mut scaled = self.clone();
        scaled.scale_in_place(factor);
        scaled
    }

    pub(crate) fn scale_in_place(&mut self, factor: f64) {
        for f in self.features.iter_mut() {
            f.1 *= factor;
        }
        self.features.retain(|&(_, v)| v != 0.0);
    }

    /// `features` must already be sorted, unique and free of zeros.
    pub(crate) fn replace_features(&mut self, features: Vec<(usize, f64)>) {
        debug_assert!(features.windows(2).all(|w| w[0].0 < w[1].0));
        self.features = features;
    }

    pub(crate) fn map_values<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, f64) -> f64,
    {
        for feat in self.features.iter_mut() {
            feat.1 = f(feat.0, feat.1);
        }
        self.features.retain(|&(_, v)| v != 0.0);
    }

    pub fn classes(&self) -> &[ClassRef] {
        &self.classes
    }

    /// Explicit class position for `discr`, if any.
    pub fn class_for(&self, discr: DiscrId) -> Option<usize> {
        self.classes.iter().find(|c| c.discr == discr).map(|c| c.pos)
    }

    /// Explicit label if present, otherwise the discrimination's default.
    pub fn true_class(&self, discr: &Discrimination) -> Option<usize> {
        self.class_for(discr.id())
            .or_else(|| discr.default_class().map(|c| c.pos()))
    }

    /// Assign explicit labels, replacing any earlier label for the same
    /// discrimination.
    ///
    /// Every class must belong to a discrimination of `suite`; two labels for
    /// one discrimination in a single call, or any label on the fallback
    /// discrimination, is a schema violation.
    pub fn set_classes(&mut self, classes: &[ClassRef], suite: &Suite) -> Result<()> {
        let mut seen = HashSet::new();
        for cref in classes {
            let discr = suite.discrimination(cref.discr)?;
            discr.class_at(cref.pos)?;
            if discr.is_fallback() {
                return Err(ClassifierError::schema(format!(
                    "data point '{}' carries an explicit label on fallback discrimination '{}'",
                    self.name,
                    discr.name()
                )));
            }
            if !seen.insert(cref.discr) {
                return Err(ClassifierError::schema(format!(
                    "data point '{}' has more than one label for discrimination '{}'",
                    self.name,
                    discr.name()
                )));
            }
        }
        for cref in classes {
            self.classes.retain(|c| c.discr != cref.discr);
            self.classes.push(*cref);
        }
        Ok(())
    }

    pub fn add_class(&mut self, cref: ClassRef, suite: &Suite) -> Result<()> {
        self.set_classes(&[cref], suite)
    }

    /// Drop all explicit labels.
    pub fn clear_classes(&mut self) {
        self.classes.clear();
    }

    /// Human readable `name feature:value ... | discr:class ...` line.
    pub fn describe(&self, suite: &Suite) -> String {
        let mut out = self.name.clone();
        let dict = suite.dictionary();
        for &(id, v) in &self.features {
            let label = dict.get_label(id).unwrap_or("?");
            let _ = write!(out, " {}:{}", label, v);
        }
        out.push_str(" |");
        for cref in &self.classes {
            if let Ok(discr) = suite.discrimination(cref.discr) {
                let class = discr.class_at(cref.pos).map(|c| c.name()).unwrap_or("?");
                let _ = write!(out, " {}:{}", discr.name(), class);
            }
        }
        out
    }
}
