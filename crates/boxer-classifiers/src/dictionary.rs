//! Bidirectional feature-name / dense-id mapping.
//!
//! Ids are handed out in first-seen order and never change. Coefficient-block
//! rows are indexed by these ids, so a reloaded dictionary must reproduce the
//! original assignment order exactly.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};

/// Name of the reserved bias feature.
pub const DUMMY_FEATURE: &str = "@dummy";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DictionaryDocument", into = "DictionaryDocument")]
pub struct FeatureDictionary {
    labels: Vec<String>,
    ids: HashMap<String, usize>,
    has_dummy: bool,
}

/// Serialized form: just the ordered labels.
#[derive(Serialize, Deserialize)]
struct DictionaryDocument {
    has_dummy: bool,
    labels: Vec<String>,
}

impl FeatureDictionary {
    /// Empty dictionary; user features start at id 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dictionary with the bias feature reserved at id 0.
    pub fn with_dummy() -> Self {
        let mut dict = Self::new();
        dict.has_dummy = true;
        dict.labels.push(DUMMY_FEATURE.to_string());
        dict.ids.insert(DUMMY_FEATURE.to_string(), 0);
        dict
    }

    /// Rebuild a dictionary from labels listed in id order.
    pub fn from_labels<I, S>(labels: I, has_dummy: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dict = Self::new();
        for label in labels {
            let label = label.into();
            if dict.ids.contains_key(&label) {
                return Err(ClassifierError::schema(format!(
                    "duplicate feature name '{}' in dictionary",
                    label
                )));
            }
            dict.ids.insert(label.clone(), dict.labels.len());
            dict.labels.push(label);
        }
        if has_dummy && dict.labels.first().map(String::as_str) != Some(DUMMY_FEATURE) {
            return Err(ClassifierError::schema(format!(
                "dictionary with a bias feature must list '{}' first",
                DUMMY_FEATURE
            )));
        }
        dict.has_dummy = has_dummy;
        Ok(dict)
    }

    /// Id for `name`, allocating the next id if the name is new.
    pub fn get_id_always(&mut self, name: &str) -> usize {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.labels.len();
        self.labels.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        log::trace!("Allocated feature id {} for '{}'", id, name);
        id
    }

    pub fn get_id(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn get_label(&self, id: usize) -> Result<&str> {
        self.labels
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| ClassifierError::not_found("feature id", id))
    }

    /// Number of allocated ids, bias feature included.
    pub fn dimension(&self) -> usize {
        self.labels.len()
    }

    pub fn dummy_id(&self) -> Option<usize> {
        if self.has_dummy {
            Some(0)
        } else {
            None
        }
    }

    /// First id available to user features.
    pub fn base(&self) -> usize {
        usize::from(self.has_dummy)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl TryFrom<DictionaryDocument> for FeatureDictionary {
    type Error = ClassifierError;

    fn try_from(doc: DictionaryDocument) -> Result<Self> {
        FeatureDictionary::from_labels(doc.labels, doc.has_dummy)
    }
}

impl From<FeatureDictionary> for DictionaryDocument {
    fn from(dict: FeatureDictionary) -> Self {
        DictionaryDocument {
            has_dummy: dict.has_dummy,
            labels: dict.labels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_and_increasing() {
        let mut dict = FeatureDictionary::new();
        let a = dict.get_id_always("apple");
        let b = dict.get_id_always("banana");
        assert_eq!((a, b), (0, 1));
        assert_eq!(dict.get_id_always("apple"), 0);
        assert_eq!(dict.dimension(), 2);
        assert_eq!(dict.get_label(1).unwrap(), "banana");
    }

    #[test]
    fn dummy_reserves_first_id() {
        let mut dict = FeatureDictionary::with_dummy();
        assert_eq!(dict.dummy_id(), Some(0));
        assert_eq!(dict.base(), 1);
        assert_eq!(dict.get_id_always("word"), 1);
        assert_eq!(dict.dimension(), 2);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let dict = FeatureDictionary::new();
        assert!(matches!(
            dict.get_label(3),
            Err(ClassifierError::NotFound { .. })
        ));
    }

    #[test]
    fn from_labels_keeps_order_and_rejects_duplicates() {
        let dict = FeatureDictionary::from_labels(vec!["z", "a", "m"], false).unwrap();
        assert_eq!(dict.get_id("z"), Some(0));
        assert_eq!(dict.get_id("m"), Some(2));
        assert!(FeatureDictionary::from_labels(vec!["a", "a"], false).is_err());
        assert!(FeatureDictionary::from_labels(vec!["a"], true).is_err());
    }

    #[test]
    fn serde_round_trip_preserves_ids() {
        let mut dict = FeatureDictionary::with_dummy();
        for name in ["the", "cat", "sat"] {
            dict.get_id_always(name);
        }
        let json = serde_json::to_string(&dict).unwrap();
        let back: FeatureDictionary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dict);
        assert_eq!(back.get_id("sat"), Some(3));
    }
}
