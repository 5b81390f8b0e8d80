//! Label schema: a `Suite` of independent discriminations.
//!
//! Each `Discrimination` is a partition of the label space with an ordered,
//! append-only list of classes, an optional default class and a class-set
//! policy that decides whether unseen class names may be created in the
//! current context. A suite also owns the shared `FeatureDictionary`.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dictionary::FeatureDictionary;
use crate::error::{ClassifierError, Result};

/// Stable discrimination identifier. Never reused within a suite, unaffected
/// by deletion of other discriminations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscrId(pub u32);

impl fmt::Display for DiscrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A class, addressed by its discrimination and its dense position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassRef {
    pub discr: DiscrId,
    pub pos: usize,
}

/// Who is asking for a class to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationContext {
    /// Direct programmatic call.
    Api,
    /// Parsing definitional (training) data.
    Training,
    /// Parsing non-definitional (test) data.
    Testing,
}

impl CreationContext {
    pub fn from_definitional(is_definitional: bool) -> Self {
        if is_definitional {
            CreationContext::Training
        } else {
            CreationContext::Testing
        }
    }
}

impl fmt::Display for CreationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CreationContext::Api => "api",
            CreationContext::Training => "training",
            CreationContext::Testing => "testing",
        };
        write!(f, "{}", s)
    }
}

/// Class-set policy fixed when a discrimination is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassPolicy {
    /// No new classes, ever.
    Fixed,
    /// New classes accepted in every context.
    Dynamic,
    /// New classes from API calls and training data; test data may not add any.
    TrainOnly,
    /// Like `TrainOnly`, but unseen test classes are skipped instead of rejected.
    TrainOnlySkipTest,
}

impl FromStr for ClassPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(ClassPolicy::Fixed),
            "dynamic" => Ok(ClassPolicy::Dynamic),
            "train" | "train_only" => Ok(ClassPolicy::TrainOnly),
            "skip" | "train_only_skip_test" => Ok(ClassPolicy::TrainOnlySkipTest),
            _ => Err(format!("Unknown class policy: {}", s)),
        }
    }
}

/// Whether labels may introduce discriminations the suite has not seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewDiscrPolicy {
    Fixed,
    #[default]
    TrainOnly,
    Dynamic,
}

enum Decision {
    Allow,
    Reject,
    Skip,
}

/// One label value within a discrimination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cla {
    name: String,
    pos: usize,
}

impl Cla {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pos(&self) -> usize {
        self.pos
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Discrimination {
    id: DiscrId,
    name: String,
    classes: Vec<Cla>,
    class_index: HashMap<String, usize>,
    default_class: Option<usize>,
    fallback: bool,
    policy: Option<ClassPolicy>,
    max_classes: Option<usize>,
}

impl Discrimination {
    fn new(id: DiscrId, name: &str) -> Self {
        Discrimination {
            id,
            name: name.to_string(),
            classes: Vec::new(),
            class_index: HashMap::new(),
            default_class: None,
            fallback: false,
            policy: None,
            max_classes: None,
        }
    }

    pub fn id(&self) -> DiscrId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classes(&self) -> &[Cla] {
        &self.classes
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn class_at(&self, pos: usize) -> Result<&Cla> {
        self.classes.get(pos).ok_or_else(|| {
            ClassifierError::not_found("class position", format!("{}[{}]", self.name, pos))
        })
    }

    pub fn class_by_name(&self, name: &str) -> Option<&Cla> {
        self.class_index.get(name).map(|&pos| &self.classes[pos])
    }

    pub fn class_ref(&self, pos: usize) -> ClassRef {
        ClassRef { discr: self.id, pos }
    }

    pub fn default_class(&self) -> Option<&Cla> {
        self.default_class.map(|pos| &self.classes[pos])
    }

    /// Designate an existing class as the default.
    pub fn set_default_class(&mut self, name: &str) -> Result<()> {
        let pos = self
            .class_index
            .get(name)
            .copied()
            .ok_or_else(|| ClassifierError::not_found("class", format!("{}:{}", self.name, name)))?;
        self.default_class = Some(pos);
        Ok(())
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn is_committed(&self) -> bool {
        self.policy.is_some()
    }

    pub fn policy(&self) -> Option<ClassPolicy> {
        self.policy
    }

    pub fn max_classes(&self) -> Option<usize> {
        self.max_classes
    }

    pub fn set_max_classes(&mut self, limit: Option<usize>) -> Result<()> {
        if let Some(limit) = limit {
            if limit < self.classes.len() {
                return Err(ClassifierError::config(format!(
                    "discrimination '{}' already has {} classes, limit {} is too small",
                    self.name,
                    self.classes.len(),
                    limit
                )));
            }
        }
        self.max_classes = limit;
        Ok(())
    }

    /// One-way transition to the committed state.
    pub fn commit(&mut self, policy: ClassPolicy) -> Result<()> {
        if let Some(existing) = self.policy {
            return Err(ClassifierError::config(format!(
                "discrimination '{}' is already committed ({:?})",
                self.name, existing
            )));
        }
        log::debug!("Committing discrimination '{}' as {:?}", self.name, policy);
        self.policy = Some(policy);
        Ok(())
    }

    fn decide(&self, context: CreationContext) -> Decision {
        match (self.policy, context) {
            (None, CreationContext::Testing) => Decision::Reject,
            (None, _) => Decision::Allow,
            (Some(ClassPolicy::Fixed), _) => Decision::Reject,
            (Some(ClassPolicy::Dynamic), _) => Decision::Allow,
            (Some(ClassPolicy::TrainOnly), CreationContext::Testing) => Decision::Reject,
            (Some(ClassPolicy::TrainOnly), _) => Decision::Allow,
            (Some(ClassPolicy::TrainOnlySkipTest), CreationContext::Testing) => Decision::Skip,
            (Some(ClassPolicy::TrainOnlySkipTest), _) => Decision::Allow,
        }
    }

    /// Look up `name`, creating it at the next position when permitted.
    ///
    /// Returns `Ok(None)` only when the committed policy says to skip unseen
    /// classes silently in this context.
    pub fn add_class(
        &mut self,
        name: &str,
        allow_create: bool,
        context: CreationContext,
    ) -> Result<Option<ClassRef>> {
        if let Some(&pos) = self.class_index.get(name) {
            return Ok(Some(self.class_ref(pos)));
        }

        let decision = if allow_create {
            self.decide(context)
        } else {
            match self.decide(context) {
                Decision::Skip => Decision::Skip,
                _ => Decision::Reject,
            }
        };

        match decision {
            Decision::Skip => {
                log::trace!(
                    "Skipping unseen class '{}' in discrimination '{}'",
                    name,
                    self.name
                );
                Ok(None)
            }
            Decision::Reject => Err(self.violation(name, context)),
            Decision::Allow => {
                if let Some(limit) = self.max_classes {
                    if self.classes.len() >= limit {
                        return Err(self.violation(name, context));
                    }
                }
                let pos = self.classes.len();
                self.classes.push(Cla {
                    name: name.to_string(),
                    pos,
                });
                self.class_index.insert(name.to_string(), pos);
                log::debug!(
                    "Created class '{}' at position {} in discrimination '{}'",
                    name,
                    pos,
                    self.name
                );
                Ok(Some(self.class_ref(pos)))
            }
        }
    }

    fn violation(&self, class: &str, context: CreationContext) -> ClassifierError {
        ClassifierError::PolicyViolation {
            discrimination: self.name.clone(),
            class: class.to_string(),
            context,
        }
    }
}

/// Ordered set of discriminations sharing one feature dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SuiteDocument", into = "SuiteDocument")]
pub struct Suite {
    name: String,
    discriminations: Vec<Discrimination>,
    dictionary: FeatureDictionary,
    next_id: u32,
    new_discr_policy: NewDiscrPolicy,
}

impl Suite {
    pub fn new(name: &str) -> Self {
        Self::with_dictionary(name, FeatureDictionary::new())
    }

    pub fn with_dictionary(name: &str, dictionary: FeatureDictionary) -> Self {
        Suite {
            name: name.to_string(),
            discriminations: Vec::new(),
            dictionary,
            next_id: 0,
            new_discr_policy: NewDiscrPolicy::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dictionary(&self) -> &FeatureDictionary {
        &self.dictionary
    }

    pub fn dictionary_mut(&mut self) -> &mut FeatureDictionary {
        &mut self.dictionary
    }

    pub fn new_discr_policy(&self) -> NewDiscrPolicy {
        self.new_discr_policy
    }

    pub fn set_new_discr_policy(&mut self, policy: NewDiscrPolicy) {
        self.new_discr_policy = policy;
    }

    pub fn discriminations(&self) -> &[Discrimination] {
        &self.discriminations
    }

    pub fn discrimination_count(&self) -> usize {
        self.discriminations.len()
    }

    pub fn position_of_name(&self, name: &str) -> Option<usize> {
        self.discriminations.iter().position(|d| d.name == name)
    }

    pub fn position_of(&self, id: DiscrId) -> Option<usize> {
        self.discriminations.iter().position(|d| d.id == id)
    }

    pub fn get_discrimination(&self, name: &str) -> Option<&Discrimination> {
        self.discriminations.iter().find(|d| d.name == name)
    }

    pub fn get_discrimination_mut(&mut self, name: &str) -> Option<&mut Discrimination> {
        self.discriminations.iter_mut().find(|d| d.name == name)
    }

    pub fn discrimination(&self, id: DiscrId) -> Result<&Discrimination> {
        self.discriminations
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| ClassifierError::not_found("discrimination", id))
    }

    pub fn discrimination_at(&self, index: usize) -> Result<&Discrimination> {
        self.discriminations
            .get(index)
            .ok_or_else(|| ClassifierError::not_found("discrimination index", index))
    }

    pub fn fallback(&self) -> Option<&Discrimination> {
        self.discriminations.iter().find(|d| d.fallback)
    }

    /// Append a new, empty, uncommitted discrimination.
    pub fn add_discrimination(&mut self, name: &str) -> Result<&mut Discrimination> {
        if name.is_empty() {
            return Err(ClassifierError::schema("discrimination name may not be empty"));
        }
        if self.position_of_name(name).is_some() {
            return Err(ClassifierError::schema(format!(
                "discrimination '{}' already exists in suite '{}'",
                name, self.name
            )));
        }
        let id = DiscrId(self.next_id);
        self.next_id += 1;
        log::debug!("Adding discrimination '{}' ({})", name, id);
        self.discriminations.push(Discrimination::new(id, name));
        let last = self.discriminations.len() - 1;
        Ok(&mut self.discriminations[last])
    }

    /// Add the suite's single fallback discrimination, committed `Fixed`
    /// with `default_class` as its only class.
    pub fn add_fallback_discrimination(&mut self, name: &str, default_class: &str) -> Result<DiscrId> {
        if let Some(existing) = self.fallback() {
            return Err(ClassifierError::schema(format!(
                "suite '{}' already has a fallback discrimination '{}'",
                self.name, existing.name
            )));
        }
        let discr = self.add_discrimination(name)?;
        discr.fallback = true;
        discr.add_class(default_class, true, CreationContext::Api)?;
        discr.set_default_class(default_class)?;
        discr.commit(ClassPolicy::Fixed)?;
        Ok(discr.id)
    }

    /// Resolve `class_name` in the named discrimination (see
    /// [`Discrimination::add_class`]).
    pub fn add_class(
        &mut self,
        discr_name: &str,
        class_name: &str,
        allow_create: bool,
        context: CreationContext,
    ) -> Result<Option<ClassRef>> {
        let discr = self
            .get_discrimination_mut(discr_name)
            .ok_or_else(|| ClassifierError::not_found("discrimination", discr_name))?;
        discr.add_class(class_name, allow_create, context)
    }

    /// Create (through the API) `class_name` if needed and make it the default.
    pub fn set_default_class(&mut self, discr_name: &str, class_name: &str) -> Result<ClassRef> {
        let discr = self
            .get_discrimination_mut(discr_name)
            .ok_or_else(|| ClassifierError::not_found("discrimination", discr_name))?;
        let cref = discr
            .add_class(class_name, true, CreationContext::Api)?
            .ok_or_else(|| discr.violation(class_name, CreationContext::Api))?;
        discr.set_default_class(class_name)?;
        Ok(cref)
    }

    /// Commit every uncommitted discrimination under `policy`.
    ///
    /// Returns how many were committed. Fails when there was nothing left to
    /// commit, i.e. on a repeated commit of an already-committed suite.
    pub fn commit_all_discriminations(&mut self, policy: ClassPolicy) -> Result<usize> {
        let mut committed = 0;
        for discr in self.discriminations.iter_mut().filter(|d| !d.is_committed()) {
            discr.commit(policy)?;
            committed += 1;
        }
        if committed == 0 && !self.discriminations.is_empty() {
            return Err(ClassifierError::config(format!(
                "all discriminations of suite '{}' are already committed",
                self.name
            )));
        }
        Ok(committed)
    }

    /// Resolve a label read from data.
    ///
    /// An empty or missing `discr_name` selects the sole non-fallback
    /// discrimination. Unknown discriminations are created only in
    /// definitional context and only when the suite policy allows it. New
    /// classes are created in definitional context, or in any context for
    /// `Dynamic` discriminations.
    pub fn get_cla_always(
        &mut self,
        discr_name: Option<&str>,
        class_name: &str,
        is_definitional: bool,
    ) -> Result<Option<ClassRef>> {
        let context = CreationContext::from_definitional(is_definitional);
        let index = match discr_name.filter(|n| !n.is_empty()) {
            Some(name) => match self.position_of_name(name) {
                Some(index) => index,
                None => self.create_discrimination_from_label(name, class_name, is_definitional)?,
            },
            None => self.sole_explicit_discrimination()?,
        };

        let discr = &mut self.discriminations[index];
        if discr.fallback {
            return Err(ClassifierError::schema(format!(
                "explicit label '{}' on fallback discrimination '{}'",
                class_name, discr.name
            )));
        }
        let allow_create = is_definitional || discr.policy == Some(ClassPolicy::Dynamic);
        discr.add_class(class_name, allow_create, context)
    }

    fn create_discrimination_from_label(
        &mut self,
        name: &str,
        class_name: &str,
        is_definitional: bool,
    ) -> Result<usize> {
        let allowed = match self.new_discr_policy {
            NewDiscrPolicy::Fixed => false,
            NewDiscrPolicy::TrainOnly => is_definitional,
            NewDiscrPolicy::Dynamic => true,
        };
        if !allowed {
            return Err(ClassifierError::schema(format!(
                "label '{}:{}' references unknown discrimination in {} context",
                name,
                class_name,
                CreationContext::from_definitional(is_definitional)
            )));
        }
        self.add_discrimination(name)?;
        Ok(self.discriminations.len() - 1)
    }

    fn sole_explicit_discrimination(&self) -> Result<usize> {
        let mut candidates = self
            .discriminations
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.fallback)
            .map(|(i, _)| i);
        match (candidates.next(), candidates.next()) {
            (Some(index), None) => Ok(index),
            (None, _) => Err(ClassifierError::schema(format!(
                "label without discrimination name, but suite '{}' has no discrimination to receive it",
                self.name
            ))),
            (Some(_), Some(_)) => Err(ClassifierError::schema(format!(
                "label without discrimination name is ambiguous: suite '{}' has several discriminations",
                self.name
            ))),
        }
    }

    pub fn class_name(&self, cref: ClassRef) -> Result<&str> {
        Ok(self.discrimination(cref.discr)?.class_at(cref.pos)?.name())
    }

    /// Remove the discrimination at `index`, shifting later ones down.
    ///
    /// Callers holding per-discrimination arrays (scores, learners) must drop
    /// the same index in the same step.
    pub fn delete_discrimination(&mut self, index: usize) -> Result<Discrimination> {
        if index >= self.discriminations.len() {
            return Err(ClassifierError::not_found("discrimination index", index));
        }
        let removed = self.discriminations.remove(index);
        log::info!("Deleted discrimination '{}' from suite '{}'", removed.name, self.name);
        Ok(removed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiscriminationDocument {
    id: DiscrId,
    name: String,
    classes: Vec<String>,
    #[serde(default)]
    default_class: Option<String>,
    #[serde(default)]
    fallback: bool,
    #[serde(default)]
    policy: Option<ClassPolicy>,
    #[serde(default)]
    max_classes: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SuiteDocument {
    name: String,
    #[serde(default)]
    new_discr_policy: NewDiscrPolicy,
    next_id: u32,
    dictionary: FeatureDictionary,
    discriminations: Vec<DiscriminationDocument>,
}

impl From<Suite> for SuiteDocument {
    fn from(suite: Suite) -> Self {
        let discriminations = suite
            .discriminations
            .iter()
            .map(|d| DiscriminationDocument {
                id: d.id,
                name: d.name.clone(),
                classes: d.classes.iter().map(|c| c.name.clone()).collect(),
                default_class: d.default_class().map(|c| c.name.clone()),
                fallback: d.fallback,
                policy: d.policy,
                max_classes: d.max_classes,
            })
            .collect();
        SuiteDocument {
            name: suite.name,
            new_discr_policy: suite.new_discr_policy,
            next_id: suite.next_id,
            dictionary: suite.dictionary,
            discriminations,
        }
    }
}

impl TryFrom<SuiteDocument> for Suite {
    type Error = ClassifierError;

    fn try_from(doc: SuiteDocument) -> Result<Self> {
        let mut suite = Suite::with_dictionary(&doc.name, doc.dictionary);
        suite.new_discr_policy = doc.new_discr_policy;

        for d in doc.discriminations {
            if d.id.0 >= doc.next_id {
                return Err(ClassifierError::schema(format!(
                    "discrimination '{}' has id {} beyond the suite counter {}",
                    d.name, d.id.0, doc.next_id
                )));
            }
            if suite.discriminations.iter().any(|e| e.id == d.id) {
                return Err(ClassifierError::schema(format!("duplicate discrimination id {}", d.id)));
            }
            suite.next_id = d.id.0;
            let discr = suite.add_discrimination(&d.name)?;
            for class in &d.classes {
                if discr.class_index.contains_key(class) {
                    return Err(ClassifierError::schema(format!(
                        "duplicate class '{}' in discrimination '{}'",
                        class, d.name
                    )));
                }
                discr.add_class(class, true, CreationContext::Api)?;
            }
            if let Some(default) = &d.default_class {
                discr.set_default_class(default)?;
            }
            discr.set_max_classes(d.max_classes)?;
            discr.fallback = d.fallback;
            discr.policy = d.policy;
        }

        if suite.discriminations.iter().filter(|d| d.fallback).count() > 1 {
            return Err(ClassifierError::schema("more than one fallback discrimination"));
        }
        suite.next_id = doc.next_id;
        Ok(suite)
    }
}
