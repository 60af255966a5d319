//! Configuration of reading and writing.

use crate::diagnostics::{Diagnostics, WarningPolicy, default_policy};
use crate::error::MorphError;
use crate::model::Modifiers;
use serde::{Deserialize, Serialize};

// =#========================================================================#=
// LOAD OPTIONS
// =#========================================================================#=
/// Options applied when reading a morphology.
///
/// # Example
/// ```
/// use neuromorph::LoadOptions;
/// use neuromorph::model::Modifiers;
///
/// let options = LoadOptions::from_json_str(r#"{"modifiers": "NO_DUPLICATES", "workers": 2}"#).unwrap();
/// assert_eq!(options.modifiers(), Modifiers::NO_DUPLICATES);
/// assert_eq!(options.workers(), 2);
///
/// let options = LoadOptions::default().with_modifiers(Modifiers::TWO_POINTS_SECTIONS).with_allow_type_change();
/// assert!(options.allow_type_change());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    modifiers: Modifiers,
    policy: WarningPolicy,
    allow_type_change: bool,
    workers: Option<usize>,
}

impl Default for LoadOptions {
    /// No modifiers, the thread's [default policy](crate::diagnostics::default_policy).
    fn default() -> Self {
        Self { modifiers: Modifiers::empty(), policy: default_policy(), allow_type_change: false, workers: None }
    }
}

impl LoadOptions {
    /// Reads options from JSON, missing fields take their default.
    ///
    /// # Errors
    /// [MorphError::Json] on malformed input.
    pub fn from_json_str(json: &str) -> Result<Self, MorphError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_policy(mut self, policy: WarningPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// In SWC files, split a section where the type changes without a
    /// branch point instead of failing.
    pub fn with_allow_type_change(mut self) -> Self {
        self.allow_type_change = true;
        self
    }

    /// Number of threads used by [Collection::load_unordered](crate::collection::Collection::load_unordered).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn policy(&self) -> &WarningPolicy {
        &self.policy
    }

    pub fn allow_type_change(&self) -> bool {
        self.allow_type_change
    }

    /// Configured number of workers, defaults to the number of CPUs.
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    /// New diagnostics sink applying this policy.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::new(self.policy.clone())
    }
}

// =#========================================================================#=
// WRITE OPTIONS
// =#========================================================================#=
/// Options applied when writing a morphology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    policy: WarningPolicy,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { policy: default_policy() }
    }
}

impl WriteOptions {
    pub fn from_json_str(json: &str) -> Result<Self, MorphError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_policy(mut self, policy: WarningPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &WarningPolicy {
        &self.policy
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::new(self.policy.clone())
    }
}
