//! Warning policy and the diagnostics sink applying it.
//!
//! A [WarningPolicy] decides what happens to each emitted [Warning]:
//! printing it through `tracing`, promoting it to an error, or merely
//! collecting it. Specific kinds can be ignored altogether.
//!
//! The policy is passed explicitly to every parse and write
//! (see [LoadOptions](crate::LoadOptions) and [WriteOptions](crate::WriteOptions)).
//! A thread-local default exists only as a convenience for callers that
//! do not configure one.

use crate::diagnostics::warning::{Warning, WarningKind};
use crate::error::MorphError;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeSet;

/// Default number of warnings printed per [Diagnostics] sink
const DEFAULT_MAX_PRINTED: usize = 100;

thread_local! {
    static DEFAULT_POLICY: RefCell<WarningPolicy> = RefCell::new(WarningPolicy::default());
}

/// Returns a copy of the current thread's default policy.
pub fn default_policy() -> WarningPolicy {
    DEFAULT_POLICY.with(|policy| policy.borrow().clone())
}

/// Replaces the current thread's default policy.
pub fn set_default_policy(policy: WarningPolicy) {
    DEFAULT_POLICY.with(|current| *current.borrow_mut() = policy);
}

// =#========================================================================#=
// WARNING POLICY
// =#========================================================================#=
/// What a [Diagnostics] sink does with a non-ignored warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WarningMode {
    /// Log through `tracing::warn!` (up to a maximum count) and collect.
    #[default]
    Print,
    /// Abort the current operation with [MorphError::RaisedWarning].
    Raise,
    /// Collect silently.
    Collect,
}

/// Configuration of warning handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningPolicy {
    mode: WarningMode,
    ignored: BTreeSet<WarningKind>,
    max_printed: Option<usize>,
}

impl Default for WarningPolicy {
    fn default() -> Self {
        Self {
            mode: WarningMode::Print,
            ignored: BTreeSet::new(),
            max_printed: Some(DEFAULT_MAX_PRINTED),
        }
    }
}

impl WarningPolicy {
    /// Policy collecting warnings without printing them.
    pub fn collecting() -> Self {
        Self::default().with_mode(WarningMode::Collect)
    }

    /// Policy promoting every non-ignored warning to an error.
    pub fn raising() -> Self {
        Self::default().with_mode(WarningMode::Raise)
    }

    pub fn with_mode(mut self, mode: WarningMode) -> Self {
        self.mode = mode;
        self
    }

    /// Ignore warnings of the given kind.
    pub fn ignoring(mut self, kind: WarningKind) -> Self {
        self.ignored.insert(kind);
        self
    }

    /// Maximum number of printed warnings, `None` prints all of them.
    pub fn with_max_printed(mut self, max_printed: Option<usize>) -> Self {
        self.max_printed = max_printed;
        self
    }

    pub fn mode(&self) -> WarningMode {
        self.mode
    }

    pub fn is_ignored(&self, kind: WarningKind) -> bool {
        self.ignored.contains(&kind)
    }
}

// =#========================================================================#=
// DIAGNOSTICS
// =#========================================================================#=
/// Sink for warnings emitted during one or more operations.
///
/// Non-ignored warnings are kept (unless raised), so that callers can
/// inspect them afterwards regardless of whether they were printed.
#[derive(Debug, Default)]
pub struct Diagnostics {
    policy: WarningPolicy,
    warnings: Vec<Warning>,
    printed: usize,
}

impl Diagnostics {
    pub fn new(policy: WarningPolicy) -> Self {
        Self { policy, warnings: Vec::new(), printed: 0 }
    }

    /// Sink using the thread's default policy.
    pub fn with_default_policy() -> Self {
        Self::new(default_policy())
    }

    /// Emits a warning according to the policy.
    ///
    /// # Errors
    /// Returns [MorphError::RaisedWarning] if the policy raises warnings
    /// and the kind is not ignored.
    pub fn emit(&mut self, warning: Warning) -> Result<(), MorphError> {
        if self.policy.is_ignored(warning.kind()) {
            return Ok(());
        }

        match self.policy.mode() {
            WarningMode::Raise => return Err(MorphError::RaisedWarning(warning)),
            WarningMode::Print => self.print(&warning),
            WarningMode::Collect => {}
        }
        self.warnings.push(warning);
        Ok(())
    }

    fn print(&mut self, warning: &Warning) {
        if let Some(max) = self.policy.max_printed {
            if self.printed > max {
                return;
            }
            if self.printed == max {
                tracing::warn!("Maximum number of warnings reached, next warnings won't be displayed");
                self.printed += 1;
                return;
            }
        }
        tracing::warn!(kind = ?warning.kind(), "{warning}");
        self.printed += 1;
    }

    pub fn is_ignored(&self, kind: WarningKind) -> bool {
        self.policy.is_ignored(kind)
    }

    pub fn policy(&self) -> &WarningPolicy {
        &self.policy
    }

    /// Warnings emitted so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Count of emitted warnings of the given kind.
    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind() == kind).count()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::warning::STRING_URI;

    #[test]
    fn test_ignored_kind_is_dropped() {
        let mut diagnostics = Diagnostics::new(WarningPolicy::raising().ignoring(WarningKind::NoSomaFound));
        assert!(diagnostics.emit(Warning::no_soma_found(STRING_URI)).is_ok());
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn test_raise_promotes_warning() {
        let mut diagnostics = Diagnostics::new(WarningPolicy::raising());
        let result = diagnostics.emit(Warning::write_no_soma());
        assert!(matches!(result, Err(MorphError::RaisedWarning(w)) if w.kind() == WarningKind::WriteNoSoma));
    }

    #[test]
    fn test_default_policy_is_thread_local() {
        set_default_policy(WarningPolicy::collecting());
        assert_eq!(default_policy().mode(), WarningMode::Collect);
        let other = std::thread::spawn(|| default_policy().mode()).join().unwrap();
        assert_eq!(other, WarningMode::Print);
        set_default_policy(WarningPolicy::default());
    }
}
