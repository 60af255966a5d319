//! Diagnostics: warnings, their `(file, line)` locators, and the policy
//! deciding whether they are printed, raised, collected or ignored.

mod policy;
mod warning;

pub use policy::{Diagnostics, WarningMode, WarningPolicy, default_policy, set_default_policy};
pub use warning::{Location, STRING_URI, Warning, WarningKind};
