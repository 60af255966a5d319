#![allow(dead_code)]

use neuromorph::LoadOptions;
use neuromorph::diagnostics::{Diagnostics, WarningPolicy};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Routes the crate's logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

pub fn fixture(name: &str) -> PathBuf {
    Path::new("tests").join("fixtures").join(name)
}

pub fn collecting() -> Diagnostics {
    Diagnostics::new(WarningPolicy::collecting())
}

pub fn collecting_options() -> LoadOptions {
    LoadOptions::default().with_policy(WarningPolicy::collecting())
}
