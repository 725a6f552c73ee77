mod cli_backend;
pub mod parse;
pub mod program;
pub mod run;

pub use cli_backend::CliBackend;

use branchbar_core::services::GitBackend;
use branchbar_core::services::{GitRepository, Result};
use std::path::Path;
use std::sync::Arc;

/// The always-available backend: plain `git` subprocess invocations.
pub fn default_backend() -> Arc<dyn GitBackend> {
    Arc::new(CliBackend::default())
}

pub fn open_repo(workdir: &Path) -> Result<Arc<dyn GitRepository>> {
    default_backend().open(workdir)
}
