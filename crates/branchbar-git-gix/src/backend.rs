use crate::repo::GixRepo;
use branchbar_core::error::{Error, ErrorKind};
use branchbar_core::services::{GitBackend, GitRepository, Result};
use std::path::Path;
use std::sync::Arc;

/// Backend that validates and reads repositories through `gix`, while
/// branch mutations go through git plumbing invocations.
pub struct GixBackend;

impl Default for GixBackend {
    fn default() -> Self {
        Self
    }
}

impl GitBackend for GixBackend {
    fn open(&self, workdir: &Path) -> Result<Arc<dyn GitRepository>> {
        let workdir = workdir
            .canonicalize()
            .map_err(|e| Error::new(ErrorKind::Io(e.kind())))?;

        let repo = gix::open(&workdir).map_err(|e| match e {
            gix::open::Error::NotARepository { .. } => Error::new(ErrorKind::NotARepository),
            gix::open::Error::Io(io) => Error::new(ErrorKind::Io(io.kind())),
            e => Error::command(format!("gix open: {e}")),
        })?;

        Ok(Arc::new(GixRepo::new(workdir, repo.into_sync())))
    }
}
