use crate::domain::*;
use crate::error::{Error, ErrorKind};
use std::path::Path;
use std::sync::Arc;

pub use crate::error::Result;

/// One opened repository. Listing operations report current state; mutating
/// operations issue exactly one underlying git invocation and return `Ok`
/// only when it succeeded.
pub trait GitRepository: Send + Sync + std::fmt::Debug {
    fn spec(&self) -> &RepoSpec;

    fn current_branch(&self) -> Result<String>;
    /// Local branches sorted lexicographically by name, annotated with
    /// selection state, upstream tracking ref, and ahead/behind counts.
    fn list_branches(&self) -> Result<Vec<Branch>>;

    fn checkout_branch(&self, name: &str) -> Result<()>;
    /// Creates `name` at HEAD and checks it out.
    fn create_branch(&self, name: &str) -> Result<()>;
    /// Force-deletes `name` regardless of merge state.
    fn delete_branch(&self, name: &str) -> Result<()>;
    /// Renames `old` to `new`; `None` renames the currently checked-out
    /// branch (the single-argument form of `git branch -m`).
    fn rename_branch(&self, old: Option<&str>, new: &str) -> Result<()>;
    /// Points `branch` at the tracking ref given as `remote/branch`.
    fn set_upstream(&self, branch: &str, upstream: &str) -> Result<()>;
    fn unset_upstream(&self, branch: &str) -> Result<()>;
    /// Fetches `branch`'s upstream directly into the local ref without
    /// touching the working tree.
    fn fetch_into_branch(&self, branch: &str) -> Result<()> {
        let _ = branch;
        Err(Error::new(ErrorKind::Unsupported(
            "fetching into a branch is not implemented for this backend",
        )))
    }
}

pub trait GitBackend: Send + Sync {
    fn open(&self, workdir: &Path) -> Result<Arc<dyn GitRepository>>;
}
