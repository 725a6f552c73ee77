use branchbar_core::domain::{Branch, RepoSpec};
use branchbar_core::services::{GitRepository, Result};
use std::path::PathBuf;

mod porcelain;
mod refs;

pub(crate) struct GixRepo {
    spec: RepoSpec,
    repo: gix::ThreadSafeRepository,
}

impl std::fmt::Debug for GixRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GixRepo").field("spec", &self.spec).finish()
    }
}

impl GixRepo {
    pub(crate) fn new(workdir: PathBuf, repo: gix::ThreadSafeRepository) -> Self {
        Self {
            spec: RepoSpec { workdir },
            repo,
        }
    }
}

impl GitRepository for GixRepo {
    fn spec(&self) -> &RepoSpec {
        &self.spec
    }

    fn current_branch(&self) -> Result<String> {
        self.current_branch_impl()
    }

    fn list_branches(&self) -> Result<Vec<Branch>> {
        self.list_branches_impl()
    }

    fn checkout_branch(&self, name: &str) -> Result<()> {
        self.checkout_branch_impl(name)
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        self.create_branch_impl(name)
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        self.delete_branch_impl(name)
    }

    fn rename_branch(&self, old: Option<&str>, new: &str) -> Result<()> {
        self.rename_branch_impl(old, new)
    }

    fn set_upstream(&self, branch: &str, upstream: &str) -> Result<()> {
        self.set_upstream_impl(branch, upstream)
    }

    fn unset_upstream(&self, branch: &str) -> Result<()> {
        self.unset_upstream_impl(branch)
    }

    fn fetch_into_branch(&self, branch: &str) -> Result<()> {
        self.fetch_into_branch_impl(branch)
    }
}
