use super::GixRepo;
use branchbar_core::domain::Upstream;
use branchbar_core::error::Error;
use branchbar_core::services::Result;
use branchbar_git::run::run_git_simple;
use std::process::Command;

impl GixRepo {
    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.spec.workdir);
        cmd
    }

    pub(super) fn checkout_branch_impl(&self, name: &str) -> Result<()> {
        let mut cmd = self.git();
        cmd.arg("checkout").arg(name);
        run_git_simple(cmd, "git checkout")
    }

    pub(super) fn create_branch_impl(&self, name: &str) -> Result<()> {
        let mut cmd = self.git();
        cmd.arg("checkout").arg("-b").arg(name);
        run_git_simple(cmd, "git checkout -b")
    }

    pub(super) fn delete_branch_impl(&self, name: &str) -> Result<()> {
        let mut cmd = self.git();
        cmd.arg("branch").arg("-D").arg(name);
        run_git_simple(cmd, "git branch -D")
    }

    pub(super) fn rename_branch_impl(&self, old: Option<&str>, new: &str) -> Result<()> {
        let mut cmd = self.git();
        cmd.arg("branch").arg("-m");
        if let Some(old) = old {
            cmd.arg(old);
        }
        cmd.arg(new);
        run_git_simple(cmd, "git branch -m")
    }

    pub(super) fn set_upstream_impl(&self, branch: &str, upstream: &str) -> Result<()> {
        let mut cmd = self.git();
        cmd.arg("branch")
            .arg(format!("--set-upstream-to={upstream}"))
            .arg(branch);
        run_git_simple(cmd, "git branch --set-upstream-to")
    }

    pub(super) fn unset_upstream_impl(&self, branch: &str) -> Result<()> {
        let mut cmd = self.git();
        cmd.arg("branch").arg("--unset-upstream").arg(branch);
        run_git_simple(cmd, "git branch --unset-upstream")
    }

    pub(super) fn fetch_into_branch_impl(&self, branch: &str) -> Result<()> {
        let Some(upstream) = self.upstream_of(branch)? else {
            return Err(Error::command(format!(
                "branch {branch} has no upstream to sync from"
            )));
        };
        let mut cmd = self.git();
        cmd.arg("fetch")
            .arg(&upstream.remote)
            .arg(format!("{}:{}", upstream.branch, branch));
        run_git_simple(cmd, "git fetch")
    }

    fn upstream_of(&self, branch: &str) -> Result<Option<Upstream>> {
        let branches = self.list_branches_impl()?;
        Ok(branches
            .into_iter()
            .find(|b| b.name == branch)
            .and_then(|b| b.upstream))
    }
}
