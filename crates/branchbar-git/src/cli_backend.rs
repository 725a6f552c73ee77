use crate::parse;
use crate::program;
use crate::run::{run_git_capture, run_git_simple};
use branchbar_core::domain::{Branch, RepoSpec, Upstream};
use branchbar_core::error::{Error, ErrorKind};
use branchbar_core::services::{GitBackend, GitRepository, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

/// Backend that shells out to the git binary for everything. Works against
/// any installed git; used when the structured backend is unavailable or
/// disabled.
pub struct CliBackend {
    program: PathBuf,
}

impl Default for CliBackend {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }
}

impl CliBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Picks the first candidate executable that answers `--version`,
    /// falling back to `git` from PATH.
    pub fn with_candidates(candidates: &[String]) -> Self {
        Self {
            program: program::resolve(candidates),
        }
    }
}

impl GitBackend for CliBackend {
    fn open(&self, workdir: &Path) -> Result<Arc<dyn GitRepository>> {
        let workdir = workdir
            .canonicalize()
            .map_err(|e| Error::new(ErrorKind::Io(e.kind())))?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("-C").arg(&workdir).arg("rev-parse").arg("--git-dir");
        if let Err(err) = run_git_capture(cmd, "git rev-parse --git-dir") {
            return Err(match err.kind() {
                ErrorKind::Io(_) | ErrorKind::Timeout(_) => err,
                _ => Error::new(ErrorKind::NotARepository),
            });
        }

        Ok(Arc::new(CliRepo {
            spec: RepoSpec { workdir },
            program: self.program.clone(),
        }))
    }
}

#[derive(Debug)]
pub(crate) struct CliRepo {
    spec: RepoSpec,
    program: PathBuf,
}

impl CliRepo {
    fn git(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-C").arg(&self.spec.workdir);
        cmd
    }

    fn upstream_of(&self, branch: &str) -> Result<Option<Upstream>> {
        let branches = self.list_branches()?;
        Ok(branches
            .into_iter()
            .find(|b| b.name == branch)
            .and_then(|b| b.upstream))
    }
}

impl GitRepository for CliRepo {
    fn spec(&self) -> &RepoSpec {
        &self.spec
    }

    fn current_branch(&self) -> Result<String> {
        let mut cmd = self.git();
        cmd.arg("rev-parse").arg("--abbrev-ref").arg("HEAD");
        Ok(run_git_capture(cmd, "git rev-parse --abbrev-ref HEAD")?
            .trim()
            .to_string())
    }

    fn list_branches(&self) -> Result<Vec<Branch>> {
        let mut cmd = self.git();
        cmd.arg("for-each-ref")
            .arg(format!("--format={}", parse::BRANCH_FORMAT))
            .arg("refs/heads");
        let stdout = run_git_capture(cmd, "git for-each-ref refs/heads")?;
        Ok(parse::parse_branch_lines(&stdout))
    }

    fn checkout_branch(&self, name: &str) -> Result<()> {
        let mut cmd = self.git();
        cmd.arg("checkout").arg(name);
        run_git_simple(cmd, "git checkout")
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        let mut cmd = self.git();
        cmd.arg("checkout").arg("-b").arg(name);
        run_git_simple(cmd, "git checkout -b")
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        let mut cmd = self.git();
        cmd.arg("branch").arg("-D").arg(name);
        run_git_simple(cmd, "git branch -D")
    }

    fn rename_branch(&self, old: Option<&str>, new: &str) -> Result<()> {
        let mut cmd = self.git();
        cmd.arg("branch").arg("-m");
        if let Some(old) = old {
            cmd.arg(old);
        }
        cmd.arg(new);
        run_git_simple(cmd, "git branch -m")
    }

    fn set_upstream(&self, branch: &str, upstream: &str) -> Result<()> {
        let mut cmd = self.git();
        cmd.arg("branch")
            .arg(format!("--set-upstream-to={upstream}"))
            .arg(branch);
        run_git_simple(cmd, "git branch --set-upstream-to")
    }

    fn unset_upstream(&self, branch: &str) -> Result<()> {
        let mut cmd = self.git();
        cmd.arg("branch").arg("--unset-upstream").arg(branch);
        run_git_simple(cmd, "git branch --unset-upstream")
    }

    fn fetch_into_branch(&self, branch: &str) -> Result<()> {
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
}
