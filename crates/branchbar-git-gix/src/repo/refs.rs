use super::GixRepo;
use branchbar_core::domain::Branch;
use branchbar_core::error::Error;
use branchbar_core::services::Result;
use branchbar_git::parse;
use branchbar_git::run::run_git_capture;
use std::process::Command;

impl GixRepo {
    pub(super) fn current_branch_impl(&self) -> Result<String> {
        let repo = self.repo.to_thread_local();
        let head = repo
            .head_name()
            .map_err(|e| Error::command(format!("gix head: {e}")))?;
        Ok(match head {
            Some(name) => name.shorten().to_string(),
            // Detached HEAD: the same placeholder `git rev-parse
            // --abbrev-ref HEAD` prints.
            None => "HEAD".to_string(),
        })
    }

    pub(super) fn list_branches_impl(&self) -> Result<Vec<Branch>> {
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(&self.spec.workdir)
            .arg("for-each-ref")
            .arg(format!("--format={}", parse::BRANCH_FORMAT))
            .arg("refs/heads");
        let stdout = run_git_capture(cmd, "git for-each-ref refs/heads")?;
        Ok(parse::parse_branch_lines(&stdout))
    }
}
