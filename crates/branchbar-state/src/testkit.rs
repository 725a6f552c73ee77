//! Recording fakes for gateway and dispatcher tests.

use branchbar_core::domain::{Branch, RepoSpec};
use branchbar_core::error::{Error, ErrorKind};
use branchbar_core::services::{GitBackend, GitRepository, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum RecordingCall {
    ListBranches,
    CurrentBranch,
    Checkout(String),
    Create(String),
    Delete(String),
    Rename(Option<String>, String),
    SetUpstream(String, String),
    UnsetUpstream(String),
    FetchIntoBranch(String),
}

#[derive(Default, Debug)]
struct Shared {
    calls: Mutex<Vec<RecordingCall>>,
    branches: Mutex<Vec<Branch>>,
    fail_next: Mutex<Option<String>>,
    allowed: Mutex<HashSet<PathBuf>>,
}

impl Shared {
    fn record(&self, call: RecordingCall) {
        self.calls.lock().expect("call log lock").push(call);
    }

    fn take_failure(&self) -> Option<Error> {
        self.fail_next
            .lock()
            .expect("failure lock")
            .take()
            .map(Error::command)
    }
}

/// Backend that opens only the paths it was told to allow and records
/// every repository call it receives.
#[derive(Default)]
pub(crate) struct RecordingBackend {
    shared: Arc<Shared>,
}

impl RecordingBackend {
    pub(crate) fn allow(&self, path: &Path) {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.shared.allowed.lock().expect("allow lock").insert(path);
    }

    pub(crate) fn set_branches(&self, branches: Vec<Branch>) {
        *self.shared.branches.lock().expect("branches lock") = branches;
    }

    pub(crate) fn fail_next(&self, message: &str) {
        *self.shared.fail_next.lock().expect("failure lock") = Some(message.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<RecordingCall> {
        self.shared.calls.lock().expect("call log lock").clone()
    }
}

impl GitBackend for RecordingBackend {
    fn open(&self, workdir: &Path) -> Result<Arc<dyn GitRepository>> {
        let allowed = self
            .shared
            .allowed
            .lock()
            .expect("allow lock")
            .contains(workdir);
        if !allowed {
            return Err(Error::new(ErrorKind::NotARepository));
        }
        Ok(Arc::new(RecordingRepo {
            spec: RepoSpec {
                workdir: workdir.to_path_buf(),
            },
            shared: Arc::clone(&self.shared),
        }))
    }
}

#[derive(Debug)]
struct RecordingRepo {
    spec: RepoSpec,
    shared: Arc<Shared>,
}

impl GitRepository for RecordingRepo {
    fn spec(&self) -> &RepoSpec {
        &self.spec
    }

    fn current_branch(&self) -> Result<String> {
        self.shared.record(RecordingCall::CurrentBranch);
        let branches = self.shared.branches.lock().expect("branches lock");
        Ok(branches
            .iter()
            .find(|b| b.is_head)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| "main".to_string()))
    }

    fn list_branches(&self) -> Result<Vec<Branch>> {
        self.shared.record(RecordingCall::ListBranches);
        Ok(self.shared.branches.lock().expect("branches lock").clone())
    }

    fn checkout_branch(&self, name: &str) -> Result<()> {
        if let Some(err) = self.shared.take_failure() {
            return Err(err);
        }
        self.shared.record(RecordingCall::Checkout(name.to_string()));
        Ok(())
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        if let Some(err) = self.shared.take_failure() {
            return Err(err);
        }
        self.shared.record(RecordingCall::Create(name.to_string()));
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        if let Some(err) = self.shared.take_failure() {
            return Err(err);
        }
        self.shared.record(RecordingCall::Delete(name.to_string()));
        Ok(())
    }

    fn rename_branch(&self, old: Option<&str>, new: &str) -> Result<()> {
        if let Some(err) = self.shared.take_failure() {
            return Err(err);
        }
        self.shared.record(RecordingCall::Rename(
            old.map(str::to_string),
            new.to_string(),
        ));
        Ok(())
    }

    fn set_upstream(&self, branch: &str, upstream: &str) -> Result<()> {
        if let Some(err) = self.shared.take_failure() {
            return Err(err);
        }
        self.shared.record(RecordingCall::SetUpstream(
            branch.to_string(),
            upstream.to_string(),
        ));
        Ok(())
    }

    fn unset_upstream(&self, branch: &str) -> Result<()> {
        if let Some(err) = self.shared.take_failure() {
            return Err(err);
        }
        self.shared
            .record(RecordingCall::UnsetUpstream(branch.to_string()));
        Ok(())
    }

    fn fetch_into_branch(&self, branch: &str) -> Result<()> {
        if let Some(err) = self.shared.take_failure() {
            return Err(err);
        }
        self.shared
            .record(RecordingCall::FetchIntoBranch(branch.to_string()));
        Ok(())
    }
}

pub(crate) fn branch(name: &str, is_head: bool) -> Branch {
    use branchbar_core::domain::CommitId;
    Branch {
        name: name.to_string(),
        target: CommitId("0000000000000000000000000000000000000000".to_string()),
        upstream: None,
        divergence: None,
        is_head,
    }
}
