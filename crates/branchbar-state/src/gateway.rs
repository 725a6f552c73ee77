use branchbar_core::domain::{Branch, RepoSpec};
use branchbar_core::error::Error;
use branchbar_core::refname;
use branchbar_core::services::{GitBackend, GitRepository, Result};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, mpsc};

/// Process-local handle for an open repository.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RepoId(pub u64);

/// Payload-free change broadcast. Consumers re-read whatever they
/// displayed; repeated deliveries are harmless.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GatewayEvent {
    RepositoriesChanged,
}

#[derive(Clone, Debug)]
pub struct RepoEntry {
    pub id: RepoId,
    pub spec: RepoSpec,
}

struct OpenRepo {
    id: RepoId,
    repo: Arc<dyn GitRepository>,
}

/// Front door for everything the tree and command layers do with git.
///
/// Owns the open repository set and the change notification channel.
/// Mutations validate branch names before touching any backend, issue
/// exactly one backend call, and broadcast `RepositoriesChanged` only
/// when that call succeeded.
pub struct Gateway {
    backend: Arc<dyn GitBackend>,
    repos: RwLock<Vec<OpenRepo>>,
    id_alloc: AtomicU64,
    event_tx: mpsc::Sender<GatewayEvent>,
}

impl Gateway {
    pub fn new(backend: Arc<dyn GitBackend>) -> (Arc<Self>, mpsc::Receiver<GatewayEvent>) {
        let (event_tx, event_rx) = mpsc::channel::<GatewayEvent>();
        (
            Arc::new(Self {
                backend,
                repos: RwLock::new(Vec::new()),
                id_alloc: AtomicU64::new(1),
                event_tx,
            }),
            event_rx,
        )
    }

    /// Opens `workdir`, reusing the existing handle when the same
    /// repository is already open.
    pub fn open_repository(&self, workdir: &Path) -> Result<RepoId> {
        let workdir = normalize_repo_path(workdir.to_path_buf());

        if let Some(id) = self.find_open(&workdir) {
            return Ok(id);
        }

        let repo = self.backend.open(&workdir)?;
        let id = RepoId(self.id_alloc.fetch_add(1, Ordering::Relaxed));
        {
            let mut repos = self.repos.write().expect("repo table lock poisoned");
            // A concurrent open of the same path wins by arriving first.
            if let Some(existing) = repos
                .iter()
                .find(|r| r.repo.spec().workdir == workdir)
                .map(|r| r.id)
            {
                return Ok(existing);
            }
            repos.push(OpenRepo { id, repo });
        }
        self.notify_changed();
        Ok(id)
    }

    /// Opens every path in order, skipping duplicates and paths that
    /// fail to open. Used for session restore.
    pub fn open_repositories(&self, paths: Vec<PathBuf>) -> Vec<RepoId> {
        let mut ids = Vec::new();
        for path in dedup_paths_in_order(paths) {
            if let Ok(id) = self.open_repository(&path) {
                ids.push(id);
            }
        }
        ids
    }

    pub fn close_repository(&self, id: RepoId) {
        let removed = {
            let mut repos = self.repos.write().expect("repo table lock poisoned");
            let before = repos.len();
            repos.retain(|r| r.id != id);
            repos.len() != before
        };
        if removed {
            self.notify_changed();
        }
    }

    /// Never fails; empty when nothing is open.
    pub fn list_repositories(&self) -> Vec<RepoEntry> {
        self.repos
            .read()
            .expect("repo table lock poisoned")
            .iter()
            .map(|r| RepoEntry {
                id: r.id,
                spec: r.repo.spec().clone(),
            })
            .collect()
    }

    /// Branches sorted by name, with head/upstream/divergence attached.
    pub fn list_branches(&self, id: RepoId) -> Result<Vec<Branch>> {
        self.repo(id)?.list_branches()
    }

    pub fn current_branch(&self, id: RepoId) -> Result<String> {
        self.repo(id)?.current_branch()
    }

    /// Re-broadcasts the change notification without mutating anything,
    /// so consumers re-read repository state.
    pub fn refresh(&self) {
        self.notify_changed();
    }

    pub fn checkout_branch(&self, id: RepoId, name: &str) -> Result<()> {
        refname::validate(name)?;
        let repo = self.repo(id)?;
        repo.checkout_branch(name)?;
        self.notify_changed();
        Ok(())
    }

    pub fn create_branch(&self, id: RepoId, name: &str) -> Result<()> {
        refname::validate(name)?;
        let repo = self.repo(id)?;
        repo.create_branch(name)?;
        self.notify_changed();
        Ok(())
    }

    pub fn delete_branch(&self, id: RepoId, name: &str) -> Result<()> {
        refname::validate(name)?;
        let repo = self.repo(id)?;
        repo.delete_branch(name)?;
        self.notify_changed();
        Ok(())
    }

    /// `old == None` renames the current branch (single-argument form).
    pub fn rename_branch(&self, id: RepoId, old: Option<&str>, new: &str) -> Result<()> {
        refname::validate(new)?;
        if let Some(old) = old {
            refname::validate(old)?;
        }
        let repo = self.repo(id)?;
        repo.rename_branch(old, new)?;
        self.notify_changed();
        Ok(())
    }

    /// An empty (or blank) upstream means "track nothing" and is
    /// handled as `unset_upstream`, not as an error.
    pub fn set_upstream(&self, id: RepoId, branch: &str, upstream: &str) -> Result<()> {
        let upstream = upstream.trim();
        if upstream.is_empty() {
            return self.unset_upstream(id, branch);
        }
        refname::validate(branch)?;
        refname::validate(upstream)?;
        let repo = self.repo(id)?;
        repo.set_upstream(branch, upstream)?;
        self.notify_changed();
        Ok(())
    }

    pub fn unset_upstream(&self, id: RepoId, branch: &str) -> Result<()> {
        refname::validate(branch)?;
        let repo = self.repo(id)?;
        repo.unset_upstream(branch)?;
        self.notify_changed();
        Ok(())
    }

    /// Fetches the branch's upstream directly into the local ref
    /// without checking it out.
    pub fn sync_branch(&self, id: RepoId, branch: &str) -> Result<()> {
        refname::validate(branch)?;
        let repo = self.repo(id)?;
        repo.fetch_into_branch(branch)?;
        self.notify_changed();
        Ok(())
    }

    fn repo(&self, id: RepoId) -> Result<Arc<dyn GitRepository>> {
        self.repos
            .read()
            .expect("repo table lock poisoned")
            .iter()
            .find(|r| r.id == id)
            .map(|r| Arc::clone(&r.repo))
            .ok_or_else(|| Error::command("repository is no longer open"))
    }

    fn find_open(&self, workdir: &Path) -> Option<RepoId> {
        self.repos
            .read()
            .expect("repo table lock poisoned")
            .iter()
            .find(|r| r.repo.spec().workdir == workdir)
            .map(|r| r.id)
    }

    fn notify_changed(&self) {
        let _ = self.event_tx.send(GatewayEvent::RepositoriesChanged);
    }
}

fn dedup_paths_in_order(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::with_capacity(paths.len());
    let mut seen: FxHashSet<PathBuf> = FxHashSet::default();
    for p in paths {
        if !seen.insert(p.clone()) {
            continue;
        }
        out.push(p);
    }
    out
}

fn normalize_repo_path(path: PathBuf) -> PathBuf {
    let path = if path.is_relative() {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    } else {
        path
    };

    std::fs::canonicalize(&path).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{RecordingBackend, RecordingCall};
    use branchbar_core::error::ErrorKind;

    fn open_one(gateway: &Gateway, backend: &RecordingBackend) -> RepoId {
        let dir = std::env::temp_dir();
        backend.allow(&dir);
        gateway.open_repository(&dir).expect("open succeeds")
    }

    fn drain(rx: &mpsc::Receiver<GatewayEvent>) -> usize {
        rx.try_iter().count()
    }

    #[test]
    fn successful_mutation_notifies_exactly_once() {
        let backend = Arc::new(RecordingBackend::default());
        let (gateway, rx) = Gateway::new(backend.clone());
        let id = open_one(&gateway, &backend);
        drain(&rx);

        gateway.create_branch(id, "feature/x").expect("create");
        assert_eq!(drain(&rx), 1);
        assert_eq!(
            backend.calls(),
            vec![RecordingCall::Create("feature/x".into())]
        );
    }

    #[test]
    fn failed_mutation_does_not_notify() {
        let backend = Arc::new(RecordingBackend::default());
        backend.fail_next("boom");
        let (gateway, rx) = Gateway::new(backend.clone());
        let id = open_one(&gateway, &backend);
        drain(&rx);

        let err = gateway.checkout_branch(id, "main").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Command(_)));
        assert_eq!(drain(&rx), 0);
    }

    #[test]
    fn invalid_name_is_rejected_before_any_backend_call() {
        let backend = Arc::new(RecordingBackend::default());
        let (gateway, rx) = Gateway::new(backend.clone());
        let id = open_one(&gateway, &backend);
        drain(&rx);

        let err = gateway.create_branch(id, "bad..name").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidRefName(_)));
        assert!(backend.calls().is_empty());
        assert_eq!(drain(&rx), 0);
    }

    #[test]
    fn empty_upstream_input_unsets_the_upstream() {
        let backend = Arc::new(RecordingBackend::default());
        let (gateway, rx) = Gateway::new(backend.clone());
        let id = open_one(&gateway, &backend);
        drain(&rx);

        gateway.set_upstream(id, "main", "  ").expect("unset");
        assert_eq!(
            backend.calls(),
            vec![RecordingCall::UnsetUpstream("main".into())]
        );
        assert_eq!(drain(&rx), 1);
    }

    #[test]
    fn non_empty_upstream_is_passed_through() {
        let backend = Arc::new(RecordingBackend::default());
        let (gateway, rx) = Gateway::new(backend.clone());
        let id = open_one(&gateway, &backend);
        drain(&rx);

        gateway
            .set_upstream(id, "main", "origin/main")
            .expect("set upstream");
        assert_eq!(
            backend.calls(),
            vec![RecordingCall::SetUpstream(
                "main".into(),
                "origin/main".into()
            )]
        );
        assert_eq!(drain(&rx), 1);
    }

    #[test]
    fn reopening_the_same_path_reuses_the_handle() {
        let backend = Arc::new(RecordingBackend::default());
        let (gateway, _rx) = Gateway::new(backend.clone());
        let dir = std::env::temp_dir();
        backend.allow(&dir);

        let a = gateway.open_repository(&dir).expect("open");
        let b = gateway.open_repository(&dir).expect("reopen");
        assert_eq!(a, b);
        assert_eq!(gateway.list_repositories().len(), 1);
    }

    #[test]
    fn close_removes_the_repository_and_notifies() {
        let backend = Arc::new(RecordingBackend::default());
        let (gateway, rx) = Gateway::new(backend.clone());
        let id = open_one(&gateway, &backend);
        drain(&rx);

        gateway.close_repository(id);
        assert!(gateway.list_repositories().is_empty());
        assert_eq!(drain(&rx), 1);

        // Closing an unknown id is a no-op.
        gateway.close_repository(id);
        assert_eq!(drain(&rx), 0);
    }
}
