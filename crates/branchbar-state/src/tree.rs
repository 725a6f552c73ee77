use crate::gateway::{Gateway, GatewayEvent, RepoEntry};
use crate::rows::{BranchRow, branch_rows, repo_row};
use branchbar_core::services::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, mpsc};
use std::thread;

/// Payload-free tree invalidation. The whole tree is re-queried on
/// receipt; there is no incremental update path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TreeEvent {
    Invalidated,
}

/// Two-level tree over the gateway's repositories: repository grouping
/// rows at the root when several are open, branch rows directly when
/// exactly one is.
pub struct TreeController {
    gateway: Arc<Gateway>,
    repos: Arc<RwLock<Vec<RepoEntry>>>,
    show_divergence: AtomicBool,
}

impl TreeController {
    /// Consumes the gateway's event receiver: on every change broadcast
    /// the repository list is re-fetched and one `Invalidated` is
    /// forwarded.
    pub fn new(
        gateway: Arc<Gateway>,
        gateway_rx: mpsc::Receiver<GatewayEvent>,
    ) -> (Self, mpsc::Receiver<TreeEvent>) {
        let repos = Arc::new(RwLock::new(gateway.list_repositories()));
        let (event_tx, event_rx) = mpsc::channel::<TreeEvent>();

        let thread_gateway = Arc::clone(&gateway);
        let thread_repos = Arc::clone(&repos);
        thread::spawn(move || {
            while let Ok(GatewayEvent::RepositoriesChanged) = gateway_rx.recv() {
                let refreshed = thread_gateway.list_repositories();
                *thread_repos.write().expect("repo cache lock poisoned") = refreshed;
                if event_tx.send(TreeEvent::Invalidated).is_err() {
                    break;
                }
            }
        });

        (
            Self {
                gateway,
                repos,
                show_divergence: AtomicBool::new(true),
            },
            event_rx,
        )
    }

    pub fn set_show_divergence(&self, on: bool) {
        self.show_divergence.store(on, Ordering::Relaxed);
    }

    /// True when exactly one repository is open. Gates whether the
    /// global create-branch command has an unambiguous target.
    pub fn single_repository(&self) -> bool {
        self.repos.read().expect("repo cache lock poisoned").len() == 1
    }

    /// The only open repository, or `None` when zero or several are.
    pub fn current_repository(&self) -> Option<RepoEntry> {
        let repos = self.repos.read().expect("repo cache lock poisoned");
        match repos.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        }
    }

    pub fn root_nodes(&self) -> Result<Vec<BranchRow>> {
        let repos = self
            .repos
            .read()
            .expect("repo cache lock poisoned")
            .clone();
        match repos.as_slice() {
            [] => Ok(Vec::new()),
            [only] => self.branch_rows_for(only),
            many => Ok(many.iter().map(repo_row).collect()),
        }
    }

    pub fn children(&self, row: &BranchRow) -> Result<Vec<BranchRow>> {
        if !row.is_repo_row() {
            return Ok(Vec::new());
        }
        let entry = self
            .repos
            .read()
            .expect("repo cache lock poisoned")
            .iter()
            .find(|r| r.id == row.repo_id)
            .cloned();
        match entry {
            Some(entry) => self.branch_rows_for(&entry),
            // The repository was closed between render and expand.
            None => Ok(Vec::new()),
        }
    }

    fn branch_rows_for(&self, entry: &RepoEntry) -> Result<Vec<BranchRow>> {
        let branches = self.gateway.list_branches(entry.id)?;
        Ok(branch_rows(
            entry.id,
            &entry.spec.label(),
            &branches,
            self.show_divergence.load(Ordering::Relaxed),
        ))
    }
}
