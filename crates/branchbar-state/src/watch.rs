use crate::gateway::RepoId;
use notify::event::{AccessKind, AccessMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// One repository's git state changed on disk. Payload-free; the
/// receiver re-reads whatever it needs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WatchEvent {
    pub repo_id: RepoId,
}

enum MonitorMsg {
    Event(notify::Result<notify::Event>),
    Stop,
}

/// Coalesces bursts of filesystem events: quiet for `debounce` flushes,
/// and a continuous stream flushes at `max_delay` from the first event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct DebouncedChange {
    pending: bool,
    first_event_at: Option<Instant>,
    last_event_at: Option<Instant>,
    debounce: Duration,
    max_delay: Duration,
}

impl DebouncedChange {
    fn new(debounce: Duration, max_delay: Duration) -> Self {
        Self {
            pending: false,
            first_event_at: None,
            last_event_at: None,
            debounce,
            max_delay,
        }
    }

    fn is_pending(&self) -> bool {
        self.pending
    }

    /// Records an event; returns true when the max delay elapsed and
    /// the pending change must flush immediately.
    fn note(&mut self, now: Instant) -> bool {
        self.pending = true;
        self.first_event_at.get_or_insert(now);
        self.last_event_at = Some(now);
        match self.first_event_at {
            Some(first) if now.duration_since(first) >= self.max_delay => self.take(),
            _ => false,
        }
    }

    fn next_timeout(&self, now: Instant) -> Option<Duration> {
        let (first, last) = (self.first_event_at?, self.last_event_at?);
        let due_by_debounce = last + self.debounce;
        let due_by_max = first + self.max_delay;
        let due = if due_by_debounce <= due_by_max {
            due_by_debounce
        } else {
            due_by_max
        };
        Some(due.saturating_duration_since(now))
    }

    fn take_if_due(&mut self, now: Instant) -> bool {
        if !self.pending {
            return false;
        }
        let timeout = self.next_timeout(now).unwrap_or(Duration::from_secs(0));
        if timeout.is_zero() { self.take() } else { false }
    }

    fn take(&mut self) -> bool {
        let pending = self.pending;
        self.pending = false;
        self.first_event_at = None;
        self.last_event_at = None;
        pending
    }
}

/// Runs one watcher thread per open repository, translating git-dir
/// changes (HEAD, refs, packed-refs, config) into `WatchEvent`s.
pub struct RepoWatcherManager {
    handles: HashMap<RepoId, WatcherHandle>,
}

struct WatcherHandle {
    msg_tx: mpsc::Sender<MonitorMsg>,
    join: thread::JoinHandle<()>,
}

impl RepoWatcherManager {
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    pub fn start(&mut self, repo_id: RepoId, workdir: PathBuf, event_tx: mpsc::Sender<WatchEvent>) {
        if self.handles.contains_key(&repo_id) {
            return;
        }
        let (monitor_tx, monitor_rx) = mpsc::channel::<MonitorMsg>();
        let monitor_tx_for_notify = monitor_tx.clone();
        let join = thread::spawn(move || {
            watcher_thread(repo_id, workdir, event_tx, monitor_rx, monitor_tx_for_notify)
        });
        self.handles.insert(
            repo_id,
            WatcherHandle {
                msg_tx: monitor_tx,
                join,
            },
        );
    }

    pub fn stop(&mut self, repo_id: RepoId) {
        let Some(handle) = self.handles.remove(&repo_id) else {
            return;
        };
        let _ = handle.msg_tx.send(MonitorMsg::Stop);
        let _ = handle.join.join();
    }

    pub fn stop_all(&mut self) {
        let repo_ids = self.handles.keys().copied().collect::<Vec<_>>();
        for repo_id in repo_ids {
            self.stop(repo_id);
        }
    }

    pub fn running_repo_ids(&self) -> Vec<RepoId> {
        self.handles.keys().copied().collect()
    }
}

impl Default for RepoWatcherManager {
    fn default() -> Self {
        Self::new()
    }
}

fn watcher_thread(
    repo_id: RepoId,
    workdir: PathBuf,
    event_tx: mpsc::Sender<WatchEvent>,
    monitor_rx: mpsc::Receiver<MonitorMsg>,
    monitor_tx: mpsc::Sender<MonitorMsg>,
) {
    let workdir = workdir.canonicalize().unwrap_or(workdir);
    let Some(git_dir) = resolve_git_dir(&workdir) else {
        return;
    };

    let watcher = notify::recommended_watcher({
        let monitor_tx = monitor_tx.clone();
        move |res| {
            let _ = monitor_tx.send(MonitorMsg::Event(res));
        }
    });

    let mut watcher: RecommendedWatcher = match watcher {
        Ok(w) => w,
        Err(_) => return,
    };

    if watcher
        .watch(&git_dir, RecursiveMode::Recursive)
        .or_else(|_| watcher.watch(&git_dir, RecursiveMode::NonRecursive))
        .is_err()
    {
        return;
    }

    let debounce = Duration::from_millis(250);
    let max_delay = Duration::from_secs(2);
    let idle_tick = Duration::from_secs(30);

    let mut debouncer = DebouncedChange::new(debounce, max_delay);

    loop {
        let now = Instant::now();
        let timeout = debouncer.next_timeout(now).unwrap_or(idle_tick);

        match monitor_rx.recv_timeout(timeout) {
            Ok(MonitorMsg::Stop) => break,
            Ok(MonitorMsg::Event(Ok(event))) => {
                if is_branch_state_event(&git_dir, &event) && debouncer.note(Instant::now()) {
                    let _ = event_tx.send(WatchEvent { repo_id });
                }
            }
            Ok(MonitorMsg::Event(Err(_))) => {
                // Watcher errors are treated as "something changed".
                if debouncer.note(Instant::now()) {
                    let _ = event_tx.send(WatchEvent { repo_id });
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if debouncer.take_if_due(Instant::now()) {
                    let _ = event_tx.send(WatchEvent { repo_id });
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn resolve_git_dir(workdir: &Path) -> Option<PathBuf> {
    let dot_git = workdir.join(".git");
    let md = fs::metadata(&dot_git).ok()?;

    if md.is_dir() {
        return Some(dot_git);
    }

    if !md.is_file() {
        return None;
    }

    // Worktrees and submodules keep a `.git` file pointing at the real
    // git dir.
    let contents = fs::read_to_string(&dot_git).ok()?;
    let line = contents.lines().next()?.trim();
    let gitdir = line.strip_prefix("gitdir:")?.trim();
    if gitdir.is_empty() {
        return None;
    }

    let path = PathBuf::from(gitdir);
    if path.is_absolute() {
        Some(path)
    } else {
        Some(workdir.join(path))
    }
}

fn is_branch_state_event(git_dir: &Path, event: &notify::Event) -> bool {
    if should_ignore_event_kind(event) {
        return false;
    }

    // If notify indicates a rescan is needed, assume anything could have changed.
    if event.need_rescan() || event.paths.is_empty() {
        return true;
    }

    event
        .paths
        .iter()
        .any(|path| is_branch_state_path(git_dir, path))
}

/// Paths whose change can alter the branch list, HEAD, or tracking
/// configuration. Object and log churn is deliberately not matched.
fn is_branch_state_path(git_dir: &Path, path: &Path) -> bool {
    let Ok(rel) = path.strip_prefix(git_dir) else {
        return false;
    };
    rel == Path::new("HEAD")
        || rel == Path::new("packed-refs")
        || rel == Path::new("config")
        || rel.starts_with("refs")
}

fn should_ignore_event_kind(event: &notify::Event) -> bool {
    match &event.kind {
        // Reading repo state should not cause a refresh loop; ignore access events except
        // close-after-write which indicates a write has completed.
        notify::EventKind::Access(AccessKind::Close(AccessMode::Write)) => false,
        notify::EventKind::Access(_) => true,
        _ => false,
    }
}
