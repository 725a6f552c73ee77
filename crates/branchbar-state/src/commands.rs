use crate::gateway::{Gateway, RepoId};
use crate::rows::BranchRow;
use crate::settings::Settings;
use branchbar_core::services::Result;
use std::ops::Range;
use std::sync::{Arc, RwLock};

/// Free-text prompt shown by the host. `preselect` is a byte range
/// into `prefill` that starts out selected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InputRequest {
    pub prompt: String,
    pub placeholder: Option<String>,
    pub prefill: String,
    pub preselect: Option<Range<usize>>,
}

/// The interaction surface a front end lends to the dispatcher:
/// prompts, confirms, notices and a progress scope. Returning `None`
/// from `prompt_input` means the user dismissed the prompt.
pub trait HostUi: Send + Sync {
    fn prompt_input(&self, request: InputRequest) -> Option<String>;
    fn confirm(&self, message: &str) -> bool;
    fn notify_info(&self, message: &str);
    fn notify_error(&self, message: &str);
    fn begin_progress(&self, label: &str);
    fn end_progress(&self);
}

/// Turns user-triggered actions into gateway calls.
///
/// Each action is a thin procedure: gather input through the host,
/// honor settings, delegate. Errors never cross this boundary; they
/// are surfaced through `HostUi::notify_error`. Actions whose target
/// cannot be resolved silently do nothing.
pub struct CommandDispatcher {
    gateway: Arc<Gateway>,
    ui: Arc<dyn HostUi>,
    settings: RwLock<Settings>,
}

impl CommandDispatcher {
    pub fn new(gateway: Arc<Gateway>, ui: Arc<dyn HostUi>, settings: Settings) -> Self {
        Self {
            gateway,
            ui,
            settings: RwLock::new(settings),
        }
    }

    pub fn set_settings(&self, settings: Settings) {
        *self.settings.write().expect("settings lock poisoned") = settings;
    }

    pub fn refresh(&self) {
        self.gateway.refresh();
    }

    /// Global variant: only applicable while exactly one repository is
    /// open, otherwise the target would be ambiguous.
    pub fn create_branch(&self) {
        let repos = self.gateway.list_repositories();
        let [only] = repos.as_slice() else {
            return;
        };
        self.create_branch_in(only.id);
    }

    pub fn create_branch_in(&self, repo: RepoId) {
        let Some(name) = self.ui.prompt_input(InputRequest {
            prompt: "Create a branch from the current commit".to_string(),
            placeholder: Some("Enter a branch name".to_string()),
            prefill: String::new(),
            preselect: None,
        }) else {
            return;
        };
        if name.is_empty() {
            return;
        }
        self.report(self.gateway.create_branch(repo, &name));
    }

    pub fn checkout(&self, row: &BranchRow) {
        let Some(name) = row.branch.as_deref() else {
            return;
        };
        self.report(self.gateway.checkout_branch(row.repo_id, name));
    }

    pub fn rename(&self, row: &BranchRow) {
        let Some(name) = row.branch.as_deref() else {
            return;
        };
        let Some(new) = self.ui.prompt_input(self.rename_request(name)) else {
            return;
        };
        if new.is_empty() {
            return;
        }
        // The checked-out branch is renamed with the single-argument
        // form so git resolves it from HEAD.
        let old = if row.selected { None } else { Some(name) };
        self.report(self.gateway.rename_branch(row.repo_id, old, &new));
    }

    pub fn delete(&self, row: &BranchRow) {
        let Some(name) = row.branch.as_deref() else {
            return;
        };
        let confirm_destructive = self
            .settings
            .read()
            .expect("settings lock poisoned")
            .confirm_destructive;
        if confirm_destructive
            && !self
                .ui
                .confirm(&format!("Are you sure you want to delete branch '{name}'?"))
        {
            return;
        }
        self.report(self.gateway.delete_branch(row.repo_id, name));
    }

    /// An empty reply stops tracking; dismissing the prompt changes
    /// nothing.
    pub fn set_upstream(&self, row: &BranchRow) {
        let Some(name) = row.branch.as_deref() else {
            return;
        };
        let prefill = row.upstream.as_ref().map(|u| u.short()).unwrap_or_default();
        let Some(upstream) = self.ui.prompt_input(InputRequest {
            prompt: format!("Track a remote branch from '{name}'"),
            placeholder: Some("remote/branch (leave empty to stop tracking)".to_string()),
            preselect: Some(0..prefill.len()),
            prefill,
        }) else {
            return;
        };
        self.report(self.gateway.set_upstream(row.repo_id, name, &upstream));
    }

    pub fn unset_upstream(&self, row: &BranchRow) {
        let Some(name) = row.branch.as_deref() else {
            return;
        };
        self.report(self.gateway.unset_upstream(row.repo_id, name));
    }

    pub fn sync(&self, row: &BranchRow) {
        let Some(name) = row.branch.as_deref() else {
            return;
        };
        self.ui.begin_progress(&format!("Syncing {name}"));
        let result = self.gateway.sync_branch(row.repo_id, name);
        self.ui.end_progress();
        self.report_sync(name, result);
    }

    /// Fetch then checkout as sequential gateway calls under one
    /// progress scope; a failed fetch leaves HEAD where it was.
    pub fn sync_then_checkout(&self, row: &BranchRow) {
        let Some(name) = row.branch.as_deref() else {
            return;
        };
        self.ui.begin_progress(&format!("Syncing {name}"));
        let result = self
            .gateway
            .sync_branch(row.repo_id, name)
            .and_then(|()| self.gateway.checkout_branch(row.repo_id, name));
        self.ui.end_progress();
        self.report_sync(name, result);
    }

    fn rename_request(&self, name: &str) -> InputRequest {
        let settings = self.settings.read().expect("settings lock poisoned");
        let preselect = match settings.branch_prefix.as_deref() {
            Some(prefix)
                if settings.rename_respects_prefix
                    && name.len() > prefix.len()
                    && name.starts_with(prefix) =>
            {
                prefix.len()..name.len()
            }
            _ => 0..name.len(),
        };
        InputRequest {
            prompt: format!("Renaming branch from '{name}'"),
            placeholder: Some("Enter a branch name".to_string()),
            prefill: name.to_string(),
            preselect: Some(preselect),
        }
    }

    fn report(&self, result: Result<()>) {
        if let Err(err) = result {
            self.ui.notify_error(&err.to_string());
        }
    }

    fn report_sync(&self, name: &str, result: Result<()>) {
        match result {
            Ok(()) => self.ui.notify_info(&format!("Synced {name}")),
            Err(err) => self.ui.notify_error(&err.to_string()),
        }
    }
}
