use std::path::PathBuf;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RepoSpec {
    pub workdir: PathBuf,
}

impl RepoSpec {
    /// Display label for a repository: the last path component, or the full
    /// path when it has none (e.g. `/`).
    pub fn label(&self) -> String {
        self.workdir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.workdir.to_string_lossy().to_string())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CommitId(pub String);

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A local branch with its upstream tracking metadata.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Branch {
    pub name: String,
    pub target: CommitId,
    pub upstream: Option<Upstream>,
    pub divergence: Option<UpstreamDivergence>,
    pub is_head: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Upstream {
    pub remote: String,
    pub branch: String,
}

impl Upstream {
    /// The `remote/branch` form used by `git branch -u` and friends.
    pub fn short(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct UpstreamDivergence {
    pub ahead: usize,
    pub behind: usize,
}
