use crate::gateway::{RepoEntry, RepoId};
use branchbar_core::domain::{Branch, Upstream, UpstreamDivergence};

/// One line of the sidebar. `branch == None` marks a repository
/// grouping row; everything else is a branch under that repository.
///
/// Rows are rebuilt wholesale on every refresh, never mutated in place.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BranchRow {
    pub repo_id: RepoId,
    pub repo_label: String,
    pub branch: Option<String>,
    pub selected: bool,
    pub upstream: Option<Upstream>,
    pub annotation: Option<String>,
}

impl BranchRow {
    pub fn is_repo_row(&self) -> bool {
        self.branch.is_none()
    }
}

pub fn repo_row(entry: &RepoEntry) -> BranchRow {
    BranchRow {
        repo_id: entry.id,
        repo_label: entry.spec.label(),
        branch: None,
        selected: false,
        upstream: None,
        annotation: None,
    }
}

pub fn branch_rows(
    repo_id: RepoId,
    repo_label: &str,
    branches: &[Branch],
    show_divergence: bool,
) -> Vec<BranchRow> {
    branches
        .iter()
        .map(|branch| BranchRow {
            repo_id,
            repo_label: repo_label.to_string(),
            branch: Some(branch.name.clone()),
            selected: branch.is_head,
            upstream: branch.upstream.clone(),
            annotation: if show_divergence {
                branch.divergence.and_then(divergence_annotation)
            } else {
                None
            },
        })
        .collect()
}

fn divergence_annotation(divergence: UpstreamDivergence) -> Option<String> {
    if divergence.ahead == 0 && divergence.behind == 0 {
        return None;
    }
    Some(format!("\u{2191}{} \u{2193}{}", divergence.ahead, divergence.behind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::branch;

    fn diverged(name: &str, ahead: usize, behind: usize) -> Branch {
        let mut b = branch(name, false);
        b.upstream = Some(Upstream {
            remote: "origin".to_string(),
            branch: name.to_string(),
        });
        b.divergence = Some(UpstreamDivergence { ahead, behind });
        b
    }

    #[test]
    fn head_branch_is_selected_and_diverged_branch_is_annotated() {
        let branches = vec![diverged("feature/x", 2, 1), branch("main", true)];
        let rows = branch_rows(RepoId(1), "repo", &branches, true);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].branch.as_deref(), Some("feature/x"));
        assert!(!rows[0].selected);
        assert_eq!(rows[0].upstream.as_ref().map(|u| u.short()).as_deref(), Some("origin/feature/x"));
        assert_eq!(rows[0].annotation.as_deref(), Some("\u{2191}2 \u{2193}1"));

        assert_eq!(rows[1].branch.as_deref(), Some("main"));
        assert!(rows[1].selected);
        assert_eq!(rows[1].upstream, None);
        assert_eq!(rows[1].annotation, None);
    }

    #[test]
    fn annotation_is_omitted_when_counts_are_zero() {
        let rows = branch_rows(RepoId(1), "repo", &[diverged("main", 0, 0)], true);
        assert_eq!(rows[0].annotation, None);
    }

    #[test]
    fn annotation_is_omitted_when_divergence_display_is_off() {
        let rows = branch_rows(RepoId(1), "repo", &[diverged("main", 2, 1)], false);
        assert_eq!(rows[0].annotation, None);
    }

    #[test]
    fn one_sided_divergence_still_shows_both_counters() {
        let rows = branch_rows(RepoId(1), "repo", &[diverged("main", 3, 0)], true);
        assert_eq!(rows[0].annotation.as_deref(), Some("\u{2191}3 \u{2193}0"));
    }
}
