use std::path::{Path, PathBuf};
use std::process::Command;

/// Resolves the git executable to invoke. Candidates come from user
/// configuration in preference order; the first one that answers
/// `--version` wins, otherwise plain `git` from PATH is used.
pub fn resolve(candidates: &[String]) -> PathBuf {
    for candidate in candidates {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            continue;
        }
        if answers_version(Path::new(candidate)) {
            return PathBuf::from(candidate);
        }
    }
    PathBuf::from("git")
}

fn answers_version(program: &Path) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}
