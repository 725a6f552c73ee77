use branchbar_core::services::GitBackend;
use branchbar_git::CliBackend;
use std::fs;
use std::path::Path;
use std::process::Command;

fn run_git(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .status()
        .expect("git command to run");
    assert!(status.success(), "git {:?} failed", args);
}

fn run_git_capture(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .expect("git command to run");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn init_work_repo(root: &Path) -> std::path::PathBuf {
    let work_repo = root.join("work");
    fs::create_dir_all(&work_repo).unwrap();

    run_git(&work_repo, &["init", "-b", "main"]);
    run_git(&work_repo, &["config", "user.email", "you@example.com"]);
    run_git(&work_repo, &["config", "user.name", "You"]);
    run_git(&work_repo, &["config", "commit.gpgsign", "false"]);

    fs::write(work_repo.join("file.txt"), "hi\n").unwrap();
    run_git(&work_repo, &["add", "file.txt"]);
    run_git(&work_repo, &["commit", "-m", "init"]);

    work_repo
}

fn commit_change(repo: &Path, contents: &str, message: &str) {
    fs::write(repo.join("file.txt"), contents).unwrap();
    run_git(repo, &["add", "file.txt"]);
    run_git(repo, &["commit", "-m", message]);
}

#[test]
fn open_rejects_a_plain_directory() {
    let dir = tempfile::tempdir().unwrap();
    let plain = dir.path().join("plain");
    fs::create_dir_all(&plain).unwrap();

    let backend = CliBackend::default();
    assert!(backend.open(&plain).is_err());
}

#[test]
fn create_branch_checks_it_out() {
    let dir = tempfile::tempdir().unwrap();
    let work_repo = init_work_repo(dir.path());

    let backend = CliBackend::default();
    let repo = backend.open(&work_repo).unwrap();

    repo.create_branch("feature/next").unwrap();

    assert_eq!(repo.current_branch().unwrap(), "feature/next");
    let branches = repo.list_branches().unwrap();
    let names: Vec<_> = branches.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["feature/next", "main"]);
    assert!(branches[0].is_head);
    assert!(!branches[1].is_head);
}

#[test]
fn rename_current_branch_uses_single_argument_form() {
    let dir = tempfile::tempdir().unwrap();
    let work_repo = init_work_repo(dir.path());

    let backend = CliBackend::default();
    let repo = backend.open(&work_repo).unwrap();

    repo.rename_branch(None, "trunk").unwrap();
    assert_eq!(repo.current_branch().unwrap(), "trunk");
}

#[test]
fn rename_other_branch_leaves_head_alone() {
    let dir = tempfile::tempdir().unwrap();
    let work_repo = init_work_repo(dir.path());
    run_git(&work_repo, &["branch", "side"]);

    let backend = CliBackend::default();
    let repo = backend.open(&work_repo).unwrap();

    repo.rename_branch(Some("side"), "renamed-side").unwrap();

    assert_eq!(repo.current_branch().unwrap(), "main");
    let names: Vec<_> = repo
        .list_branches()
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["main", "renamed-side"]);
}

#[test]
fn delete_branch_is_forced() {
    let dir = tempfile::tempdir().unwrap();
    let work_repo = init_work_repo(dir.path());

    // An unmerged branch would survive a plain -d.
    run_git(&work_repo, &["checkout", "-b", "doomed"]);
    commit_change(&work_repo, "hi\nunmerged\n", "unmerged work");
    run_git(&work_repo, &["checkout", "main"]);

    let backend = CliBackend::default();
    let repo = backend.open(&work_repo).unwrap();
    repo.delete_branch("doomed").unwrap();

    let names: Vec<_> = repo
        .list_branches()
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["main"]);
}

#[test]
fn list_branches_reports_upstream_and_divergence() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let remote_repo = root.join("remote.git");
    fs::create_dir_all(&remote_repo).unwrap();
    run_git(&remote_repo, &["init", "--bare"]);

    let work_repo = init_work_repo(root);
    run_git(
        &work_repo,
        &[
            "remote",
            "add",
            "origin",
            remote_repo.to_str().expect("remote path"),
        ],
    );

    commit_change(&work_repo, "hi\nb\n", "b");
    commit_change(&work_repo, "hi\nb\nc\n", "c");
    run_git(&work_repo, &["push", "-u", "origin", "main"]);

    // Drop the remote's newest commit locally, then add two of our own:
    // 2 ahead, 1 behind.
    run_git(&work_repo, &["reset", "--hard", "HEAD~1"]);
    commit_change(&work_repo, "hi\nb\nd\n", "d");
    commit_change(&work_repo, "hi\nb\nd\ne\n", "e");

    let backend = CliBackend::default();
    let repo = backend.open(&work_repo).unwrap();
    let branches = repo.list_branches().unwrap();
    assert_eq!(branches.len(), 1);

    let main = &branches[0];
    assert!(main.is_head);
    let upstream = main.upstream.as_ref().expect("upstream is set");
    assert_eq!(upstream.remote, "origin");
    assert_eq!(upstream.branch, "main");
    let divergence = main.divergence.expect("divergence is known");
    assert_eq!(divergence.ahead, 2);
    assert_eq!(divergence.behind, 1);
}

#[test]
fn set_and_unset_upstream_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let remote_repo = root.join("remote.git");
    fs::create_dir_all(&remote_repo).unwrap();
    run_git(&remote_repo, &["init", "--bare"]);

    let work_repo = init_work_repo(root);
    run_git(
        &work_repo,
        &[
            "remote",
            "add",
            "origin",
            remote_repo.to_str().expect("remote path"),
        ],
    );
    run_git(&work_repo, &["push", "origin", "HEAD:refs/heads/main"]);
    run_git(&work_repo, &["fetch", "origin"]);

    let backend = CliBackend::default();
    let repo = backend.open(&work_repo).unwrap();

    repo.set_upstream("main", "origin/main").unwrap();
    let upstream = run_git_capture(
        &work_repo,
        &["for-each-ref", "--format=%(upstream:short)", "refs/heads/main"],
    )
    .trim()
    .to_string();
    assert_eq!(upstream, "origin/main");

    repo.unset_upstream("main").unwrap();
    let upstream = run_git_capture(
        &work_repo,
        &["for-each-ref", "--format=%(upstream:short)", "refs/heads/main"],
    )
    .trim()
    .to_string();
    assert!(upstream.is_empty());
}

#[test]
fn fetch_into_branch_updates_local_ref_without_checkout() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let remote_repo = root.join("remote.git");
    fs::create_dir_all(&remote_repo).unwrap();
    run_git(&remote_repo, &["init", "--bare"]);

    let work_repo = init_work_repo(root);
    run_git(
        &work_repo,
        &[
            "remote",
            "add",
            "origin",
            remote_repo.to_str().expect("remote path"),
        ],
    );

    run_git(&work_repo, &["checkout", "-b", "feature"]);
    commit_change(&work_repo, "hi\nfeature\n", "feature work");
    run_git(&work_repo, &["push", "-u", "origin", "feature"]);

    // Advance the remote's copy of the branch from a second clone.
    let other_repo = root.join("other");
    run_git(
        root,
        &[
            "clone",
            remote_repo.to_str().expect("remote path"),
            other_repo.to_str().expect("other path"),
        ],
    );
    run_git(&other_repo, &["config", "user.email", "you@example.com"]);
    run_git(&other_repo, &["config", "user.name", "You"]);
    run_git(&other_repo, &["config", "commit.gpgsign", "false"]);
    run_git(&other_repo, &["checkout", "feature"]);
    commit_change(&other_repo, "hi\nfeature\nmore\n", "remote work");
    run_git(&other_repo, &["push", "origin", "feature"]);

    // Sync from main so `feature` is not the checked-out branch.
    run_git(&work_repo, &["checkout", "main"]);

    let backend = CliBackend::default();
    let repo = backend.open(&work_repo).unwrap();
    repo.fetch_into_branch("feature").unwrap();

    let local = run_git_capture(&work_repo, &["rev-parse", "refs/heads/feature"]);
    let remote = run_git_capture(&other_repo, &["rev-parse", "refs/heads/feature"]);
    assert_eq!(local.trim(), remote.trim());
    assert_eq!(repo.current_branch().unwrap(), "main");
}

#[test]
fn fetch_into_branch_without_upstream_fails() {
    let dir = tempfile::tempdir().unwrap();
    let work_repo = init_work_repo(dir.path());

    let backend = CliBackend::default();
    let repo = backend.open(&work_repo).unwrap();
    assert!(repo.fetch_into_branch("main").is_err());
}
