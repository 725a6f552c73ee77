//! Parsing of `git for-each-ref` branch listings.

use branchbar_core::domain::{Branch, CommitId, Upstream, UpstreamDivergence};

/// Per-ref format string for branch listings. One line per local branch:
/// HEAD marker, short name, target sha, upstream short name, upstream track.
pub const BRANCH_FORMAT: &str =
    "%(HEAD)\t%(refname:short)\t%(objectname)\t%(upstream:short)\t%(upstream:track)";

/// Parses the output of `git for-each-ref --format=BRANCH_FORMAT refs/heads`
/// into branches sorted lexicographically by name.
pub fn parse_branch_lines(output: &str) -> Vec<Branch> {
    let mut branches = Vec::new();
    for line in output.lines() {
        if let Some(branch) = parse_branch_line(line) {
            branches.push(branch);
        }
    }
    branches.sort_by(|a, b| a.name.cmp(&b.name));
    branches
}

fn parse_branch_line(line: &str) -> Option<Branch> {
    let mut parts = line.split('\t');
    let head_marker = parts.next()?;
    let name = parts.next().map(str::trim).filter(|s| !s.is_empty())?;
    let sha = parts.next().map(str::trim).filter(|s| !s.is_empty())?;
    let upstream_short = parts.next().unwrap_or("").trim();
    let track = parts.next().unwrap_or("").trim();

    let upstream = parse_upstream_short(upstream_short);
    let divergence = upstream.as_ref().and_then(|_| parse_upstream_track(track));

    Some(Branch {
        name: name.to_string(),
        target: CommitId(sha.to_string()),
        upstream,
        divergence,
        is_head: head_marker.trim() == "*",
    })
}

fn parse_upstream_short(s: &str) -> Option<Upstream> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (remote, branch) = s.split_once('/')?;
    Some(Upstream {
        remote: remote.to_string(),
        branch: branch.to_string(),
    })
}

/// Parses `%(upstream:track)` output such as `[ahead 2, behind 1]`. A gone
/// upstream reports no divergence.
fn parse_upstream_track(s: &str) -> Option<UpstreamDivergence> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.trim_start_matches('[').trim_end_matches(']');
    if s.trim().is_empty() || s.contains("gone") {
        return None;
    }

    let mut ahead: Option<usize> = None;
    let mut behind: Option<usize> = None;

    for part in s.split(',') {
        let mut it = part.trim().split_whitespace();
        let Some(kind) = it.next() else {
            continue;
        };
        let Some(n) = it.next().and_then(|x| x.parse::<usize>().ok()) else {
            continue;
        };
        match kind {
            "ahead" => ahead = Some(n),
            "behind" => behind = Some(n),
            _ => {}
        }
    }

    let ahead = ahead.unwrap_or(0);
    let behind = behind.unwrap_or(0);
    Some(UpstreamDivergence { ahead, behind })
}
