use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs, io};

/// The configuration surface plus the restored session, read at
/// startup and consulted at command-invocation time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    pub confirm_destructive: bool,
    pub rename_respects_prefix: bool,
    pub branch_prefix: Option<String>,
    pub show_divergence: bool,
    /// Candidates for the git binary, first one that answers
    /// `--version` wins. Empty means plain `git` from PATH.
    pub git_program: Vec<String>,
    pub open_repos: Vec<PathBuf>,
    pub active_repo: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confirm_destructive: false,
            rename_respects_prefix: true,
            branch_prefix: None,
            show_divergence: true,
            git_program: Vec::new(),
            open_repos: Vec::new(),
            active_repo: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct SettingsFileV1 {
    version: u32,
    open_repos: Vec<String>,
    active_repo: Option<String>,
    confirm_destructive: Option<bool>,
    rename_respects_prefix: Option<bool>,
    branch_prefix: Option<String>,
    show_divergence: Option<bool>,
    git_program: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
struct SettingsFileV2 {
    version: u32,
    open_repos: Vec<String>,
    active_repo: Option<String>,
    confirm_destructive: Option<bool>,
    rename_respects_prefix: Option<bool>,
    branch_prefix: Option<String>,
    show_divergence: Option<bool>,
    git_program: Option<Vec<String>>,
}

const SETTINGS_FILE_VERSION_V1: u32 = 1;
const SETTINGS_FILE_VERSION_V2: u32 = 2;
const CURRENT_SETTINGS_FILE_VERSION: u32 = SETTINGS_FILE_VERSION_V2;

pub fn load() -> Settings {
    let Some(path) = default_settings_file_path() else {
        return Settings::default();
    };

    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Settings {
    let Some(file) = load_file_v2(path) else {
        return Settings::default();
    };

    let defaults = Settings::default();
    let (open_repos, active_repo) = parse_repos(file.open_repos, file.active_repo);
    Settings {
        confirm_destructive: file
            .confirm_destructive
            .unwrap_or(defaults.confirm_destructive),
        rename_respects_prefix: file
            .rename_respects_prefix
            .unwrap_or(defaults.rename_respects_prefix),
        branch_prefix: file.branch_prefix.filter(|p| !p.trim().is_empty()),
        show_divergence: file.show_divergence.unwrap_or(defaults.show_divergence),
        git_program: parse_program_candidates(file.git_program.unwrap_or_default()),
        open_repos,
        active_repo,
    }
}

pub fn persist(settings: &Settings) -> io::Result<()> {
    let Some(path) = default_settings_file_path() else {
        return Ok(());
    };
    persist_to_path(settings, &path)
}

pub fn persist_to_path(settings: &Settings, path: &Path) -> io::Result<()> {
    let file = SettingsFileV2 {
        version: CURRENT_SETTINGS_FILE_VERSION,
        open_repos: settings
            .open_repos
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect(),
        active_repo: settings
            .active_repo
            .as_ref()
            .map(|p| p.to_string_lossy().to_string()),
        confirm_destructive: Some(settings.confirm_destructive),
        rename_respects_prefix: Some(settings.rename_respects_prefix),
        branch_prefix: settings.branch_prefix.clone(),
        show_divergence: Some(settings.show_divergence),
        git_program: Some(settings.git_program.clone()),
    };
    persist_file_to_path(path, &file)
}

/// Persists the session part only, leaving configured options in the
/// file untouched.
pub fn persist_session(open_repos: &[PathBuf], active_repo: Option<&Path>) -> io::Result<()> {
    let Some(path) = default_settings_file_path() else {
        return Ok(());
    };
    persist_session_to_path(open_repos, active_repo, &path)
}

pub fn persist_session_to_path(
    open_repos: &[PathBuf],
    active_repo: Option<&Path>,
    path: &Path,
) -> io::Result<()> {
    let mut repos: Vec<String> = Vec::new();
    for repo in open_repos {
        let s = repo.to_string_lossy().to_string();
        if repos.iter().any(|p| p == &s) {
            continue;
        }
        repos.push(s);
    }

    let active_repo: Option<String> = active_repo
        .map(|p| p.to_string_lossy().to_string())
        .filter(|active| repos.iter().any(|p| p == active));

    let mut file = load_file_v2(path).unwrap_or_default();
    file.version = CURRENT_SETTINGS_FILE_VERSION;
    file.open_repos = repos;
    file.active_repo = active_repo;

    persist_file_to_path(path, &file)
}

fn parse_repos(
    open_repos_raw: Vec<String>,
    active_repo_raw: Option<String>,
) -> (Vec<PathBuf>, Option<PathBuf>) {
    let mut open_repos: Vec<PathBuf> = Vec::new();
    for repo in open_repos_raw {
        let repo = repo.trim();
        if repo.is_empty() {
            continue;
        }
        let repo = PathBuf::from(repo);
        if open_repos.iter().any(|p| p == &repo) {
            continue;
        }
        open_repos.push(repo);
    }

    let active_repo = active_repo_raw
        .as_deref()
        .and_then(|p| {
            let p = p.trim();
            if p.is_empty() {
                None
            } else {
                Some(PathBuf::from(p))
            }
        })
        .filter(|active| open_repos.iter().any(|p| p == active));

    (open_repos, active_repo)
}

fn parse_program_candidates(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn load_file_v2(path: &Path) -> Option<SettingsFileV2> {
    let Ok(contents) = fs::read_to_string(path) else {
        return None;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&contents) else {
        return None;
    };
    let version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .unwrap_or(SETTINGS_FILE_VERSION_V1 as u64) as u32;
    match version {
        SETTINGS_FILE_VERSION_V1 => {
            let file: SettingsFileV1 = serde_json::from_value(value).ok()?;
            // V1 stored a single program path; V2 stores an ordered
            // candidate list.
            let git_program = file
                .git_program
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .map(|p| vec![p]);
            Some(SettingsFileV2 {
                version: CURRENT_SETTINGS_FILE_VERSION,
                open_repos: file.open_repos,
                active_repo: file.active_repo,
                confirm_destructive: file.confirm_destructive,
                rename_respects_prefix: file.rename_respects_prefix,
                branch_prefix: file.branch_prefix,
                show_divergence: file.show_divergence,
                git_program,
            })
        }
        SETTINGS_FILE_VERSION_V2 => serde_json::from_value::<SettingsFileV2>(value).ok(),
        _ => None,
    }
}

fn persist_file_to_path(path: &Path, file: &impl Serialize) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let contents = serde_json::to_vec(file).expect("serializing settings file should succeed");
    fs::write(&tmp_path, contents)?;

    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            // Windows can't overwrite an existing file via rename.
            let copy_res = fs::copy(&tmp_path, path);
            let _ = fs::remove_file(&tmp_path);
            match copy_res {
                Ok(_) => Ok(()),
                Err(copy_err) => Err(io::Error::new(
                    copy_err.kind(),
                    format!("rename failed: {rename_err}; copy failed: {copy_err}"),
                )),
            }
        }
    }
}

fn default_settings_file_path() -> Option<PathBuf> {
    // Avoid writing to user state dir during unit tests unless explicitly exercised.
    if cfg!(test) {
        return None;
    }

    Some(app_state_dir()?.join("settings.json"))
}

pub fn app_state_dir() -> Option<PathBuf> {
    // Follow XDG on linux; otherwise fall back to platform conventions.
    #[cfg(target_os = "linux")]
    {
        if let Some(state_home) = env::var_os("XDG_STATE_HOME") {
            return Some(PathBuf::from(state_home).join("branchbar"));
        }
        let home = env::var_os("HOME")?;
        Some(PathBuf::from(home).join(".local/state/branchbar"))
    }

    #[cfg(target_os = "macos")]
    {
        let home = env::var_os("HOME")?;
        return Some(PathBuf::from(home).join("Library/Application Support/branchbar"));
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = env::var_os("LOCALAPPDATA").or_else(|| env::var_os("APPDATA"))?;
        return Some(PathBuf::from(appdata).join("branchbar"));
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".branchbar"))
    }
}
