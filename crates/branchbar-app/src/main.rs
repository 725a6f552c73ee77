mod crashlog;
mod ui;

use branchbar_core::services::GitBackend;
use branchbar_git::CliBackend;
use branchbar_state::settings::{self, Settings};
use branchbar_state::{
    BranchRow, CommandDispatcher, Gateway, RepoWatcherManager, TreeController, TreeEvent,
    WatchEvent,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

fn main() {
    crashlog::install();

    let settings = settings::load();

    let backend: Arc<dyn GitBackend> = if cfg!(feature = "gix") {
        #[cfg(feature = "gix")]
        {
            Arc::new(branchbar_git_gix::GixBackend::default())
        }

        #[cfg(not(feature = "gix"))]
        {
            cli_backend(&settings)
        }
    } else {
        cli_backend(&settings)
    };

    let (gateway, gateway_rx) = Gateway::new(backend);
    gateway.open_repositories(startup_repos(&settings));

    let (tree, tree_rx) = TreeController::new(Arc::clone(&gateway), gateway_rx);
    tree.set_show_divergence(settings.show_divergence);

    let (watch_tx, watch_rx) = mpsc::channel::<WatchEvent>();
    let mut watchers = RepoWatcherManager::new();
    sync_watchers(&mut watchers, &gateway, &watch_tx);
    {
        let gateway = Arc::clone(&gateway);
        thread::spawn(move || {
            while watch_rx.recv().is_ok() {
                gateway.refresh();
            }
        });
    }

    let dispatcher = CommandDispatcher::new(
        Arc::clone(&gateway),
        Arc::new(ui::TerminalUi),
        settings.clone(),
    );

    repl(&gateway, &tree, &tree_rx, &dispatcher, &mut watchers, &watch_tx);

    watchers.stop_all();

    let open: Vec<PathBuf> = gateway
        .list_repositories()
        .into_iter()
        .map(|entry| entry.spec.workdir)
        .collect();
    if let Err(err) = settings::persist_session(&open, settings.active_repo.as_deref()) {
        eprintln!("failed to persist session: {err}");
    }
}

fn cli_backend(settings: &Settings) -> Arc<dyn GitBackend> {
    if settings.git_program.is_empty() {
        branchbar_git::default_backend()
    } else {
        Arc::new(CliBackend::with_candidates(&settings.git_program))
    }
}

/// Command-line paths win over the restored session; with neither, the
/// current directory is tried.
fn startup_repos(settings: &Settings) -> Vec<PathBuf> {
    let args: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if !args.is_empty() {
        return args;
    }
    if !settings.open_repos.is_empty() {
        return settings.open_repos.clone();
    }
    std::env::current_dir().into_iter().collect()
}

/// Starts a watcher for every open repository and stops the ones whose
/// repository has been closed.
fn sync_watchers(
    watchers: &mut RepoWatcherManager,
    gateway: &Gateway,
    watch_tx: &mpsc::Sender<WatchEvent>,
) {
    let entries = gateway.list_repositories();
    for entry in &entries {
        watchers.start(entry.id, entry.spec.workdir.clone(), watch_tx.clone());
    }
    for id in watchers.running_repo_ids() {
        if !entries.iter().any(|entry| entry.id == id) {
            watchers.stop(id);
        }
    }
}

fn repl(
    gateway: &Arc<Gateway>,
    tree: &TreeController,
    tree_rx: &mpsc::Receiver<TreeEvent>,
    dispatcher: &CommandDispatcher,
    watchers: &mut RepoWatcherManager,
    watch_tx: &mpsc::Sender<WatchEvent>,
) {
    print_rows(tree);

    let mut line = String::new();
    loop {
        // Give the tree thread a moment to apply whatever the last
        // command or watcher broadcast changed, then re-render once.
        let mut invalidated = false;
        while let Ok(TreeEvent::Invalidated) = tree_rx.recv_timeout(Duration::from_millis(50)) {
            invalidated = true;
        }
        if invalidated {
            print_rows(tree);
        }

        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (cmd, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (trimmed, ""),
        };

        match cmd {
            "q" | "quit" => break,
            "help" | "?" => print_help(),
            "ls" => print_rows(tree),
            "refresh" => dispatcher.refresh(),
            "open" => {
                if rest.is_empty() {
                    println!("usage: open <path>");
                } else if let Err(err) = gateway.open_repository(Path::new(rest)) {
                    eprintln!("error: {err}");
                }
                sync_watchers(watchers, gateway, watch_tx);
            }
            "close" => {
                with_row(tree, rest, |row| gateway.close_repository(row.repo_id));
                sync_watchers(watchers, gateway, watch_tx);
            }
            "new" => {
                if !rest.is_empty() {
                    with_row(tree, rest, |row| dispatcher.create_branch_in(row.repo_id));
                } else if tree.current_repository().is_some() {
                    dispatcher.create_branch();
                } else {
                    println!("several repositories are open; use `new <row>`");
                }
            }
            "co" => with_row(tree, rest, |row| dispatcher.checkout(row)),
            "mv" => with_row(tree, rest, |row| dispatcher.rename(row)),
            "rm" => with_row(tree, rest, |row| dispatcher.delete(row)),
            "track" => with_row(tree, rest, |row| dispatcher.set_upstream(row)),
            "untrack" => with_row(tree, rest, |row| dispatcher.unset_upstream(row)),
            "sync" => with_row(tree, rest, |row| dispatcher.sync(row)),
            "sync-co" => with_row(tree, rest, |row| dispatcher.sync_then_checkout(row)),
            other => println!("unknown command `{other}`; try `help`"),
        }
    }
}

fn with_row(tree: &TreeController, arg: &str, act: impl FnOnce(&BranchRow)) {
    let Ok(idx) = arg.parse::<usize>() else {
        println!("expected a row number");
        return;
    };
    let rows = match ui::visible_rows(tree) {
        Ok(rows) => rows,
        Err(err) => {
            eprintln!("error: {err}");
            return;
        }
    };
    let Some(row) = rows.get(idx) else {
        println!("no row {idx}");
        return;
    };
    act(row);
}

fn print_rows(tree: &TreeController) {
    match ui::visible_rows(tree) {
        Ok(rows) => ui::render(&rows),
        Err(err) => eprintln!("error: {err}"),
    }
}

fn print_help() {
    println!("ls                 show the branch tree");
    println!("open <path>        open a repository");
    println!("close <row>        close the repository behind a row");
    println!("new [row]          create a branch and switch to it");
    println!("co <row>           check out the branch");
    println!("mv <row>           rename the branch");
    println!("rm <row>           delete the branch");
    println!("track <row>        set the branch upstream");
    println!("untrack <row>      stop tracking the upstream");
    println!("sync <row>         fetch the upstream into the branch");
    println!("sync-co <row>      sync, then check the branch out");
    println!("refresh            re-read every repository");
    println!("quit               exit");
}
