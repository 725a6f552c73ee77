use branchbar_core::services::Result;
use branchbar_state::{BranchRow, HostUi, InputRequest, TreeController};
use std::io::{self, BufRead, Write};

/// Line-oriented host: prompts and confirms read one line from stdin,
/// EOF counts as a dismissal.
pub struct TerminalUi;

impl HostUi for TerminalUi {
    fn prompt_input(&self, request: InputRequest) -> Option<String> {
        if request.prefill.is_empty() {
            match &request.placeholder {
                Some(hint) => print!("{} ({hint}): ", request.prompt),
                None => print!("{}: ", request.prompt),
            }
        } else {
            print!("{} (current: {}): ", request.prompt, request.prefill);
        }
        let _ = io::stdout().flush();

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).unwrap_or(0) == 0 {
            return None;
        }
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn confirm(&self, message: &str) -> bool {
        print!("{message} [y/N]: ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).unwrap_or(0) == 0 {
            return false;
        }
        matches!(line.trim(), "y" | "Y" | "yes")
    }

    fn notify_info(&self, message: &str) {
        println!("{message}");
    }

    fn notify_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn begin_progress(&self, label: &str) {
        println!("{label}...");
    }

    fn end_progress(&self) {}
}

/// Root rows with each grouping row's children spliced in below it, in
/// render order. Row indices into this list are what commands take.
pub fn visible_rows(tree: &TreeController) -> Result<Vec<BranchRow>> {
    let mut rows = Vec::new();
    for root in tree.root_nodes()? {
        let children = if root.is_repo_row() {
            tree.children(&root)?
        } else {
            Vec::new()
        };
        rows.push(root);
        rows.extend(children);
    }
    Ok(rows)
}

pub fn render(rows: &[BranchRow]) {
    if rows.is_empty() {
        println!("(no repositories open)");
        return;
    }
    for (idx, row) in rows.iter().enumerate() {
        println!("{idx:>3} {}", format_row(row));
    }
}

fn format_row(row: &BranchRow) -> String {
    let Some(name) = row.branch.as_deref() else {
        return format!("{}/", row.repo_label);
    };

    let marker = if row.selected { "*" } else { " " };
    let mut line = format!("  {marker} {name}");
    if let Some(upstream) = &row.upstream {
        line.push_str(" -> ");
        line.push_str(&upstream.short());
    }
    if let Some(annotation) = &row.annotation {
        line.push(' ');
        line.push_str(annotation);
    }
    line
}
