use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

/// Walk up from `start` to find a directory containing `.claude/`.
/// Returns that directory (the project root) if found.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(".claude").is_dir() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Project root for `cwd`, or `cwd` itself when no `.claude/` is found above it.
pub fn project_root_or_cwd(cwd: &Path) -> PathBuf {
    find_project_root(cwd).unwrap_or_else(|| cwd.to_path_buf())
}

/// Log a hook failure to `.claude/.hook-errors.log` under the project root.
/// Trims to 50 entries (keeps last 30) to prevent unbounded growth.
pub fn log_hook_error(project_root: &Path, event_name: &str, exit_code: i32, message: &str) {
    let claude_dir = project_root.join(".claude");
    if !claude_dir.is_dir() {
        return;
    }

    let log_path = claude_dir.join(".hook-errors.log");
    let ts = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let first_line = message.lines().next().unwrap_or("");
    let entry = format!("[{}] {} exit={} {}\n", ts, event_name, exit_code, first_line);

    if let Ok(mut f) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = f.write_all(entry.as_bytes());
    }

    trim_log_file(&log_path, 50, 30);
}

/// Trim a log file: if it exceeds `max_lines`, keep only the last `keep_lines`.
fn trim_log_file(path: &Path, max_lines: usize, keep_lines: usize) {
    if let Ok(content) = fs::read_to_string(path) {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() > max_lines {
            let mut output = lines[lines.len() - keep_lines..].join("\n");
            output.push('\n');
            let _ = fs::write(path, output);
        }
    }
}
