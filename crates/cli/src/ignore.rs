//! `.runpodignore` handling for the file watcher and rsync.

use std::path::Path;

/// File name of the per-project ignore file, in the project root.
pub const IGNORE_FILE: &str = ".runpodignore";

/// Always excluded from the watch, before any user patterns.
pub const BASE_EXCLUDE: &str = r"(__pycache__|\.pyc$)";

/// Always excluded from rsync transfers.
pub const BASE_RSYNC_EXCLUDES: [&str; 3] = ["__pycache__/", "*.pyc", ".git/"];

/// Parse ignore-file content into patterns, one per non-comment, non-blank
/// line, in file order.
pub fn parse_patterns(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Build the watch exclude regex: the base fragment OR-ed with each user
/// pattern, preserving file order.
pub fn exclude_pattern(patterns: &[String]) -> String {
    let mut pattern = BASE_EXCLUDE.to_string();
    for p in patterns {
        pattern.push_str(&format!("|({p})"));
    }
    pattern
}

/// Read the project's ignore file, if present. A missing file contributes
/// no patterns.
pub async fn load_patterns(project_dir: &Path) -> std::io::Result<Vec<String>> {
    let path = project_dir.join(IGNORE_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(parse_patterns(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
