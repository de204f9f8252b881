//! Line-level match scanning for a single file
use std::path::{Path, PathBuf};

use super::CompiledPattern;

/// One matched line plus its surrounding context window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub file: PathBuf,
    /// 1-based line number of the matched line.
    pub line_num: usize,
    pub line: String,
    /// Lines immediately before the match, oldest first. At most
    /// `context_lines` entries, fewer near the start of the file.
    pub pre_context: Vec<String>,
    /// Lines immediately after the match, at most `context_lines` entries.
    pub post_context: Vec<String>,
}

/// Scan one file's lines, yielding a `Hit` for every matching line in
/// increasing line order. A line with several matches still yields exactly
/// one `Hit`; the first match position is recomputed at open time.
pub fn scan(
    file: &Path,
    lines: &[String],
    pattern: &CompiledPattern,
    context_lines: usize,
) -> Vec<Hit> {
    let mut hits = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if !pattern.is_match(line) {
            continue;
        }
        let pre_start = i.saturating_sub(context_lines);
        let post_end = (i + 1 + context_lines).min(lines.len());
        hits.push(Hit {
            file: file.to_path_buf(),
            line_num: i + 1,
            line: line.clone(),
            pre_context: lines[pre_start..i].to_vec(),
            post_context: lines[i + 1..post_end].to_vec(),
        });
    }
    hits
}
