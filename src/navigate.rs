//! Open-match navigation
//!
//! Search results carry a file and a line number, not an offset. When the
//! host opens a match it re-locates the pattern on that line with the same
//! literal/case rules as the engine; the file may have changed since the
//! search, in which case the line can legitimately no longer match.
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{QuarryError, Result};
use crate::search::CompiledPattern;

/// Byte range to select, relative to the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub len: usize,
}

/// Resolve `file` against `root` and find the first match of `query` on the
/// 1-based `line_num`. Errors with `NoMatchOnLine` when the line is gone or
/// no longer contains the pattern.
pub fn locate_match(
    root: &Path,
    file: &Path,
    line_num: usize,
    query: &str,
    literal_match: bool,
    match_case: bool,
) -> Result<Selection> {
    let path = resolve(root, file);
    let pattern = CompiledPattern::compile(query, literal_match, match_case)?;

    let content = fs::read_to_string(&path).map_err(|source| QuarryError::FileAccess {
        path: path.clone(),
        source,
    })?;

    let line = content
        .lines()
        .nth(line_num.saturating_sub(1))
        .ok_or_else(|| QuarryError::NoMatchOnLine {
            path: path.clone(),
            line: line_num,
        })?;

    match pattern.find(line) {
        Some((start, end)) => Ok(Selection {
            start,
            len: end - start,
        }),
        None => Err(QuarryError::NoMatchOnLine {
            path,
            line: line_num,
        }),
    }
}

fn resolve(root: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    }
}
