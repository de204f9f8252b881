//! Project file enumeration
//!
//! The engine consumes files through the [`Walker`] trait: an ordered, finite
//! list of paths plus a line accessor. Order is stable within one search and
//! determines file grouping and numbering in the output.
use ignore::WalkBuilder;
use log::warn;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const BINARY_CHECK_SIZE: usize = 8192;

pub trait Walker: Send + Sync {
    /// Ordered list of candidate files. No duplicates; stable across calls.
    fn files(&self) -> Vec<PathBuf>;

    /// Read one file as lines. An `Err` means the file is skipped, not that
    /// the scan aborts.
    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>>;
}

/// Gitignore-aware walker over a project root, backed by the `ignore` crate.
pub struct ProjectWalker {
    root: PathBuf,
    show_hidden: bool,
}

impl ProjectWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            show_hidden: false,
        }
    }

    pub fn show_hidden(mut self, show_hidden: bool) -> Self {
        self.show_hidden = show_hidden;
        self
    }
}

impl Walker for ProjectWalker {
    fn files(&self) -> Vec<PathBuf> {
        WalkBuilder::new(&self.root)
            .hidden(!self.show_hidden)
            .git_global(!self.show_hidden)
            .git_ignore(!self.show_hidden)
            .git_exclude(!self.show_hidden)
            .ignore(!self.show_hidden)
            .sort_by_file_path(|a, b| a.cmp(b))
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry: {e}");
                    None
                }
            })
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                if is_binary(path) {
                    warn!("Skipping binary file: {}", path.display());
                    false
                } else {
                    true
                }
            })
            .collect()
    }

    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.lines().map(str::to_string).collect())
    }
}

/// NUL-byte heuristic over the first 8KB, as grep-alikes do.
pub fn is_binary(file: &Path) -> bool {
    if let Ok(mut file) = File::open(file) {
        let mut buffer = vec![0u8; BINARY_CHECK_SIZE];
        if let Ok(n) = file.read(&mut buffer) {
            if n > 0 {
                let null_bytes = buffer[..n].iter().filter(|&&b| b == 0).count();
                return (null_bytes as f64 / n as f64) > 0.3;
            }
        }
    }
    false
}
