//! Project-wide search: one ordered, lazily-produced hit stream per request
use log::{debug, warn};
use std::path::PathBuf;

use crate::error::Result;
use crate::walker::Walker;

use super::scanner::{scan, Hit};
use super::{CompiledPattern, SearchRequest};

/// Runs one [`SearchRequest`] over a walker's file list. Each call to
/// [`WordSearch::stream`] is a fresh, independent pass; nothing is shared
/// between calls.
pub struct WordSearch {
    request: SearchRequest,
}

impl WordSearch {
    pub fn new(request: SearchRequest) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    /// Compile the pattern and open a lazy hit stream over the walker's
    /// files. Compilation failure surfaces here, before any file is read.
    pub fn stream<'w>(&self, walker: &'w dyn Walker) -> Result<HitStream<'w>> {
        let pattern = self.request.compile()?;
        let files = walker.files();
        debug!(
            "searching {} files for {:?}",
            files.len(),
            self.request.query
        );
        Ok(HitStream {
            walker,
            pattern,
            context_lines: self.request.context_size(),
            files: files.into_iter(),
            current: Vec::new().into_iter(),
        })
    }
}

/// Ordered hit sequence: grouped by file in enumeration order, strictly
/// increasing line numbers within a file. Unreadable files are skipped.
pub struct HitStream<'w> {
    walker: &'w dyn Walker,
    pattern: CompiledPattern,
    context_lines: usize,
    files: std::vec::IntoIter<PathBuf>,
    current: std::vec::IntoIter<Hit>,
}

impl Iterator for HitStream<'_> {
    type Item = Hit;

    fn next(&mut self) -> Option<Hit> {
        loop {
            if let Some(hit) = self.current.next() {
                return Some(hit);
            }
            let path = self.files.next()?;
            match self.walker.read_lines(&path) {
                Ok(lines) => {
                    self.current =
                        scan(&path, &lines, &self.pattern, self.context_lines).into_iter();
                }
                Err(e) => {
                    warn!("Skipping {}: {e}", path.display());
                }
            }
        }
    }
}
