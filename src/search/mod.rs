//! Pattern compilation and the project-wide search engine
pub mod engine;
pub mod scanner;

use regex::{Regex, RegexBuilder};

use crate::error::Result;

pub use engine::{HitStream, WordSearch};
pub use scanner::{scan, Hit};

/// One search as requested by the user. Immutable once built; drives
/// pattern compilation and context sizing.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    /// Treat the query as literal text rather than a regex.
    pub literal_match: bool,
    pub match_case: bool,
    pub with_context: bool,
    pub context_lines: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            literal_match: false,
            match_case: false,
            with_context: true,
            context_lines: 2,
        }
    }

    /// Effective context window size: zero when context display is off.
    pub fn context_size(&self) -> usize {
        if self.with_context {
            self.context_lines
        } else {
            0
        }
    }

    /// Compile the query into a matchable pattern. Malformed regex queries
    /// are reported as `QuarryError::Pattern`, never a panic.
    pub fn compile(&self) -> Result<CompiledPattern> {
        CompiledPattern::compile(
            &self.query,
            self.literal_match,
            self.match_case,
        )
    }
}

/// A compiled query: literal queries are escaped before compilation,
/// case-insensitive unless `match_case` was set.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
}

impl CompiledPattern {
    pub fn compile(query: &str, literal_match: bool, match_case: bool) -> Result<Self> {
        let source = if literal_match {
            regex::escape(query)
        } else {
            query.to_string()
        };
        let regex = RegexBuilder::new(&source)
            .case_insensitive(!match_case)
            .build()?;
        Ok(Self { regex })
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// Byte range of the first match on `line`, if any.
    pub fn find(&self, line: &str) -> Option<(usize, usize)> {
        self.regex.find(line).map(|m| (m.start(), m.end()))
    }
}
