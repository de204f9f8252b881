//! Incremental result rendering
//!
//! The search worker does not build a result document; it drives a sink with
//! an ordered stream of [`RenderCommand`]s as hits arrive. A consumer that
//! applies the commands in order reproduces the full result view, and any
//! prefix of the stream is a valid partial view (a superseded job simply
//! stops mid-stream).
use log::warn;
use std::path::PathBuf;

use crate::error::Result;
use crate::search::Hit;

/// One UI mutation. Commands carry raw text; escaping for the target
/// rendering medium is the sink's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCommand {
    /// Clear the result area and show the in-progress placeholder.
    ResetResults,
    ShowSpinner,
    HideSpinner,
    HideSummary,
    /// Reset the file and line counters to zero.
    ResetCounters,
    ShowNoResults,
    /// Create the result table if it does not exist yet.
    EnsureTable,
    ShowSummary,
    /// New total of files containing at least one match.
    FileCount(usize),
    /// Separator row between file groups.
    BreakRow,
    FileHeading {
        file: PathBuf,
        file_num: usize,
    },
    /// Visual break between two hits in the same file whose context windows
    /// are disjoint.
    GapDivider {
        file_num: usize,
    },
    /// One rendered source line (match or context). Consumers must treat a
    /// repeated `(file_num, line_num)` pair as a no-op.
    LineRow {
        file_num: usize,
        line_num: usize,
        file: PathBuf,
        text: String,
    },
    /// New total of matched lines.
    LineCount(usize),
    /// Strip the stray separator emitted before the first file heading.
    RemoveLeadingBlankRow,
}

/// Receiving end of the command stream.
pub trait UiSink: Send {
    fn apply(&mut self, command: RenderCommand) -> Result<()>;
}

/// Per-job counters and grouping state, discarded when the job ends.
#[derive(Debug, Default)]
struct RenderState {
    file_count: usize,
    line_count: usize,
    last_file: Option<PathBuf>,
    last_match_line: Option<usize>,
    /// Highest row number already emitted for the current file, for
    /// overlapping-context dedupe.
    last_emitted_row: usize,
    any_hits: bool,
}

/// Turns an ordered hit stream into the command sequence of the protocol.
/// Drive it with `begin`, then `push` per hit, then `finish`; a cancelled
/// job abandons it after any `push`.
pub struct Renderer<'s> {
    sink: &'s mut dyn UiSink,
    state: RenderState,
    with_context: bool,
    context_lines: usize,
}

impl<'s> Renderer<'s> {
    pub fn new(sink: &'s mut dyn UiSink, with_context: bool, context_lines: usize) -> Self {
        Self {
            sink,
            state: RenderState::default(),
            with_context,
            context_lines,
        }
    }

    /// Stream start: clear previous results, show progress.
    pub fn begin(&mut self) {
        self.emit(RenderCommand::ResetResults);
        self.emit(RenderCommand::ShowSpinner);
        self.emit(RenderCommand::HideSummary);
        self.emit(RenderCommand::ResetCounters);
    }

    pub fn push(&mut self, hit: &Hit) {
        if !self.state.any_hits {
            self.state.any_hits = true;
            self.emit(RenderCommand::EnsureTable);
            self.emit(RenderCommand::ShowSummary);
        }

        let new_file = self.state.last_file.as_deref() != Some(hit.file.as_path());
        if new_file {
            self.state.file_count += 1;
            self.state.last_emitted_row = 0;
            self.emit(RenderCommand::FileCount(self.state.file_count));
            // Emitted even before the very first heading; the stray leading
            // separator is stripped again at stream end.
            self.emit(RenderCommand::BreakRow);
            self.emit(RenderCommand::FileHeading {
                file: hit.file.clone(),
                file_num: self.state.file_count,
            });
        } else if self.with_context {
            if let Some(last) = self.state.last_match_line {
                if hit.line_num - last > 2 * self.context_lines {
                    self.emit(RenderCommand::GapDivider {
                        file_num: self.state.file_count,
                    });
                }
            }
        }

        let first_pre_line = hit.line_num - hit.pre_context.len();
        for (i, text) in hit.pre_context.iter().enumerate() {
            self.line_row(first_pre_line + i, &hit.file, text);
        }
        self.line_row(hit.line_num, &hit.file, &hit.line);
        for (i, text) in hit.post_context.iter().enumerate() {
            self.line_row(hit.line_num + i + 1, &hit.file, text);
        }

        self.state.line_count += 1;
        self.emit(RenderCommand::LineCount(self.state.line_count));

        self.state.last_file = Some(hit.file.clone());
        self.state.last_match_line = Some(hit.line_num);
    }

    /// Stream end: empty-state or cleanup, then stop the spinner.
    pub fn finish(&mut self) {
        if self.state.any_hits {
            self.emit(RenderCommand::RemoveLeadingBlankRow);
        } else {
            self.emit(RenderCommand::ShowNoResults);
        }
        self.emit(RenderCommand::HideSpinner);
    }

    fn line_row(&mut self, line_num: usize, file: &std::path::Path, text: &str) {
        // Adjacent hits with overlapping context would re-emit rows; within a
        // file rows only ever grow, so a high-water mark suffices.
        if line_num <= self.state.last_emitted_row {
            return;
        }
        self.state.last_emitted_row = line_num;
        self.emit(RenderCommand::LineRow {
            file_num: self.state.file_count,
            line_num,
            file: file.to_path_buf(),
            text: text.to_string(),
        });
    }

    // Sink failures are logged and swallowed: rendering is best-effort and
    // must not abort the remaining scan.
    fn emit(&mut self, command: RenderCommand) {
        if let Err(e) = self.sink.apply(command) {
            warn!("Render sink rejected command: {e}");
        }
    }
}
