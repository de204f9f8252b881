//! Command-stream consumers
//!
//! [`TerminalSink`] renders the protocol to a TTY in an append-only way:
//! rows print as they arrive, counters accumulate and print as the summary
//! once the stream ends. [`ChannelSink`] forwards commands over a channel to
//! whichever thread owns the real presentation.
use colored::*;
use crossbeam_channel::Sender;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{QuarryError, Result};
use crate::render::{RenderCommand, UiSink};

pub struct TerminalSink {
    spinner: Option<ProgressBar>,
    file_count: usize,
    line_count: usize,
    show_summary: bool,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self {
            spinner: None,
            file_count: 0,
            line_count: 0,
            show_summary: false,
        }
    }

    fn start_spinner(&mut self) {
        let spinner = ProgressBar::new_spinner().with_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        spinner.set_message("Searching...");
        self.spinner = Some(spinner);
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    // Rows go to stdout; the spinner draws on stderr and clears itself.
    fn println(&self, text: String) {
        println!("{text}");
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl UiSink for TerminalSink {
    fn apply(&mut self, command: RenderCommand) -> Result<()> {
        match command {
            RenderCommand::ResetResults | RenderCommand::EnsureTable => {}
            RenderCommand::ShowSpinner => self.start_spinner(),
            RenderCommand::HideSpinner => {
                self.stop_spinner();
                if self.show_summary {
                    println!(
                        "\n{} {} matching line(s) in {} file(s)",
                        "Found".green().bold(),
                        self.line_count,
                        self.file_count
                    );
                }
            }
            RenderCommand::HideSummary => self.show_summary = false,
            RenderCommand::ShowSummary => self.show_summary = true,
            RenderCommand::ResetCounters => {
                self.file_count = 0;
                self.line_count = 0;
            }
            RenderCommand::ShowNoResults => {
                self.println(format!(
                    "{}",
                    "No results were found using the search terms you provided.".yellow()
                ));
            }
            RenderCommand::FileCount(n) => self.file_count = n,
            RenderCommand::LineCount(n) => self.line_count = n,
            // Terminal output is append-only; the leading separator the
            // protocol strips at stream end was never printed.
            RenderCommand::BreakRow | RenderCommand::RemoveLeadingBlankRow => {}
            RenderCommand::FileHeading { file, .. } => {
                self.println(format!("\n{}", file.display().to_string().green().bold()));
            }
            RenderCommand::GapDivider { .. } => {
                self.println(format!("  {}", "···".dimmed()));
            }
            RenderCommand::LineRow { line_num, text, .. } => {
                self.println(format!("  {:>5} │ {}", line_num.to_string().dimmed(), text));
            }
        }
        Ok(())
    }
}

/// Sends every command to a channel. Applying fails once the receiving side
/// is gone, which the renderer treats as best-effort and logs.
pub struct ChannelSink {
    tx: Sender<RenderCommand>,
}

impl ChannelSink {
    pub fn new(tx: Sender<RenderCommand>) -> Self {
        Self { tx }
    }
}

impl UiSink for ChannelSink {
    fn apply(&mut self, command: RenderCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| QuarryError::Sink("render channel disconnected".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn channel_sink_forwards_commands_in_order() {
        let (tx, rx) = unbounded();
        let mut sink = ChannelSink::new(tx);
        sink.apply(RenderCommand::ResetResults).unwrap();
        sink.apply(RenderCommand::LineCount(1)).unwrap();

        assert_eq!(rx.recv().unwrap(), RenderCommand::ResetResults);
        assert_eq!(rx.recv().unwrap(), RenderCommand::LineCount(1));
    }

    #[test]
    fn channel_sink_errors_after_receiver_drops() {
        let (tx, rx) = unbounded();
        drop(rx);
        let mut sink = ChannelSink::new(tx);
        assert!(sink.apply(RenderCommand::ResetResults).is_err());
    }

    #[test]
    fn terminal_sink_tracks_counters() {
        let mut sink = TerminalSink::new();
        sink.apply(RenderCommand::ResetCounters).unwrap();
        sink.apply(RenderCommand::FileCount(2)).unwrap();
        sink.apply(RenderCommand::LineCount(7)).unwrap();
        assert_eq!(sink.file_count, 2);
        assert_eq!(sink.line_count, 7);
    }
}
