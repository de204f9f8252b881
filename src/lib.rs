//! quarry — incremental, cancellable project-wide text search.
//!
//! A [`controller::SearchController`] runs one background search at a time
//! over the files a [`walker::Walker`] enumerates, and streams typed
//! [`render::RenderCommand`]s to a [`render::UiSink`] as matches are found.
//! Submitting a new search supersedes the previous one.
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod navigate;
pub mod output;
pub mod render;
pub mod search;
pub mod walker;

pub use crate::config::Config;
pub use crate::controller::{add_or_move_to_top, JobState, SearchController};
pub use crate::error::{QuarryError, Result};
pub use crate::navigate::{locate_match, Selection};
pub use crate::output::{ChannelSink, TerminalSink};
pub use crate::render::{RenderCommand, Renderer, UiSink};
pub use crate::search::{CompiledPattern, Hit, SearchRequest, WordSearch};
pub use crate::walker::{ProjectWalker, Walker};
