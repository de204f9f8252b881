use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(long, value_parser, default_value_t = false)]
    pub verbose: bool,

    #[clap(long, value_parser)]
    pub log: Option<PathBuf>,

    #[clap(long, value_parser, default_value_t = false)]
    pub show_hidden: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search a project tree and stream results as they are found
    Search {
        query: String,

        #[clap(default_value = ".")]
        path: PathBuf,

        /// Treat the query as literal text instead of a regex
        #[clap(long, value_parser, default_value_t = false)]
        literal: bool,

        /// Match case exactly; `--match-case=false` overrides a persisted
        /// `match_case = true`
        #[clap(
            long,
            value_parser,
            num_args = 0..=1,
            require_equals = true,
            default_missing_value = "true"
        )]
        match_case: Option<bool>,

        /// Number of context lines around each match
        #[clap(short, long, value_parser)]
        context: Option<usize>,

        /// Show matched lines only, without context
        #[clap(long, value_parser, default_value_t = false)]
        no_context: bool,

        /// Do not persist this query and its flags to the config file
        #[clap(long, value_parser, default_value_t = false)]
        no_save: bool,
    },
    /// Print recent queries, most recent first
    Recent,
    /// Re-locate a match on a line and print its selection range
    Locate {
        file: PathBuf,

        /// 1-based line number from the search result
        line: usize,

        query: String,

        #[clap(default_value = ".")]
        root: PathBuf,

        #[clap(long, value_parser, default_value_t = false)]
        literal: bool,

        #[clap(long, value_parser, default_value_t = false)]
        match_case: bool,
    },
}
