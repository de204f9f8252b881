use clap::Parser;
use colored::*;
use env_logger::{Builder, Env, Target};
use log::info;
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;

use quarry::cli::{Cli, Commands};
use quarry::config::{Config, ConfigStore, FileStore, MemoryStore};
use quarry::controller::{JobState, SearchController};
use quarry::error::{QuarryError, Result};
use quarry::navigate;
use quarry::output::TerminalSink;
use quarry::render::UiSink;
use quarry::search::SearchRequest;
use quarry::walker::ProjectWalker;

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli)?;

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("Could not load config, using defaults: {e}");
        Config::default()
    });

    match &cli.command {
        Commands::Search {
            query,
            path,
            literal,
            match_case,
            context,
            no_context,
            no_save,
        } => {
            let request = SearchRequest {
                query: query.clone(),
                literal_match: *literal,
                match_case: match_case.unwrap_or(config.match_case),
                with_context: !*no_context && config.with_context,
                context_lines: context.unwrap_or(config.context_lines),
            };
            info!("Searching {} for {:?}", path.display(), request.query);

            let walker = Arc::new(ProjectWalker::new(path.clone()).show_hidden(cli.show_hidden));
            let sink = Arc::new(Mutex::new(TerminalSink::new())) as Arc<Mutex<dyn UiSink>>;
            let store = make_store(*no_save);

            let controller = SearchController::new(walker, sink, store, config);
            let state = controller.submit(request).wait();
            if state == JobState::Failed {
                eprintln!("{}", "Search failed; see the log for details.".red());
                return Err(QuarryError::Other("search failed".into()));
            }
        }

        Commands::Recent => {
            if config.recent_queries.is_empty() {
                println!("No recent queries.");
            } else {
                for query in &config.recent_queries {
                    println!("{query}");
                }
            }
        }

        Commands::Locate {
            file,
            line,
            query,
            root,
            literal,
            match_case,
        } => {
            match navigate::locate_match(root, file, *line, query, *literal, *match_case) {
                Ok(selection) => {
                    println!("selection start={} len={}", selection.start, selection.len);
                }
                Err(e) => {
                    eprintln!("{}", e.to_string().red());
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}

fn make_store(no_save: bool) -> Box<dyn ConfigStore> {
    if no_save {
        return Box::new(MemoryStore::default());
    }
    match Config::default_save_path() {
        Some(path) => Box::new(FileStore::new(path)),
        None => Box::new(MemoryStore::default()),
    }
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "{} [{}] [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });

    if let Some(log_path) = &cli.log {
        if let Some(parent_dir) = log_path.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                fs::create_dir_all(parent_dir).map_err(QuarryError::Io)?;
            }
        }
        let log_file = fs::File::create(log_path).map_err(QuarryError::Io)?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| QuarryError::Other(e.to_string()))?;
    Ok(())
}
