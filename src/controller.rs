//! Single-flight search job control
//!
//! A controller owns at most one background search at a time. Submitting a
//! new request flags the previous worker as cancelled, detaches it without
//! joining, and starts a fresh worker. Cancellation is cooperative: workers
//! poll their flag between hits, and a per-job generation gate keeps a
//! superseded worker's late commands from reaching the sink.
use log::{error, info};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::{Config, ConfigStore};
use crate::error::Result;
use crate::render::{RenderCommand, Renderer, UiSink};
use crate::search::{SearchRequest, WordSearch};
use crate::walker::Walker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// State shared between the controller and one worker thread.
struct JobShared {
    cancelled: AtomicBool,
    state: Mutex<JobState>,
}

impl JobShared {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            state: Mutex::new(JobState::Pending),
        }
    }

    fn set_state(&self, state: JobState) {
        *self.state.lock() = state;
    }
}

/// Observer handle for one submitted job. Dropping it detaches the worker;
/// the controller keeps its own reference for supersession.
pub struct JobHandle {
    shared: Arc<JobShared>,
    thread: Option<JoinHandle<()>>,
}

impl JobHandle {
    pub fn state(&self) -> JobState {
        *self.shared.state.lock()
    }

    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
    }

    /// Block until the worker exits. Hosts that only want supersession never
    /// call this; the one-shot CLI does.
    pub fn wait(mut self) -> JobState {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        self.state()
    }
}

/// Forwards commands to the shared sink while this job is still the current
/// generation; a superseded job's commands are dropped on the floor.
struct JobSink {
    inner: Arc<Mutex<dyn UiSink>>,
    generation: Arc<AtomicU64>,
    id: u64,
}

impl UiSink for JobSink {
    fn apply(&mut self, command: RenderCommand) -> Result<()> {
        // The generation must be re-checked under the sink lock: a new job's
        // first command serializes on the same lock after the generation
        // bump, so a stale worker that already passed an unlocked check
        // could still slot its command in behind it.
        let mut sink = self.inner.lock();
        if self.generation.load(Ordering::Acquire) != self.id {
            return Ok(());
        }
        sink.apply(command)
    }
}

pub struct SearchController {
    walker: Arc<dyn Walker>,
    sink: Arc<Mutex<dyn UiSink>>,
    store: Mutex<Box<dyn ConfigStore>>,
    config: Mutex<Config>,
    current: Mutex<Option<Arc<JobShared>>>,
    generation: Arc<AtomicU64>,
}

impl SearchController {
    pub fn new(
        walker: Arc<dyn Walker>,
        sink: Arc<Mutex<dyn UiSink>>,
        store: Box<dyn ConfigStore>,
        config: Config,
    ) -> Self {
        Self {
            walker,
            sink,
            store: Mutex::new(store),
            config: Mutex::new(config),
            current: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start a search, superseding any search still running. Settings and
    /// recent-query bookkeeping are written back before the worker starts;
    /// the call never blocks on the old worker.
    pub fn submit(&self, request: SearchRequest) -> JobHandle {
        self.record_submission(&request);

        // Flag the old worker and drop our reference; it observes the flag
        // (or the generation gate) and winds down on its own.
        let mut current = self.current.lock();
        if let Some(old) = current.take() {
            old.cancelled.store(true, Ordering::Release);
        }
        let id = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let shared = Arc::new(JobShared::new());
        *current = Some(shared.clone());
        drop(current);

        let thread = self.spawn_worker(request, shared.clone(), id);
        JobHandle {
            shared,
            thread: Some(thread),
        }
    }

    /// Cancel any running job and release it. Idempotent.
    pub fn close(&self) {
        if let Some(old) = self.current.lock().take() {
            old.cancelled.store(true, Ordering::Release);
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn config(&self) -> Config {
        self.config.lock().clone()
    }

    fn record_submission(&self, request: &SearchRequest) {
        let mut config = self.config.lock();
        add_or_move_to_top(&request.query, &mut config.recent_queries);
        let capacity = config.max_recent_queries;
        config.recent_queries.truncate(capacity);
        config.match_case = request.match_case;
        config.with_context = request.with_context;
        if let Err(e) = self.store.lock().write(&config) {
            error!("Failed to persist search settings: {e}");
        }
    }

    fn spawn_worker(
        &self,
        request: SearchRequest,
        shared: Arc<JobShared>,
        id: u64,
    ) -> JoinHandle<()> {
        let walker = self.walker.clone();
        let mut sink = JobSink {
            inner: self.sink.clone(),
            generation: self.generation.clone(),
            id,
        };

        std::thread::spawn(move || {
            shared.set_state(JobState::Running);
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                run_search(&request, walker.as_ref(), &mut sink, &shared)
            }));
            match outcome {
                Ok(Ok(finished)) => {
                    shared.set_state(if finished {
                        JobState::Completed
                    } else {
                        JobState::Cancelled
                    });
                }
                Ok(Err(e)) => {
                    error!("Search for {:?} failed: {e}", request.query);
                    shared.set_state(JobState::Failed);
                }
                Err(panic) => {
                    let detail = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!("Search worker panicked: {detail}");
                    shared.set_state(JobState::Failed);
                }
            }
        })
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.close();
    }
}

/// Worker body. Returns `Ok(false)` when the job was cancelled before the
/// stream finished; cancellation is not an error.
fn run_search(
    request: &SearchRequest,
    walker: &dyn Walker,
    sink: &mut dyn UiSink,
    shared: &JobShared,
) -> Result<bool> {
    let mut renderer = Renderer::new(sink, request.with_context, request.context_size());
    renderer.begin();

    let search = WordSearch::new(request.clone());
    let stream = search.stream(walker)?;

    for hit in stream {
        if shared.cancelled.load(Ordering::Acquire) {
            info!("Search for {:?} superseded, stopping", request.query);
            return Ok(false);
        }
        renderer.push(&hit);
    }

    if shared.cancelled.load(Ordering::Acquire) {
        return Ok(false);
    }
    renderer.finish();
    Ok(true)
}

/// Move `item` to the front of the recent-query list, dropping any earlier
/// occurrence. A blank query leaves the list untouched.
pub fn add_or_move_to_top(item: &str, list: &mut Vec<String>) {
    if item.trim().is_empty() {
        return;
    }
    list.retain(|existing| existing != item);
    list.insert(0, item.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryStore;
    use std::collections::BTreeMap;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    #[test]
    fn add_or_move_to_top_moves_existing_entry() {
        let mut list = vec!["bar".to_string(), "foo".to_string(), "baz".to_string()];
        add_or_move_to_top("foo", &mut list);
        assert_eq!(list, vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn add_or_move_to_top_inserts_new_entry() {
        let mut list = vec!["bar".to_string()];
        add_or_move_to_top("foo", &mut list);
        assert_eq!(list, vec!["foo", "bar"]);
    }

    #[test]
    fn add_or_move_to_top_ignores_blank_queries() {
        let mut list = vec!["bar".to_string()];
        add_or_move_to_top("  ", &mut list);
        assert_eq!(list, vec!["bar"]);
    }

    /// Walker whose reads can be slowed down, to hold a worker mid-stream.
    struct SlowWalker {
        files: Vec<PathBuf>,
        contents: BTreeMap<PathBuf, Vec<String>>,
        delay: Duration,
    }

    impl SlowWalker {
        fn new(entries: &[(&str, &str)], delay: Duration) -> Self {
            let mut files = Vec::new();
            let mut contents = BTreeMap::new();
            for (name, text) in entries {
                let path = PathBuf::from(name);
                files.push(path.clone());
                contents.insert(path, text.lines().map(str::to_string).collect());
            }
            Self {
                files,
                contents,
                delay,
            }
        }
    }

    impl Walker for SlowWalker {
        fn files(&self) -> Vec<PathBuf> {
            self.files.clone()
        }

        fn read_lines(&self, path: &Path) -> io::Result<Vec<String>> {
            std::thread::sleep(self.delay);
            self.contents
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unreadable"))
        }
    }

    struct SharedRecordingSink {
        commands: Arc<Mutex<Vec<RenderCommand>>>,
    }

    impl UiSink for SharedRecordingSink {
        fn apply(&mut self, command: RenderCommand) -> Result<()> {
            self.commands.lock().push(command);
            Ok(())
        }
    }

    fn controller_over(
        walker: Arc<dyn Walker>,
    ) -> (SearchController, Arc<Mutex<Vec<RenderCommand>>>) {
        let commands = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(Mutex::new(SharedRecordingSink {
            commands: commands.clone(),
        })) as Arc<Mutex<dyn UiSink>>;
        let controller = SearchController::new(
            walker,
            sink,
            Box::new(MemoryStore::default()),
            Config::default(),
        );
        (controller, commands)
    }

    fn many_files(count: usize) -> Vec<(String, String)> {
        (0..count)
            .map(|i| (format!("file{i:03}.txt"), "needle here\n".to_string()))
            .collect()
    }

    #[test]
    fn completed_search_renders_all_hits() {
        let walker = Arc::new(SlowWalker::new(
            &[("a.txt", "one needle\ntwo\nthree needle\n")],
            Duration::ZERO,
        ));
        let (controller, commands) = controller_over(walker);

        let state = controller.submit(SearchRequest::new("needle")).wait();
        assert_eq!(state, JobState::Completed);

        let commands = commands.lock();
        assert_eq!(commands.first(), Some(&RenderCommand::ResetResults));
        assert_eq!(commands.last(), Some(&RenderCommand::HideSpinner));
        let line_counts: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::LineCount(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(line_counts, vec![1, 2]);
    }

    #[test]
    fn empty_results_render_the_no_results_state() {
        let walker = Arc::new(SlowWalker::new(&[("a.txt", "nothing\n")], Duration::ZERO));
        let (controller, commands) = controller_over(walker);

        let state = controller.submit(SearchRequest::new("needle")).wait();
        assert_eq!(state, JobState::Completed);

        let commands = commands.lock();
        assert!(commands.contains(&RenderCommand::ShowNoResults));
        assert!(!commands
            .iter()
            .any(|c| matches!(c, RenderCommand::EnsureTable | RenderCommand::LineRow { .. })));
    }

    #[test]
    fn new_submission_supersedes_the_running_job() {
        let entries = many_files(50);
        let borrowed: Vec<(&str, &str)> = entries
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        let walker = Arc::new(SlowWalker::new(&borrowed, Duration::from_millis(5)));
        let (controller, commands) = controller_over(walker);

        let first = controller.submit(SearchRequest::new("needle"));
        std::thread::sleep(Duration::from_millis(20));
        let second = controller.submit(SearchRequest::new("needle"));

        assert_eq!(second.wait(), JobState::Completed);
        let first_state = first.wait();
        assert!(matches!(
            first_state,
            JobState::Cancelled | JobState::Completed
        ));

        // Nothing from the first job may appear after the second job's
        // ResetResults.
        let commands = commands.lock();
        let last_reset = commands
            .iter()
            .rposition(|c| *c == RenderCommand::ResetResults)
            .unwrap();
        let resets = commands
            .iter()
            .filter(|c| **c == RenderCommand::ResetResults)
            .count();
        assert_eq!(resets, 2);
        // After the final reset the stream is a single coherent sequence
        // ending in HideSpinner.
        assert_eq!(commands.last(), Some(&RenderCommand::HideSpinner));
        let tail_hides = commands[last_reset..]
            .iter()
            .filter(|c| **c == RenderCommand::HideSpinner)
            .count();
        assert_eq!(tail_hides, 1);
    }

    #[test]
    fn cancelled_job_emits_a_valid_prefix_and_no_more() {
        let entries = many_files(50);
        let borrowed: Vec<(&str, &str)> = entries
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        let walker = Arc::new(SlowWalker::new(&borrowed, Duration::from_millis(5)));
        let (controller, commands) = controller_over(walker);

        let handle = controller.submit(SearchRequest::new("needle"));
        std::thread::sleep(Duration::from_millis(20));
        handle.cancel();
        let state = handle.wait();
        assert_eq!(state, JobState::Cancelled);

        let commands = commands.lock();
        // The spinner was never hidden: the job stopped silently mid-stream.
        assert!(!commands.contains(&RenderCommand::HideSpinner));
        assert!(!commands.contains(&RenderCommand::ShowNoResults));
    }

    #[test]
    fn malformed_pattern_fails_the_job_without_crashing() {
        let walker = Arc::new(SlowWalker::new(&[("a.txt", "text\n")], Duration::ZERO));
        let (controller, _commands) = controller_over(walker);

        let mut request = SearchRequest::new("(broken");
        request.literal_match = false;
        let state = controller.submit(request).wait();
        assert_eq!(state, JobState::Failed);
    }

    #[test]
    fn submit_records_recent_queries_and_flags() {
        let walker = Arc::new(SlowWalker::new(&[("a.txt", "text\n")], Duration::ZERO));
        let (controller, _commands) = controller_over(walker);

        let mut request = SearchRequest::new("alpha");
        request.match_case = true;
        controller.submit(request).wait();
        controller.submit(SearchRequest::new("beta")).wait();
        controller.submit(SearchRequest::new("alpha")).wait();

        let config = controller.config();
        assert_eq!(config.recent_queries, vec!["alpha", "beta"]);
        assert!(!config.match_case);
    }

    #[test]
    fn blank_query_does_not_touch_recent_queries() {
        let walker = Arc::new(SlowWalker::new(&[("a.txt", "text\n")], Duration::ZERO));
        let (controller, _commands) = controller_over(walker);

        controller.submit(SearchRequest::new("alpha")).wait();
        controller.submit(SearchRequest::new("   ")).wait();

        assert_eq!(controller.config().recent_queries, vec!["alpha"]);
    }

    #[test]
    fn recent_queries_are_truncated_to_capacity() {
        let walker = Arc::new(SlowWalker::new(&[("a.txt", "text\n")], Duration::ZERO));
        let commands = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(Mutex::new(SharedRecordingSink {
            commands: commands.clone(),
        })) as Arc<Mutex<dyn UiSink>>;
        let mut config = Config::default();
        config.max_recent_queries = 2;
        let controller =
            SearchController::new(walker, sink, Box::new(MemoryStore::default()), config);

        controller.submit(SearchRequest::new("one")).wait();
        controller.submit(SearchRequest::new("two")).wait();
        controller.submit(SearchRequest::new("three")).wait();

        assert_eq!(controller.config().recent_queries, vec!["three", "two"]);
    }

    #[test]
    fn superseded_worker_never_writes_after_the_new_reset() {
        // A hit-heavy first job raced against a hitless second job on the
        // same sink, repeated to shake out interleavings around the
        // generation bump. Only the first job can produce LineRows, so any
        // row after the second job's ResetResults is a stale write.
        let entries: Vec<(String, String)> = (0..20)
            .map(|i| (format!("f{i:02}.txt"), "alpha token\n".to_string()))
            .collect();
        let borrowed: Vec<(&str, &str)> = entries
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();

        for _ in 0..50 {
            let walker = Arc::new(SlowWalker::new(&borrowed, Duration::from_micros(200)));
            let (controller, commands) = controller_over(walker);

            let first = controller.submit(SearchRequest::new("alpha"));
            std::thread::sleep(Duration::from_micros(500));
            let second = controller.submit(SearchRequest::new("beta"));

            assert_eq!(second.wait(), JobState::Completed);
            let _ = first.wait();

            let commands = commands.lock();
            let last_reset = commands
                .iter()
                .rposition(|c| *c == RenderCommand::ResetResults)
                .unwrap();
            let stale_rows = commands[last_reset..]
                .iter()
                .filter(|c| matches!(c, RenderCommand::LineRow { .. }))
                .count();
            assert_eq!(stale_rows, 0);
        }
    }

    #[test]
    fn close_is_idempotent() {
        let walker = Arc::new(SlowWalker::new(&[("a.txt", "text\n")], Duration::ZERO));
        let (controller, _commands) = controller_over(walker);

        let handle = controller.submit(SearchRequest::new("text"));
        controller.close();
        controller.close();
        let _ = handle.wait();
    }
}
