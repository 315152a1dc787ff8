//! Session controller between a client and the query stages.
//!
//! A [`Host`] owns the database, the worker pool and the results of the
//! latest search and filter. Every long running operation returns an
//! [`Operation`] handle right away and completes on the pool; the same
//! completion is also pushed to the [`EventSink`] as a [`HostEvent`].
//!
//! Each started operation gets a fresh id. Progress and completions from an
//! operation that was aborted or superseded no longer match the id in its
//! slot and are dropped, so the client only ever sees the latest one.

mod events;
mod executor;
mod operation;

pub use events::{Completed, EventSink, HostEvent, NullSink};
pub use executor::Executor;
pub use operation::Operation;

use crate::catalog::GroupId;
use crate::config::Config;
use crate::error::{HostError, ResultInterop};
use crate::query::{ResultSet, SearchFilter, Stats};
use crate::signal::AbortSignal;
use crate::stages::cook::CookOutput;
use crate::stages::{self, StageContext, StageOutput};
use crate::store::Database;
use operation::Completion;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info};

/// Cheap to clone; all clones share the same session.
#[derive(Clone)]
pub struct Host {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    executor: Executor,
    sink: Box<dyn EventSink>,
    db: OnceLock<Result<Database, HostError>>,
    next_id: AtomicU64,
    session: Mutex<Session>,
}

#[derive(Default)]
struct Session {
    search: Option<Running<Stats>>,
    filter: Option<Running<Stats>>,
    cook: Option<Running<CookOutput>>,
    search_result: Option<ResultSet>,
    filter_result: Option<ResultSet>,
    title: String,
}

/// An operation in flight
struct Running<T> {
    signal: AbortSignal,
    /// Generation of the result set the operation reads
    input: u64,
    completion: Completion<T>,
}

impl<T> Running<T> {
    fn id(&self) -> u64 {
        self.completion.id()
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Search,
    Filter,
}

impl Stage {
    fn slot(self, session: &mut Session) -> &mut Option<Running<Stats>> {
        match self {
            Stage::Search => &mut session.search,
            Stage::Filter => &mut session.filter,
        }
    }

    fn progress_event(self, percentage: u32) -> HostEvent {
        match self {
            Stage::Search => HostEvent::SearchProgress(percentage),
            Stage::Filter => HostEvent::FilterProgress(percentage),
        }
    }

    fn complete_event(self, id: u64, result: Result<Stats, HostError>) -> HostEvent {
        let completed = Completed::new(id, result);
        match self {
            Stage::Search => HostEvent::SearchComplete(completed),
            Stage::Filter => HostEvent::FilterComplete(completed),
        }
    }
}

impl Host {
    pub fn new(config: Config, sink: impl EventSink) -> Result<Self, HostError> {
        let executor = Executor::new(config.worker_threads, config.max_pending_tasks)?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                executor,
                sink: Box::new(sink),
                db: OnceLock::new(),
                next_id: AtomicU64::new(1),
                session: Mutex::new(Session::default()),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Open the database on the worker pool.
    ///
    /// Stages open it on first use too, so this only makes the open happen early.
    pub fn initialize(&self) -> Operation<()> {
        let id = self.inner.next_id();
        let (completion, operation) = Completion::new(id);
        let inner = Arc::clone(&self.inner);
        let task = move || {
            let result = inner.database().map(|_| ());
            inner
                .sink
                .emit(HostEvent::Initialized(ResultInterop::from(result.clone())));
            completion.resolve(result);
        };
        if let Err(e) = self.inner.executor.execute(task) {
            let (completion, operation) = Completion::new(id);
            self.inner
                .sink
                .emit(HostEvent::Initialized(ResultInterop::err(e.clone())));
            completion.resolve(Err(e));
            return operation;
        }
        operation
    }

    /// The database, opening it if needed
    pub fn database(&self) -> Result<&Database, HostError> {
        self.inner.database()
    }

    /// Start a search, aborting the running search and filter.
    pub fn search(&self, filter: SearchFilter) -> Result<Operation<Stats>, HostError> {
        filter.validate()?;
        let inner = &self.inner;
        let mut session = inner.session.lock();
        let id = inner.next_id();
        let signal = AbortSignal::new();
        let task = {
            let inner = Arc::clone(inner);
            let signal = signal.clone();
            move || {
                let result = inner.database().and_then(|db| {
                    let on_progress = |p: u32| inner.emit_progress(Stage::Search, id, p);
                    let ctx = inner.stage_context(db, &signal, &on_progress);
                    stages::search::run(&ctx, &filter, inner.config.group_stat_limit)
                });
                inner.finish_stage(Stage::Search, id, result);
            }
        };
        inner.executor.execute(task)?;

        inner.abort_stage(&mut session, Stage::Search);
        inner.abort_stage(&mut session, Stage::Filter);
        let (completion, operation) = Completion::new(id);
        session.search = Some(Running {
            signal,
            input: id,
            completion,
        });
        info!(id, "search queued");
        Ok(operation)
    }

    /// Abort the running search. It completes with `Aborted`.
    pub fn abort_search(&self) {
        let mut session = self.inner.session.lock();
        self.inner.abort_stage(&mut session, Stage::Search);
    }

    /// Narrow the latest search result to recipes made only of `groups`.
    ///
    /// Needs a completed search; fails with `MissingSearchResult` otherwise.
    pub fn filter(&self, groups: Vec<GroupId>) -> Result<Operation<Stats>, HostError> {
        let inner = &self.inner;
        let mut session = inner.session.lock();
        if session.search.is_some() {
            return Err(HostError::MissingSearchResult);
        }
        let input = session
            .search_result
            .clone()
            .ok_or(HostError::MissingSearchResult)?;
        let id = inner.next_id();
        let signal = AbortSignal::new();
        let generation = input.generation();
        let task = {
            let inner = Arc::clone(inner);
            let signal = signal.clone();
            move || {
                let result = inner.database().and_then(|db| {
                    let on_progress = |p: u32| inner.emit_progress(Stage::Filter, id, p);
                    let ctx = inner.stage_context(db, &signal, &on_progress);
                    stages::filter::run(&ctx, &input, &groups)
                });
                inner.finish_stage(Stage::Filter, id, result);
            }
        };
        inner.executor.execute(task)?;

        inner.abort_stage(&mut session, Stage::Filter);
        let (completion, operation) = Completion::new(id);
        session.filter = Some(Running {
            signal,
            input: generation,
            completion,
        });
        info!(id, "filter queued");
        Ok(operation)
    }

    /// Abort the running filter. It completes with `Aborted`.
    pub fn abort_filter(&self) {
        let mut session = self.inner.session.lock();
        self.inner.abort_stage(&mut session, Stage::Filter);
    }

    /// Cook the latest filter result, or the latest search result if there
    /// is no filter result.
    ///
    /// A cook of the same input that is still running is shared instead of
    /// started again. A cook of an older input is aborted.
    pub fn cook(&self) -> Result<Operation<CookOutput>, HostError> {
        let inner = &self.inner;
        let mut session = inner.session.lock();
        if session.search.is_some() || session.filter.is_some() {
            return Err(HostError::MissingSearchResult);
        }
        let input = session
            .filter_result
            .clone()
            .or_else(|| session.search_result.clone())
            .ok_or(HostError::MissingSearchResult)?;
        let generation = input.generation();
        if let Some(running) = session.cook.as_mut() {
            if running.input == generation {
                debug!(id = running.id(), "joining cook in progress");
                return Ok(running.completion.subscribe());
            }
        }

        let id = inner.next_id();
        let signal = AbortSignal::new();
        let limit = inner.config.result_limit;
        let task = {
            let inner = Arc::clone(inner);
            let signal = signal.clone();
            move || {
                let result = inner.database().and_then(|db| {
                    let no_progress = |_: u32| {};
                    let ctx = inner.stage_context(db, &signal, &no_progress);
                    stages::cook::run(&ctx, &input, limit)
                });
                inner.finish_cook(id, result);
            }
        };
        inner.executor.execute(task)?;

        inner.abort_cook(&mut session);
        let (completion, operation) = Completion::new(id);
        session.cook = Some(Running {
            signal,
            input: generation,
            completion,
        });
        info!(id, "cook queued");
        Ok(operation)
    }

    /// Abort the cook in progress. Every waiter completes with `Aborted`.
    pub fn abort_cook(&self) {
        let mut session = self.inner.session.lock();
        self.inner.abort_cook(&mut session);
    }

    /// Maximum number of recipes a cook reads
    pub fn result_limit(&self) -> usize {
        self.inner.config.result_limit
    }

    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        info!("setting title: {}", title);
        self.inner.session.lock().title = title;
    }

    pub fn title(&self) -> String {
        self.inner.session.lock().title.clone()
    }

    /// Size of the latest search result, if any
    pub fn search_result_len(&self) -> Option<usize> {
        self.inner
            .session
            .lock()
            .search_result
            .as_ref()
            .map(ResultSet::len)
    }

    /// Size of the latest filter result, if any
    pub fn filter_result_len(&self) -> Option<usize> {
        self.inner
            .session
            .lock()
            .filter_result
            .as_ref()
            .map(ResultSet::len)
    }
}

impl Inner {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn database(&self) -> Result<&Database, HostError> {
        let db = self.db.get_or_init(|| {
            let path = &self.config.database_path;
            info!("opening database from {}", path.display());
            let result = if self.config.bypass_lock {
                info!("bypassing lock check");
                Database::open_unlocked(path)
            } else {
                Database::open(path)
            };
            result.map_err(|e| {
                error!("failed to open database: {}", e);
                HostError::from(e)
            })
        });
        db.as_ref().map_err(Clone::clone)
    }

    fn stage_context<'a>(
        &self,
        db: &'a Database,
        signal: &'a AbortSignal,
        on_progress: &'a (dyn Fn(u32) + Sync),
    ) -> StageContext<'a> {
        StageContext {
            db,
            signal,
            progress_interval: self.config.progress_interval(),
            storage: self.config.result_storage,
            on_progress,
        }
    }

    /// Emit progress only while `id` is still the running operation of the stage
    fn emit_progress(&self, stage: Stage, id: u64, percentage: u32) {
        let mut session = self.session.lock();
        let current = stage.slot(&mut session).as_ref().map(Running::id);
        if current == Some(id) {
            self.sink.emit(stage.progress_event(percentage));
        }
    }

    fn finish_stage(&self, stage: Stage, id: u64, result: Result<StageOutput, HostError>) {
        let mut session = self.session.lock();
        let Some(running) = stage.slot(&mut session).take_if(|r| r.id() == id) else {
            debug!(id, ?stage, "dropping completion of a stale operation");
            return;
        };
        let result = result.map(|output| {
            match stage {
                Stage::Search => {
                    session.search_result = Some(output.result.with_generation(id));
                    session.filter_result = None;
                }
                Stage::Filter => {
                    session.filter_result = Some(output.result.with_generation(id));
                }
            }
            output.stats
        });
        match &result {
            Ok(stats) => info!(id, ?stage, found = stats.found_count, "stage completed"),
            Err(e) if e.is_aborted() => info!(id, ?stage, "stage aborted"),
            Err(e) => error!(id, ?stage, "stage failed: {}", e),
        }
        self.sink.emit(stage.complete_event(id, result.clone()));
        running.completion.resolve(result);
    }

    fn finish_cook(&self, id: u64, result: Result<CookOutput, HostError>) {
        let mut session = self.session.lock();
        let Some(running) = session.cook.take_if(|r| r.id() == id) else {
            debug!(id, "dropping completion of a stale cook");
            return;
        };
        if let Err(e) = &result {
            if !e.is_aborted() {
                error!(id, "cook failed: {}", e);
            }
        }
        self.sink
            .emit(HostEvent::CookComplete(Completed::new(id, result.clone())));
        running.completion.resolve(result);
    }

    fn abort_stage(&self, session: &mut Session, stage: Stage) {
        let Some(running) = stage.slot(session).take() else {
            return;
        };
        let id = running.id();
        info!(id, ?stage, "aborting");
        running.signal.abort();
        self.sink
            .emit(stage.complete_event(id, Err(HostError::Aborted)));
        running.completion.resolve(Err(HostError::Aborted));
    }

    fn abort_cook(&self, session: &mut Session) {
        let Some(running) = session.cook.take() else {
            return;
        };
        let id = running.id();
        info!(id, "aborting cook");
        running.signal.abort();
        self.sink.emit(HostEvent::CookComplete(Completed::new(
            id,
            Err(HostError::Aborted),
        )));
        running.completion.resolve(Err(HostError::Aborted));
    }
}
