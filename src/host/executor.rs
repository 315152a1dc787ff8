//! Executor on top of a rayon pool, with a cap on pending tasks

use crate::error::HostError;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error};

pub struct Executor {
    pool: ThreadPool,
    pending: Arc<AtomicUsize>,
    max_pending: usize,
}

/// Releases a pending slot when the task finishes, even if it panics
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Executor {
    /// Create a new executor.
    ///
    /// `worker_threads` of `None` lets rayon pick (usually the number of CPUs).
    pub fn new(worker_threads: Option<usize>, max_pending: usize) -> Result<Self, HostError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("sagasu-worker-{}", i));
        if let Some(threads) = worker_threads {
            builder = builder.num_threads(threads.max(1));
        }
        let pool = builder.build().map_err(|e| {
            error!("failed to create worker pool: {}", e);
            HostError::Unexpected(e.to_string())
        })?;
        debug!(threads = pool.current_num_threads(), "worker pool created");
        Ok(Self {
            pool,
            pending: Arc::new(AtomicUsize::new(0)),
            max_pending: max_pending.max(1),
        })
    }

    /// Run `f` on the pool.
    ///
    /// Parallel iterators inside `f` run on the same pool.
    pub fn execute<F>(&self, f: F) -> Result<(), HostError>
    where
        F: FnOnce() + Send + 'static,
    {
        let reserved = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                (pending < self.max_pending).then_some(pending + 1)
            });
        if reserved.is_err() {
            error!(max = self.max_pending, "too many pending tasks");
            return Err(HostError::ExecutorUnavailable);
        }
        let guard = PendingGuard(Arc::clone(&self.pending));
        self.pool.spawn(move || {
            let _guard = guard;
            f();
        });
        Ok(())
    }

    /// Number of tasks queued or running
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}
