//! Worker pool scoped to one race.

use rayon::prelude::*;

use crate::error::RaceError;

/// A dedicated rayon pool. Created before the first round and dropped when
/// the caller is done with the race; nothing is registered globally.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// `threads == 0` lets rayon pick (one per core).
    pub fn new(threads: usize) -> Result<Self, RaceError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("race-worker-{i}"))
            .build()
            .map_err(|e| RaceError::invalid(format!("Could not start worker pool: {e}")))?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Apply `f` to every item on the pool; results keep input order.
    ///
    /// Returns only once every call has finished (the round barrier).
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(&f).collect())
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .finish()
    }
}
