//! # Worker Pool
//!
//! A fixed-size rayon pool bound to a read-only context.
//!
//! The context (buffered geometries, or the parcel table and its tile index)
//! is installed once when the pool is built and lent to every task by
//! shared reference. Tasks cannot mutate it and the pool owns it for its
//! whole lifetime, so nothing is re-sent per task.

use crate::TileGraphError;
use rayon::prelude::*;

/// Worker pool sharing one immutable context with every task.
pub struct WorkerPool<C> {
    pool: rayon::ThreadPool,
    context: C,
}

impl<C> std::fmt::Debug for WorkerPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

impl<C: Sync> WorkerPool<C> {
    /// Start a pool of `workers` threads around `context`.
    ///
    /// `None` or `Some(0)` uses one worker per available CPU.
    pub fn new(context: C, workers: Option<usize>) -> Result<Self, TileGraphError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.unwrap_or(0))
            .thread_name(|i| format!("tilegraph-worker-{i}"))
            .build()?;
        tracing::debug!(workers = pool.current_num_threads(), "worker pool started");
        Ok(Self { pool, context })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// The shared context.
    #[must_use]
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Apply `task` to every item in parallel and collect the results.
    ///
    /// The caller blocks until the whole batch is done. Results come back in
    /// input order, though neither engine relies on it.
    pub fn map<I, O, F>(&self, items: &[I], task: F) -> Vec<O>
    where
        I: Sync,
        O: Send,
        F: Fn(&C, &I) -> O + Sync + Send,
    {
        let context = &self.context;
        self.pool
            .install(|| items.par_iter().map(|item| task(context, item)).collect())
    }

    /// Like [`map`](Self::map), keeping only the `Some` results.
    pub fn filter_map<I, O, F>(&self, items: &[I], task: F) -> Vec<O>
    where
        I: Sync,
        O: Send,
        F: Fn(&C, &I) -> Option<O> + Sync + Send,
    {
        let context = &self.context;
        self.pool.install(|| {
            items
                .par_iter()
                .filter_map(|item| task(context, item))
                .collect()
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_uses_shared_context() {
        let pool = WorkerPool::new(vec![10, 20, 30], Some(2)).expect("pool");
        let out = pool.map(&[0usize, 2, 1], |ctx, &i| ctx[i]);
        assert_eq!(out, vec![10, 30, 20]);
    }

    #[test]
    fn filter_map_drops_none() {
        let pool = WorkerPool::new((), Some(3)).expect("pool");
        let items: Vec<u32> = (0..100).collect();
        let mut evens = pool.filter_map(&items, |_, &i| (i % 2 == 0).then_some(i));
        evens.sort_unstable();
        assert_eq!(evens.len(), 50);
        assert_eq!(evens[0], 0);
    }

    #[test]
    fn worker_count_respected() {
        let pool = WorkerPool::new("payload", Some(4)).expect("pool");
        assert_eq!(pool.workers(), 4);
        assert_eq!(*pool.context(), "payload");
    }

    #[test]
    fn default_worker_count_positive() {
        let pool = WorkerPool::new((), None).expect("pool");
        assert!(pool.workers() >= 1);
    }

    #[test]
    fn empty_batch() {
        let pool = WorkerPool::new((), Some(1)).expect("pool");
        let out: Vec<u8> = pool.map(&[] as &[u8], |_, &b| b);
        assert!(out.is_empty());
    }
}
