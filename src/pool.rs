// Fixed-size worker pool shared by the scrape and annotation phases.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{MoodBenchError, Result};

pub struct WorkerPool {
    degree: usize,
    pool: ThreadPool,
}

impl WorkerPool {
    /// Build a pool with exactly `degree` worker threads.
    pub fn new(degree: usize, name: &str) -> Result<Self> {
        if degree == 0 {
            return Err(MoodBenchError::InvalidConfig("worker pool size must be > 0".to_string()));
        }

        let prefix = name.to_string();
        let pool = ThreadPoolBuilder::new()
            .num_threads(degree)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .build()
            .map_err(|e| MoodBenchError::Pool(e.to_string()))?;

        Ok(Self { degree, pool })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Run `work` on every item and wait for all of them.
    ///
    /// Items are split one per task so blocking work (pauses, network) spreads
    /// across all workers. Results come back in input order.
    pub fn map<T, R, F>(&self, items: &[T], work: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.pool
            .install(|| items.par_iter().with_max_len(1).map(|item| work(item)).collect())
    }
}
