//! # Threading Configuration
//!
//! Rayon thread pool construction for the two parallel stages. The dense
//! matrix multiplies inside the window stage are single-threaded by
//! construction, so nesting them under the pool cannot over-subscribe.

use crate::error::{RemiError, Result};

/// Create a configured thread pool with named worker threads
pub fn build_thread_pool(n_threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .thread_name(|i| format!("remi-worker-{i}"))
        .build()
        .map_err(|e| RemiError::config(format!("failed to create thread pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_runs_tasks() {
        let pool = build_thread_pool(2).unwrap();
        let sum: u32 = pool.install(|| {
            use rayon::prelude::*;
            (0..100u32).into_par_iter().sum()
        });
        assert_eq!(sum, 4950);
    }
}
