//! Parallel processing configuration
//!
//! Stations are independent, so `process` can fan them out on Rayon's
//! global pool. Without `--threads` everything runs sequentially on the
//! calling thread.

use crate::errors::{HidroError, Result};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

/// Configuration for parallel processing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    /// `None` or `Some(1)` means sequential
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Use every available CPU core
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.num_threads.is_some_and(|n| n > 1)
    }

    /// Set up the global Rayon thread pool. Does nothing when sequential.
    pub fn setup_global_pool(&self) -> Result<()> {
        match self.num_threads {
            Some(0) => Err(HidroError::ThreadPool(
                "thread count must be at least 1".to_string(),
            )),
            Some(n) if n > 1 => {
                ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build_global()
                    .map_err(|e| {
                        HidroError::ThreadPool(format!(
                            "failed to initialize thread pool with {n} threads: {e}"
                        ))
                    })?;
                tracing::info!(threads = n, "configured parallel station processing");
                Ok(())
            }
            _ => {
                tracing::debug!("processing stations sequentially");
                Ok(())
            }
        }
    }

    /// Apply `f` to every item, in parallel when configured, keeping input
    /// order in the output
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if self.is_parallel() {
            items.par_iter().map(f).collect()
        } else {
            items.iter().map(f).collect()
        }
    }
}

/// Get information about the current parallel configuration
pub fn get_parallel_info() -> ParallelInfo {
    ParallelInfo {
        current_threads: rayon::current_num_threads(),
        available_cores: num_cpus::get(),
        available_parallelism: std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
    }
}

/// Information about the parallel processing environment
#[derive(Debug, Clone)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
    pub available_parallelism: usize,
}

impl ParallelInfo {
    pub fn print_info(&self) {
        println!("Parallel processing:");
        println!("   Rayon threads: {}", self.current_threads);
        println!("   CPU cores: {}", self.available_cores);
        println!("   Available parallelism: {}", self.available_parallelism);
    }
}
