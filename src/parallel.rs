//! Parallel processing configuration
//!
//! The native backend spreads its nearest-neighbor searches over Rayon's global
//! thread pool; this module configures that pool.

use crate::errors::{Result, RegridError};
use rayon::ThreadPoolBuilder;
use tracing::info;

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a configuration that uses all available CPU cores
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    /// Create a configuration that uses a specific number of threads
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }

    /// Set up the global Rayon thread pool with the specified configuration
    ///
    /// The global pool can only be built once per process; a second call fails
    /// with [`RegridError::ThreadPoolError`].
    pub fn setup_global_pool(&self) -> Result<()> {
        match self.num_threads {
            Some(0) => Err(RegridError::ThreadPoolError(
                "thread count must be at least 1".to_string(),
            )),
            Some(num_threads) => {
                ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build_global()
                    .map_err(|e| {
                        RegridError::ThreadPoolError(format!(
                            "Failed to initialize thread pool with {} threads: {}",
                            num_threads, e
                        ))
                    })?;
                info!(threads = num_threads, "configured parallel processing");
                Ok(())
            }
            None => {
                info!(
                    threads = rayon::current_num_threads(),
                    "using default thread pool configuration"
                );
                Ok(())
            }
        }
    }

    /// Number of threads in the global pool
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        assert!(ParallelConfig::default().num_threads.is_none());
        assert_eq!(ParallelConfig::with_threads(4).num_threads, Some(4));
        assert!(ParallelConfig::all_cores().num_threads.unwrap() > 0);
        assert!(ParallelConfig::default().current_threads() > 0);
    }

    #[test]
    fn zero_threads_is_rejected() {
        let result = ParallelConfig::with_threads(0).setup_global_pool();
        assert!(matches!(result, Err(RegridError::ThreadPoolError(_))));
    }

    #[test]
    fn default_pool_needs_no_setup() {
        assert!(ParallelConfig::default().setup_global_pool().is_ok());
    }
}
