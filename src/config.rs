use log::trace;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::CorrError;

/// Observation count from which a single pair's dot product is itself split
/// across workers.
pub const DEFAULT_INNER_PARALLEL_MIN_OBS: usize = 16_384;

/// Per-call settings for the correlation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrConfig {
    /// Worker count. `None` runs on the ambient rayon pool, which defaults to
    /// `RAYON_NUM_THREADS` or the number of logical CPUs.
    pub num_threads: Option<usize>,
    pub inner_parallel_min_obs: usize,
}

impl Default for CorrConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            inner_parallel_min_obs: DEFAULT_INNER_PARALLEL_MIN_OBS,
        }
    }
}

impl CorrConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// `0` means "use the default", same as never calling this.
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = (num_threads > 0).then_some(num_threads);
        self
    }

    pub fn with_inner_parallel_min_obs(mut self, min_obs: usize) -> Self {
        self.inner_parallel_min_obs = min_obs;
        self
    }

    /// A private pool sized to `num_threads`, or `None` to stay on the
    /// ambient pool.
    pub(crate) fn thread_pool(&self) -> Result<Option<ThreadPool>, CorrError> {
        match self.num_threads {
            Some(threads) if threads > 0 => {
                trace!("building private pool with {} threads", threads);
                let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
                Ok(Some(pool))
            }
            _ => {
                trace!(
                    "using ambient pool ({} threads)",
                    rayon::current_num_threads()
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_means_default() {
        let config = CorrConfig::new().with_num_threads(0);
        assert_eq!(config.num_threads, None);
        assert!(config.thread_pool().expect("pool").is_none());
    }

    #[test]
    fn explicit_threads_build_sized_pool() {
        let config = CorrConfig::new().with_num_threads(3);
        let pool = config.thread_pool().expect("pool").expect("private pool");
        assert_eq!(pool.current_num_threads(), 3);
    }
}
