use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Partition length used when frames are packed into compressed buffers.
pub const DEFAULT_PARTITION_LENGTH: usize = 4096;

/// Settings carried by an image and handed to every processor applied to it.
///
/// The default runs parallel loops on the global rayon pool, keeps failure messages terse and
/// packs frames in partitions of [`DEFAULT_PARTITION_LENGTH`] elements.
#[derive(Clone, Debug)]
pub struct Configuration {
    pool: Option<Arc<ThreadPool>>,
    diagnostics: bool,
    partition_length: usize,
}

impl Configuration {
    pub fn new() -> Self {
        Configuration {
            pool: None,
            diagnostics: false,
            partition_length: DEFAULT_PARTITION_LENGTH,
        }
    }

    /// Run parallel loops on a dedicated pool of at most `threads` workers.
    ///
    /// Zero selects the global pool again.
    pub fn with_max_degree_of_parallelism(
        mut self,
        threads: usize,
    ) -> Result<Self, ThreadPoolBuildError> {
        if threads == 0 {
            self.pool = None;
            return Ok(self);
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("pixelflow-{}", index))
            .build()?;
        self.pool = Some(Arc::new(pool));
        Ok(self)
    }

    /// Render and log the cause of processing failures.
    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_preferred_partition_length(mut self, length: usize) -> Self {
        self.partition_length = length;
        self
    }

    pub fn diagnostics(&self) -> bool {
        self.diagnostics
    }

    pub fn preferred_partition_length(&self) -> usize {
        self.partition_length
    }

    /// The number of workers a parallel loop may use.
    pub fn max_degree_of_parallelism(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Run `op` so that rayon calls inside of it use the configured pool.
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration::new()
    }
}

#[test]
fn dedicated_pool() {
    let config = Configuration::new().with_max_degree_of_parallelism(2).unwrap();
    assert_eq!(config.max_degree_of_parallelism(), 2);
    assert_eq!(config.install(rayon::current_num_threads), 2);

    let config = config.with_max_degree_of_parallelism(0).unwrap();
    assert_eq!(config.max_degree_of_parallelism(), rayon::current_num_threads());
}
