use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::debug;

/// Worker pool used for CPU-bound batch work such as chunk generation.
pub struct JobSystem {
    pool: ThreadPool,
}

impl JobSystem {
    pub fn new(num_threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|index| format!("tessel-job-{index}"));
        if let Some(count) = num_threads {
            builder = builder.num_threads(count);
        }

        let pool = builder.build()?;
        debug!("Job system started with {} thread(s)", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `job` over every input on the pool and blocks until all results are in.
    /// Results keep the order of `inputs`.
    pub fn map_ordered<T, R, F>(&self, inputs: Vec<T>, job: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        self.pool
            .install(|| inputs.into_par_iter().map(|input| job(input)).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::JobSystem;

    #[test]
    fn map_ordered_preserves_input_order() {
        let jobs = JobSystem::new(Some(4)).expect("build pool");
        let inputs: Vec<u32> = (0..64).collect();
        let squares = jobs.map_ordered(inputs, |value| value * value);

        assert_eq!(squares.len(), 64);
        for (index, square) in squares.iter().enumerate() {
            assert_eq!(*square, (index * index) as u32);
        }
    }

    #[test]
    fn jobs_run_on_the_configured_pool() {
        let jobs = JobSystem::new(Some(2)).expect("build pool");
        let counter = AtomicUsize::new(0);
        let names = jobs.map_ordered((0..8).collect::<Vec<u32>>(), |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::current().name().map(str::to_owned)
        });

        assert_eq!(counter.load(Ordering::SeqCst), 8);
        assert_eq!(jobs.thread_count(), 2);
        assert!(names
            .iter()
            .all(|name| name.as_deref().is_some_and(|n| n.starts_with("tessel-job-"))));
    }
}
