mod feed_enqueue_job;
mod traits;

pub use feed_enqueue_job::FeedEnqueueJob;
pub use traits::{JobResult, SchedulerJob};

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Scheduler service that manages periodic background tasks.
///
/// Each registered job runs in its own tokio task. The first tick fires one
/// full interval after [`start`](Self::start); callers that want an
/// immediate run execute the job themselves first.
///
/// # Example
///
/// ```rust,ignore
/// let job = Arc::new(FeedEnqueueJob::new(repository, metrics, &config));
/// job.execute().await?;
///
/// let scheduler = SchedulerService::new().with_arc_job(job);
/// scheduler.start();
/// ```
pub struct SchedulerService {
    jobs: Vec<Arc<dyn SchedulerJob>>,
}

impl SchedulerService {
    /// Creates a new scheduler service with no jobs.
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    /// Adds a job to the scheduler.
    pub fn with_job<J: SchedulerJob + 'static>(mut self, job: J) -> Self {
        self.jobs.push(Arc::new(job));
        self
    }

    /// Adds an already-wrapped Arc job, keeping a reference for manual runs.
    pub fn with_arc_job<J: SchedulerJob + 'static>(mut self, job: Arc<J>) -> Self {
        self.jobs.push(job);
        self
    }

    /// Starts all registered jobs and returns their task handles.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        self.jobs
            .iter()
            .map(|job| {
                let job = Arc::clone(job);
                tokio::spawn(async move {
                    Self::run_job_loop(job).await;
                })
            })
            .collect()
    }

    /// Runs a single job in an infinite loop.
    async fn run_job_loop(job: Arc<dyn SchedulerJob>) {
        let name = job.name();
        let interval = job.interval();

        let mut timer = tokio::time::interval_at(Instant::now() + interval, interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            timer.tick().await;

            match job.execute().await {
                Ok(()) => {
                    tracing::debug!("Job '{}' completed successfully", name);
                }
                Err(e) => {
                    tracing::error!("Job '{}' failed: {}", name, e);
                }
            }
        }
    }

    /// Returns the number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

impl Default for SchedulerService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingJob {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SchedulerJob for CountingJob {
        fn name(&self) -> &'static str {
            "Counting"
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(60)
        }

        async fn execute(&self) -> JobResult {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = SchedulerService::new().with_job(CountingJob { runs: runs.clone() });
        assert_eq!(scheduler.job_count(), 1);

        let handles = scheduler.start();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        for handle in handles {
            handle.abort();
        }
    }
}
