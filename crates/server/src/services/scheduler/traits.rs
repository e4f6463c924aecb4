use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppResult;

pub type JobResult = AppResult<()>;

/// A periodic background job
#[async_trait]
pub trait SchedulerJob: Send + Sync {
    /// Job name used in logs
    fn name(&self) -> &'static str;

    /// Time between two runs
    fn interval(&self) -> Duration;

    /// Run the job once
    async fn execute(&self) -> JobResult;
}
