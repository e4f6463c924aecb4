mod dedup;
mod ingestion;
mod metrics;
mod scheduler;
mod supervisor;

pub use dedup::{derive_identifier, IdentifierError};
pub use ingestion::{select_candidates, IngestReport, IngestionService, JobOutcome};
pub use metrics::{Component, HealthState, HealthStatus, Metrics};
pub use scheduler::{FeedEnqueueJob, JobResult, SchedulerJob, SchedulerService};
pub use supervisor::{ConnectionSupervisor, SupervisorEvent, SupervisorHandle, SupervisorState};
