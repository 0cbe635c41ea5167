//! Sync run orchestration for the schedule agent.
//!
//! Provides the ingestion client, the fetch-aggregate-forward run and the
//! scheduler that triggers it.

pub mod ingest;
pub mod orchestrator;
pub mod scheduler;

pub use ingest::{IngestClient, IngestResponse, SyncPayload, WeekSchedules, SYNC_PATH};
pub use orchestrator::{SyncOrchestrator, SyncOutcome, WEEK_OFFSETS};
pub use scheduler::{SchedulerState, SyncJob, SyncScheduler};
