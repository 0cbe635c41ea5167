//! KSE schedule API integration.
//!
//! Provides the week window calculation, the schedule API client and the
//! never-failing per-week fetcher used by the sync run.

pub mod client;
pub mod error;
pub mod fetcher;
pub mod types;
pub mod week;

pub use client::ScheduleClient;
pub use error::ScheduleError;
pub use fetcher::ScheduleFetcher;
pub use types::{EventRecord, ScheduleBody, WeekResult};
pub use week::{week_range, Clock, FixedClock, SystemClock, WeekRange};
