//! Per-week schedule fetch that never fails.
//!
//! Every error is logged and turned into an absent week so one bad week
//! cannot sink the whole sync run.

use std::sync::Arc;

use crate::client::ScheduleClient;
use crate::types::WeekResult;
use crate::week::{Clock, WeekRange};

pub struct ScheduleFetcher {
    client: ScheduleClient,
    clock: Arc<dyn Clock>,
}

impl ScheduleFetcher {
    pub fn new(client: ScheduleClient, clock: Arc<dyn Clock>) -> Self {
        Self { client, clock }
    }

    /// Range for `offset_weeks`, relative to the clock's today.
    pub fn week_range(&self, offset_weeks: i32) -> WeekRange {
        WeekRange::current(self.clock.as_ref(), offset_weeks)
    }

    /// Fetch one week. `None` means the week could not be fetched.
    pub async fn fetch_week(&self, token: &str, offset_weeks: i32) -> Option<WeekResult> {
        let range = self.week_range(offset_weeks);

        match self.client.fetch_schedule(token, range).await {
            Ok(body) => {
                let events = body.into_events();
                tracing::debug!(
                    offset = offset_weeks,
                    week = %range,
                    events = events.len(),
                    "Fetched week"
                );
                Some(WeekResult::new(range, events))
            }
            Err(e) => {
                if e.needs_sign_in() {
                    tracing::warn!(offset = offset_weeks, "Session token rejected: {}", e);
                }
                tracing::error!(
                    offset = offset_weeks,
                    week = %range,
                    status = ?e.status(),
                    "Failed to fetch week {}: {}",
                    offset_weeks,
                    e
                );
                None
            }
        }
    }
}
