//! Schedule API response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::week::WeekRange;

/// One schedule entry. Opaque to the sync agent and forwarded as-is.
pub type EventRecord = Value;

/// Schedule for one week, as forwarded to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekResult {
    #[serde(flatten)]
    pub range: WeekRange,
    pub events: Vec<EventRecord>,
}

impl WeekResult {
    pub fn new(range: WeekRange, events: Vec<EventRecord>) -> Self {
        Self { range, events }
    }
}

/// Shapes the schedule API is known to answer with.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleBody {
    /// `{ "events": [...] }`; items may themselves be arrays of events.
    Grouped(Vec<Value>),
    /// A bare array of events.
    Flat(Vec<Value>),
    /// Anything else, including `null`. Carries no events.
    Empty,
}

impl From<Value> for ScheduleBody {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(mut map) => match map.remove("events") {
                Some(Value::Array(events)) => ScheduleBody::Grouped(events),
                _ => ScheduleBody::Empty,
            },
            Value::Array(events) => ScheduleBody::Flat(events),
            _ => ScheduleBody::Empty,
        }
    }
}

impl ScheduleBody {
    /// Flatten grouped events one level and drop null entries.
    pub fn into_events(self) -> Vec<EventRecord> {
        match self {
            ScheduleBody::Grouped(groups) => groups
                .into_iter()
                .flat_map(|item| match item {
                    Value::Array(inner) => inner,
                    other => vec![other],
                })
                .filter(|event| !event.is_null())
                .collect(),
            ScheduleBody::Flat(events) => events.into_iter().filter(|e| !e.is_null()).collect(),
            ScheduleBody::Empty => Vec::new(),
        }
    }
}
