//! Rolling week window.
//!
//! Weeks run Monday to Sunday. A week offset of 0 is the week containing
//! "today", 1 the next one, -1 the previous one. Offsets that would leave
//! chrono's date range saturate at the first or last complete week.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Source of the current local calendar date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a single date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Monday-to-Sunday date range, serialized as ISO `YYYY-MM-DD` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl WeekRange {
    /// Range for `offset_weeks` relative to the clock's today.
    pub fn current(clock: &dyn Clock, offset_weeks: i32) -> Self {
        week_range(clock.today(), offset_weeks)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

impl std::fmt::Display for WeekRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

/// Week containing `today`, shifted by `offset_weeks` whole weeks.
pub fn week_range(today: NaiveDate, offset_weeks: i32) -> WeekRange {
    let since_monday = i64::from(today.weekday().num_days_from_monday());
    let monday = i64::from(today.num_days_from_ce()) - since_monday + 7 * i64::from(offset_weeks);
    let monday = monday.clamp(first_monday(), last_monday());

    WeekRange {
        from: date_from_days(monday),
        to: date_from_days(monday + 6),
    }
}

/// Earliest Monday representable by chrono, in days from CE.
fn first_monday() -> i64 {
    let min = NaiveDate::MIN;
    let to_monday = (7 - min.weekday().num_days_from_monday()) % 7;
    i64::from(min.num_days_from_ce()) + i64::from(to_monday)
}

/// Latest Monday whose Sunday is still representable, in days from CE.
fn last_monday() -> i64 {
    let max = NaiveDate::MAX;
    // Six days before `max` is one weekday later.
    let past_monday = (max.weekday().num_days_from_monday() + 1) % 7;
    i64::from(max.num_days_from_ce()) - 6 - i64::from(past_monday)
}

fn date_from_days(days: i64) -> NaiveDate {
    i32::try_from(days)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}
