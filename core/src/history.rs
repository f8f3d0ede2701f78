//! Gap-free per-day nutrition series over a date range.
//!
//! Past days come from the stored daily aggregates. The current day is
//! always taken from a live sum over the event log, so an entry logged a
//! moment ago is visible even when the caller has not yet observed the
//! aggregate row written alongside it.

use std::collections::BTreeMap;
use std::iter;

use chrono::{Days, NaiveDate};

use crate::error::ValidationError;
use crate::models::DailyAggregate;

/// Largest allowed `end - start`, in days (31 entries inclusive).
pub const MAX_RANGE_DAYS: i64 = 30;

/// Days covered when a caller names no start date.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// First day of the `days`-long window that ends on `end`.
///
/// Fails when the window would reach before the earliest representable date.
pub fn window_start(end: NaiveDate, days: u32) -> Result<NaiveDate, ValidationError> {
    end.checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .ok_or_else(|| ValidationError::InvalidDate(end.to_string()))
}

pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if end < start {
        return Err(ValidationError::InvalidRange { start, end });
    }
    let days = (end - start).num_days();
    if days > MAX_RANGE_DAYS {
        return Err(ValidationError::RangeTooLarge { days });
    }
    Ok(())
}

/// Blend stored rows and the live sum for `today` into one entry per day.
///
/// `stored` may contain rows outside the range; they are ignored. `live_today`
/// replaces whatever was stored for `today` when `today` lies in the range.
#[must_use]
pub fn reconstruct(
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    stored: Vec<DailyAggregate>,
    today: NaiveDate,
    live_today: Option<DailyAggregate>,
) -> Vec<DailyAggregate> {
    let mut by_date: BTreeMap<NaiveDate, DailyAggregate> =
        iter::successors(Some(start), NaiveDate::succ_opt)
            .take_while(|day| *day <= end)
            .map(|day| (day, DailyAggregate::zero(user_id, day)))
            .collect();

    for row in stored {
        if let Some(slot) = by_date.get_mut(&row.date) {
            *slot = row;
        }
    }

    if let Some(slot) = by_date.get_mut(&today) {
        *slot = live_today.unwrap_or_else(|| DailyAggregate::zero(user_id, today));
    }

    by_date.into_values().collect()
}
