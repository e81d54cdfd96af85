//! Next-fire calculation for recurring and interval tasks.
//!
//! A `recurring` pattern ("hourly", "daily", "weekly:<day>") takes
//! precedence over `scheduler_params.repeat_interval`. Weekly patterns
//! index days from Sunday (0) through Saturday (6).

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use tracing::warn;

use hivesched_core::types::Task;

/// Minutes between firings when neither a recurring pattern nor an
/// explicit interval is set.
const DEFAULT_REPEAT_MINUTES: u32 = 60;

/// The task's next due time after a successful firing at `now`.
/// `None` means the task has no further firing scheduled.
pub fn next_fire(task: &Task, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(pattern) = task.recurring.as_deref() {
        if !pattern.is_empty() {
            return Some(recurring_next_fire(
                now,
                pattern,
                task.schedule_time.as_deref(),
            ));
        }
    }
    match task.scheduler_params.repeat_interval {
        Some(0) => None,
        Some(minutes) => Some(now + Duration::minutes(i64::from(minutes))),
        None => Some(now + Duration::minutes(i64::from(DEFAULT_REPEAT_MINUTES))),
    }
}

/// Advance `from` to the next occurrence of a recurring pattern,
/// honoring a preferred "HH:MM" fire time when given. The result is
/// always strictly after `from`.
pub fn recurring_next_fire(
    from: DateTime<Utc>,
    pattern: &str,
    preferred_time: Option<&str>,
) -> DateTime<Utc> {
    let mut next = from;
    if let Some((hour, minute)) = preferred_time.and_then(parse_hh_mm) {
        if let Some(at) = from
            .with_hour(hour)
            .and_then(|t| t.with_minute(minute))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
        {
            next = at;
        }
    }

    if next > from {
        return next;
    }

    if pattern == "hourly" {
        next + Duration::hours(1)
    } else if pattern == "daily" {
        next + Duration::days(1)
    } else if let Some(day_name) = pattern.strip_prefix("weekly:") {
        next + Duration::days(days_until_weekday(next, day_name))
    } else {
        warn!("⚠️ Unrecognized recurring pattern '{pattern}', falling back to daily");
        next + Duration::days(1)
    }
}

/// Days to add to reach the named weekday, strictly in the future
/// (1..=7). An unrecognized day name falls back to a full week.
fn days_until_weekday(from: DateTime<Utc>, day_name: &str) -> i64 {
    let target = match day_name.to_ascii_lowercase().as_str() {
        "sunday" => 0,
        "monday" => 1,
        "tuesday" => 2,
        "wednesday" => 3,
        "thursday" => 4,
        "friday" => 5,
        "saturday" => 6,
        other => {
            warn!("⚠️ Unrecognized weekday '{other}' in recurring pattern, using +7 days");
            return 7;
        }
    };
    let current = i64::from(from.weekday().num_days_from_sunday());
    let mut delta = target - current;
    if delta <= 0 {
        delta += 7;
    }
    delta
}

fn parse_hh_mm(raw: &str) -> Option<(u32, u32)> {
    let (h, m) = raw.split_once(':')?;
    let hour: u32 = h.trim().parse().ok()?;
    let minute: u32 = m.trim().parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}
