//! Time Helpers
//!
//! Day boundaries and interval checks on chrono date-times, plus the layouts
//! and second counts used around the cache.

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone};

// == Layouts ==
/// `chrono` format strings.
pub const DATETIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";
pub const LAYOUT_WITH_MS3: &str = "%Y-%m-%d %H:%M:%S%.3f";
pub const LAYOUT_WITH_MS6: &str = "%Y-%m-%d %H:%M:%S%.6f";
pub const DATE_LAYOUT: &str = "%Y-%m-%d";
pub const TIME_LAYOUT: &str = "%H:%M:%S";

// == Durations in seconds ==
pub const SECOND_SECS: i64 = 1;
pub const MINUTE_SECS: i64 = 60;
pub const HOUR_SECS: i64 = 3600;
pub const DAY_SECS: i64 = 86_400;
pub const WEEK_SECS: i64 = 7 * DAY_SECS;
pub const MONTH_SECS: i64 = 30 * DAY_SECS;

const DAY_NANOS: i64 = DAY_SECS * 1_000_000_000;

/// First instant of the day containing `t`, in `t`'s time zone.
pub fn day_start<Tz: TimeZone>(t: &DateTime<Tz>) -> DateTime<Tz> {
    let midnight = t.date_naive().and_time(NaiveTime::MIN);
    resolve_local(&t.timezone(), midnight)
}

/// Last nanosecond of the day containing `t` (23:59:59.999999999).
pub fn day_end<Tz: TimeZone>(t: &DateTime<Tz>) -> DateTime<Tz> {
    let last = t.date_naive().and_time(NaiveTime::MIN) + Duration::nanoseconds(DAY_NANOS - 1);
    resolve_local(&t.timezone(), last)
}

pub fn today_start() -> DateTime<Local> {
    day_start(&Local::now())
}

pub fn today_end() -> DateTime<Local> {
    day_end(&Local::now())
}

/// Whether `dst` lies strictly inside `(start, end)`.
///
/// A missing bound leaves that side open; with both missing nothing matches.
pub fn between<Tz: TimeZone>(
    dst: &DateTime<Tz>,
    start: Option<&DateTime<Tz>>,
    end: Option<&DateTime<Tz>>,
) -> bool {
    match (start, end) {
        (None, None) => false,
        (None, Some(end)) => dst < end,
        (Some(start), None) => dst > start,
        (Some(start), Some(end)) => dst > start && dst < end,
    }
}

/// Maps a wall-clock time into `tz`, taking the earlier instant when the
/// time is ambiguous and skipping forward over a DST gap.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    let mut candidate = naive;
    loop {
        if let Some(resolved) = tz.from_local_datetime(&candidate).earliest() {
            return resolved;
        }
        candidate += Duration::minutes(15);
    }
}
