use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 86_400_000;

/// Reporting granularity for [`time_buckets`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

/// Group a non-decreasing timestamp sequence into contiguous runs sharing
/// one bucket key and invoke `callback(bucket_key, start, end_exclusive)`
/// per run.
///
/// The bucket key is the canonical end-of-period instant for the run's
/// timestamps: the first instant of the next minute/hour/day, the upcoming
/// Monday 00:00 UTC for weeks, the first instant of the next month for
/// months. A timestamp exactly on a boundary belongs to the period it
/// starts.
///
/// Single O(n) pass, O(1) extra space. Behavior on unsorted input is
/// undefined and not validated. A callback error stops iteration and
/// propagates. Empty input returns without invoking the callback.
pub fn time_buckets<F>(
    interval: Interval,
    timestamps: &[DateTime<Utc>],
    mut callback: F,
) -> Result<()>
where
    F: FnMut(DateTime<Utc>, usize, usize) -> Result<()>,
{
    let Some(first) = timestamps.first() else {
        return Ok(());
    };
    let mut run_start = 0;
    let mut run_key = bucket_end(interval, *first);
    for (i, ts) in timestamps.iter().enumerate().skip(1) {
        let key = bucket_end(interval, *ts);
        if key != run_key {
            callback(run_key, run_start, i)?;
            run_start = i;
            run_key = key;
        }
    }
    callback(run_key, run_start, timestamps.len())
}

/// Canonical end-of-period instant for `ts` under `interval`.
pub fn bucket_end(interval: Interval, ts: DateTime<Utc>) -> DateTime<Utc> {
    match interval {
        Interval::Minute => ceil_to_step(ts, MINUTE_MS),
        Interval::Hour => ceil_to_step(ts, HOUR_MS),
        Interval::Day => ceil_to_step(ts, DAY_MS),
        Interval::Week => end_of_week(ts),
        Interval::Month => end_of_month(ts),
    }
}

fn ceil_to_step(ts: DateTime<Utc>, step_ms: i64) -> DateTime<Utc> {
    let ms = ts.timestamp_millis();
    let end = ms - ms.rem_euclid(step_ms) + step_ms;
    DateTime::<Utc>::from_timestamp_millis(end).unwrap_or(ts)
}

/// Upcoming Monday 00:00 UTC (ISO weeks). Epoch day zero was a Thursday.
fn end_of_week(ts: DateTime<Utc>) -> DateTime<Utc> {
    let day = ts.timestamp_millis().div_euclid(DAY_MS);
    let days_since_monday = (day + 3).rem_euclid(7);
    let end_day = day - days_since_monday + 7;
    DateTime::<Utc>::from_timestamp_millis(end_day * DAY_MS).unwrap_or(ts)
}

fn end_of_month(ts: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if ts.month() == 12 {
        (ts.year() + 1, 1)
    } else {
        (ts.year(), ts.month() + 1)
    };
    chrono::NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(ts)
}
