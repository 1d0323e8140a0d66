use anyhow::Result;
use chrono::{DateTime, Utc};

use tidemark_core::{time_buckets, Interval, Sum};

/// One re-aggregated point: the canonical end-of-period instant and the
/// folded counters of every input value inside that period.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub bucket: DateTime<Utc>,
    pub sum: Sum,
}

/// Re-aggregate a timestamp-sorted series to the requested granularity.
///
/// `points` must be ascending by timestamp, as stored series and rollup
/// output already are. Each output point covers one maximal run of inputs
/// sharing a bucket; runs arrive in order and cover the whole input.
pub fn aggregate_series(
    interval: Interval,
    points: &[(DateTime<Utc>, Sum)],
) -> Result<Vec<SeriesPoint>> {
    let timestamps: Vec<DateTime<Utc>> = points.iter().map(|(ts, _)| *ts).collect();
    let mut out = Vec::new();
    time_buckets(interval, &timestamps, |bucket, start, end| {
        let mut sum = Sum::default();
        for (_, value) in &points[start..end] {
            sum.add(value);
        }
        out.push(SeriesPoint { bucket, sum });
        Ok(())
    })?;
    Ok(out)
}
