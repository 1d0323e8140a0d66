use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SummaryError;

/// Three counters for one reporting period.
///
/// Counters are floating so that partial attribution (sampling factors,
/// weighted rollups) keeps working without a type change. `add` is plain
/// field-wise addition: commutative and associative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sum {
    pub visitors: f64,
    pub visits: f64,
    pub events: f64,
}

impl Sum {
    pub fn new(visitors: f64, visits: f64, events: f64) -> Self {
        Self {
            visitors,
            visits,
            events,
        }
    }

    pub fn add(&mut self, other: &Sum) {
        self.visitors += other.visitors;
        self.visits += other.visits;
        self.events += other.events;
    }

    /// Reset to zero for reuse in tight rollup loops.
    pub fn reuse(&mut self) {
        self.visitors = 0.0;
        self.visits = 0.0;
        self.events = 0.0;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SummaryError> {
        bincode::serialize(self).map_err(SummaryError::Encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Sum, SummaryError> {
        bincode::deserialize(bytes).map_err(SummaryError::Decode)
    }
}

/// Exact day count of `year`, leap-aware (365 or 366).
pub fn days_in_year(year: i32) -> usize {
    chrono::NaiveDate::from_ymd_opt(year, 12, 31)
        .map(|d| d.ordinal() as usize)
        .unwrap_or(365)
}

/// Per-day counters for one (site, year).
///
/// Three parallel sequences with one slot per day of the calendar year the
/// structure was built for. The length is fixed at construction and never
/// changes; `update` only ever adds into an existing slot.
///
/// A calendar is exclusively owned by the rollup invocation updating it;
/// concurrent writers for the same (site, year) are a design violation, not
/// something this type defends against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    year: i32,
    visitors: Vec<f64>,
    visits: Vec<f64>,
    events: Vec<f64>,
}

impl Calendar {
    /// A zeroed calendar for `year`, sized to its exact day count.
    pub fn new(year: i32) -> Calendar {
        let days = days_in_year(year);
        Calendar {
            year,
            visitors: vec![0.0; days],
            visits: vec![0.0; days],
            events: vec![0.0; days],
        }
    }

    /// Allocate a calendar for `timestamp`'s year and apply one update.
    ///
    /// This is how the aggregate for a (site, year) with no prior blob
    /// comes into existence.
    pub fn zero(timestamp: DateTime<Utc>, sum: &Sum) -> Calendar {
        let mut calendar = Calendar::new(timestamp.year());
        calendar.update(timestamp, sum);
        calendar
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn days(&self) -> usize {
        self.visitors.len()
    }

    /// Add `sum` into the slot for `timestamp`'s day of year.
    ///
    /// Day-of-year is 1-based in the timestamp, 0-based in the slot arrays.
    /// A timestamp from a different year is skipped rather than misfiled
    /// into a same-numbered slot of the wrong year.
    pub fn update(&mut self, timestamp: DateTime<Utc>, sum: &Sum) {
        if timestamp.year() != self.year {
            return;
        }
        let slot = timestamp.ordinal() as usize - 1;
        if slot >= self.visitors.len() {
            return;
        }
        self.visitors[slot] += sum.visitors;
        self.visits[slot] += sum.visits;
        self.events[slot] += sum.events;
    }

    /// Re-year and zero in place, reusing the backing allocation.
    ///
    /// The explicit counterpart of `Sum::reuse` for pooled rollup loops: no
    /// reallocation happens unless the day count grows (365 → 366).
    pub fn reset(&mut self, year: i32) {
        let days = days_in_year(year);
        self.year = year;
        for column in [&mut self.visitors, &mut self.visits, &mut self.events] {
            column.clear();
            column.resize(days, 0.0);
        }
    }

    pub fn series_visitors(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> &[f64] {
        Self::slice(&self.visitors, self.year, from, to)
    }

    pub fn series_visits(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> &[f64] {
        Self::slice(&self.visits, self.year, from, to)
    }

    pub fn series_events(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> &[f64] {
        Self::slice(&self.events, self.year, from, to)
    }

    /// Daily values covering `[from, to)` as day-of-year offsets.
    ///
    /// Both endpoints must fall in this calendar's year and `to` must not
    /// precede `from`; a violating range yields an empty slice, never an
    /// error.
    fn slice<'a>(
        column: &'a [f64],
        year: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> &'a [f64] {
        if from.year() != year || to.year() != year || to < from {
            return &[];
        }
        let start = from.ordinal() as usize - 1;
        let end = (to.ordinal() as usize - 1).min(column.len());
        if start >= end {
            return &[];
        }
        &column[start..end]
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SummaryError> {
        bincode::serialize(self).map_err(SummaryError::Encode)
    }

    /// Reconstruct a calendar from a persisted blob.
    ///
    /// Rejects blobs whose column lengths disagree with the encoded year:
    /// a truncated or tampered blob must surface as an error, not as a
    /// short calendar that silently drops days.
    pub fn from_bytes(bytes: &[u8]) -> Result<Calendar, SummaryError> {
        let calendar: Calendar = bincode::deserialize(bytes).map_err(SummaryError::Decode)?;
        let days = days_in_year(calendar.year);
        if calendar.visitors.len() != days
            || calendar.visits.len() != days
            || calendar.events.len() != days
        {
            return Err(SummaryError::Corrupt(format!(
                "calendar for year {} has {}/{}/{} slots, expected {}",
                calendar.year,
                calendar.visitors.len(),
                calendar.visits.len(),
                calendar.events.len(),
                days
            )));
        }
        Ok(calendar)
    }
}
