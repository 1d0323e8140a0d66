//! Background rollup: folds committed event batches into compact per-site,
//! per-year [`Calendar`] aggregates.
//!
//! A calendar for a given (site, year) is exclusively owned by the rollup
//! invocation updating it. Rollup is serialized per site, never run with
//! concurrent writers for the same key.

use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Datelike;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};

use tidemark_core::{time_buckets, Calendar, EventBatch, Interval, Sum};

/// Persistence boundary for calendar blobs.
///
/// Blobs are opaque byte sequences produced by the calendar codec; format
/// stability matters only within this crate's own read/write pairing.
#[async_trait]
pub trait CalendarStore: Send + Sync + 'static {
    async fn load(&self, site_id: &str, year: i32) -> Result<Option<Vec<u8>>>;
    async fn save(&self, site_id: &str, year: i32, blob: &[u8]) -> Result<()>;
}

/// In-memory calendar store for tests and embedded use.
#[derive(Default)]
pub struct MemoryCalendarStore {
    blobs: Mutex<HashMap<(String, i32), Vec<u8>>>,
}

impl MemoryCalendarStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CalendarStore for MemoryCalendarStore {
    async fn load(&self, site_id: &str, year: i32) -> Result<Option<Vec<u8>>> {
        let blobs = self.blobs.lock().await;
        Ok(blobs.get(&(site_id.to_string(), year)).cloned())
    }

    async fn save(&self, site_id: &str, year: i32, blob: &[u8]) -> Result<()> {
        let mut blobs = self.blobs.lock().await;
        blobs.insert((site_id.to_string(), year), blob.to_vec());
        Ok(())
    }
}

/// Folds batches into yearly calendars through a [`CalendarStore`].
pub struct Rollup<S> {
    store: S,
}

impl<S: CalendarStore> Rollup<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fold one committed batch into `site_id`'s yearly calendars.
    ///
    /// Batches come out of the write path per site and ordered by timestamp,
    /// so the day-granularity bucketing pass runs straight over the
    /// timestamp column. Per row the contribution is: visitors += new-visit
    /// flag, visits += 1, events += merged page views. A year with no prior
    /// blob gets a freshly zeroed calendar sized to that year.
    pub async fn apply_batch(&self, site_id: &str, batch: &EventBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let instants = batch.instants();

        // Load existing aggregates for every year the batch touches before
        // the single synchronous folding pass.
        let years: BTreeSet<i32> = instants.iter().map(|ts| ts.year()).collect();
        let mut calendars: HashMap<i32, Option<Calendar>> = HashMap::new();
        for year in &years {
            let calendar = match self.store.load(site_id, *year).await? {
                Some(blob) => Some(Calendar::from_bytes(&blob)?),
                None => None,
            };
            calendars.insert(*year, calendar);
        }

        let mut day = Sum::default();
        time_buckets(Interval::Day, &instants, |_, start, end| {
            day.reuse();
            for i in start..end {
                let visitors = if batch.is_new_visit[i] { 1.0 } else { 0.0 };
                day.add(&Sum::new(visitors, 1.0, batch.page_views[i] as f64));
            }
            let when = instants[start];
            if let Some(slot) = calendars.get_mut(&when.year()) {
                match slot {
                    Some(calendar) => calendar.update(when, &day),
                    None => *slot = Some(Calendar::zero(when, &day)),
                }
            }
            Ok(())
        })?;

        for (year, calendar) in calendars {
            if let Some(calendar) = calendar {
                self.store.save(site_id, year, &calendar.to_bytes()?).await?;
            }
        }
        info!(site = site_id, rows = batch.len(), "batch rolled up");
        Ok(())
    }

    /// Rollup driver: drain committed (site, batch) pairs from a channel.
    ///
    /// A failing batch is logged and skipped so one bad blob never stalls
    /// the drain; decode errors surface per batch via `apply_batch`.
    pub async fn run(&self, mut batches: mpsc::Receiver<(String, EventBatch)>) {
        while let Some((site_id, batch)) = batches.recv().await {
            if let Err(e) = self.apply_batch(&site_id, &batch).await {
                error!(site = %site_id, error = %e, "rollup failed for batch");
            }
        }
    }
}
