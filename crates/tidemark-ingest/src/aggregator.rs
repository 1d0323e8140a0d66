use std::sync::{Arc, Mutex as StdMutex};

use moka::future::Cache;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use tidemark_core::{config::Config, Event, EventBatch, SubmissionPayload};

use crate::store::EventStore;

/// Deduplicates near-duplicate hits into one logical visit per session key
/// and buffers the resulting rows for periodic flushing.
///
/// The session cache is bounded and time-expiring (TTL = session window);
/// its TinyLFU admission favors frequently-updated keys and may silently
/// drop entries under pressure; a dropped session simply restarts as a new
/// visit on the next hit. Cached entries and buffered rows share one handle,
/// so merging a duplicate hit updates the already-buffered row in place: a
/// duplicate never produces a second row.
pub struct SessionAggregator {
    site_id: String,
    sessions: Cache<String, Arc<StdMutex<Event>>>,
    /// Pending rows of the current batch. `queue`'s append and `flush`'s
    /// swap both go through this lock, so neither ever observes a
    /// partially-appended batch.
    pending: Mutex<Vec<Arc<StdMutex<Event>>>>,
    store: Arc<dyn EventStore>,
}

impl SessionAggregator {
    pub fn new(site_id: String, config: &Config, store: Arc<dyn EventStore>) -> Self {
        Self {
            site_id,
            sessions: Cache::builder()
                .max_capacity(config.session_cache_capacity)
                .time_to_live(config.session_window())
                .build(),
            pending: Mutex::new(Vec::new()),
            store,
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// Parse and buffer one decoded submission.
    ///
    /// Malformed payloads are dropped silently: ingestion never raises a
    /// user-visible error for bad input, it simply does not count it.
    pub async fn queue(&self, payload: SubmissionPayload) {
        let Some(event) = Event::parse(&self.site_id, payload) else {
            debug!(site = %self.site_id, "dropping unparseable submission");
            return;
        };
        let hit_at = event.timestamp;
        let key = event.session_key.clone();
        let row = Arc::new(StdMutex::new(event));

        // Atomic create-if-absent keeps at most one live entry per key even
        // when two first hits race.
        let entry = self
            .sessions
            .entry(key)
            .or_insert_with(std::future::ready(row.clone()))
            .await;

        if entry.is_fresh() {
            // This event is the row; buffer its shared handle.
            self.pending.lock().await.push(row);
        } else if let Ok(mut open) = entry.into_value().lock() {
            // Duplicate hit within the session window: fold it into the open
            // visit and drop the transient event.
            open.merge(hit_at);
        }
    }

    /// Swap out the pending batch, finalize it, and append it to the store.
    ///
    /// The swap is an O(1) pointer exchange under the batch lock; the O(n)
    /// finalization runs outside it. An empty batch is a no-op. An append
    /// failure is logged and propagated; the swapped-out batch is lost and
    /// deliberately not re-merged into the next one.
    pub async fn flush(&self) -> anyhow::Result<()> {
        let rows = {
            let mut pending = self.pending.lock().await;
            std::mem::take(&mut *pending)
        };
        if rows.is_empty() {
            return Ok(());
        }

        let events: Vec<Event> = rows
            .iter()
            .filter_map(|row| row.lock().ok().map(|event| event.clone()))
            .collect();
        let batch = EventBatch::from_rows(events);
        let count = batch.len();

        if let Err(e) = self.store.append(batch).await {
            error!(site = %self.site_id, count, error = %e, "batch append failed, events lost");
            return Err(e);
        }
        info!(site = %self.site_id, count, "batch flushed");
        Ok(())
    }

    /// Number of rows waiting in the current batch.
    pub async fn pending_rows(&self) -> usize {
        self.pending.lock().await.len()
    }
}
