use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Event;

/// An immutable columnar batch of finalized visit rows.
///
/// Built once when the aggregator swaps its pending buffer out; rows are
/// ordered by timestamp so the rollup can feed the column straight into
/// [`crate::time_buckets`]. After construction nothing mutates a batch;
/// it is handed to the log-structured store as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventBatch {
    pub site_ids: Vec<String>,
    pub session_keys: Vec<String>,
    pub names: Vec<String>,
    pub paths: Vec<String>,
    pub referrers: Vec<Option<String>>,
    pub screen_widths: Vec<Option<u32>>,
    pub countries: Vec<Option<String>>,
    pub regions: Vec<Option<String>>,
    pub cities: Vec<Option<String>>,
    pub devices: Vec<Option<String>>,
    pub browsers: Vec<Option<String>>,
    pub oses: Vec<Option<String>>,
    pub utm_sources: Vec<Option<String>>,
    pub utm_mediums: Vec<Option<String>>,
    pub utm_campaigns: Vec<Option<String>>,
    pub utm_terms: Vec<Option<String>>,
    pub utm_contents: Vec<Option<String>>,
    /// Millisecond epoch, non-decreasing.
    pub timestamps: Vec<i64>,
    pub is_new_visit: Vec<bool>,
    pub page_views: Vec<u32>,
    pub duration_seconds: Vec<u32>,
}

impl EventBatch {
    /// Finalize a set of rows into a columnar batch, ordered by timestamp.
    pub fn from_rows(mut rows: Vec<Event>) -> EventBatch {
        rows.sort_by_key(|e| e.timestamp);
        let mut batch = EventBatch::with_capacity(rows.len());
        for event in rows {
            batch.push(event);
        }
        batch
    }

    fn with_capacity(n: usize) -> EventBatch {
        EventBatch {
            site_ids: Vec::with_capacity(n),
            session_keys: Vec::with_capacity(n),
            names: Vec::with_capacity(n),
            paths: Vec::with_capacity(n),
            referrers: Vec::with_capacity(n),
            screen_widths: Vec::with_capacity(n),
            countries: Vec::with_capacity(n),
            regions: Vec::with_capacity(n),
            cities: Vec::with_capacity(n),
            devices: Vec::with_capacity(n),
            browsers: Vec::with_capacity(n),
            oses: Vec::with_capacity(n),
            utm_sources: Vec::with_capacity(n),
            utm_mediums: Vec::with_capacity(n),
            utm_campaigns: Vec::with_capacity(n),
            utm_terms: Vec::with_capacity(n),
            utm_contents: Vec::with_capacity(n),
            timestamps: Vec::with_capacity(n),
            is_new_visit: Vec::with_capacity(n),
            page_views: Vec::with_capacity(n),
            duration_seconds: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, event: Event) {
        self.site_ids.push(event.site_id);
        self.session_keys.push(event.session_key);
        self.names.push(event.name);
        self.paths.push(event.path);
        self.referrers.push(event.referrer);
        self.screen_widths.push(event.screen_width);
        self.countries.push(event.country);
        self.regions.push(event.region);
        self.cities.push(event.city);
        self.devices.push(event.device);
        self.browsers.push(event.browser);
        self.oses.push(event.os);
        self.utm_sources.push(event.utm_source);
        self.utm_mediums.push(event.utm_medium);
        self.utm_campaigns.push(event.utm_campaign);
        self.utm_terms.push(event.utm_term);
        self.utm_contents.push(event.utm_content);
        self.timestamps.push(event.timestamp.timestamp_millis());
        self.is_new_visit.push(event.is_new_visit);
        self.page_views.push(event.page_views);
        self.duration_seconds.push(event.duration_seconds);
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Row timestamps decoded to UTC instants, in batch order.
    ///
    /// Always one instant per row so indices stay aligned with the other
    /// columns; an unrepresentable millisecond value decodes to the epoch.
    pub fn instants(&self) -> Vec<DateTime<Utc>> {
        self.timestamps
            .iter()
            .map(|ms| {
                DateTime::<Utc>::from_timestamp_millis(*ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
            })
            .collect()
    }
}
