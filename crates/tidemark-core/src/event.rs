use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::compute_session_key;

/// The decoded submission the transport layer hands to the aggregator.
///
/// Enrichment fields (geo, device classification) are optional and filled in
/// by the external lookup services before the payload reaches this crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionPayload {
    /// Stable visitor token computed at the transport boundary.
    pub fingerprint: String,
    /// Event name; pageviews arrive with an empty name.
    pub name: Option<String>,
    pub path: String,
    pub referrer: Option<String>,
    pub screen_width: Option<u32>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub device: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    /// Millisecond epoch; absent means "now" at parse time.
    pub timestamp_ms: Option<i64>,
}

/// One materialized visit row.
///
/// Created from a [`SubmissionPayload`]; mutated in place when a duplicate
/// hit for the same session key arrives within the session window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub site_id: String,
    pub session_key: String,
    pub name: String,
    pub path: String,
    pub referrer: Option<String>,
    pub screen_width: Option<u32>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub device: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    /// First-seen instant of the visit this row represents.
    pub timestamp: DateTime<Utc>,
    pub is_new_visit: bool,
    pub page_views: u32,
    pub duration_seconds: u32,
}

impl Event {
    /// Parse a decoded submission into a fresh visit row for `site_id`.
    ///
    /// Returns `None` when the payload cannot represent a countable hit
    /// (missing fingerprint or path, unrepresentable timestamp). Ingestion
    /// drops such payloads silently; one bad hit never disrupts the batch.
    pub fn parse(site_id: &str, payload: SubmissionPayload) -> Option<Event> {
        if site_id.is_empty() || payload.fingerprint.is_empty() || payload.path.is_empty() {
            return None;
        }
        let timestamp = match payload.timestamp_ms {
            Some(ms) => DateTime::<Utc>::from_timestamp_millis(ms)?,
            None => Utc::now(),
        };
        let session_key = compute_session_key(&payload.fingerprint, site_id);
        Some(Event {
            id: uuid::Uuid::new_v4().to_string(),
            site_id: site_id.to_string(),
            session_key,
            name: payload.name.unwrap_or_else(|| "pageview".to_string()),
            path: payload.path,
            referrer: payload.referrer,
            screen_width: payload.screen_width,
            country: payload.country,
            region: payload.region,
            city: payload.city,
            device: payload.device,
            browser: payload.browser,
            os: payload.os,
            utm_source: payload.utm_source,
            utm_medium: payload.utm_medium,
            utm_campaign: payload.utm_campaign,
            utm_term: payload.utm_term,
            utm_content: payload.utm_content,
            timestamp,
            is_new_visit: true,
            page_views: 1,
            duration_seconds: 0,
        })
    }

    /// Fold a duplicate hit for the same session key into this row.
    ///
    /// Increments the page-view counter, extends the visit duration from the
    /// first-seen instant, and clears the new-visit marker. The duplicate hit
    /// itself contributes no new row.
    pub fn merge(&mut self, duplicate_at: DateTime<Utc>) {
        self.page_views = self.page_views.saturating_add(1);
        let elapsed = (duplicate_at - self.timestamp).num_seconds();
        if elapsed > 0 {
            self.duration_seconds = self.duration_seconds.max(elapsed.min(u32::MAX as i64) as u32);
        }
        self.is_new_visit = false;
    }
}
