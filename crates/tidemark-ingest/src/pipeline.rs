use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use tidemark_core::SubmissionPayload;

use crate::admission::AdmissionGuard;
use crate::sites::SiteGate;

/// The assembled write path: admission → site gate → session aggregator.
///
/// Owning structures are passed in explicitly; nothing is resolved through
/// ambient request context.
pub struct IngestPipeline {
    guard: AdmissionGuard,
    gate: SiteGate,
}

impl IngestPipeline {
    pub fn new(guard: AdmissionGuard, gate: SiteGate) -> Self {
        Self { guard, gate }
    }

    /// Run one decoded hit through the full gate chain.
    ///
    /// Returns `false` when the hit was not admitted (global budget, domain
    /// allow-list, unknown domain, or site rate limit); all of these are
    /// expected, non-fatal outcomes. The admission checks run before any per-site
    /// work, so an exhausted global budget never touches a site's limiter.
    pub async fn submit(&self, domain: &str, payload: SubmissionPayload) -> bool {
        if !self.guard.allow() {
            debug!(domain, "global request budget exhausted");
            return false;
        }
        if !self.guard.accept(domain) {
            debug!(domain, "domain not on allow-list");
            return false;
        }
        let Some(aggregator) = self.gate.check(domain) else {
            return false;
        };
        aggregator.queue(payload).await;
        true
    }

    /// Flush every site's pending batch. Each site flushes independently;
    /// the first append failure is reported after all sites were attempted.
    pub async fn flush_all(&self) -> anyhow::Result<()> {
        let mut first_error = None;
        for aggregator in self.gate.aggregators() {
            if let Err(e) = aggregator.flush().await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Periodic flush driver. Spawned once per process; append failures are
    /// already logged per site inside `flush`, so the loop keeps running.
    pub async fn run_flush_loop(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let _ = self.flush_all().await;
        }
    }
}
