use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use tidemark_core::config::{Config, SiteConfig};

use crate::aggregator::SessionAggregator;
use crate::ratelimit::RateGate;
use crate::store::EventStore;

struct Site {
    id: String,
    rate_per_sec: u32,
    burst: u32,
    aggregator: Arc<SessionAggregator>,
}

/// Resolves a request domain to its tenant site and enforces the site's
/// configured rate limit.
///
/// The registry owns the lifetime of every per-site event buffer; no single
/// request does.
pub struct SiteGate {
    rates: RateGate,
    by_domain: HashMap<String, Arc<Site>>,
    aggregators: Vec<Arc<SessionAggregator>>,
}

impl SiteGate {
    /// Build the registry from per-tenant configuration. Every registered
    /// domain resolves to its site's single aggregator; domain matching is
    /// case-insensitive.
    pub fn new(sites: Vec<SiteConfig>, config: &Config, store: Arc<dyn EventStore>) -> Self {
        let mut by_domain = HashMap::new();
        let mut aggregators = Vec::with_capacity(sites.len());
        for sc in sites {
            let aggregator = Arc::new(SessionAggregator::new(
                sc.id.clone(),
                config,
                store.clone(),
            ));
            aggregators.push(aggregator.clone());
            let site = Arc::new(Site {
                id: sc.id,
                rate_per_sec: sc.rate_per_sec,
                burst: sc.burst,
                aggregator,
            });
            for domain in sc.domains {
                by_domain.insert(domain.to_ascii_lowercase(), site.clone());
            }
        }
        Self {
            rates: RateGate::new(),
            by_domain,
            aggregators,
        }
    }

    /// Look up the site owning `domain` and consume one token from its
    /// bucket.
    ///
    /// Unknown domains and rate-limit denials both return `None`. The
    /// caller drops the event; neither is an error.
    pub fn check(&self, domain: &str) -> Option<Arc<SessionAggregator>> {
        let site = self.by_domain.get(&domain.to_ascii_lowercase())?;
        if !self.rates.allow(&site.id, site.rate_per_sec, site.burst) {
            debug!(domain, site = %site.id, "site rate limit exceeded");
            return None;
        }
        Some(site.aggregator.clone())
    }

    /// One aggregator per registered site, for the flush driver.
    pub fn aggregators(&self) -> &[Arc<SessionAggregator>] {
        &self.aggregators
    }
}
